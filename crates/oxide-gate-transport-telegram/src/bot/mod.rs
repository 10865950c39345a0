/// Command and message handlers
pub mod handlers;
/// `Transport` implementation over the Bot API
pub mod transport;
/// Reply keyboards
pub mod views;

pub use transport::TelegramTransport;
