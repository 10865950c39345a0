//! Reply keyboards
//!
//! Maps the core's [`Keyboard`] onto Telegram reply markup.

use oxide_gate_core::menu::{main_menu_rows, LABEL_CANCEL};
use oxide_gate_core::transport::Keyboard;
use teloxide::types::{KeyboardButton, KeyboardMarkup};

fn row<I, S>(labels: I) -> Vec<KeyboardButton>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels.into_iter().map(KeyboardButton::new).collect()
}

/// Build the reply keyboard for a core keyboard
///
/// # Examples
///
/// ```
/// use oxide_gate_core::transport::Keyboard;
/// use oxide_gate_transport_telegram::bot::views::render_keyboard;
///
/// let markup = render_keyboard(&Keyboard::Cancel);
/// assert_eq!(markup.keyboard.len(), 1);
/// ```
#[must_use]
pub fn render_keyboard(keyboard: &Keyboard) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = match keyboard {
        Keyboard::MainMenu(role) => main_menu_rows(*role).into_iter().map(row).collect(),
        Keyboard::Cancel => vec![row([LABEL_CANCEL])],
        Keyboard::Choices(choices) => choices
            .iter()
            .map(|choice| row([choice.as_str()]))
            .chain(std::iter::once(row([LABEL_CANCEL])))
            .collect(),
    };
    KeyboardMarkup::new(rows).resize_keyboard()
}
