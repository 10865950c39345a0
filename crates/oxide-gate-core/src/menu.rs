//! Menu labels and reply texts
//!
//! Contains the reply-keyboard labels, label matching, and every text the
//! gate sends to a caller.

use crate::vault::Role;
use lazy_regex::regex_replace_all;

// ─────────────────────────────────────────────────────────────────────────────
// Labels
// ─────────────────────────────────────────────────────────────────────────────

/// Start adding an admin
pub const LABEL_ADD_ADMIN: &str = "➕ Add admin";
/// Start adding an operator
pub const LABEL_ADD_OPERATOR: &str = "➕ Add operator";
/// Start removing an operator
pub const LABEL_REMOVE_OPERATOR: &str = "➖ Remove operator";
/// List operators
pub const LABEL_LIST_OPERATORS: &str = "📋 List operators";
/// Start the remote login and member export
pub const LABEL_SCAN: &str = "🔍 Scan";
/// Abort the current flow
pub const LABEL_CANCEL: &str = "❌ Cancel";

/// Item of the main menu
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuItem {
    /// [`LABEL_ADD_ADMIN`]
    AddAdmin,
    /// [`LABEL_ADD_OPERATOR`]
    AddOperator,
    /// [`LABEL_REMOVE_OPERATOR`]
    RemoveOperator,
    /// [`LABEL_LIST_OPERATORS`]
    ListOperators,
    /// [`LABEL_SCAN`]
    Scan,
    /// [`LABEL_CANCEL`]
    Cancel,
}

impl MenuItem {
    const ALL: [Self; 6] = [
        Self::AddAdmin,
        Self::AddOperator,
        Self::RemoveOperator,
        Self::ListOperators,
        Self::Scan,
        Self::Cancel,
    ];

    /// Button label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AddAdmin => LABEL_ADD_ADMIN,
            Self::AddOperator => LABEL_ADD_OPERATOR,
            Self::RemoveOperator => LABEL_REMOVE_OPERATOR,
            Self::ListOperators => LABEL_LIST_OPERATORS,
            Self::Scan => LABEL_SCAN,
            Self::Cancel => LABEL_CANCEL,
        }
    }

    /// Whether only admins may select this item
    #[must_use]
    pub const fn admin_only(self) -> bool {
        matches!(
            self,
            Self::AddAdmin | Self::AddOperator | Self::RemoveOperator | Self::ListOperators
        )
    }

    /// Match free text against the labels
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|item| is_same_label(text, item.label()))
    }
}

/// Main menu rows for a role
#[must_use]
pub fn main_menu_rows(role: Role) -> Vec<Vec<&'static str>> {
    match role {
        Role::Admin => vec![
            vec![LABEL_ADD_ADMIN, LABEL_ADD_OPERATOR, LABEL_REMOVE_OPERATOR],
            vec![LABEL_LIST_OPERATORS, LABEL_SCAN],
        ],
        Role::Operator => vec![vec![LABEL_SCAN]],
    }
}

/// Canonical form of a label: no leading `/`, no whitespace, lowercase
#[must_use]
pub fn normalize_label(text: &str) -> String {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    regex_replace_all!(r"\s+", trimmed, "").to_lowercase()
}

/// Whether `text` selects `label`
#[must_use]
pub fn is_same_label(text: &str, label: &str) -> bool {
    normalize_label(text) == normalize_label(label)
}

// ─────────────────────────────────────────────────────────────────────────────
// Texts
// ─────────────────────────────────────────────────────────────────────────────

/// Reply texts
pub mod texts {
    /// Sent on `/start` before the menu
    pub const USAGE_WARNING: &str = "⚠️ This bot signs in to a messaging account on your behalf.\n\
        Use it only with accounts you own or are authorized to manage. \
        Login messages are deleted automatically and sessions expire after 15 minutes.";
    /// Sent with the menu on `/start`
    pub const WELCOME: &str = "Welcome to the main menu:";
    /// Sent with the menu after a flow ends
    pub const BACK_TO_MENU: &str = "Back to the main menu:";
    /// Input outside any flow that matches no label
    pub const UNKNOWN_COMMAND: &str = "Unknown command, use the menu buttons.";
    /// Operator selected an admin-only item
    pub const ADMIN_ONLY: &str = "🚫 Only admins can do this.";

    /// Scan selected
    pub const ASK_PHONE: &str = "📱 Enter the phone number to sign in:";
    /// Phone input rejected
    pub const INVALID_PHONE: &str =
        "❌ Invalid number. Use the format +79161234567 or press Cancel.";
    /// Before requesting the code
    pub const SENDING_CODE: &str = "⏳ Sending the verification code...";
    /// Code requested
    pub const ASK_CODE: &str = "📩 Verification code sent. Enter it:";
    /// Second factor required
    pub const ASK_PASSWORD: &str = "🔒 Enter the 2FA password:";
    /// Credential artifact exists but no session is tracked
    pub const SESSION_EXISTS: &str = "⚠️ A session for this number already exists.";
    /// Code rejected or reuse failed
    pub const AUTH_FAILED: &str = "❌ Authorization failed.";
    /// Password rejected
    pub const PASSWORD_FAILED: &str = "❌ 2FA failed.";
    /// Dialog listing failed
    pub const CHATS_FAILED: &str = "❌ Failed to fetch the chat list.";
    /// No exportable chat
    pub const NO_CHATS: &str = "No groups or channels available.";
    /// Chat list presented
    pub const CHOOSE_CHAT: &str = "Choose a chat to export members from:";
    /// Selection matched no presented title
    pub const CHAT_NOT_FOUND: &str = "❌ Chat not found. Pick one of the buttons or press Cancel.";

    /// Participant fetch failed
    pub const MEMBERS_FAILED: &str = "❌ Failed to export members.";
    /// Chat has no participants
    pub const NO_MEMBERS: &str = "No members found in this chat.";
    /// Spreadsheet writer failed or is not compiled in
    pub const CSV_FALLBACK: &str = "⚠️ Spreadsheet export is unavailable, sending CSV instead.";
    /// Upload failed
    pub const UPLOAD_FAILED: &str = "❌ Failed to send the export file.";

    /// Add admin selected
    pub const ASK_ADMIN_ID: &str = "Enter the Telegram ID of the new admin (number):";
    /// Add operator selected
    pub const ASK_OPERATOR_ID: &str = "Enter the Telegram ID of the new operator (number):";
    /// Remove operator selected
    pub const ASK_REMOVE_ID: &str = "Choose the operator to remove or type the ID:";
    /// Id input rejected
    pub const ID_NOT_NUMBER: &str = "❌ The ID must be a number. Enter a valid Telegram ID or press Cancel.";
    /// Operator roster is empty
    pub const NO_OPERATORS: &str = "No operators.";
    /// Already an admin
    pub const ALREADY_ADMIN: &str = "⚠️ This user is already an admin.";
    /// Already an operator
    pub const ALREADY_OPERATOR: &str = "⚠️ This user is already an operator.";
    /// Operator to remove is not on the roster
    pub const OPERATOR_NOT_FOUND: &str = "⚠️ No such operator.";
    /// Roster write failed
    pub const ROSTER_SAVE_FAILED: &str = "❌ Failed to save the roster.";

    /// Admin added
    #[must_use]
    pub fn admin_added(id: i64) -> String {
        format!("✅ Admin added: {id}")
    }

    /// Operator added
    #[must_use]
    pub fn operator_added(id: i64) -> String {
        format!("✅ Operator added: {id}")
    }

    /// Operator removed
    #[must_use]
    pub fn operator_removed(id: i64) -> String {
        format!("✅ Operator {id} removed.")
    }

    /// Operator listing
    #[must_use]
    pub fn operator_list(ids: &[i64]) -> String {
        let lines: Vec<String> = ids.iter().map(ToString::to_string).collect();
        format!("Operators:\n{}", lines.join("\n"))
    }

    /// Code request failed for a reason other than an existing session
    #[must_use]
    pub fn code_request_failed(detail: &str) -> String {
        format!("❌ Failed to send the code: {detail}")
    }
}
