//! Outbound message text and deep links. Nothing is sent from here; the
//! link is handed to staff to open in their messaging client.

use crate::config::Settings;
use crate::models::{EntryStatus, QueueEntry};
use serde::{Deserialize, Serialize};

/// A staff-facing message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// First call-up, asks the customer to confirm.
    Initial,
    ReplyYes,
    ReplyNo,
}

/// The customer's answer to a call-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reply {
    Yes,
    No,
}

impl Reply {
    pub fn template(self) -> Template {
        match self {
            Reply::Yes => Template::ReplyYes,
            Reply::No => Template::ReplyNo,
        }
    }
}

impl Template {
    /// Status the entry moves to once this message goes out.
    pub fn next_status(self) -> EntryStatus {
        match self {
            Template::Initial => EntryStatus::Notified,
            Template::ReplyYes => EntryStatus::Confirmed,
            Template::ReplyNo => EntryStatus::Waiting,
        }
    }

    pub fn render(self, name: &str, settings: &Settings) -> String {
        let minutes = (settings.response_window_ms / 60_000).max(1);
        let text = match self {
            Template::Initial => format!(
                "Hi [NAME],\n\nYour turn at {} is coming up! Please reply \"YES\" if you're on your way, or \"NO\" if you can't make it yet.\n\nWe'll wait for your answer for the next {} minute(s). Thanks!",
                settings.business_name, minutes
            ),
            Template::ReplyYes => format!(
                "Thanks for confirming, [NAME]! Please head over to {} now so you don't miss your turn.",
                settings.business_name
            ),
            Template::ReplyNo => {
                "No problem, [NAME], thanks for letting us know. We'll reach out again when a slot opens up."
                    .to_string()
            }
        };
        text.replace("[NAME]", name)
    }
}

/// A rendered message plus the link that opens it pre-filled.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub entry: QueueEntry,
    pub message: String,
    pub link: String,
}

impl Notification {
    pub fn new(entry: QueueEntry, template: Template, settings: &Settings) -> Self {
        let message = template.render(&entry.name, settings);
        let link = message_link(&entry.phone, &message);
        Self { entry, message, link }
    }
}

pub fn message_link(phone: &str, message: &str) -> String {
    format!("https://wa.me/{}?text={}", phone, urlencoding::encode(message))
}

/// Digits only, with the local trunk `0` swapped for `country_code` and the
/// country code prefixed when missing. Returns `None` when no digits remain.
pub fn normalize_phone(raw: &str, country_code: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let normalized = if let Some(rest) = digits.strip_prefix('0') {
        format!("{country_code}{rest}")
    } else if digits.starts_with(country_code) {
        digits
    } else {
        format!("{country_code}{digits}")
    };
    Some(normalized)
}
