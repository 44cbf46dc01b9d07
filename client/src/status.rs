use chrono::{DateTime, Utc};

use crowdmap_shared::IngestError;
use crowdmap_shared::format::{format_count, format_kst};

/// Text under the toolbar. A failed refresh replaces the text but the
/// markers from the last good fetch stay on the map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub loading: bool,
    pub text: String,
    pub is_error: bool,
}

impl StatusLine {
    /// Keep the previous text visible while a fetch is pending.
    pub fn loading(previous: &StatusLine) -> Self {
        let text = if previous.text.is_empty() {
            "Loading crowd data...".to_string()
        } else {
            previous.text.clone()
        };
        Self {
            loading: true,
            text,
            is_error: previous.is_error,
        }
    }

    pub fn loaded(total: usize, latest: Option<DateTime<Utc>>) -> Self {
        let count = format_count(i64::try_from(total).unwrap_or(i64::MAX));
        let text = match latest {
            Some(at) => format!("{count} places · updated {} KST", format_kst(&at)),
            None => format!("{count} places"),
        };
        Self {
            loading: false,
            text,
            is_error: false,
        }
    }

    pub fn failed(err: &IngestError) -> Self {
        Self {
            loading: false,
            text: err.status_message(),
            is_error: true,
        }
    }

    pub fn message(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            loading: false,
            text: text.into(),
            is_error,
        }
    }
}
