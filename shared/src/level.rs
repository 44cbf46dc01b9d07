use std::fmt;

use serde::{Deserialize, Serialize};

/// Recognized crowding categories, ordered from least to most crowded.
/// `Unknown` covers any value the service sends that is not in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LevelKind {
    Relaxed,
    Normal,
    SlightlyCrowded,
    Crowded,
    Congested,
    Unknown,
}

impl LevelKind {
    /// The enumerated set, excluding the `Unknown` fallback.
    pub const KNOWN: [LevelKind; 5] = [
        LevelKind::Relaxed,
        LevelKind::Normal,
        LevelKind::SlightlyCrowded,
        LevelKind::Crowded,
        LevelKind::Congested,
    ];

    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "여유" | "light" | "relaxed" => Self::Relaxed,
            "보통" | "moderate" | "normal" => Self::Normal,
            "약간 붐빔" | "heavy" | "slightly crowded" => Self::SlightlyCrowded,
            "붐빔" | "severe" | "crowded" => Self::Crowded,
            "혼잡" | "very severe" | "congested" => Self::Congested,
            _ => Self::Unknown,
        }
    }

    /// Canonical service label, used for the category filter options.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Relaxed => "여유",
            Self::Normal => "보통",
            Self::SlightlyCrowded => "약간 붐빔",
            Self::Crowded => "붐빔",
            Self::Congested => "혼잡",
            Self::Unknown => "정보 없음",
        }
    }

    /// Marker/badge color. Light is green, moderate blue, the heavy
    /// end of the scale red, and anything unrecognized neutral gray.
    pub const fn color_rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Relaxed => (34, 197, 94),
            Self::Normal => (59, 130, 246),
            Self::SlightlyCrowded | Self::Crowded | Self::Congested => (239, 68, 68),
            Self::Unknown => (148, 150, 160),
        }
    }

    /// `#rrggbb` form of [`Self::color_rgb`].
    pub fn color_hex(self) -> String {
        let (r, g, b) = self.color_rgb();
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// A crowding level as reported by the service. The raw text is kept
/// verbatim so filtering can match exactly what was sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrowdLevel(String);

impl CrowdLevel {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> LevelKind {
        LevelKind::classify(&self.0)
    }

    /// Text for badges: the raw value, or the neutral label when empty.
    pub fn display_label(&self) -> &str {
        if self.0.trim().is_empty() {
            LevelKind::Unknown.label()
        } else {
            &self.0
        }
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_service_labels() {
        assert_eq!(LevelKind::classify("여유"), LevelKind::Relaxed);
        assert_eq!(LevelKind::classify("보통"), LevelKind::Normal);
        assert_eq!(LevelKind::classify("약간 붐빔"), LevelKind::SlightlyCrowded);
        assert_eq!(LevelKind::classify("붐빔"), LevelKind::Crowded);
        assert_eq!(LevelKind::classify("혼잡"), LevelKind::Congested);
    }

    #[test]
    fn classifies_english_aliases_case_insensitively() {
        assert_eq!(LevelKind::classify("Light"), LevelKind::Relaxed);
        assert_eq!(LevelKind::classify(" MODERATE "), LevelKind::Normal);
        assert_eq!(LevelKind::classify("very severe"), LevelKind::Congested);
    }

    #[test]
    fn unrecognized_is_unknown_but_preserved() {
        let level = CrowdLevel::new("폭주");
        assert_eq!(level.kind(), LevelKind::Unknown);
        assert_eq!(level.as_str(), "폭주");
        assert_eq!(level.display_label(), "폭주");
        assert_eq!(CrowdLevel::default().display_label(), "정보 없음");
    }

    #[test]
    fn known_set_is_ordered() {
        let mut sorted = LevelKind::KNOWN;
        sorted.sort();
        assert_eq!(sorted, LevelKind::KNOWN);
        assert!(LevelKind::Relaxed < LevelKind::Congested);
    }

    #[test]
    fn color_table() {
        assert_eq!(LevelKind::Relaxed.color_hex(), "#22c55e");
        assert_eq!(LevelKind::Normal.color_hex(), "#3b82f6");
        assert_eq!(LevelKind::Crowded.color_rgb(), LevelKind::Congested.color_rgb());
        assert_eq!(LevelKind::Unknown.color_hex(), "#9496a0");
    }
}
