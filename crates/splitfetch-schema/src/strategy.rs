//! The five ways of turning a base package plus splits into one artifact.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A merge strategy, identified on the command line by number (1-5) or slug.
///
/// # Example
///
/// ```
/// use splitfetch_schema::MergeStrategy;
///
/// let s: MergeStrategy = "5".parse().unwrap();
/// assert_eq!(s, MergeStrategy::FullMergeSign);
/// assert_eq!(s.slug(), "full-merge-sign");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Bundle base and splits into an `.xapk` with a JSON manifest.
    XapkBundle,
    /// Bundle base and splits into an `.apks` archive.
    ApksBundle,
    /// Merge into a single APK with the external APKEditor jar.
    ApkeditorMerge,
    /// Install base and splits on a connected device through the device bridge.
    AdbInstall,
    /// Merge archive entries directly and re-sign with the external signer jar.
    FullMergeSign,
}

/// Error returned when a strategy identifier is neither a known id nor slug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown merge strategy '{0}' (expected 1-5 or a strategy name)")]
pub struct ParseStrategyError(pub String);

impl MergeStrategy {
    /// All strategies in menu order.
    pub const ALL: [Self; 5] = [
        Self::XapkBundle,
        Self::ApksBundle,
        Self::ApkeditorMerge,
        Self::AdbInstall,
        Self::FullMergeSign,
    ];

    /// Numeric id used by the command line (1-5).
    pub fn id(self) -> u8 {
        match self {
            Self::XapkBundle => 1,
            Self::ApksBundle => 2,
            Self::ApkeditorMerge => 3,
            Self::AdbInstall => 4,
            Self::FullMergeSign => 5,
        }
    }

    /// Looks a strategy up by numeric id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Stable machine name.
    pub fn slug(self) -> &'static str {
        match self {
            Self::XapkBundle => "xapk-bundle",
            Self::ApksBundle => "apks-bundle",
            Self::ApkeditorMerge => "apkeditor-merge",
            Self::AdbInstall => "adb-install",
            Self::FullMergeSign => "full-merge-sign",
        }
    }

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            Self::XapkBundle => "XAPK bundle",
            Self::ApksBundle => "APKS bundle",
            Self::ApkeditorMerge => "APKEditor merge",
            Self::AdbInstall => "Install via ADB",
            Self::FullMergeSign => "Full merge + resign",
        }
    }

    /// One-line description shown next to the label.
    pub fn description(self) -> &'static str {
        match self {
            Self::XapkBundle => "Create XAPK file (recommended)",
            Self::ApksBundle => "Create APKS file",
            Self::ApkeditorMerge => "Merge using APKEditor",
            Self::AdbInstall => "Direct install to device",
            Self::FullMergeSign => "Complete merge and sign",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for MergeStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id).ok_or_else(|| ParseStrategyError(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStrategyError(s.to_string()))
    }
}
