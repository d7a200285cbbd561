//! Failure taxonomy for the acquisition and assembly pipeline.
//!
//! Per-mirror and per-split failures never surface here: they are logged and
//! absorbed where they happen. What reaches the caller is either fatal to the
//! run or attached to a best-effort [`AssemblyOutcome`](crate::AssemblyOutcome).

use std::path::PathBuf;

use splitfetch_schema::MergeStrategy;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("All {mirrors} mirror(s) failed for {label}")]
    NetworkFailure { label: String, mirrors: usize },

    #[error("Base package for {package} could not be downloaded")]
    MissingBaseArtifact { package: String },

    #[error("{}", no_strategy_message(.strategy, .reason))]
    NoStrategyAvailable {
        strategy: Option<MergeStrategy>,
        reason: String,
    },

    #[error("No merge method was chosen")]
    UserDeclined,

    #[error("{tool} failed (exit code {}): {stderr}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ExternalToolFailure {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Signer reported success but no signed file was found next to {}", .merged.display())]
    AmbiguousSignerOutput { merged: PathBuf },

    #[error("Archive IO error: {0}")]
    ArchiveIo(#[from] std::io::Error),

    #[error("Archive format error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid package descriptor: {0}")]
    InvalidDescriptor(String),
}

impl Error {
    /// Returns `true` for failures caused by missing tools or devices rather
    /// than by the network or a user decision.
    pub fn is_setup_problem(&self) -> bool {
        matches!(self, Self::NoStrategyAvailable { .. })
    }

    pub(crate) fn tool_output(tool: &str, output: &std::process::Output) -> Self {
        Self::ExternalToolFailure {
            tool: tool.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

fn no_strategy_message(strategy: &Option<MergeStrategy>, reason: &str) -> String {
    match strategy {
        Some(s) => format!("Merge method '{}' is not available: {reason}", s.label()),
        None => format!("No merge method available: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::NoStrategyAvailable {
            strategy: Some(MergeStrategy::FullMergeSign),
            reason: "Missing: uber-apk-signer".into(),
        };
        assert_eq!(
            err.to_string(),
            "Merge method 'Full merge + resign' is not available: Missing: uber-apk-signer"
        );
        assert!(err.is_setup_problem());
        assert!(!Error::UserDeclined.is_setup_problem());

        let err = Error::ExternalToolFailure {
            tool: "adb".into(),
            code: None,
            stderr: "killed".into(),
        };
        assert_eq!(err.to_string(), "adb failed (exit code none): killed");
    }
}
