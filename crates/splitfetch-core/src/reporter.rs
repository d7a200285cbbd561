//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation.

/// Snapshot of a running download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Bytes written so far.
    pub downloaded: u64,
    /// Expected size, when the server announced one.
    pub total: Option<u64>,
    /// Average throughput since the transfer started.
    pub bytes_per_sec: f64,
}

impl Progress {
    /// Percentage complete, if the total size is known.
    pub fn percent(&self) -> Option<f64> {
        self.total
            .filter(|&t| t > 0)
            .map(|t| (self.downloaded as f64 / t as f64) * 100.0)
    }
}

pub trait Reporter: Send + Sync {
    /// Indicates a new phase has started (e.g. "Downloading splits").
    fn section(&self, title: &str);

    /// Updates the progress of a download. Called at most a few times per second.
    fn downloading(&self, label: &str, progress: &Progress);

    /// Marks a download as complete.
    fn downloaded(&self, label: &str, bytes: u64);

    /// A download attempt failed and will be retried.
    fn retrying(&self, label: &str, attempt: u32, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, label: &str, progress: &Progress) {
        (**self).downloading(label, progress);
    }
    fn downloaded(&self, label: &str, bytes: u64) {
        (**self).downloaded(label, bytes);
    }
    fn retrying(&self, label: &str, attempt: u32, reason: &str) {
        (**self).retrying(label, attempt, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: &Progress) {}
    fn downloaded(&self, _: &str, _: u64) {}
    fn retrying(&self, _: &str, _: u32, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        let p = Progress {
            downloaded: 512,
            total: Some(1024),
            bytes_per_sec: 0.0,
        };
        assert_eq!(p.percent(), Some(50.0));

        let unknown = Progress { total: None, ..p };
        assert_eq!(unknown.percent(), None);

        let empty = Progress { total: Some(0), ..p };
        assert_eq!(empty.percent(), None);
    }
}
