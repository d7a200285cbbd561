//! Per-invocation settings and well-known paths.
//!
//! ```text
//! <home>/                      # SPLITFETCH_HOME or <config dir>/splitfetch
//! └── tools/
//!     ├── APKEditor.jar
//!     ├── uber-apk-signer.jar
//!     └── platform-tools/adb
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::fetch::RetryPolicy;

/// Overrides the per-user configuration directory.
pub const HOME_ENV: &str = "SPLITFETCH_HOME";
/// Overrides the auxiliary runtime executable used to run the jar tools.
pub const RUNTIME_ENV: &str = "SPLITFETCH_JAVA";
/// Overrides the device bridge executable.
pub const BRIDGE_ENV: &str = "SPLITFETCH_ADB";

/// Simultaneous split downloads.
pub const SPLIT_WORKERS: usize = 3;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Per-user configuration directory.
    pub home: PathBuf,
    /// Auxiliary runtime (`java`), resolved through `PATH` unless absolute.
    pub runtime: PathBuf,
    /// Device bridge (`adb`), resolved through `PATH` unless absolute.
    pub bridge: PathBuf,
    /// Directory relative fallback tool paths are resolved against.
    pub search_root: PathBuf,
    /// User home for home-relative fallback tool paths.
    pub user_home: Option<PathBuf>,
    /// Bound on version checks of external executables.
    pub probe_timeout: Duration,
    /// Bound on listing attached devices.
    pub device_list_timeout: Duration,
    /// Longest wait for more data from a mirror before the attempt fails.
    pub read_timeout: Duration,
    pub retry: RetryPolicy,
    pub split_workers: usize,
    /// Minimum wall-clock time between two progress updates of one download.
    pub progress_interval: Duration,
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// Returns `None` if neither `SPLITFETCH_HOME` is set nor the user's
    /// configuration directory can be determined.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let home = match lookup(HOME_ENV).filter(|v| !v.is_empty()) {
            Some(val) => PathBuf::from(val),
            None => dirs::config_dir()?.join("splitfetch"),
        };

        let mut settings = Self::with_home(home);
        if let Some(runtime) = lookup(RUNTIME_ENV).filter(|v| !v.is_empty()) {
            settings.runtime = PathBuf::from(runtime);
        }
        if let Some(bridge) = lookup(BRIDGE_ENV).filter(|v| !v.is_empty()) {
            settings.bridge = PathBuf::from(bridge);
        }
        Some(settings)
    }

    /// Default settings rooted at `home`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            runtime: PathBuf::from("java"),
            bridge: PathBuf::from("adb"),
            search_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            user_home: dirs::home_dir(),
            probe_timeout: Duration::from_secs(5),
            device_list_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            split_workers: SPLIT_WORKERS,
            progress_interval: Duration::from_millis(200),
        }
    }

    /// Installed tools: `<home>/tools`
    pub fn tools_dir(&self) -> PathBuf {
        self.home.join("tools")
    }

    /// Device bridge shipped in the tools directory: `<home>/tools/platform-tools/adb`
    pub fn installed_bridge(&self) -> PathBuf {
        let exe = if cfg!(windows) { "adb.exe" } else { "adb" };
        self.tools_dir().join("platform-tools").join(exe)
    }

    /// Resolve `path` against the fallback search root unless it is absolute.
    pub(crate) fn in_search_root(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.search_root.join(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_home_override() {
        let settings = Settings::from_lookup(lookup(&[(HOME_ENV, "/opt/sf")])).unwrap();
        assert_eq!(settings.home, PathBuf::from("/opt/sf"));
        assert_eq!(settings.tools_dir(), PathBuf::from("/opt/sf/tools"));
        assert_eq!(settings.runtime, PathBuf::from("java"));
        assert_eq!(settings.bridge, PathBuf::from("adb"));
    }

    #[test]
    fn test_program_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (HOME_ENV, "/opt/sf"),
            (RUNTIME_ENV, "/usr/lib/jvm/bin/java"),
            (BRIDGE_ENV, ""),
        ]))
        .unwrap();
        assert_eq!(settings.runtime, PathBuf::from("/usr/lib/jvm/bin/java"));
        // Empty values fall back to the default
        assert_eq!(settings.bridge, PathBuf::from("adb"));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::with_home("/tmp/sf");
        assert_eq!(settings.split_workers, 3);
        assert_eq!(settings.retry.attempts, 3);
        assert_eq!(settings.retry.pause, Duration::from_secs(1));
        assert_eq!(settings.probe_timeout, Duration::from_secs(5));
        assert_eq!(settings.progress_interval, Duration::from_millis(200));
        assert!(
            settings
                .installed_bridge()
                .starts_with("/tmp/sf/tools/platform-tools")
        );
    }
}
