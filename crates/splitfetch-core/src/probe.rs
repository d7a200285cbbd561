//! Capability detection for the external tools the merge methods rely on.
//!
//! Nothing here mutates state and nothing here fails: a tool that cannot be
//! spawned, exits non-zero or hangs past its timeout is simply reported as
//! unavailable. Results are never cached because tools get installed and
//! devices get plugged in while the process runs.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use serde::Serialize;
use splitfetch_schema::MergeStrategy;
use tracing::debug;
use wait_timeout::ChildExt;

use crate::config::Settings;

pub const DEVICE_READY: &str = "ADB ready with connected device";
pub const NO_DEVICE: &str = "No device connected to ADB";
pub const BRIDGE_NOT_FOUND: &str = "ADB not found";
pub const BRIDGE_UNREACHABLE: &str = "ADB connection failed";

/// External jar tools that can be installed into the tools directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    ApkEditor,
    Signer,
}

impl ToolKind {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::ApkEditor => "APKEditor.jar",
            Self::Signer => "uber-apk-signer.jar",
        }
    }

    /// Places searched after the tools directory, in order.
    fn fallbacks(self) -> &'static [&'static str] {
        match self {
            Self::ApkEditor => &["APKEditor.jar", "apkeditor.jar", "tools/APKEditor.jar"],
            Self::Signer => &["uber-apk-signer.jar", "tools/uber-apk-signer.jar"],
        }
    }

    /// System-wide location searched last, if any.
    fn system_path(self) -> Option<&'static str> {
        match self {
            Self::ApkEditor => Some("/usr/local/bin/APKEditor.jar"),
            Self::Signer => None,
        }
    }
}

/// Availability of one dependency, with a line fit for showing to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolAvailability {
    pub available: bool,
    pub status: String,
}

impl ToolAvailability {
    pub fn ready(status: impl Into<String>) -> Self {
        Self {
            available: true,
            status: status.into(),
        }
    }

    pub fn missing(status: impl Into<String>) -> Self {
        Self {
            available: false,
            status: status.into(),
        }
    }
}

/// Where external tools live and whether they respond.
///
/// Components take a probe instead of looking tools up themselves, so tests
/// can substitute [`StaticProbe`].
pub trait Probe: Send + Sync {
    /// The auxiliary runtime, if it answers its version command.
    fn locate_runtime(&self) -> Option<PathBuf>;

    /// Installed copy of `kind`, first match in the documented search order.
    fn locate_tool(&self, kind: ToolKind) -> Option<PathBuf>;

    /// A device bridge executable that answers its version command.
    fn locate_bridge(&self) -> Option<PathBuf>;

    /// Raw `devices` listing from `bridge`, or `None` if the call failed.
    fn list_devices(&self, bridge: &Path) -> Option<String>;

    fn check_runtime(&self) -> bool {
        self.locate_runtime().is_some()
    }

    /// Bridge reachable and at least one live device attached.
    fn check_device_bridge(&self) -> ToolAvailability {
        device_status(self, self.locate_bridge().as_deref())
    }
}

/// Probe backed by the real filesystem and real processes.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    settings: Settings,
}

impl SystemProbe {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Every path [`Probe::locate_tool`] looks at for `kind`, in order.
    pub fn tool_candidates(&self, kind: ToolKind) -> Vec<PathBuf> {
        let mut candidates = vec![self.settings.tools_dir().join(kind.file_name())];
        candidates.extend(kind.fallbacks().iter().map(|p| self.settings.in_search_root(p)));
        if let Some(home) = &self.settings.user_home {
            candidates.push(home.join(kind.file_name()));
        }
        candidates.extend(kind.system_path().map(PathBuf::from));
        candidates
    }
}

impl Probe for SystemProbe {
    fn locate_runtime(&self) -> Option<PathBuf> {
        let runtime = &self.settings.runtime;
        check_executable(runtime, &["-version"], self.settings.probe_timeout)
            .then(|| runtime.clone())
    }

    fn locate_tool(&self, kind: ToolKind) -> Option<PathBuf> {
        let found = self.tool_candidates(kind).into_iter().find(|p| p.is_file());
        debug!(tool = kind.file_name(), path = ?found, "Located tool");
        found
    }

    fn locate_bridge(&self) -> Option<PathBuf> {
        let timeout = self.settings.probe_timeout;
        let on_path = &self.settings.bridge;
        if check_executable(on_path, &["version"], timeout) {
            return Some(on_path.clone());
        }

        let installed = self.settings.installed_bridge();
        (installed.is_file() && check_executable(&installed, &["version"], timeout))
            .then_some(installed)
    }

    fn list_devices(&self, bridge: &Path) -> Option<String> {
        let mut cmd = Command::new(bridge);
        cmd.arg("devices");
        match run_with_timeout(&mut cmd, self.settings.device_list_timeout) {
            Ok(Some(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(_) => None,
            Err(e) => {
                debug!(bridge = %bridge.display(), error = %e, "Device listing failed");
                None
            }
        }
    }
}

/// Probe with fixed answers.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub runtime: Option<PathBuf>,
    pub apkeditor: Option<PathBuf>,
    pub signer: Option<PathBuf>,
    pub bridge: Option<PathBuf>,
    /// Output of the `devices` listing; `None` makes the listing fail.
    pub devices: Option<String>,
}

impl Probe for StaticProbe {
    fn locate_runtime(&self) -> Option<PathBuf> {
        self.runtime.clone()
    }

    fn locate_tool(&self, kind: ToolKind) -> Option<PathBuf> {
        match kind {
            ToolKind::ApkEditor => self.apkeditor.clone(),
            ToolKind::Signer => self.signer.clone(),
        }
    }

    fn locate_bridge(&self) -> Option<PathBuf> {
        self.bridge.clone()
    }

    fn list_devices(&self, _bridge: &Path) -> Option<String> {
        self.devices.clone()
    }
}

/// Returns `true` if `program args...` exits zero within `timeout`.
pub fn check_executable(program: &Path, args: &[&str], timeout: Duration) -> bool {
    let mut cmd = Command::new(program);
    cmd.args(args);
    let ok = matches!(
        run_with_timeout(&mut cmd, timeout),
        Ok(Some(output)) if output.status.success()
    );
    debug!(program = %program.display(), ok, "Checked executable");
    ok
}

/// Run `cmd` to completion, killing it once `timeout` elapses.
///
/// Returns `Ok(None)` on timeout. Intended for short version and listing
/// commands whose output fits in the pipe buffers.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<Option<Output>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let Some(status) = child.wait_timeout(timeout)? else {
        child.kill().ok();
        child.wait().ok();
        return Ok(None);
    };

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_end(&mut stdout)?;
    }
    if let Some(mut err) = child.stderr.take() {
        err.read_to_end(&mut stderr)?;
    }

    Ok(Some(Output {
        status,
        stdout,
        stderr,
    }))
}

/// Number of attached devices in state `device` in a `devices` listing.
///
/// The header line, blank lines, daemon chatter and devices that are
/// `offline` or `unauthorized` are not counted.
pub fn count_live_devices(listing: &str) -> usize {
    listing
        .lines()
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _serial = cols.next()?;
            cols.next()
        })
        .filter(|state| *state == "device")
        .count()
}

/// Device status for an already located bridge.
pub fn device_status<P: Probe + ?Sized>(probe: &P, bridge: Option<&Path>) -> ToolAvailability {
    let Some(bridge) = bridge else {
        return ToolAvailability::missing(BRIDGE_NOT_FOUND);
    };
    match probe.list_devices(bridge) {
        None => ToolAvailability::missing(BRIDGE_UNREACHABLE),
        Some(listing) if count_live_devices(&listing) > 0 => ToolAvailability::ready(DEVICE_READY),
        Some(_) => ToolAvailability::missing(NO_DEVICE),
    }
}

/// A merge method annotated with whether it can run right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodStatus {
    pub strategy: MergeStrategy,
    pub available: bool,
    pub status: String,
}

/// Snapshot of one probing pass.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub runtime: Option<PathBuf>,
    pub apkeditor: Option<PathBuf>,
    pub signer: Option<PathBuf>,
    pub bridge: Option<PathBuf>,
    pub device: Option<ToolAvailability>,
}

impl Capabilities {
    /// Probe everything any method depends on.
    pub fn probe<P: Probe + ?Sized>(probe: &P) -> Self {
        let bridge = probe.locate_bridge();
        let device = device_status(probe, bridge.as_deref());
        Self {
            runtime: probe.locate_runtime(),
            apkeditor: probe.locate_tool(ToolKind::ApkEditor),
            signer: probe.locate_tool(ToolKind::Signer),
            bridge,
            device: Some(device),
        }
    }

    /// Probe only what `strategy` depends on.
    pub fn probe_for<P: Probe + ?Sized>(probe: &P, strategy: MergeStrategy) -> Self {
        match strategy {
            MergeStrategy::XapkBundle | MergeStrategy::ApksBundle => Self::default(),
            MergeStrategy::ApkeditorMerge => Self {
                runtime: probe.locate_runtime(),
                apkeditor: probe.locate_tool(ToolKind::ApkEditor),
                ..Self::default()
            },
            MergeStrategy::AdbInstall => {
                let bridge = probe.locate_bridge();
                let device = device_status(probe, bridge.as_deref());
                Self {
                    bridge,
                    device: Some(device),
                    ..Self::default()
                }
            }
            MergeStrategy::FullMergeSign => Self {
                runtime: probe.locate_runtime(),
                signer: probe.locate_tool(ToolKind::Signer),
                ..Self::default()
            },
        }
    }

    pub fn method(&self, strategy: MergeStrategy) -> MethodStatus {
        let (available, status) = match strategy {
            MergeStrategy::XapkBundle | MergeStrategy::ApksBundle => {
                (true, "Always available".to_string())
            }
            MergeStrategy::ApkeditorMerge => {
                let mut problems = Vec::new();
                if self.runtime.is_none() {
                    problems.push("Java not found");
                }
                if self.apkeditor.is_none() {
                    problems.push("APKEditor.jar not found");
                }
                if problems.is_empty() {
                    (true, "Ready".to_string())
                } else {
                    (false, problems.join(" | "))
                }
            }
            MergeStrategy::AdbInstall => match &self.device {
                Some(device) => (device.available, device.status.clone()),
                None => (false, BRIDGE_NOT_FOUND.to_string()),
            },
            MergeStrategy::FullMergeSign => {
                let mut missing = Vec::new();
                if self.signer.is_none() {
                    missing.push("uber-apk-signer");
                }
                if self.runtime.is_none() {
                    missing.push("Java");
                }
                if missing.is_empty() {
                    (true, "Ready with Uber APK Signer".to_string())
                } else {
                    (false, format!("Missing: {}", missing.join(", ")))
                }
            }
        };

        MethodStatus {
            strategy,
            available,
            status,
        }
    }
}

/// All five methods, freshly probed.
pub fn enumerate_methods<P: Probe + ?Sized>(probe: &P) -> Vec<MethodStatus> {
    let caps = Capabilities::probe(probe);
    MergeStrategy::ALL.iter().map(|&s| caps.method(s)).collect()
}

/// Individual dependencies, as shown by the capability report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dependency {
    AuxiliaryRuntime,
    ApkeditorJar,
    SignerJar,
    DeviceBridge,
    DeviceBridgeWithConnectedDevice,
}

impl Dependency {
    pub const ALL: [Self; 5] = [
        Self::AuxiliaryRuntime,
        Self::ApkeditorJar,
        Self::SignerJar,
        Self::DeviceBridge,
        Self::DeviceBridgeWithConnectedDevice,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::AuxiliaryRuntime => "auxiliary-runtime",
            Self::ApkeditorJar => "apkeditor-jar",
            Self::SignerJar => "signer-jar",
            Self::DeviceBridge => "device-bridge",
            Self::DeviceBridgeWithConnectedDevice => "device-bridge-with-connected-device",
        }
    }
}

/// Availability of every [`Dependency`], in [`Dependency::ALL`] order.
pub fn probe_dependencies<P: Probe + ?Sized>(probe: &P) -> Vec<(Dependency, ToolAvailability)> {
    let caps = Capabilities::probe(probe);
    let found = |path: &Option<PathBuf>, missing: &str| match path {
        Some(p) => ToolAvailability::ready(format!("Found at {}", p.display())),
        None => ToolAvailability::missing(missing),
    };

    vec![
        (
            Dependency::AuxiliaryRuntime,
            found(&caps.runtime, "Java not found"),
        ),
        (
            Dependency::ApkeditorJar,
            found(&caps.apkeditor, "APKEditor.jar not found"),
        ),
        (
            Dependency::SignerJar,
            found(&caps.signer, "uber-apk-signer.jar not found"),
        ),
        (
            Dependency::DeviceBridge,
            found(&caps.bridge, BRIDGE_NOT_FOUND),
        ),
        (
            Dependency::DeviceBridgeWithConnectedDevice,
            caps.device
                .unwrap_or_else(|| ToolAvailability::missing(BRIDGE_NOT_FOUND)),
        ),
    ]
}
