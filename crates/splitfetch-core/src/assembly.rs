//! Turning a downloaded file set into one final artifact.
//!
//! One procedure per [`MergeStrategy`], each a single pass. Availability is
//! probed again right before running, so a tool that disappeared since
//! selection fails fast instead of producing half an artifact.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use serde::Serialize;
use splitfetch_schema::{MergeStrategy, PackageDescriptor};
use tracing::{debug, info, warn};

use crate::Error;
use crate::acquire::DownloadedFileSet;
use crate::io::archive::{self, BundleEntry};
use crate::probe::{Capabilities, Probe};
use crate::reporter::Reporter;

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    File(PathBuf),
    /// The packages went straight onto a device; nothing was written.
    Installed,
}

impl Artifact {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(p) => Some(p),
            Self::Installed => None,
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Installed => f.write_str("INSTALLED"),
        }
    }
}

/// An artifact, plus the reason it is not the ideal one if something went
/// wrong after useful work was already done.
#[derive(Debug)]
pub struct AssemblyOutcome {
    pub artifact: Artifact,
    pub degraded: Option<Error>,
}

impl AssemblyOutcome {
    fn complete(artifact: Artifact) -> Self {
        Self {
            artifact,
            degraded: None,
        }
    }

    fn degraded(path: PathBuf, reason: Error) -> Self {
        Self {
            artifact: Artifact::File(path),
            degraded: Some(reason),
        }
    }
}

#[derive(Serialize)]
struct XapkManifest<'a> {
    xapk_version: u8,
    package_name: &'a str,
    name: &'a str,
}

pub fn xapk_name(package_id: &str) -> String {
    format!("{package_id}.xapk")
}

pub fn apks_name(package_id: &str) -> String {
    format!("{package_id}.apks")
}

pub fn merged_name(package_id: &str) -> String {
    format!("{package_id}_merged.apk")
}

pub fn signed_name(package_id: &str) -> String {
    format!("{package_id}_signed.apk")
}

/// Where the signer may have put its output, most likely first.
///
/// The signer derives the name from its input and its own flags, so this
/// is a guess; the first existing candidate is taken as the signed file.
pub fn signer_candidates(package_id: &str, merged: &Path) -> Vec<PathBuf> {
    let dir = merged.parent().unwrap_or_else(|| Path::new("."));
    let stem = merged
        .file_stem()
        .map_or_else(|| merged_name(package_id), |s| s.to_string_lossy().into_owned());

    let names = [
        format!("{package_id}_merged-aligned-debugSigned.apk"),
        format!("{package_id}_merged-debugSigned.apk"),
        format!("{stem}-aligned-debugSigned.apk"),
        format!("{stem}-debugSigned.apk"),
    ];

    let mut candidates: Vec<PathBuf> = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(name);
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }
    candidates
}

pub struct AssemblyEngine {
    probe: Arc<dyn Probe>,
    output_dir: PathBuf,
    reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for AssemblyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyEngine")
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl AssemblyEngine {
    pub fn new(
        probe: Arc<dyn Probe>,
        output_dir: impl Into<PathBuf>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            probe,
            output_dir: output_dir.into(),
            reporter,
        }
    }

    /// Run `strategy` over `files`.
    ///
    /// Blocking: external tools are waited on without a timeout.
    pub fn execute(
        &self,
        strategy: MergeStrategy,
        descriptor: &PackageDescriptor,
        files: &DownloadedFileSet,
    ) -> Result<AssemblyOutcome, Error> {
        let caps = Capabilities::probe_for(self.probe.as_ref(), strategy);
        let status = caps.method(strategy);
        if !status.available {
            return Err(Error::NoStrategyAvailable {
                strategy: Some(strategy),
                reason: status.status,
            });
        }

        fs::create_dir_all(&self.output_dir)?;
        self.reporter
            .section(&format!("Assembling with {}", strategy.label()));
        info!(%strategy, package = %files.package_id, splits = files.splits.len(), "Assembling");

        match strategy {
            MergeStrategy::XapkBundle => self.xapk(descriptor, files),
            MergeStrategy::ApksBundle => self.apks(files),
            MergeStrategy::ApkeditorMerge => {
                let runtime = required(caps.runtime, strategy)?;
                let jar = required(caps.apkeditor, strategy)?;
                self.apkeditor(&runtime, &jar, files)
            }
            MergeStrategy::AdbInstall => {
                let bridge = required(caps.bridge, strategy)?;
                self.install(&bridge, files)
            }
            MergeStrategy::FullMergeSign => {
                let runtime = required(caps.runtime, strategy)?;
                let jar = required(caps.signer, strategy)?;
                self.merge_and_sign(&runtime, &jar, files)
            }
        }
    }

    fn xapk(
        &self,
        descriptor: &PackageDescriptor,
        files: &DownloadedFileSet,
    ) -> Result<AssemblyOutcome, Error> {
        let pkg = files.package_id.as_str();
        let manifest = serde_json::to_vec(&XapkManifest {
            xapk_version: 2,
            package_name: pkg,
            name: descriptor.display_name(),
        })
        .map_err(io::Error::other)?;

        let mut entries = vec![BundleEntry::File {
            name: "base.apk".to_string(),
            source: &files.base,
        }];
        entries.extend(files.splits.iter().enumerate().map(|(i, s)| BundleEntry::File {
            name: format!("config.{i}.apk"),
            source: &s.path,
        }));
        entries.push(BundleEntry::Bytes {
            name: "manifest.json".to_string(),
            data: manifest,
        });

        let output = self.output_dir.join(xapk_name(pkg));
        archive::write_bundle(&output, &entries)?;
        self.reporter
            .success(&format!("Created {}", output.display()));
        Ok(AssemblyOutcome::complete(Artifact::File(output)))
    }

    fn apks(&self, files: &DownloadedFileSet) -> Result<AssemblyOutcome, Error> {
        let mut entries = vec![BundleEntry::File {
            name: "base-master.apk".to_string(),
            source: &files.base,
        }];
        entries.extend(files.splits.iter().enumerate().map(|(i, s)| BundleEntry::File {
            name: format!("base-{i}.apk"),
            source: &s.path,
        }));

        let output = self.output_dir.join(apks_name(&files.package_id));
        archive::write_bundle(&output, &entries)?;
        self.reporter
            .success(&format!("Created {}", output.display()));
        Ok(AssemblyOutcome::complete(Artifact::File(output)))
    }

    fn apkeditor(
        &self,
        runtime: &Path,
        jar: &Path,
        files: &DownloadedFileSet,
    ) -> Result<AssemblyOutcome, Error> {
        let staging = tempfile::tempdir()?;
        fs::copy(&files.base, staging.path().join("base.apk"))?;
        for (i, split) in files.splits.iter().enumerate() {
            fs::copy(&split.path, staging.path().join(format!("split_{i}.apk")))?;
        }

        let output = self.output_dir.join(merged_name(&files.package_id));
        // A leftover from an earlier run must not pass the existence check
        remove_stale(&output)?;
        let mut cmd = Command::new(runtime);
        cmd.arg("-jar")
            .arg(jar)
            .args(["m", "-i"])
            .arg(staging.path())
            .arg("-o")
            .arg(&output);

        let result = run_tool(&mut cmd, "APKEditor")?;
        // Staging is removed here whatever the tool did
        drop(staging);

        if !result.status.success() {
            return Err(Error::tool_output("APKEditor", &result));
        }
        if !output.exists() {
            return Err(Error::ExternalToolFailure {
                tool: "APKEditor".to_string(),
                code: result.status.code(),
                stderr: format!("reported success but {} was not written", output.display()),
            });
        }

        self.reporter
            .success(&format!("Merged {}", output.display()));
        Ok(AssemblyOutcome::complete(Artifact::File(output)))
    }

    fn install(&self, bridge: &Path, files: &DownloadedFileSet) -> Result<AssemblyOutcome, Error> {
        let mut cmd = Command::new(bridge);
        cmd.arg("install-multiple")
            .arg(&files.base)
            .args(files.split_paths());

        let result = run_tool(&mut cmd, "adb")?;
        if !result.status.success() {
            return Err(Error::tool_output("adb", &result));
        }

        self.reporter.success("Installed via ADB");
        Ok(AssemblyOutcome::complete(Artifact::Installed))
    }

    fn merge_and_sign(
        &self,
        runtime: &Path,
        signer: &Path,
        files: &DownloadedFileSet,
    ) -> Result<AssemblyOutcome, Error> {
        let pkg = files.package_id.as_str();
        let merged = self.output_dir.join(merged_name(pkg));

        self.reporter.info("Merging split packages");
        let report = archive::merge_packages(&files.base, &files.split_paths(), &merged)?;
        info!(
            copied = report.copied,
            stripped = report.stripped,
            duplicates = report.duplicates.len(),
            "Merged package entries"
        );
        if !report.duplicates.is_empty() {
            self.reporter.info(&format!(
                "Skipped {} duplicate entries",
                report.duplicates.len()
            ));
        }

        for candidate in signer_candidates(pkg, &merged) {
            remove_stale(&candidate)?;
        }

        self.reporter.info("Signing with Uber APK Signer");
        let mut cmd = Command::new(runtime);
        cmd.arg("-jar")
            .arg(signer)
            .args(["--overwrite", "--allowResign", "-a"])
            .arg(&merged);

        let result = match run_tool(&mut cmd, "uber-apk-signer") {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Signer could not be started");
                self.reporter.warning(&e.to_string());
                return Ok(AssemblyOutcome::degraded(merged, e));
            }
        };

        if !result.status.success() {
            let e = Error::tool_output("uber-apk-signer", &result);
            warn!(error = %e, "Signer failed, keeping unsigned merge");
            self.reporter.warning(&e.to_string());
            return Ok(AssemblyOutcome::degraded(merged, e));
        }

        let Some(signed) = signer_candidates(pkg, &merged).into_iter().find(|p| p.exists()) else {
            let e = Error::AmbiguousSignerOutput {
                merged: merged.clone(),
            };
            warn!(error = %e, "Signed output not found");
            self.reporter.warning(&format!(
                "Signing finished but its output was not found; look for files starting with {pkg}_merged"
            ));
            return Ok(AssemblyOutcome::degraded(merged, e));
        };

        let output = self.output_dir.join(signed_name(pkg));
        debug!(from = %signed.display(), to = %output.display(), "Promoting signed package");
        fs::rename(&signed, &output)?;
        if merged.exists() {
            fs::remove_file(&merged)?;
        }

        self.reporter
            .success(&format!("Signed {}", output.display()));
        Ok(AssemblyOutcome::complete(Artifact::File(output)))
    }
}

fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn required(path: Option<PathBuf>, strategy: MergeStrategy) -> Result<PathBuf, Error> {
    path.ok_or_else(|| Error::NoStrategyAvailable {
        strategy: Some(strategy),
        reason: "tool disappeared while probing".to_string(),
    })
}

/// Run an external tool to completion, capturing its output.
fn run_tool(cmd: &mut Command, tool: &str) -> Result<Output, Error> {
    debug!(tool, command = ?cmd, "Running external tool");
    let output = cmd.output().map_err(|e| Error::ExternalToolFailure {
        tool: tool.to_string(),
        code: None,
        stderr: e.to_string(),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    debug!(tool, status = ?output.status.code(), stdout = %stdout.trim(), "External tool finished");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use crate::acquire::DownloadedSplit;
    use crate::probe::StaticProbe;
    use std::io::Read;
    use zip::ZipArchive;

    fn fixture(dir: &Path, splits: usize) -> (PackageDescriptor, DownloadedFileSet) {
        let base = dir.join("pkg_base.apk");
        fs::write(&base, b"base").unwrap();
        let splits = (0..splits)
            .map(|i| {
                let path = dir.join(format!("pkg_split_{i}.apk"));
                fs::write(&path, format!("split{i}")).unwrap();
                DownloadedSplit {
                    index: i,
                    tag: format!("config.{i}"),
                    path,
                }
            })
            .collect();
        let descriptor =
            PackageDescriptor::new("pkg", vec!["http://x".into()], vec![]).with_display_name("My App");
        (
            descriptor,
            DownloadedFileSet {
                package_id: "pkg".into(),
                base,
                splits,
            },
        )
    }

    fn engine(out: &Path) -> AssemblyEngine {
        AssemblyEngine::new(
            Arc::new(StaticProbe::default()),
            out,
            Arc::new(NullReporter),
        )
    }

    fn entry(path: &Path, name: &str) -> String {
        let mut zip = ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        let mut s = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn test_xapk_layout() {
        let dir = tempfile::tempdir().unwrap();
        let (descriptor, files) = fixture(dir.path(), 2);
        let out = dir.path().join("out");

        let outcome = engine(&out)
            .execute(MergeStrategy::XapkBundle, &descriptor, &files)
            .unwrap();
        assert!(outcome.degraded.is_none());
        assert_eq!(outcome.artifact, Artifact::File(out.join("pkg.xapk")));

        let path = out.join("pkg.xapk");
        assert_eq!(entry(&path, "base.apk"), "base");
        assert_eq!(entry(&path, "config.0.apk"), "split0");
        assert_eq!(entry(&path, "config.1.apk"), "split1");

        let manifest: serde_json::Value =
            serde_json::from_str(&entry(&path, "manifest.json")).unwrap();
        assert_eq!(manifest["xapk_version"], 2);
        assert_eq!(manifest["package_name"], "pkg");
        assert_eq!(manifest["name"], "My App");
    }

    #[test]
    fn test_xapk_twice_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let (descriptor, files) = fixture(dir.path(), 3);
        let first = dir.path().join("first");
        let second = dir.path().join("second");

        engine(&first)
            .execute(MergeStrategy::XapkBundle, &descriptor, &files)
            .unwrap();
        engine(&second)
            .execute(MergeStrategy::XapkBundle, &descriptor, &files)
            .unwrap();

        assert_eq!(
            fs::read(first.join("pkg.xapk")).unwrap(),
            fs::read(second.join("pkg.xapk")).unwrap()
        );
    }

    #[test]
    fn test_apks_layout() {
        let dir = tempfile::tempdir().unwrap();
        let (descriptor, files) = fixture(dir.path(), 1);

        let outcome = engine(dir.path())
            .execute(MergeStrategy::ApksBundle, &descriptor, &files)
            .unwrap();

        let path = dir.path().join("pkg.apks");
        assert_eq!(outcome.artifact.path(), Some(path.as_path()));
        let zip = ZipArchive::new(fs::File::open(&path).unwrap()).unwrap();
        let names: Vec<_> = zip.file_names().collect();
        assert_eq!(names, vec!["base-master.apk", "base-0.apk"]);
    }

    #[test]
    fn test_unavailable_strategy_fails_before_touching_files() {
        let dir = tempfile::tempdir().unwrap();
        let (descriptor, files) = fixture(dir.path(), 1);

        let err = engine(dir.path())
            .execute(MergeStrategy::FullMergeSign, &descriptor, &files)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::NoStrategyAvailable {
                strategy: Some(MergeStrategy::FullMergeSign),
                ..
            }
        ));
        assert!(!dir.path().join("pkg_merged.apk").exists());
    }

    #[test]
    fn test_signer_candidates() {
        let got = signer_candidates("com.a", Path::new("/out/com.a_merged.apk"));
        assert_eq!(
            got,
            vec![
                PathBuf::from("/out/com.a_merged-aligned-debugSigned.apk"),
                PathBuf::from("/out/com.a_merged-debugSigned.apk"),
            ]
        );
    }

    #[test]
    fn test_artifact_display() {
        assert_eq!(Artifact::Installed.to_string(), "INSTALLED");
        assert_eq!(Artifact::Installed.path(), None);
    }
}
