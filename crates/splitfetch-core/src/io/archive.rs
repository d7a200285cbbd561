//! Zip-level operations on packages: bundling whole files into a container
//! and merging the entries of several packages into one.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::Error;

/// Signature directory; its entries are invalid once contents change.
pub const SIGNATURE_DIR: &str = "META-INF/";

/// Package manifest entry. Only the base package's copy survives a merge.
pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";

/// One member of a bundle archive.
#[derive(Debug, Clone)]
pub enum BundleEntry<'a> {
    /// Copy a file from disk under the given entry name.
    File { name: String, source: &'a Path },
    /// Write literal bytes under the given entry name.
    Bytes { name: String, data: Vec<u8> },
}

/// Summary of a [`merge_packages`] run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub copied: usize,
    pub stripped: usize,
    pub duplicates: Vec<String>,
}

/// Entry options for bundles. Fixed timestamps keep repeated runs
/// byte-identical; packages are already compressed, so they are stored.
fn bundle_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default())
}

/// Write a new archive at `output` holding `entries` in order.
pub fn write_bundle(output: &Path, entries: &[BundleEntry<'_>]) -> Result<(), Error> {
    let mut zip = ZipWriter::new(File::create(output)?);

    for entry in entries {
        match entry {
            BundleEntry::File { name, source } => {
                zip.start_file(name.as_str(), bundle_options())?;
                let mut reader = BufReader::new(File::open(source)?);
                io::copy(&mut reader, &mut zip)?;
            }
            BundleEntry::Bytes { name, data } => {
                zip.start_file(name.as_str(), bundle_options())?;
                zip.write_all(data)?;
            }
        }
    }

    zip.finish()?;
    Ok(())
}

fn is_signature_entry(name: &str) -> bool {
    name.starts_with(SIGNATURE_DIR)
}

/// Merge the entries of `base` and `splits` into a single package at `output`.
///
/// Signature entries are dropped everywhere so the result can be re-signed,
/// and split manifests are dropped in favour of the base's. Entry names are
/// claimed by the first writer: the base beats every split and earlier
/// splits beat later ones. Losing duplicates are skipped, not overwritten.
///
/// Entries are copied raw, keeping each one's compression as stored.
pub fn merge_packages(base: &Path, splits: &[PathBuf], output: &Path) -> Result<MergeReport, Error> {
    let mut writer = ZipWriter::new(File::create(output)?);
    let mut claimed: HashSet<String> = HashSet::new();
    let mut report = MergeReport::default();

    copy_entries(base, &mut writer, &mut claimed, &mut report, |name| {
        is_signature_entry(name)
    })?;

    for split in splits {
        debug!(split = %split.display(), "Merging split entries");
        copy_entries(split, &mut writer, &mut claimed, &mut report, |name| {
            is_signature_entry(name) || name == MANIFEST_ENTRY
        })?;
    }

    writer.finish()?;
    Ok(report)
}

fn copy_entries(
    source: &Path,
    writer: &mut ZipWriter<File>,
    claimed: &mut HashSet<String>,
    report: &mut MergeReport,
    strip: impl Fn(&str) -> bool,
) -> Result<(), Error> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(source)?))?;

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();

        if strip(&name) {
            report.stripped += 1;
            continue;
        }
        if claimed.contains(&name) {
            debug!(entry = %name, source = %source.display(), "Skipping duplicate entry");
            report.duplicates.push(name);
            continue;
        }

        writer.raw_copy_file(entry)?;
        claimed.insert(name);
        report.copied += 1;
    }

    Ok(())
}
