//! Downloading a package's base and splits into a working directory.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use futures::stream;
use splitfetch_schema::PackageDescriptor;
use tracing::{info, warn};

use crate::Error;
use crate::config::SPLIT_WORKERS;
use crate::io::fetch::Fetcher;

/// One split that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedSplit {
    /// Position in the descriptor's split list.
    pub index: usize,
    pub tag: String,
    pub path: PathBuf,
}

/// Files a run works on. Always holds a base; splits that failed are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFileSet {
    pub package_id: String,
    pub base: PathBuf,
    /// Sorted by [`DownloadedSplit::index`].
    pub splits: Vec<DownloadedSplit>,
}

impl DownloadedFileSet {
    pub fn split_paths(&self) -> Vec<PathBuf> {
        self.splits.iter().map(|s| s.path.clone()).collect()
    }

    /// Every file in the set, base first.
    pub fn all_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.base.clone())
            .chain(self.split_paths())
            .collect()
    }
}

/// Temporary name of the base download: `{pkg}_base.apk`
pub fn base_file_name(package_id: &str) -> String {
    format!("{package_id}_base.apk")
}

/// Temporary name of a split download: `{pkg}_split_{i}.apk`
pub fn split_file_name(package_id: &str, index: usize) -> String {
    format!("{package_id}_split_{index}.apk")
}

/// Rejects descriptors that cannot be acted on.
pub fn validate(descriptor: &PackageDescriptor) -> Result<(), Error> {
    let id = &descriptor.package_id;
    if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
        return Err(Error::InvalidDescriptor(format!(
            "unusable package id '{id}'"
        )));
    }
    if descriptor.base_urls.is_empty() {
        return Err(Error::InvalidDescriptor(format!(
            "no base package URLs for {id}"
        )));
    }
    Ok(())
}

/// Fetches the base, then every split through a bounded worker pool.
#[derive(Debug, Clone)]
pub struct SplitDownloadCoordinator {
    fetcher: Fetcher,
    work_dir: PathBuf,
    workers: usize,
}

impl SplitDownloadCoordinator {
    pub fn new(fetcher: Fetcher, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            work_dir: work_dir.into(),
            workers: SPLIT_WORKERS,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Download everything `descriptor` names.
    ///
    /// Fails with [`Error::MissingBaseArtifact`] if the base cannot be
    /// fetched, in which case no split is attempted. Split failures are
    /// logged and leave the split out of the returned set.
    pub async fn acquire(&self, descriptor: &PackageDescriptor) -> Result<DownloadedFileSet, Error> {
        validate(descriptor)?;
        let pkg = descriptor.package_id.as_str();
        let reporter = self.fetcher.reporter();

        reporter.section(&format!("Downloading {}", descriptor.display_name()));
        let base = self.work_dir.join(base_file_name(pkg));
        if let Err(e) = self.fetcher.fetch(&descriptor.base_urls, &base).await {
            warn!(package = pkg, error = %e, "Base package download failed");
            return Err(Error::MissingBaseArtifact {
                package: pkg.to_string(),
            });
        }

        if !descriptor.has_splits() {
            return Ok(DownloadedFileSet {
                package_id: pkg.to_string(),
                base,
                splits: Vec::new(),
            });
        }

        let declared = descriptor.splits.len();
        info!(package = pkg, splits = declared, workers = self.workers, "Downloading splits");
        reporter.section(&format!("Downloading {declared} split(s)"));

        let mut results = stream::iter(descriptor.splits.iter().enumerate())
            .map(|(index, split)| {
                let dest = self.work_dir.join(split_file_name(pkg, index));
                async move {
                    match self.fetcher.fetch(&split.urls, &dest).await {
                        Ok(_) => Some(DownloadedSplit {
                            index,
                            tag: split.tag.clone(),
                            path: dest,
                        }),
                        Err(e) => {
                            warn!(package = pkg, split = %split.tag, error = %e, "Split download failed");
                            reporter.warning(&format!("Skipping split {}: {e}", split.tag));
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.workers);

        let mut splits = Vec::with_capacity(declared);
        while let Some(result) = results.next().await {
            splits.extend(result);
        }
        splits.sort_by_key(|s| s.index);

        info!(package = pkg, downloaded = splits.len(), declared, "Split downloads finished");
        Ok(DownloadedFileSet {
            package_id: pkg.to_string(),
            base,
            splits,
        })
    }
}
