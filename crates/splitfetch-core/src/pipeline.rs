//! One complete run: acquire, select, assemble, clean up.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use splitfetch_schema::{MergeStrategy, PackageDescriptor};
use tracing::{debug, info};

use crate::Error;
use crate::acquire::SplitDownloadCoordinator;
use crate::assembly::{AssemblyEngine, AssemblyOutcome};
use crate::cleanup::WorkspaceCleaner;
use crate::config::Settings;
use crate::io::fetch::{Fetcher, RetryPolicy};
use crate::probe::{Probe, SystemProbe, enumerate_methods};
use crate::reporter::Reporter;
use crate::select::{Chooser, select};

/// Result of [`Pipeline::run`].
#[derive(Debug)]
pub enum RunOutcome {
    /// The package has no splits; the base was kept as `{pkg}.apk`.
    Single(PathBuf),
    Assembled {
        strategy: MergeStrategy,
        outcome: AssemblyOutcome,
    },
}

pub struct Pipeline {
    client: Client,
    probe: Arc<dyn Probe>,
    reporter: Arc<dyn Reporter>,
    output_dir: PathBuf,
    retry: RetryPolicy,
    split_workers: usize,
    progress_interval: Duration,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("output_dir", &self.output_dir)
            .field("retry", &self.retry)
            .field("split_workers", &self.split_workers)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        settings: &Settings,
        client: Client,
        output_dir: impl Into<PathBuf>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            client,
            probe: Arc::new(SystemProbe::new(settings)),
            reporter,
            output_dir: output_dir.into(),
            retry: settings.retry,
            split_workers: settings.split_workers,
            progress_interval: settings.progress_interval,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Download and assemble `descriptor`.
    ///
    /// Intermediate downloads are removed before this returns, on success
    /// and on every error after the base was fetched.
    pub async fn run(
        &self,
        descriptor: &PackageDescriptor,
        explicit: Option<MergeStrategy>,
        chooser: &dyn Chooser,
    ) -> Result<RunOutcome, Error> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let fetcher = Fetcher::new(self.client.clone(), Arc::clone(&self.reporter))
            .with_policy(self.retry)
            .with_progress_interval(self.progress_interval);
        let coordinator = SplitDownloadCoordinator::new(fetcher, &self.output_dir)
            .with_workers(self.split_workers);

        let files = coordinator.acquire(descriptor).await?;
        let mut cleaner = WorkspaceCleaner::new();
        for path in files.all_paths() {
            cleaner.track(path);
        }

        if !descriptor.has_splits() {
            let output = self
                .output_dir
                .join(format!("{}.apk", descriptor.package_id));
            tokio::fs::rename(&files.base, &output).await?;
            cleaner.release(&files.base);
            self.reporter
                .success(&format!("Downloaded {}", output.display()));
            return Ok(RunOutcome::Single(output));
        }

        let probe = Arc::clone(&self.probe);
        let methods = tokio::task::spawn_blocking(move || enumerate_methods(probe.as_ref()))
            .await
            .map_err(join_error)?;
        let strategy = select(&methods, explicit, chooser, &descriptor.package_id)?;
        info!(%strategy, package = %descriptor.package_id, "Selected merge method");

        let engine = AssemblyEngine::new(
            Arc::clone(&self.probe),
            self.output_dir.clone(),
            Arc::clone(&self.reporter),
        );
        let owned_descriptor = descriptor.clone();
        let owned_files = files.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            engine.execute(strategy, &owned_descriptor, &owned_files)
        })
        .await
        .map_err(join_error)??;

        let removed = cleaner.finish();
        debug!(removed, "Removed intermediate files");
        Ok(RunOutcome::Assembled { strategy, outcome })
    }
}

fn join_error(e: tokio::task::JoinError) -> Error {
    Error::ArchiveIo(io::Error::other(e))
}
