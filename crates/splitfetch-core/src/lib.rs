//! Core library for splitfetch.
//!
//! The pipeline runs leaves first:
//!
//! ```text
//! PackageDescriptor --[acquire]--> DownloadedFileSet --[select]--> MergeStrategy
//!                                                   \--[assemble]--> Artifact
//! ```
//!
//! Downloaded files are always removed afterwards, whatever the outcome.

pub mod acquire;
pub mod assembly;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod probe;
pub mod reporter;
pub mod select;

pub use acquire::{DownloadedFileSet, DownloadedSplit, SplitDownloadCoordinator};
pub use assembly::{Artifact, AssemblyEngine, AssemblyOutcome};
pub use cleanup::WorkspaceCleaner;
pub use config::Settings;
pub use error::Error;
pub use io::fetch::{Fetcher, RetryPolicy, build_client};
pub use pipeline::{Pipeline, RunOutcome};
pub use probe::{
    Capabilities, Dependency, MethodStatus, Probe, StaticProbe, SystemProbe, ToolAvailability,
    ToolKind, enumerate_methods, probe_dependencies,
};
pub use reporter::{NullReporter, Progress, Reporter};
pub use select::{Chooser, Decline, Fixed};

pub use splitfetch_schema::{MergeStrategy, PackageDescriptor, SplitDescriptor};

/// User Agent string for outgoing requests
pub const USER_AGENT: &str = concat!("splitfetch/", env!("CARGO_PKG_VERSION"));
