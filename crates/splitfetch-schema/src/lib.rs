//! Shared types and wire formats for splitfetch.
//!
//! Store clients produce a [`StoreReply`]; everything downstream works on the
//! normalized [`PackageDescriptor`] and picks one of the fixed
//! [`MergeStrategy`] variants to assemble the downloaded files.

/// Normalized package and split descriptors.
pub mod descriptor;
/// Store reply shapes and their conversion to descriptors.
pub mod reply;
/// The fixed set of merge strategies.
pub mod strategy;

// Re-exports
pub use descriptor::{PackageDescriptor, SplitDescriptor};
pub use reply::{ReplyError, StoreReply};
pub use strategy::{MergeStrategy, ParseStrategyError};
