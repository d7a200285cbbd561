use serde::{Deserialize, Serialize};

/// Everything needed to download one application: its base package and the
/// split packages that complete it.
///
/// Produced by a store client (through [`StoreReply`](crate::StoreReply)) and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Package identifier (e.g. `com.example.app`), unique across stores.
    pub package_id: String,

    /// Human readable name, written into bundle metadata.
    /// Falls back to the package identifier when the store gives none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Mirrors for the base package, tried in order.
    pub base_urls: Vec<String>,

    /// Split packages. They are combined, never sequenced, so the order only
    /// matters for naming and merge precedence.
    #[serde(default)]
    pub splits: Vec<SplitDescriptor>,
}

impl PackageDescriptor {
    /// Creates a descriptor with no display name.
    pub fn new(
        package_id: impl Into<String>,
        base_urls: Vec<String>,
        splits: Vec<SplitDescriptor>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            display_name: None,
            base_urls,
            splits,
        }
    }

    /// Sets the human readable name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name to show users and to write into bundle manifests.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.package_id)
    }

    /// Returns `true` if the store declared at least one split.
    pub fn has_splits(&self) -> bool {
        !self.splits.is_empty()
    }
}

/// One split package (density, ABI or language fragment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDescriptor {
    /// Logical tag as reported by the store (e.g. `config.arm64_v8a`).
    pub tag: String,

    /// Mirrors for this split, tried in order.
    pub urls: Vec<String>,
}

impl SplitDescriptor {
    /// Creates a split descriptor.
    pub fn new(tag: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            tag: tag.into(),
            urls,
        }
    }
}
