use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use crate::core::reconciler::ListKind;

/// Page size used by the repository's list endpoints when nothing else is configured
pub const DEFAULT_PAGE_SIZE: NonZeroU32 = match NonZeroU32::new(25) {
    Some(size) => size,
    None => panic!("page size must be non-zero"),
};

/// Settings for the list engine
///
/// ```yaml
/// default_page_size: 25
/// page_sizes:
///   search: 50
/// clear_on_refresh: false
/// logging:
///   filter: "folio=debug"
///   file: /tmp/folio.log
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub default_page_size: NonZeroU32,
    /// Per-list overrides of `default_page_size`
    pub page_sizes: HashMap<ListKind, NonZeroU32>,
    /// Empty a list when a refresh starts instead of when page 1 arrives.
    /// A failed refresh then leaves the list empty.
    pub clear_on_refresh: bool,
    pub logging: LoggingConfig,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            page_sizes: HashMap::new(),
            clear_on_refresh: false,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub filter: String,
    /// Append logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "folio=info".to_string(),
            file: None,
        }
    }
}

impl FolioConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config YAML {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: FolioConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn page_size_for(&self, kind: ListKind) -> NonZeroU32 {
        self.page_sizes
            .get(&kind)
            .copied()
            .unwrap_or(self.default_page_size)
    }
}
