//! Dataset catalog configuration
//!
//! Each dataset is described by a static bundle: where the store lives, which
//! table it maps to, the primary key, the branching policy and where load and
//! save operations are journaled. A catalog maps dataset names to bundles and
//! is usually read from TOML:
//!
//! ```toml
//! [scooters]
//! store_location = "data/repo"
//! tablename = "scooters"
//! primary_key_columns = ["pk"]
//! branching_policy = "append_to_branch"
//!
//! [scooters.journal]
//! tablename = "kedro_meta"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use vertab_core::rules::{validate_branch_name, validate_identifier, validate_journal_table};
use vertab_core::{BranchingPolicy, SaveMode, VertabError, VtError, VtErrorKind};
use vertab_store::errors::{io_error, Result};
use vertab_store::{StoreLocation, MAIN_BRANCH};

/// Journal table used when a dataset names none
pub const DEFAULT_JOURNAL_TABLE: &str = "vertab_journal";

fn default_branch() -> String {
    MAIN_BRANCH.to_string()
}

/// Where load/save records for a dataset are appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JournalConfig {
    /// Defaults to the dataset's own store
    #[serde(default)]
    pub store_location: Option<StoreLocation>,
    pub tablename: String,
}

/// Static configuration of one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    #[serde(default)]
    pub store_location: Option<StoreLocation>,
    pub tablename: String,
    pub primary_key_columns: Vec<String>,
    #[serde(default)]
    pub branching_policy: BranchingPolicy,
    #[serde(default)]
    pub save_mode: SaveMode,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Pinned commit for read-only "as of" loads
    #[serde(default)]
    pub commit: Option<String>,
    /// Name prefix of the branches forked by checkout policies; each save
    /// forks `<prefix>-<id>`
    #[serde(default)]
    pub checkout_branch: Option<String>,
    #[serde(default)]
    pub journal: Option<JournalConfig>,
    /// Remote server connection; not supported
    #[serde(default)]
    pub uri: Option<String>,
}

impl DatasetConfig {
    pub fn new(
        store_location: impl Into<StoreLocation>,
        tablename: impl Into<String>,
        primary_key_columns: Vec<String>,
    ) -> Self {
        Self {
            store_location: Some(store_location.into()),
            tablename: tablename.into(),
            primary_key_columns,
            branching_policy: BranchingPolicy::default(),
            save_mode: SaveMode::default(),
            branch: default_branch(),
            commit: None,
            checkout_branch: None,
            journal: None,
            uri: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: BranchingPolicy) -> Self {
        self.branching_policy = policy;
        self
    }

    #[must_use]
    pub fn with_save_mode(mut self, mode: SaveMode) -> Self {
        self.save_mode = mode;
        self
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    #[must_use]
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    #[must_use]
    pub fn with_checkout_branch(mut self, name: impl Into<String>) -> Self {
        self.checkout_branch = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_journal(mut self, journal: JournalConfig) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Check the bundle before any store is touched.
    ///
    /// # Errors
    ///
    /// - `NotImplemented` when `uri` is set
    /// - `InvalidInput` for a missing store location, an empty primary key,
    ///   or an unsafe table, journal or branch name
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| {
            VtError::new(VtErrorKind::InvalidInput)
                .with_op("validate_config")
                .with_table(&self.tablename)
                .with_message(msg)
        };
        let name_err = |e: VertabError| VtError::from(e).with_op("validate_config");

        if let Some(uri) = &self.uri {
            return Err(VtError::new(VtErrorKind::NotImplemented)
                .with_op("validate_config")
                .with_table(&self.tablename)
                .with_message(format!("Remote stores are not supported (uri = {})", uri)));
        }
        if self.store_location.is_none() {
            return Err(invalid("store_location is required".to_string()));
        }
        validate_identifier(&self.tablename).map_err(name_err)?;
        if self.primary_key_columns.is_empty() {
            return Err(invalid("primary_key_columns must not be empty".to_string()));
        }
        validate_branch_name(&self.branch).map_err(name_err)?;
        if let Some(name) = &self.checkout_branch {
            validate_branch_name(name).map_err(name_err)?;
            if *name == self.branch {
                return Err(invalid("checkout_branch must differ from branch".to_string()));
            }
        }
        validate_journal_table(&self.journal_config().tablename).map_err(name_err)?;
        Ok(())
    }

    /// Data store location; call [`DatasetConfig::validate`] first
    pub fn location(&self) -> Result<&StoreLocation> {
        self.store_location.as_ref().ok_or_else(|| {
            VtError::new(VtErrorKind::InvalidInput)
                .with_table(&self.tablename)
                .with_message("store_location is required")
        })
    }

    /// Effective journal settings, with defaults filled in
    pub fn journal_config(&self) -> JournalConfig {
        let mut journal = self.journal.clone().unwrap_or(JournalConfig {
            store_location: None,
            tablename: DEFAULT_JOURNAL_TABLE.to_string(),
        });
        if journal.store_location.is_none() {
            journal.store_location = self.store_location.clone();
        }
        journal
    }

    /// JSON description of the dataset for catalog listings
    pub fn describe(&self) -> serde_json::Value {
        let journal = self.journal_config();
        serde_json::json!({
            "store_location": self.store_location.as_ref().map(|l| l.to_string()),
            "tablename": self.tablename,
            "primary_key_columns": self.primary_key_columns,
            "branch": self.branch,
            "commit": self.commit,
            "branching_policy": self.branching_policy.as_str(),
            "save_mode": self.save_mode.as_str(),
            "journal": {
                "store_location": journal.store_location.map(|l| l.to_string()),
                "tablename": journal.tablename,
            },
        })
    }
}

/// Dataset name → configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogConfig {
    datasets: BTreeMap<String, DatasetConfig>,
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// `InvalidInput` if the TOML is malformed or has unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            VtError::new(VtErrorKind::InvalidInput)
                .with_op("load_catalog")
                .with_message(e.to_string())
        })
    }

    /// # Errors
    ///
    /// `Io` if the file cannot be read, `InvalidInput` if it does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| io_error("load_catalog", e))?;
        Self::from_toml_str(&text)
    }

    #[must_use]
    pub fn with_dataset(mut self, name: impl Into<String>, config: DatasetConfig) -> Self {
        self.datasets.insert(name.into(), config);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, config: DatasetConfig) {
        self.datasets.insert(name.into(), config);
    }

    /// # Errors
    ///
    /// `InvalidInput` for an unknown dataset name.
    pub fn get(&self, name: &str) -> Result<&DatasetConfig> {
        self.datasets.get(name).ok_or_else(|| {
            VtError::new(VtErrorKind::InvalidInput)
                .with_op("catalog_lookup")
                .with_message(format!("Unknown dataset '{}'", name))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }
}
