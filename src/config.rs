//! Runtime configuration
//!
//! Settings are read once from YAML at startup and handed to components
//! read-only. Every field has a default, so an empty file is a valid config.

use crate::curation::FlowStep;
use crate::propagation::IdentifierStrategy;
use crate::workflow::DEFAULT_STEPS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound on review steps; state ids stay small and dense
pub const MAX_STEPS: u8 = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub workflow: WorkflowSettings,
    pub propagation: PropagationSettings,
    pub storage: StorageSettings,
    pub curation: CurationSettings,
}

impl Settings {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = if text.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(text)?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Load `path` if given, else the default location if a file exists
    /// there, else built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workflow.steps > MAX_STEPS {
            return Err(ConfigError::Invalid(format!(
                "workflow.steps must be at most {}, got {}",
                MAX_STEPS, self.workflow.steps
            )));
        }
        if self.propagation.uri_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "propagation.uri_prefix must not be empty".into(),
            ));
        }
        for (collection, set) in &self.curation.mappings {
            if !self.curation.task_sets.contains_key(set) {
                return Err(ConfigError::Invalid(format!(
                    "curation mapping '{}' names unknown task set '{}'",
                    collection, set
                )));
            }
        }
        Ok(())
    }
}

/// `~/.config/accession/config.yaml` (platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("accession").join("config.yaml"))
}

/// `~/.local/share/accession/graphs.db` (platform equivalent)
pub fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("accession").join("graphs.db")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Number of review steps between SUBMIT and ARCHIVE
    pub steps: u8,
    /// Re-announce an item to its pool after a reviewer unclaims it
    pub notify_returned_tasks: bool,
    /// Base of links placed in notifications
    pub base_url: String,
    /// Per-step task description sent with pool notifications
    pub step_messages: BTreeMap<u8, String>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            notify_returned_tasks: true,
            base_url: "http://localhost:8080".to_string(),
            step_messages: BTreeMap::new(),
        }
    }
}

impl WorkflowSettings {
    pub fn step_message(&self, step: u8) -> String {
        if let Some(message) = self.step_messages.get(&step) {
            return message.clone();
        }
        match step {
            1 => "The submission must be checked before inclusion in the archive.".to_string(),
            _ => "The metadata needs to be checked to ensure compliance with the collection's standards, and edited if necessary.".to_string(),
        }
    }

    /// Where reviewers and submitters find their tasks
    pub fn task_list_link(&self) -> String {
        format!("{}/mydspace", self.base_url.trim_end_matches('/'))
    }

    pub fn handle_link(&self, handle: &str) -> String {
        format!("{}/handle/{}", self.base_url.trim_end_matches('/'), handle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationSettings {
    pub uri_prefix: String,
    pub identifiers: IdentifierStrategy,
}

impl Default for PropagationSettings {
    fn default() -> Self {
        Self {
            uri_prefix: "http://localhost:8080/rdf/resource".to_string(),
            identifiers: IdentifierStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite file for converted graphs; `default_db_path()` when unset
    pub path: Option<PathBuf>,
}

impl StorageSettings {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_db_path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationSettings {
    /// Collection handle (or `default`) to task-set name
    pub mappings: BTreeMap<String, String>,
    /// Task-set name to its ordered flow steps
    pub task_sets: BTreeMap<String, Vec<FlowStep>>,
}
