use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// How raw form text is prepared before validation
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FormConfig {
    /// Strip surrounding whitespace from every field (default: true)
    #[serde(default)]
    pub trim_inputs: Option<bool>,
}

impl FormConfig {
    pub fn trim_inputs(&self) -> bool {
        self.trim_inputs.unwrap_or(true)
    }
}

/// Where accounts and profiles are kept
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    /// Root data directory (default: .goshop/data)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Accounts file, relative to the data directory unless absolute
    #[serde(default)]
    pub accounts_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuditConfig {
    /// Default: true
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Log file, relative to the data directory unless absolute (default: audit.jsonl)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl AuditConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn file(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| PathBuf::from("audit.jsonl"))
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub form: FormConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.goshop/config.local.toml) > project (.goshop/config.toml) > user (~/.goshop/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".goshop").join("config.toml");
            if user_config.exists() {
                let user = Self::load_from(&user_config)?;
                config.merge(user);
            }
        }

        let project_config = Path::new(".goshop").join("config.toml");
        if project_config.exists() {
            let project = Self::load_from(&project_config)?;
            config.merge(project);
        }

        // Should be gitignored
        let local_config = Path::new(".goshop").join("config.local.toml");
        if local_config.exists() {
            let local = Self::load_from(&local_config)?;
            config.merge(local);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority)
    /// Only values the other layer actually sets are taken
    pub fn merge(&mut self, other: Config) {
        if other.form.trim_inputs.is_some() {
            self.form.trim_inputs = other.form.trim_inputs;
        }
        if other.audit.enabled.is_some() {
            self.audit.enabled = other.audit.enabled;
        }
        if other.audit.file.is_some() {
            self.audit.file = other.audit.file;
        }
        if other.storage.data_dir.is_some() {
            self.storage.data_dir = other.storage.data_dir;
        }
        if other.storage.accounts_file.is_some() {
            self.storage.accounts_file = other.storage.accounts_file;
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| Path::new(".goshop").join("data"))
    }

    pub fn accounts_path(&self) -> PathBuf {
        let file = self
            .storage
            .accounts_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("accounts.json"));
        self.data_dir().join(file)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.data_dir().join(self.audit.file())
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if let Some(dir) = &self.storage.data_dir {
            if dir.as_os_str().is_empty() {
                errors.push(ConfigError {
                    field: "storage.data_dir".to_string(),
                    message: "Must not be empty".to_string(),
                });
            }
        }

        if let Some(file) = &self.storage.accounts_file {
            if file.as_os_str().is_empty() || file.file_name().is_none() {
                errors.push(ConfigError {
                    field: "storage.accounts_file".to_string(),
                    message: format!("Invalid accounts file '{}'", file.display()),
                });
            }
        }

        if self.audit.enabled() && self.audit.file().as_os_str().is_empty() {
            errors.push(ConfigError {
                field: "audit.file".to_string(),
                message: "Required when audit logging is enabled".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
