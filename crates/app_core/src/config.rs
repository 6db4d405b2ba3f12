//! Application configuration

use app_fs::{ListOptions, Sentinels};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lowest PBKDF2 iteration count the crypto pipeline accepts
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub listing: ListOptions,
    pub vault: VaultConfig,
    pub trash: TrashConfig,
    pub search: SearchConfig,
    pub analysis: AnalysisConfig,
    pub recent: RecentConfig,
    pub crypto: CryptoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Device storage root the façade operates on
    pub storage_root: PathBuf,
    pub log_retention_days: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            storage_root: project_dirs()
                .map(|dirs| dirs.data_dir().join("storage"))
                .unwrap_or_else(|| PathBuf::from("./storage")),
            log_retention_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Sentinel id of the vault
    pub name: String,
    /// Hidden directory backing the vault
    pub dir_name: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            name: "vault".to_string(),
            dir_name: ".vault".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrashConfig {
    pub dir_name: String,
    /// Ledger file inside the trash directory
    pub index_file: String,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            dir_name: ".trash".to_string(),
            index_file: ".index.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_depth: usize,
    /// Entries examined before a search gives up
    pub max_examined: usize,
    pub max_results: usize,
    /// Traversal seeds; "" is the storage root
    pub seed_folders: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_examined: 10_000,
            max_results: 500,
            seed_folders: ["", "Download", "DCIM", "Pictures", "Documents", "Music", "Movies"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub max_depth: usize,
    pub large_file_count: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            large_file_count: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentConfig {
    pub days: u32,
    pub limit: usize,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self { days: 30, limit: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    pub pbkdf2_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: MIN_PBKDF2_ITERATIONS,
        }
    }
}

impl CryptoConfig {
    /// Configured iterations, raised to the supported minimum
    pub fn effective_iterations(&self) -> u32 {
        self.pbkdf2_iterations.max(MIN_PBKDF2_ITERATIONS)
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    /// Sentinel names for the path resolver
    pub fn sentinels(&self) -> Sentinels {
        Sentinels {
            vault_id: self.vault.name.clone(),
            vault_dir: self.vault.dir_name.clone(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "PocketFiler", "PocketFiler")
}
