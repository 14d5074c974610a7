// Configuration Storage Service
// Detector tuning parameters with JSON persistence and version backup

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    /// Sliding-window stride in tokens; must not exceed the oracle's
    /// context length.
    #[serde(default = "default_stride")]
    pub stride: usize,
    /// Documents above this word count are split into chunks and scored
    /// independently (~780 GPT-2 tokens, safe against the 1024 limit).
    #[serde(default = "default_max_words_per_chunk")]
    pub max_words_per_chunk: usize,
    /// Base seed for perturbation sampling; perturbation `i` reseeds with
    /// `perturbation_seed + i`.
    #[serde(default = "default_perturbation_seed")]
    pub perturbation_seed: u64,
    #[serde(default = "default_max_parallel_chunks")]
    pub max_parallel_chunks: usize,
    /// Wall-clock bound for one analysis; overrun degrades to the
    /// neutral verdict.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_device")]
    pub device: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            stride: default_stride(),
            max_words_per_chunk: default_max_words_per_chunk(),
            perturbation_seed: default_perturbation_seed(),
            max_parallel_chunks: default_max_parallel_chunks(),
            timeout_secs: default_timeout_secs(),
            model_id: default_model_id(),
            device: default_device(),
        }
    }
}

fn default_stride() -> usize { 512 }
fn default_max_words_per_chunk() -> usize { 600 }
fn default_perturbation_seed() -> u64 { 42 }
fn default_max_parallel_chunks() -> usize { 4 }
fn default_timeout_secs() -> u64 { 120 }
fn default_model_id() -> String { "gpt2".to_string() }
fn default_device() -> String { "cpu".to_string() }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("DETECTGPT_CONFIG_DIR") {
            if !dir.trim().is_empty() {
                return Some(PathBuf::from(dir));
            }
        }
        dirs::config_dir().map(|p| p.join("detectgpt"))
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file; a missing file yields the defaults
    pub fn load(&self) -> Result<DetectorConfig, String> {
        if !self.config_file.exists() {
            return Ok(DetectorConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &DetectorConfig) -> Result<(), String> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        // Keep only last 10 backups
        self.cleanup_old_backups(&backup_dir, 10)?;

        Ok(())
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &PathBuf, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Sort by modification time (oldest first)
        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}
