use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data_directory: String,
    pub receive_directory: String,
    pub max_concurrent_transfers: usize,
    pub block_size: usize,
    pub known_devices: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_dir = format!("{}/.dfsend", home);

        Self {
            data_directory: data_dir.clone(),
            receive_directory: format!("{}/received", data_dir),
            max_concurrent_transfers: 4,
            block_size: 64 * 1024,
            known_devices: vec![],
        }
    }
}

impl AppConfig {
    /// Load configuration from file or create default
    pub fn load_or_default(config_path: Option<&str>) -> Self {
        if let Some(config) = config_path
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
        {
            return config;
        }
        Self::default()
    }

    /// Save configuration to file
    pub fn save_to_file(&self, config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn receive_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.receive_directory)
    }

    /// Ensure all directories exist
    pub fn ensure_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.data_directory)?;
        std::fs::create_dir_all(&self.receive_directory)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.block_size == 0 {
            return Err("Block size must be greater than 0".into());
        }

        if self.max_concurrent_transfers == 0 {
            return Err("Max concurrent transfers must be greater than 0".into());
        }

        Ok(())
    }
}
