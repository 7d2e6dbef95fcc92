use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LayerConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub storage: StorageConfig,
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeploymentConfig {
    /// Liquidity the flash-loan cast module may lend per batch.
    #[serde(default = "default_flash_loan_amount")]
    pub flash_loan_amount: u64,
    /// Reference connectors registered by `init`.
    #[serde(default = "default_connectors")]
    pub connectors: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_flash_loan_amount() -> u64 {
    1_000_000
}

fn default_connectors() -> Vec<String> {
    vec![
        "auth".to_string(),
        "emitEvent".to_string(),
        "betaV2".to_string(),
        "basic".to_string(),
    ]
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            flash_loan_amount: default_flash_loan_amount(),
            connectors: default_connectors(),
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            storage: StorageConfig {
                db_path: "./data/layer".to_string(),
            },
            deployment: DeploymentConfig::default(),
        }
    }
}

impl LayerConfig {
    /// Read `path`, falling back to defaults on any problem. A missing file
    /// is created with the defaults. Runs before logging is set up, so
    /// problems go to stderr.
    pub fn load_or_default(path: &str) -> Self {
        if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("Error parsing config: {}. Using defaults.", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    eprintln!("Error reading config: {}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            eprintln!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            if let Ok(s) = toml::to_string_pretty(&config) {
                let _ = std::fs::write(path, s);
            }
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: LayerConfig = toml::from_str(
            r#"
            [storage]
            db_path = "/tmp/layer-test"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.storage.db_path, "/tmp/layer-test");
        assert_eq!(config.deployment.flash_loan_amount, 1_000_000);
        assert!(config.deployment.connectors.contains(&"auth".to_string()));
    }

    #[test]
    fn test_default_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&LayerConfig::default()).unwrap();
        let back: LayerConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.deployment.connectors.len(), 4);
    }
}
