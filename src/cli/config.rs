//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 0. `QBXML_RELAY_CONFIG` environment variable
//! 1. Current directory: ./qbxml-relay.toml or ./.qbxml-relay/config.toml
//! 2. User config: ~/.qbxml-relay/config.toml
//! 3. System config: /etc/qbxml-relay/config.toml
//! 4. Built-in defaults

use crate::{RelayConfig, env};
use anyhow::{Context, Result};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load `explicit` when given, otherwise discover through the hierarchy
    pub fn load(explicit: Option<&Path>) -> Result<RelayConfig> {
        match explicit {
            Some(path) => {
                info!("Loading configuration override from: {:?}", path);
                RelayConfig::from_toml_file(path)
            }
            None => Self::discover_config(),
        }
    }

    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<RelayConfig> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return RelayConfig::from_toml_file(config_path);
        }

        info!("No configuration file found, using defaults");
        Ok(RelayConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        Self::first_existing(Self::get_config_candidates())
    }

    fn first_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        Self::candidates_for(
            std_env::var_os(env::CONFIG_ENV_VAR).map(PathBuf::from),
            std_env::current_dir().ok(),
            Self::get_home_dir(),
        )
    }

    fn candidates_for(
        explicit: Option<PathBuf>,
        current_dir: Option<PathBuf>,
        home_dir: Option<PathBuf>,
    ) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        // 0. Explicit file from the environment
        if let Some(path) = explicit {
            candidates.push(path);
        }

        // 1. Current directory
        if let Some(current_dir) = current_dir {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        // 2. User config: ~/.qbxml-relay/config.toml
        if let Some(home_dir) = home_dir {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        // 3. System config (Unix-like systems)
        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/qbxml-relay/config.toml"));

        #[cfg(windows)]
        if let Ok(program_data) = std_env::var("PROGRAMDATA") {
            candidates.push(
                PathBuf::from(program_data)
                    .join("qbxml-relay")
                    .join(env::CONFIG_FILE_NAME),
            );
        }

        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Create a default config file in the user's home directory
    pub fn create_default_user_config() -> Result<PathBuf> {
        let home_dir = Self::get_home_dir().context("Could not determine home directory")?;

        let config_dir = env::user_config_dir_path(&home_dir);
        let config_path = env::user_config_file_path(&home_dir);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create {}", config_dir.display()))?;
            info!("Created configuration directory: {:?}", config_dir);
        }

        if !config_path.exists() {
            RelayConfig::default().to_toml_file(&config_path)?;
            info!("Created default configuration file: {:?}", config_path);
        } else {
            warn!("Configuration file already exists: {:?}", config_path);
        }

        Ok(config_path)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        let candidates = Self::get_config_candidates();
        for (i, candidate) in candidates.iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_candidate_order() {
        let candidates = ConfigDiscovery::candidates_for(
            Some(PathBuf::from("/opt/relay.toml")),
            Some(PathBuf::from("/work")),
            Some(PathBuf::from("/home/qb")),
        );

        assert_eq!(candidates[0], PathBuf::from("/opt/relay.toml"));
        assert_eq!(candidates[1], PathBuf::from("/work/qbxml-relay.toml"));
        assert_eq!(candidates[2], PathBuf::from("/work/.qbxml-relay/config.toml"));
        assert_eq!(candidates[3], PathBuf::from("/home/qb/.qbxml-relay/config.toml"));
        #[cfg(unix)]
        assert_eq!(candidates[4], PathBuf::from("/etc/qbxml-relay/config.toml"));
    }

    #[test]
    fn test_first_existing_skips_missing_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        let directory = temp_dir.path().join(env::RELAY_DIR_NAME);
        fs::create_dir_all(&directory).unwrap();
        let present = temp_dir.path().join(env::LOCAL_CONFIG_FILE_NAME);
        fs::write(&present, "[session]\nttl_secs = 60\n").unwrap();

        let found =
            ConfigDiscovery::first_existing(vec![missing, directory, present.clone()]).unwrap();
        assert_eq!(found, present);

        let config = ConfigDiscovery::load(Some(&found)).unwrap();
        assert_eq!(config.session.ttl_secs, 60);
    }

    #[test]
    fn test_load_reports_bad_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[session\n").unwrap();

        let error = ConfigDiscovery::load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", error).contains("broken.toml"));
    }
}
