#![forbid(unsafe_code)]

//! Project configuration, persisted as JSON under `.cartograph/`.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::store::DATA_DIR;
use crate::types::ProjectConfig;

pub const CONFIG_FILE: &str = "config.json";
pub const CONFIG_VERSION: i64 = 1;

pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(DATA_DIR).join(CONFIG_FILE)
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            include: vec![
                "**/*.js".to_string(),
                "**/*.jsx".to_string(),
                "**/*.ts".to_string(),
                "**/*.tsx".to_string(),
            ],
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/.git/**".to_string(),
                "**/dist/**".to_string(),
                "**/build/**".to_string(),
                "**/coverage/**".to_string(),
                "**/*.d.ts".to_string(),
                "**/*.min.js".to_string(),
            ],
            max_file_size: 1024 * 1024,
        }
    }
}

/// Create `.cartograph/` with a default config, keeping an existing config
/// untouched.
pub fn init_project(project_root: &Path) -> io::Result<ProjectConfig> {
    let path = config_path(project_root);
    if path.exists() {
        return load(project_root);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let config = ProjectConfig::default();
    save(project_root, &config)?;
    Ok(config)
}

pub fn load(project_root: &Path) -> io::Result<ProjectConfig> {
    let raw = std::fs::read_to_string(config_path(project_root))?;
    serde_json::from_str(&raw).map_err(io::Error::other)
}

/// Load the project config, falling back to defaults when the project was
/// never initialized.
pub fn load_or_default(project_root: &Path) -> ProjectConfig {
    match load(project_root) {
        Ok(config) => config,
        Err(err) => {
            debug!(error = %err, "no project config, using defaults");
            ProjectConfig::default()
        }
    }
}

pub fn save(project_root: &Path, config: &ProjectConfig) -> io::Result<()> {
    let raw = serde_json::to_string_pretty(config).map_err(io::Error::other)?;
    std::fs::write(config_path(project_root), raw)
}
