//! # Demo Configuration
//!
//! Optional JSON configuration. The file is looked up at the path in
//! `CUBE_BATCH_CONFIG`, then at `cube_batch.json` in the working directory;
//! with neither present the defaults are used. Every field is optional:
//!
//! ```json
//! {
//!     "initial_cube_factor": 3,
//!     "use_vbos": true,
//!     "use_stride": true,
//!     "max_allocation_bytes": null,
//!     "window_title": "Cube Batch"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::engine_state::buffer_layout::LayoutSettings;
use crate::engine_state::geometry::{CubeFactor, GeometryError, MemoryBudget};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "CUBE_BATCH_CONFIG";

/// Configuration file used when the environment variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "cube_batch.json";

const DEFAULT_CUBE_FACTOR: u32 = 3;
const DEFAULT_WINDOW_TITLE: &str = "Cube Batch";

/// Errors loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid initial cube factor: {0}")]
    InvalidCubeFactor(#[from] GeometryError),
}

/// Settings for the demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Cube grid side length generated at startup
    pub cube_factor: CubeFactor,
    /// Start with VBO storage instead of client-side arrays
    pub use_vbos: bool,
    /// Start with interleaved instead of separate attribute streams
    pub use_stride: bool,
    /// Largest single host allocation for vertex data, unlimited if `None`
    pub max_allocation_bytes: Option<usize>,
    pub window_title: String,
}

/// On-disk form, validated into [`DemoConfig`].
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DemoConfigFile {
    initial_cube_factor: u32,
    use_vbos: bool,
    use_stride: bool,
    max_allocation_bytes: Option<usize>,
    window_title: String,
}

impl Default for DemoConfigFile {
    fn default() -> Self {
        Self {
            initial_cube_factor: DEFAULT_CUBE_FACTOR,
            use_vbos: true,
            use_stride: true,
            max_allocation_bytes: None,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
        }
    }
}

impl TryFrom<DemoConfigFile> for DemoConfig {
    type Error = ConfigError;

    fn try_from(file: DemoConfigFile) -> Result<Self, Self::Error> {
        Ok(Self {
            cube_factor: CubeFactor::new(file.initial_cube_factor)?,
            use_vbos: file.use_vbos,
            use_stride: file.use_stride,
            max_allocation_bytes: file.max_allocation_bytes,
            window_title: file.window_title,
        })
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            cube_factor: CubeFactor::new(DEFAULT_CUBE_FACTOR)
                .unwrap_or_else(|_| unreachable!("default cube factor is in range")),
            use_vbos: true,
            use_stride: true,
            max_allocation_bytes: None,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
        }
    }
}

impl DemoConfig {
    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<DemoConfigFile>(json)?.try_into()
    }

    /// Reads and parses a configuration file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Loads the configuration from `CUBE_BATCH_CONFIG`, then
    /// `cube_batch.json`, falling back to the defaults.
    ///
    /// A file named by the environment variable must exist.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            log::info!("Loading config from {}", path.display());
            return Self::load_from_path(&path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            log::info!("Loading config from {}", default_path.display());
            return Self::load_from_path(default_path);
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// The layout the first generation is installed with.
    pub fn settings(&self) -> LayoutSettings {
        LayoutSettings::from_flags(self.use_vbos, self.use_stride)
    }

    pub fn budget(&self) -> MemoryBudget {
        MemoryBudget {
            max_allocation_bytes: self.max_allocation_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_empty_file() {
        let config = DemoConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.cube_factor.get(), 3);
        assert!(config.use_vbos);
        assert!(config.use_stride);
        assert_eq!(config.max_allocation_bytes, None);
        assert_eq!(config.window_title, "Cube Batch");
    }

    #[test]
    fn fields_override_defaults() {
        let config = DemoConfig::from_json_str(
            r#"{ "initial_cube_factor": 8, "use_vbos": false, "max_allocation_bytes": 1048576 }"#,
        )
        .unwrap();
        assert_eq!(config.cube_factor.get(), 8);
        assert!(!config.use_vbos);
        assert!(config.use_stride);
        assert_eq!(config.max_allocation_bytes, Some(1 << 20));
    }

    #[test]
    fn flags_select_layout_and_budget() {
        let config = DemoConfig::from_json_str(
            r#"{ "use_vbos": false, "use_stride": false, "max_allocation_bytes": 4096 }"#,
        )
        .unwrap();
        assert_eq!(config.settings(), LayoutSettings::from_flags(false, false));
        assert_eq!(config.budget(), MemoryBudget::limited(4096));
    }

    #[test]
    fn out_of_range_factor_is_rejected() {
        for factor in [0, 17] {
            let json = format!(r#"{{ "initial_cube_factor": {factor} }}"#);
            assert!(matches!(
                DemoConfig::from_json_str(&json),
                Err(ConfigError::InvalidCubeFactor(GeometryError::InvalidCubeFactor(f))) if f == factor
            ));
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            DemoConfig::from_json_str("{ initial_cube_factor: "),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DemoConfig::from_json_str(r#"{ "cube_count": 3 }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = DemoConfig::load_from_path(Path::new("/nonexistent/cube_batch.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
