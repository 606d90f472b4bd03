/// Configuration file support.
///
/// Defaults for the render options and the export directory can be set in
/// `config.toml` inside the project config directory. The directory can be moved
/// with `QISTUDIO_CONFIG`. A missing file means built-in defaults.
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::export::DEFAULT_OUTPUT_DIR;
use crate::options::{
    Background, Color, ErrorCorrectionLevel, EyeStyle, RenderOptions, ShapeKind,
};

pub const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_DIR_ENV: &str = "QISTUDIO_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub size: u32,
    pub margin: u32,
    pub error_correction: ErrorCorrectionLevel,
    pub foreground: Color,
    pub background: Color,
    pub transparent: bool,
    pub shape: ShapeKind,
    /// Applied after `shape`, so it wins for the finder patterns.
    pub eye: Option<EyeStyle>,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let options = RenderOptions::default();
        Config {
            size: options.width,
            margin: options.margin,
            error_correction: options.error_correction,
            foreground: options.foreground,
            background: Color::WHITE,
            transparent: false,
            shape: ShapeKind::Square,
            eye: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Config {
    /// Loads `path`, or `config.toml` in [`config_dir`] when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config_dir().join(CONFIG_FILE));
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Config::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Starting render options described by this configuration.
    pub fn render_options(&self) -> RenderOptions {
        let (dot_style, corners) = self.shape.styles();
        let (corner_square_style, corner_dot_style) = match self.eye {
            Some(eye) => eye.styles(),
            None => (corners, corners),
        };
        RenderOptions {
            width: self.size,
            height: self.size,
            margin: self.margin,
            error_correction: self.error_correction,
            dot_style,
            corner_square_style,
            corner_dot_style,
            foreground: self.foreground,
            background: if self.transparent {
                Background::Transparent
            } else {
                Background::Color(self.background)
            },
            ..RenderOptions::default()
        }
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "ashaffah", env!("CARGO_PKG_NAME"))
}

/// `$QISTUDIO_CONFIG`, else the platform config directory, else `./.config`.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        PathBuf::from(dir)
    } else if let Some(dirs) = project_directory() {
        dirs.config_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}
