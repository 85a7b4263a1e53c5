//! Optional TOML configuration file
//!
//! Every key is optional; whatever is present replaces the built-in
//! default, and command-line flags are applied on top afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stillmotion_core::{CancelPolicy, CodecChoice, PanDirection, RenderConfig, ZoomDirection};

/// File name looked up in the working directory, then the home directory
pub const CONFIG_FILE_NAME: &str = ".stillmotion.toml";

/// Partial configuration as written in a config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub duration: Option<f64>,
    pub zoom: Option<f64>,
    pub zoom_direction: Option<ZoomDirection>,
    pub pan: Option<PanDirection>,
    pub pan_rate: Option<f64>,
    pub blur: Option<i64>,
    pub max_zoom: Option<f64>,
    pub max_zoom_rate: Option<f64>,
    pub codec: Option<String>,
    pub ext: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub force: Option<bool>,
    pub stitch: Option<bool>,
    pub stitch_output: Option<PathBuf>,
    pub auto_fallback: Option<bool>,
    pub cancel_policy: Option<CancelPolicy>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Writes every value present in the file over `config`
    pub fn apply_to(&self, config: &mut RenderConfig) {
        let effect = &mut config.effect;
        set(&mut effect.target_width, self.width);
        set(&mut effect.target_height, self.height);
        set(&mut effect.fps, self.fps);
        set(&mut effect.duration_seconds, self.duration);
        set(&mut effect.zoom_rate_per_frame, self.zoom);
        set(&mut effect.zoom_direction, self.zoom_direction);
        set(&mut effect.pan_direction, self.pan);
        set(&mut effect.pan_rate_per_frame, self.pan_rate);
        set(&mut effect.blur_kernel_size, self.blur);
        set(&mut config.limits.max_zoom, self.max_zoom);
        set(&mut config.limits.max_zoom_rate, self.max_zoom_rate);

        if self.codec.is_some() || self.ext.is_some() {
            config.codec = CodecChoice::new(
                self.codec.clone().unwrap_or_else(|| config.codec.fourcc.clone()),
                self.ext.clone().unwrap_or_else(|| config.codec.extension.clone()),
            );
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(workers) = self.workers {
            config.worker_count = Some(workers);
        }
        set(&mut config.force, self.force);
        set(&mut config.stitch, self.stitch);
        if let Some(path) = &self.stitch_output {
            config.stitch_output = Some(path.clone());
        }
        set(&mut config.auto_fallback, self.auto_fallback);
        set(&mut config.cancel_policy, self.cancel_policy);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Finds the config file to use.
///
/// An explicit path always wins and must exist. Otherwise the working
/// directory is searched, then the home directory; `None` means defaults.
pub fn discover(explicit: Option<&Path>, cwd: &Path, home: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        anyhow::ensure!(path.is_file(), "Config file {} does not exist", path.display());
        return Ok(Some(path.to_path_buf()));
    }
    let candidates = std::iter::once(cwd).chain(home);
    Ok(candidates
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file()))
}

/// Discovers and loads the config file, or returns an empty one
pub fn load(explicit: Option<&Path>) -> Result<FileConfig> {
    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match discover(explicit, &cwd, home.as_deref())? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            FileConfig::load_from_file(&path)
        }
        None => Ok(FileConfig::default()),
    }
}
