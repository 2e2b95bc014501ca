//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use can_signal_codec::FrameLayout;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Main application configuration (loaded from a layout TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default, rename = "frame")]
    pub frames: Vec<FrameLayout>,
}

impl AppConfig {
    /// Layout of the frame with the given ID
    pub fn frame(&self, frame_id: u32) -> Result<&FrameLayout> {
        match self.frames.iter().find(|frame| frame.frame_id == frame_id) {
            Some(frame) => Ok(frame),
            None => bail!("No frame with ID 0x{:X} in configuration", frame_id),
        }
    }

    /// Check that frame IDs are unique and every layout builds
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for frame in &self.frames {
            if !seen.insert(frame.frame_id) {
                bail!("Frame ID 0x{:X} is defined more than once", frame.frame_id);
            }
            frame
                .validate()
                .with_context(|| format!("Invalid layout for frame 0x{:X}", frame.frame_id))?;
        }
        Ok(())
    }
}

/// Parse configuration from TOML text
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).context("Failed to parse layout TOML")?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Failed to load config file: {:?}", path))?;

    log::debug!("Loaded {} frame layout(s) from {:?}", config.frames.len(), path);
    Ok(config)
}
