use crate::audio::AudioFormat;
use crate::audio::format::{DEFAULT_CHUNK_SIZE, DEFAULT_FRAME_SIZE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Samples per emitted chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Samples per frame handed to the recorder
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,

    /// Capacity of the capture ring buffer in seconds
    #[serde(default = "default_ring_seconds")]
    pub ring_seconds: f32,

    /// Directory for chunk WAV files; chunks are only logged when unset
    #[serde(default)]
    pub output_dir: Option<String>,
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_frame_size() -> usize {
    DEFAULT_FRAME_SIZE
}

fn default_ring_seconds() -> f32 {
    10.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            chunk_size: default_chunk_size(),
            frame_size: default_frame_size(),
            ring_seconds: default_ring_seconds(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/chunk-recorder/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config = Self::from_json(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("chunk-recorder").join("config.json"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(anyhow::anyhow!("sample_rate must be greater than 0"));
        }

        if self.channels != 1 {
            return Err(anyhow::anyhow!("only mono capture is supported (channels = 1)"));
        }

        if self.chunk_size == 0 {
            return Err(anyhow::anyhow!("chunk_size must be greater than 0"));
        }

        if self.frame_size == 0 {
            return Err(anyhow::anyhow!("frame_size must be greater than 0"));
        }

        if self.ring_seconds.is_nan() || self.ring_seconds <= 0.0 {
            return Err(anyhow::anyhow!("ring_seconds must be greater than 0"));
        }

        if matches!(&self.output_dir, Some(dir) if dir.is_empty()) {
            return Err(anyhow::anyhow!("output_dir cannot be empty"));
        }

        Ok(())
    }

    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}
