use serde::Deserialize;
use std::path::{Path, PathBuf};
use crate::error::{Result, CloudsubError};

/// Settings for one pipeline run, fixed once the command line is parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Input video file
    pub input: PathBuf,
    /// Recognition language, e.g. `en-US`
    pub language_code: String,
    /// Bucket that temporarily holds the extracted audio
    pub bucket: String,
    /// Destination of the SRT file
    pub output: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub storage: StorageConfig,
    pub recognition: RecognitionConfig,
    pub segmentation: SegmentationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Sample rate of the extracted audio in Hz
    pub sample_rate: u32,
    /// Channel count of the extracted audio
    pub channels: u32,
    /// Directory for the temporary audio (system temp directory if unset)
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Cloud Storage JSON API base URL
    pub endpoint: String,
    /// Cloud Storage media upload base URL
    pub upload_endpoint: String,
    /// Prefix of generated object keys
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Speech-to-Text API base URL
    pub endpoint: String,
    /// Delay between job status polls
    pub poll_interval_secs: u64,
    /// Upper bound on the wait for a terminal job state
    pub timeout_secs: u64,
    /// Ask the service to insert punctuation
    pub enable_automatic_punctuation: bool,
}

/// Splitting of word-timed transcripts into subtitle lines
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Split by words; when false each recognition result becomes one entry
    pub enabled: bool,
    /// Maximum characters per subtitle line
    pub max_chars: usize,
    /// Maximum seconds covered by one subtitle
    pub max_duration_secs: f64,
    /// Close a subtitle after a word ending in `.`, `?` or `!`
    pub split_on_sentence_end: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            sample_rate: 16000,
            channels: 1,
            temp_dir: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://storage.googleapis.com/storage/v1".to_string(),
            upload_endpoint: "https://storage.googleapis.com/upload/storage/v1".to_string(),
            key_prefix: "audio-transcripts".to_string(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://speech.googleapis.com/v1".to_string(),
            poll_interval_secs: 5,
            timeout_secs: 900,
            enable_automatic_punctuation: true,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_chars: 42,
            max_duration_secs: 3.5,
            split_on_sentence_end: true,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CloudsubError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| CloudsubError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.media.sample_rate == 0 || self.media.channels == 0 {
            return Err(CloudsubError::Config(
                "media.sample_rate and media.channels must be positive".to_string(),
            ));
        }
        if self.recognition.poll_interval_secs == 0 {
            return Err(CloudsubError::Config(
                "recognition.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.segmentation.max_chars == 0 || self.segmentation.max_duration_secs <= 0.0 {
            return Err(CloudsubError::Config(
                "segmentation limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
