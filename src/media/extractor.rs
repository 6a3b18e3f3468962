use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{CloudsubError, Result};
use super::{AudioExtractor, MediaCommandBuilder};

const AUDIO_FILE_NAME: &str = "audio.wav";

/// Temporary audio file. The private directory holding it is removed on drop.
#[derive(Debug)]
pub struct ExtractedAudio {
    dir: TempDir,
    path: PathBuf,
}

impl ExtractedAudio {
    /// Reserve a fresh temporary location for an audio file
    pub fn allocate() -> Result<Self> {
        Self::allocate_in(None)
    }

    /// Like `allocate`, under `root` instead of the system temp directory
    pub fn allocate_in(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("cloudsub-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| CloudsubError::Extraction(format!("Failed to create temp directory: {}", e)))?;
        let path = dir.path().join(AUDIO_FILE_NAME);
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the temporary file now instead of at drop
    pub fn remove(self) -> Result<()> {
        let dir = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!("Removed temporary audio directory {}", dir.display());
        Ok(())
    }
}

/// ffmpeg-based audio extractor
pub struct FfmpegExtractor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegExtractor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);
        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, video_path: &Path) -> Result<ExtractedAudio> {
        info!("Extracting audio from {}", video_path.display());

        // On error `audio` is dropped here, taking the directory with it.
        let audio = ExtractedAudio::allocate_in(self.config.temp_dir.as_deref())?;
        let command = self.command_builder.extract_audio(
            video_path,
            audio.path(),
            self.config.sample_rate,
            self.config.channels,
        );
        command.execute().await?;

        if !audio.path().is_file() {
            return Err(CloudsubError::Extraction(format!(
                "{} produced no audio output",
                self.config.binary_path
            )));
        }

        info!("Audio extracted to {}", audio.path().display());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_audio_is_removed_on_drop() {
        let audio = ExtractedAudio::allocate().unwrap();
        std::fs::write(audio.path(), b"RIFF").unwrap();
        let path = audio.path().to_path_buf();
        assert!(path.exists());

        drop(audio);
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[test]
    fn test_remove_deletes_directory() {
        let audio = ExtractedAudio::allocate().unwrap();
        std::fs::write(audio.path(), b"RIFF").unwrap();
        let dir = audio.path().parent().unwrap().to_path_buf();

        audio.remove().unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_missing_ffmpeg() {
        let extractor = FfmpegExtractor::new(MediaConfig {
            binary_path: "cloudsub-no-such-ffmpeg".to_string(),
            ..MediaConfig::default()
        });
        let err = extractor.extract(Path::new("movie.mp4")).await.unwrap_err();
        assert!(matches!(err, CloudsubError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_success_without_output_is_extraction_error() {
        let extractor = FfmpegExtractor::new(MediaConfig {
            binary_path: "true".to_string(),
            ..MediaConfig::default()
        });
        let err = extractor.extract(Path::new("movie.mp4")).await.unwrap_err();
        assert!(matches!(err, CloudsubError::Extraction(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_tool_leaves_no_temp_audio() {
        let root = tempfile::tempdir().unwrap();
        let extractor = FfmpegExtractor::new(MediaConfig {
            binary_path: "false".to_string(),
            temp_dir: Some(root.path().to_path_buf()),
            ..MediaConfig::default()
        });

        let err = extractor.extract(Path::new("movie.mp4")).await.unwrap_err();
        assert!(matches!(err, CloudsubError::Extraction(ref msg) if msg.starts_with("Audio extraction failed")));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_allocate_in_custom_root() {
        let root = tempfile::tempdir().unwrap();
        let audio = ExtractedAudio::allocate_in(Some(root.path())).unwrap();
        assert!(audio.path().starts_with(root.path()));
        assert!(audio.path().parent().unwrap().exists());

        drop(audio);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
