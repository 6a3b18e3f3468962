// Audio extraction through an external media tool
//
// - commands: command builders and subprocess execution
// - extractor: the ffmpeg-backed `AudioExtractor` and the temporary audio it owns

pub mod commands;
pub mod extractor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use extractor::*;

use crate::error::Result;

/// Main trait for audio extraction
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Produce a mono WAV file from the video's audio track
    async fn extract(&self, video_path: &Path) -> Result<ExtractedAudio>;
}
