//! cloudsub - subtitles from Google Cloud Speech-to-Text
//!
//! Extracts the audio track of a video with ffmpeg, stages it in a Cloud
//! Storage bucket, runs long-running speech recognition on it and writes the
//! timed transcript as a SubRip (.srt) file.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod progress;
pub mod recognition;
pub mod storage;
pub mod subtitle;
pub mod timestamp;

#[cfg(test)]
mod test_support;
