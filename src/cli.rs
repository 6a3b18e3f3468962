use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::JobConfig;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Generate SRT subtitles for a video with Google Cloud Speech-to-Text",
    long_about = None
)]
pub struct Args {
    /// Input video file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Google Cloud Storage bucket used to stage the extracted audio
    #[arg(short, long, visible_alias = "gcs-bucket-name")]
    pub bucket: String,

    /// Language of the speech, e.g. en-US
    #[arg(short, long, default_value = "en-US", value_parser = parse_language_code)]
    pub lang: String,

    /// Output subtitle file (default: the input path with an .srt extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Service account key file
    #[arg(short = 'c', long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Configuration file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not show step spinners
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    /// Freeze the arguments into the job description handed to the pipeline
    pub fn job_config(&self) -> JobConfig {
        let output = match &self.output {
            Some(output) => output.clone(),
            None => resolve_output_path(&self.input),
        };
        JobConfig {
            input: self.input.clone(),
            language_code: self.lang.clone(),
            bucket: self.bucket.clone(),
            output,
        }
    }
}

/// Accepts BCP-47 style codes such as `en`, `en-US` or `cmn-Hans-CN`.
pub fn parse_language_code(value: &str) -> Result<String, String> {
    let mut subtags = value.split('-');

    let language = subtags.next().unwrap_or_default();
    if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(format!(
            "invalid language code '{}': expected a 2-3 letter lowercase language such as en-US",
            value
        ));
    }

    for subtag in subtags {
        if !(2..=4).contains(&subtag.len()) || !subtag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!(
                "invalid language code '{}': subtag '{}' must be 2-4 letters or digits",
                value, subtag
            ));
        }
    }

    Ok(value.to_string())
}

/// Default output next to the input. An existing file is never overwritten:
/// `movie.srt` becomes `movie-0.srt`, `movie-1.srt`, ... until a free name is found.
pub fn resolve_output_path(input: &Path) -> PathBuf {
    let candidate = input.with_extension("srt");
    if !candidate.exists() {
        return candidate;
    }

    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "subtitles".to_string());
    (0u32..)
        .map(|n| input.with_file_name(format!("{}-{}.srt", stem, n)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
