use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{CloudsubError, Result};
use crate::recognition::RecognitionResult;
use crate::timestamp::format_timestamp;

/// One numbered SRT block
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    /// 1-based, contiguous
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Turn recognized utterances into numbered subtitle entries.
///
/// Utterances keep their order. Each one contributes its best alternative;
/// blank transcripts are dropped and the remaining entries are numbered
/// from 1 without gaps.
pub fn convert(result: RecognitionResult) -> Vec<SubtitleEntry> {
    result
        .utterances
        .into_iter()
        .filter_map(|utterance| {
            let text = utterance.best_alternative()?.transcript.trim().to_string();
            (!text.is_empty()).then_some((utterance.start, utterance.end, text))
        })
        .enumerate()
        .map(|(position, (start, end, text))| SubtitleEntry {
            index: position + 1,
            start,
            end,
            text,
        })
        .collect()
}

/// Render entries in SubRip format
pub fn render_srt(entries: &[SubtitleEntry]) -> Result<String> {
    let mut srt_content = String::new();

    for entry in entries {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            entry.index,
            format_timestamp(entry.start)?,
            format_timestamp(entry.end)?,
            entry.text
        ));
    }

    Ok(srt_content)
}

/// Generate SRT subtitle file. The file appears at `output_path` only once it
/// is completely written.
pub fn write_srt<P: AsRef<Path>>(entries: &[SubtitleEntry], output_path: P) -> Result<()> {
    let srt_content = render_srt(entries)?;
    persist_srt(&srt_content, output_path)?;
    info!("SRT file generated successfully ({} entries)", entries.len());
    Ok(())
}

/// Stage rendered SRT text next to `output_path` and rename it into place
pub fn persist_srt<P: AsRef<Path>>(srt_content: &str, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    let directory = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(directory)?;
    staged.write_all(srt_content.as_bytes())?;
    staged.flush()?;
    staged
        .persist(output_path)
        .map_err(|e| CloudsubError::Io(e.error))?;

    Ok(())
}
