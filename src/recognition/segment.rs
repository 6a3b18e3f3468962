use crate::config::SegmentationConfig;
use super::Utterance;

/// A single recognized word with its time offsets in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct TimedWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl TimedWord {
    pub fn new<S: Into<String>>(word: S, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }
}

/// Groups word-timed transcripts into subtitle-sized utterances
pub struct WordSegmenter<'a> {
    config: &'a SegmentationConfig,
}

struct Block {
    start: f64,
    end: f64,
    text: String,
    confidence: Option<f32>,
}

impl Block {
    fn into_utterance(self) -> Utterance {
        let mut utterance = Utterance::new(self.start, self.end, self.text);
        utterance.alternatives[0].confidence = self.confidence;
        utterance
    }
}

impl<'a> WordSegmenter<'a> {
    pub fn new(config: &'a SegmentationConfig) -> Self {
        Self { config }
    }

    /// Split one alternative's words into utterances. `confidence` is carried
    /// onto every produced utterance.
    ///
    /// A word ending in `.`, `?` or `!` closes the block it belongs to, so the
    /// punctuation stays with its sentence instead of opening the next
    /// subtitle. The `max_chars` limit is checked before each word is added
    /// and is always enforced, as is `max_duration_secs`.
    pub fn segment(&self, words: &[TimedWord], confidence: Option<f32>) -> Vec<Utterance> {
        let mut utterances = Vec::new();
        let mut current: Option<Block> = None;

        for timed in words {
            let word = timed.word.trim();
            if word.is_empty() {
                continue;
            }

            if let Some(block) = current.take() {
                let too_long = block.text.chars().count() + 1 + word.chars().count() > self.config.max_chars;
                let too_slow = timed.end - block.start > self.config.max_duration_secs;
                if too_long || too_slow {
                    utterances.push(block.into_utterance());
                } else {
                    current = Some(block);
                }
            }

            let block = current.get_or_insert_with(|| Block {
                start: timed.start,
                end: timed.end,
                text: String::new(),
                confidence,
            });
            if !block.text.is_empty() {
                block.text.push(' ');
            }
            block.text.push_str(word);
            block.end = timed.end;

            if self.config.split_on_sentence_end && word.ends_with(['.', '?', '!']) {
                if let Some(block) = current.take() {
                    utterances.push(block.into_utterance());
                }
            }
        }

        if let Some(block) = current {
            utterances.push(block.into_utterance());
        }

        utterances
    }
}
