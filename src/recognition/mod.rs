// Speech recognition
//
// The pipeline only talks to the `SpeechRecognizer` trait. Service-specific
// payloads are parsed in their own module and mapped into `RecognitionResult`:
// - google: Google Cloud Speech-to-Text v1 long-running recognition
// - segment: splits word-timed transcripts into subtitle-sized utterances

pub mod google;
pub mod segment;

use async_trait::async_trait;

use crate::error::Result;
use crate::storage::ObjectRef;

/// One transcript hypothesis for an utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: Option<f32>,
}

/// One recognized speech segment
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    /// Hypotheses in the order the service returned them
    pub alternatives: Vec<Alternative>,
}

impl Utterance {
    /// Utterance with a single hypothesis and no declared confidence
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self {
            start,
            end,
            alternatives: vec![Alternative {
                transcript: text.into(),
                confidence: None,
            }],
        }
    }

    /// Highest declared confidence wins; ties and missing confidences keep
    /// the earliest alternative.
    pub fn best_alternative(&self) -> Option<&Alternative> {
        self.best_index().map(|index| &self.alternatives[index])
    }

    /// Position of `best_alternative` in `alternatives`
    pub fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (index, candidate) in self.alternatives.iter().enumerate() {
            let score = candidate.confidence.unwrap_or(f32::NEG_INFINITY);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((index, score)),
            }
        }
        best.map(|(index, _)| index)
    }
}

/// Ordered recognition output for one job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResult {
    pub utterances: Vec<Utterance>,
    /// Language reported by the service, if any
    pub language: Option<String>,
}

impl RecognitionResult {
    pub fn new(utterances: Vec<Utterance>) -> Self {
        Self {
            utterances,
            language: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }
}

/// Handle to a submitted long-running recognition job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub name: String,
}

/// Main trait for speech recognition operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Start recognition of an uploaded audio object
    async fn submit(&self, object: &ObjectRef, language_code: &str) -> Result<JobHandle>;

    /// Wait until the job reaches a terminal state and return its utterances
    async fn await_result(&self, job: &JobHandle) -> Result<RecognitionResult>;
}
