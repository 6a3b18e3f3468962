// Google Cloud Speech-to-Text v1 implementation
// Long-running recognition reads the audio from Cloud Storage; the client
// polls the returned operation until it is done.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::auth::TokenSource;
use crate::config::{RecognitionConfig, SegmentationConfig};
use crate::error::{CloudsubError, Result};
use crate::storage::ObjectRef;
use super::segment::{TimedWord, WordSegmenter};
use super::{Alternative, JobHandle, RecognitionResult, SpeechRecognizer, Utterance};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LongRunningRecognizeRequest<'a> {
    config: RequestConfig<'a>,
    audio: RequestAudio<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    audio_channel_count: u32,
    language_code: &'a str,
    enable_word_time_offsets: bool,
    enable_automatic_punctuation: bool,
}

#[derive(Debug, Serialize)]
struct RequestAudio<'a> {
    uri: &'a str,
}

/// google.longrunning.Operation
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub metadata: Option<OperationMetadata>,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<LongRunningRecognizeResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default)]
    pub progress_percent: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LongRunningRecognizeResponse {
    #[serde(default)]
    pub results: Vec<SpeechResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResult {
    #[serde(default)]
    pub alternatives: Vec<SpeechAlternative>,
    #[serde(default)]
    pub result_end_time: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub words: Vec<WordInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordInfo {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    pub word: String,
}

/// Parse a protobuf JSON duration such as `"1.500s"` into seconds
pub fn parse_duration(value: &str) -> Result<f64> {
    let seconds = value
        .trim()
        .strip_suffix('s')
        .and_then(|number| number.parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0);
    seconds.ok_or_else(|| CloudsubError::Recognition(format!("Malformed duration '{}'", value)))
}

fn optional_duration(value: Option<&str>) -> Result<Option<f64>> {
    value.map(parse_duration).transpose()
}

/// Mapper from Speech-to-Text responses to `RecognitionResult`
pub struct GoogleSpeechMapper;

impl GoogleSpeechMapper {
    pub fn to_recognition_result(
        response: LongRunningRecognizeResponse,
        segmentation: &SegmentationConfig,
    ) -> Result<RecognitionResult> {
        let segmenter = WordSegmenter::new(segmentation);
        let mut utterances = Vec::new();
        let mut language = None;
        let mut previous_end = 0.0;

        for result in response.results {
            if language.is_none() {
                language = result.language_code.clone();
            }
            let result_end = optional_duration(result.result_end_time.as_deref())?;

            let alternatives: Vec<Alternative> = result
                .alternatives
                .iter()
                .map(|alt| Alternative {
                    transcript: alt.transcript.trim().to_string(),
                    confidence: alt.confidence,
                })
                .collect();
            let candidate = Utterance {
                start: previous_end,
                end: result_end.unwrap_or(previous_end),
                alternatives,
            };

            // Word offsets are only attached to the top hypothesis.
            let best_index = candidate.best_index();
            let words = match best_index {
                Some(index) => timed_words(&result.alternatives[index].words)?,
                None => Vec::new(),
            };

            if words.is_empty() {
                previous_end = candidate.end;
                utterances.push(candidate);
                continue;
            }

            let confidence = best_index.and_then(|index| result.alternatives[index].confidence);
            if segmentation.enabled {
                utterances.extend(segmenter.segment(&words, confidence));
            } else {
                let text = words.iter().map(|w| w.word.trim()).collect::<Vec<_>>().join(" ");
                let mut utterance = Utterance::new(words[0].start, words[words.len() - 1].end, text);
                utterance.alternatives[0].confidence = confidence;
                utterances.push(utterance);
            }
            previous_end = result_end.unwrap_or(words[words.len() - 1].end);
        }

        Ok(RecognitionResult { utterances, language })
    }
}

fn timed_words(words: &[WordInfo]) -> Result<Vec<TimedWord>> {
    words
        .iter()
        .map(|info| {
            let start = optional_duration(info.start_time.as_deref())?.unwrap_or(0.0);
            let end = optional_duration(info.end_time.as_deref())?.unwrap_or(start);
            Ok(TimedWord::new(info.word.clone(), start, end))
        })
        .collect()
}

/// Speech-to-Text client
pub struct GoogleSpeechClient {
    config: RecognitionConfig,
    segmentation: SegmentationConfig,
    sample_rate: u32,
    channels: u32,
    client: Client,
    auth: Arc<dyn TokenSource>,
}

impl GoogleSpeechClient {
    pub fn new(
        config: RecognitionConfig,
        segmentation: SegmentationConfig,
        sample_rate: u32,
        channels: u32,
        client: Client,
        auth: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            config,
            segmentation,
            sample_rate,
            channels,
            client,
            auth,
        }
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    async fn fetch_operation(&self, job: &JobHandle) -> Result<Operation> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| CloudsubError::Recognition(e.to_string()))?;

        let response = self
            .client
            .get(format!("{}/operations/{}", self.endpoint(), job.name))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CloudsubError::Recognition(format!("Status request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CloudsubError::Recognition(format!(
                "Speech-to-Text returned {} for operation {}: {}",
                status, job.name, body
            )));
        }

        response
            .json::<Operation>()
            .await
            .map_err(|e| CloudsubError::Recognition(format!("Malformed operation status: {}", e)))
    }

    async fn poll_until_done(&self, job: &JobHandle) -> Result<Operation> {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        loop {
            let operation = self.fetch_operation(job).await?;
            if operation.done {
                return Ok(operation);
            }
            if let Some(percent) = operation.metadata.as_ref().and_then(|m| m.progress_percent) {
                debug!("Recognition {} at {}%", job.name, percent);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleSpeechClient {
    async fn submit(&self, object: &ObjectRef, language_code: &str) -> Result<JobHandle> {
        info!("Submitting {} for recognition ({})", object, language_code);

        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| CloudsubError::Submission(e.to_string()))?;

        let uri = object.uri();
        let request = LongRunningRecognizeRequest {
            config: RequestConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: self.sample_rate,
                audio_channel_count: self.channels,
                language_code,
                enable_word_time_offsets: true,
                enable_automatic_punctuation: self.config.enable_automatic_punctuation,
            },
            audio: RequestAudio { uri: &uri },
        };

        let response = self
            .client
            .post(format!("{}/speech:longrunningrecognize", self.endpoint()))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| CloudsubError::Submission(format!("Recognition request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CloudsubError::Submission(format!(
                "Speech-to-Text returned {}: {}",
                status, body
            )));
        }

        let operation: Operation = response
            .json()
            .await
            .map_err(|e| CloudsubError::Submission(format!("Malformed operation: {}", e)))?;

        debug!("Recognition operation {} started", operation.name);
        Ok(JobHandle { name: operation.name })
    }

    async fn await_result(&self, job: &JobHandle) -> Result<RecognitionResult> {
        let budget = Duration::from_secs(self.config.timeout_secs);
        let operation = tokio::time::timeout(budget, self.poll_until_done(job))
            .await
            .map_err(|_| CloudsubError::Timeout(budget))??;

        if let Some(error) = operation.error {
            return Err(CloudsubError::Recognition(format!(
                "Operation {} failed with code {}: {}",
                operation.name, error.code, error.message
            )));
        }

        let response = operation.response.unwrap_or_default();
        let result = GoogleSpeechMapper::to_recognition_result(response, &self.segmentation)?;
        info!("Recognition finished with {} utterances", result.utterances.len());
        Ok(result)
    }
}
