use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::JobConfig;
use crate::error::{PipelineError, PipelineStage};
use crate::media::AudioExtractor;
use crate::progress::{Step, StepProgress};
use crate::recognition::SpeechRecognizer;
use crate::storage::{ObjectRef, ObjectStore};
use crate::subtitle::{convert, persist_srt, render_srt};

const TOTAL_STEPS: usize = 4;

type StageResult<T> = std::result::Result<T, PipelineError>;

/// Runs one video through extraction, upload, recognition and SRT generation.
///
/// The pipeline owns both temporary resources of a run: the extracted audio
/// is removed right after the upload attempt and the uploaded object is
/// deleted once recognition has reached a terminal state, whatever the
/// outcome.
pub struct Pipeline {
    extractor: Box<dyn AudioExtractor>,
    store: Box<dyn ObjectStore>,
    recognizer: Box<dyn SpeechRecognizer>,
    progress: StepProgress,
}

impl Pipeline {
    pub fn new(
        extractor: Box<dyn AudioExtractor>,
        store: Box<dyn ObjectStore>,
        recognizer: Box<dyn SpeechRecognizer>,
    ) -> Self {
        Self {
            extractor,
            store,
            recognizer,
            progress: StepProgress::hidden(TOTAL_STEPS),
        }
    }

    /// Show a spinner per step on the terminal
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = StepProgress::new(enabled, TOTAL_STEPS);
        self
    }

    /// Produce the subtitle file for `job` and return its path
    pub async fn run(&self, job: &JobConfig) -> StageResult<PathBuf> {
        info!("Processing video file: {}", job.input.display());

        let step = self.progress.start(1, "Extracting audio from video");
        let audio = finish(step, PipelineStage::Extract, self.extractor.extract(&job.input).await)?;

        let step = self.progress.start(2, "Uploading audio to Google Cloud Storage");
        let uploaded = self.store.upload(audio.path(), &job.bucket).await;
        if let Err(e) = audio.remove() {
            warn!("Failed to remove temporary audio: {}", e);
        }
        let object = finish(step, PipelineStage::Upload, uploaded)?;
        info!("Uploaded audio to {}", object);

        let outcome = self.transcribe(&object, job).await;

        match self.store.delete(&object).await {
            Ok(()) => debug!("Deleted {}", object),
            Err(e) => warn!("Failed to delete {}: {}", object, e),
        }

        outcome?;
        info!("Subtitles written to {}", job.output.display());
        Ok(job.output.clone())
    }

    async fn transcribe(&self, object: &ObjectRef, job: &JobConfig) -> StageResult<()> {
        let step = self.progress.start(3, "Transcribing audio");
        let submitted = self.recognizer.submit(object, &job.language_code).await;
        let handle = match submitted {
            Ok(handle) => handle,
            Err(e) => {
                step.fail();
                return Err(PipelineError::new(PipelineStage::Submit, e));
            }
        };
        info!("Recognition job submitted: {}", handle.name);
        let result = finish(step, PipelineStage::Recognize, self.recognizer.await_result(&handle).await)?;

        if result.is_empty() {
            warn!("No speech was recognized in {}", job.input.display());
        }
        if let Some(language) = &result.language {
            debug!("Service reported language {}", language);
        }

        let step = self.progress.start(4, "Generating subtitle file");
        let entries = convert(result);
        debug!("Converted transcript into {} subtitle entries", entries.len());
        let srt_content = match render_srt(&entries) {
            Ok(content) => content,
            Err(e) => {
                step.fail();
                return Err(PipelineError::new(PipelineStage::Convert, e));
            }
        };
        finish(step, PipelineStage::Write, persist_srt(&srt_content, &job.output))
    }
}

fn finish<T>(step: Step, stage: PipelineStage, result: crate::error::Result<T>) -> StageResult<T> {
    match result {
        Ok(value) => {
            step.succeed();
            Ok(value)
        }
        Err(e) => {
            step.fail();
            Err(PipelineError::new(stage, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudsubError;
    use crate::media::{ExtractedAudio, MockAudioExtractor};
    use crate::recognition::{JobHandle, MockSpeechRecognizer, RecognitionResult, Utterance};
    use crate::storage::MockObjectStore;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    const OBJECT_KEY: &str = "audio-transcripts/test.wav";

    fn job(dir: &TempDir) -> JobConfig {
        JobConfig {
            input: PathBuf::from("movie.mp4"),
            language_code: "en-US".to_string(),
            bucket: "test-bucket".to_string(),
            output: dir.path().join("movie.srt"),
        }
    }

    /// Extractor producing a real temporary WAV whose path is recorded
    fn working_extractor(seen: Arc<Mutex<Option<PathBuf>>>) -> MockAudioExtractor {
        let mut extractor = MockAudioExtractor::new();
        extractor.expect_extract().times(1).returning(move |_| {
            let audio = ExtractedAudio::allocate()?;
            std::fs::write(audio.path(), b"RIFF")?;
            *seen.lock().unwrap() = Some(audio.path().to_path_buf());
            Ok(audio)
        });
        extractor
    }

    fn uploading_store() -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store.expect_upload().times(1).returning(|path: &Path, bucket: &str| {
            assert!(path.is_file());
            Ok(ObjectRef::new(bucket, OBJECT_KEY))
        });
        store
    }

    fn recognizer_with(result: crate::error::Result<RecognitionResult>) -> MockSpeechRecognizer {
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer
            .expect_submit()
            .times(1)
            .withf(|object, language| object.key == OBJECT_KEY && language == "en-US")
            .returning(|_, _| Ok(JobHandle { name: "op-1".to_string() }));
        let mut result = Some(result);
        recognizer
            .expect_await_result()
            .times(1)
            .returning(move |_| result.take().unwrap_or_else(|| Ok(RecognitionResult::default())));
        recognizer
    }

    fn two_utterances() -> RecognitionResult {
        RecognitionResult::new(vec![
            Utterance::new(0.0, 1.5, "hello"),
            Utterance::new(1.5, 3.0, "world"),
        ])
    }

    #[tokio::test]
    async fn test_successful_run_writes_output_before_delete() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);
        let seen = Arc::new(Mutex::new(None));

        let mut store = uploading_store();
        let output = job.output.clone();
        store.expect_delete().times(1).returning(move |object| {
            assert_eq!(object.uri(), "gs://test-bucket/audio-transcripts/test.wav");
            assert!(output.is_file());
            Ok(())
        });

        let pipeline = Pipeline::new(
            Box::new(working_extractor(seen.clone())),
            Box::new(store),
            Box::new(recognizer_with(Ok(two_utterances()))),
        );

        let path = pipeline.run(&job).await.unwrap();
        assert_eq!(path, job.output);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "1\n00:00:00,000 --> 00:00:01,500\nhello\n\n2\n00:00:01,500 --> 00:00:03,000\nworld\n\n"
        );
        let audio_path = seen.lock().unwrap().clone().unwrap();
        assert!(!audio_path.exists());
    }

    #[tokio::test]
    async fn test_extraction_failure_stops_before_upload() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);

        let mut extractor = MockAudioExtractor::new();
        extractor
            .expect_extract()
            .times(1)
            .returning(|_| Err(CloudsubError::ToolNotFound("ffmpeg".to_string())));
        let mut store = MockObjectStore::new();
        store.expect_upload().never();
        store.expect_delete().never();
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_submit().never();

        let pipeline = Pipeline::new(Box::new(extractor), Box::new(store), Box::new(recognizer));

        let err = pipeline.run(&job).await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Extract);
        assert!(matches!(err.source, CloudsubError::ToolNotFound(_)));
        assert!(!job.output.exists());
    }

    #[tokio::test]
    async fn test_extraction_tool_error_uploads_nothing() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);

        let mut extractor = MockAudioExtractor::new();
        extractor.expect_extract().times(1).returning(|_| {
            Err(CloudsubError::Extraction(
                "Audio extraction failed (exit status: 1): movie.mp4: Invalid data found".to_string(),
            ))
        });
        let mut store = MockObjectStore::new();
        store.expect_upload().never();
        store.expect_delete().never();
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_submit().never();

        let pipeline = Pipeline::new(Box::new(extractor), Box::new(store), Box::new(recognizer));

        let err = pipeline.run(&job).await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Extract);
        assert_eq!(err.to_string(), "Audio extraction failed");
        assert!(matches!(err.root_cause(), CloudsubError::Extraction(msg) if msg.contains("Invalid data")));
        assert!(!job.output.exists());
    }

    #[tokio::test]
    async fn test_upload_failure_removes_audio() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);
        let seen = Arc::new(Mutex::new(None));

        let mut store = MockObjectStore::new();
        store
            .expect_upload()
            .times(1)
            .returning(|_, _| Err(CloudsubError::Upload("bucket does not exist".to_string())));
        store.expect_delete().never();
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_submit().never();

        let pipeline = Pipeline::new(
            Box::new(working_extractor(seen.clone())),
            Box::new(store),
            Box::new(recognizer),
        );

        let err = pipeline.run(&job).await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Upload);
        assert_eq!(err.to_string(), "Audio upload failed");
        let audio_path = seen.lock().unwrap().clone().unwrap();
        assert!(!audio_path.exists());
    }

    #[tokio::test]
    async fn test_submission_failure_cleans_up_everything() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);
        let seen = Arc::new(Mutex::new(None));

        let mut store = uploading_store();
        store.expect_delete().times(1).returning(|_| Ok(()));
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer
            .expect_submit()
            .times(1)
            .returning(|_, _| Err(CloudsubError::Submission("invalid language code".to_string())));
        recognizer.expect_await_result().never();

        let pipeline = Pipeline::new(
            Box::new(working_extractor(seen.clone())),
            Box::new(store),
            Box::new(recognizer),
        );

        let err = pipeline.run(&job).await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Submit);
        match err.root_cause() {
            CloudsubError::Submission(message) => assert_eq!(message, "invalid language code"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!job.output.exists());
        let audio_path = seen.lock().unwrap().clone().unwrap();
        assert!(!audio_path.exists());
    }

    #[tokio::test]
    async fn test_timeout_still_deletes_object() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);

        let mut store = uploading_store();
        store.expect_delete().times(1).returning(|_| Ok(()));
        let pipeline = Pipeline::new(
            Box::new(working_extractor(Arc::new(Mutex::new(None)))),
            Box::new(store),
            Box::new(recognizer_with(Err(CloudsubError::Timeout(Duration::from_secs(900))))),
        );

        let err = pipeline.run(&job).await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Recognize);
        assert!(matches!(err.source, CloudsubError::Timeout(_)));
        assert!(!job.output.exists());
    }

    #[tokio::test]
    async fn test_delete_failure_does_not_fail_run() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);

        let mut store = uploading_store();
        store
            .expect_delete()
            .times(1)
            .returning(|_| Err(CloudsubError::Storage("permission denied".to_string())));
        let pipeline = Pipeline::new(
            Box::new(working_extractor(Arc::new(Mutex::new(None)))),
            Box::new(store),
            Box::new(recognizer_with(Ok(two_utterances()))),
        );

        let path = pipeline.run(&job).await.unwrap();
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn test_empty_recognition_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);

        let mut store = uploading_store();
        store.expect_delete().times(1).returning(|_| Ok(()));
        let pipeline = Pipeline::new(
            Box::new(working_extractor(Arc::new(Mutex::new(None)))),
            Box::new(store),
            Box::new(recognizer_with(Ok(RecognitionResult::default()))),
        );

        let path = pipeline.run(&job).await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_invalid_offsets_fail_conversion() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);

        let mut store = uploading_store();
        store.expect_delete().times(1).returning(|_| Ok(()));
        let broken = RecognitionResult::new(vec![Utterance::new(-2.0, 1.0, "early")]);
        let pipeline = Pipeline::new(
            Box::new(working_extractor(Arc::new(Mutex::new(None)))),
            Box::new(store),
            Box::new(recognizer_with(Ok(broken))),
        );

        let err = pipeline.run(&job).await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Convert);
        assert!(matches!(err.source, CloudsubError::InvalidDuration(_)));
        assert!(!job.output.exists());
    }
}
