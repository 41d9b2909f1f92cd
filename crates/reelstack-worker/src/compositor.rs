//! Composition orchestrator.
//!
//! Drives one job through `Created -> AssetsFetched -> BottomConcatenated ->
//! Composed -> Done`. Stages run strictly in sequence, the first failure ends
//! the job, and nothing is retried.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use reelstack_media::workspace::{Artifact, JobWorkspace, WorkspaceManager};
use reelstack_media::{
    check_output, compose, concatenate, probe_video, stage_asset, AssetFetcher, Encoder,
    FfmpegRunner, FilterGraphSpec, HttpFetcher, MediaError,
};
use reelstack_models::{
    AssetRole, Canvas, CompositionJob, CompositionResult, EncodingPolicy, JobStage,
    StagedAsset, ValidationError,
};
use tokio::sync::watch;
use tracing::Instrument;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::sink::{LocalPathSink, OutputSink};

const OPERATION: &str = "compose_vertical";

/// Runs composition jobs end to end.
///
/// Holds no per-job state, so one instance can serve concurrent jobs.
pub struct Compositor {
    fetcher: Arc<dyn AssetFetcher>,
    encoder: Arc<dyn Encoder>,
    workspaces: WorkspaceManager,
    sink: Arc<dyn OutputSink>,
    canvas: Canvas,
    policy: EncodingPolicy,
    verify_output: bool,
    remove_failed_workspaces: bool,
}

impl Compositor {
    /// Build a compositor from its collaborators with default canvas and policy.
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        encoder: Arc<dyn Encoder>,
        workspaces: WorkspaceManager,
    ) -> Self {
        Self {
            fetcher,
            encoder,
            workspaces,
            sink: Arc::new(LocalPathSink),
            canvas: Canvas::default(),
            policy: EncodingPolicy::default(),
            verify_output: false,
            remove_failed_workspaces: false,
        }
    }

    /// Build the production compositor: HTTP fetcher and the `ffmpeg` CLI.
    ///
    /// `cancel` is forwarded to every encoder invocation; sending `true`
    /// kills the running encoder and fails the job.
    pub fn from_config(
        config: &WorkerConfig,
        cancel: Option<watch::Receiver<bool>>,
    ) -> WorkerResult<Self> {
        let fetcher = HttpFetcher::new(config.fetch_connect_timeout)
            .map_err(|e| WorkerError::config_error(e.to_string()))?;

        let mut runner = FfmpegRunner::new();
        if let Some(timeout) = config.ffmpeg_timeout {
            runner = runner.with_timeout(timeout.as_secs());
        }
        if let Some(rx) = cancel {
            runner = runner.with_cancel(rx);
        }

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(runner),
            WorkspaceManager::new(config.work_dir.clone()),
        )
        .with_verification(config.verify_output)
        .with_failed_workspace_removal(config.remove_failed_workspaces))
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = canvas;
        self
    }

    /// Probe each output with ffprobe before reporting success.
    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify_output = enabled;
        self
    }

    pub fn with_failed_workspace_removal(mut self, enabled: bool) -> Self {
        self.remove_failed_workspaces = enabled;
        self
    }

    pub fn workspace_root(&self) -> &std::path::Path {
        self.workspaces.root()
    }

    /// Run a job and report the outcome as a [`CompositionResult`].
    pub async fn submit(&self, job: CompositionJob) -> CompositionResult {
        let job_id = job.id.clone();
        match self.run(&job).await {
            Ok(output_path) => {
                metrics::record_job_completed();
                CompositionResult::Succeeded {
                    job_id,
                    output_path,
                }
            }
            Err(e) => {
                metrics::record_job_failed(e.failed_stage());
                CompositionResult::Failed {
                    job_id,
                    failure: e.to_failure(),
                }
            }
        }
    }

    /// Run a job, returning the delivered output path.
    pub async fn run(&self, job: &CompositionJob) -> WorkerResult<PathBuf> {
        let logger = JobLogger::new(&job.id, OPERATION);
        let span = logger.create_span();

        async {
            let result = self.run_inner(job, &logger).await;
            if let Err(e) = &result {
                logger.log_failure(e.failed_stage(), &e.to_string());
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_inner(&self, job: &CompositionJob, logger: &JobLogger) -> WorkerResult<PathBuf> {
        // Created: everything that can be checked without I/O. Failures from
        // here on carry the stage being entered.
        job.validate()?;
        let graph = FilterGraphSpec::from_canvas(&self.canvas)
            .map_err(|e| ValidationError::GeometryMismatch(e.to_string()))?;

        logger.log_start(&format!(
            "{} bottom clip(s), {}s target",
            job.bottom_clip_count(),
            job.target_duration_seconds
        ));

        let workspace = self
            .workspaces
            .create_job_workspace(&job.id)
            .await
            .map_err(|e| WorkerError::stage(JobStage::AssetsFetched, e))?;

        let result = self.run_stages(job, &workspace, &graph, logger).await;

        if result.is_err() && self.remove_failed_workspaces {
            if let Err(e) = workspace.remove().await {
                logger.log_warning(&format!("Failed to remove workspace: {}", e));
            }
        }

        result
    }

    async fn run_stages(
        &self,
        job: &CompositionJob,
        workspace: &JobWorkspace,
        graph: &FilterGraphSpec,
        logger: &JobLogger,
    ) -> WorkerResult<PathBuf> {
        // Created -> AssetsFetched
        let primary = self
            .fetch(&job.primary_source_url, workspace, AssetRole::Primary)
            .await
            .map_err(|e| WorkerError::stage(JobStage::AssetsFetched, e))?;

        let mut bottom_clips = Vec::with_capacity(job.bottom_clip_count());
        for (index, url) in job.bottom_clip_urls.iter().enumerate() {
            let clip = self
                .fetch(url, workspace, AssetRole::BottomClip(index))
                .await
                .map_err(|e| WorkerError::stage(JobStage::AssetsFetched, e))?;
            bottom_clips.push(clip);
        }
        logger.log_stage(
            JobStage::AssetsFetched,
            &format!("Fetched primary and {} bottom clip(s)", bottom_clips.len()),
        );

        // AssetsFetched -> BottomConcatenated
        let clip_paths: Vec<PathBuf> = bottom_clips.iter().map(|c| c.local_path.clone()).collect();
        let start = Instant::now();
        let concatenated = concatenate(
            self.encoder.as_ref(),
            &clip_paths,
            &workspace.path_for(Artifact::ConcatManifest),
            &workspace.path_for(Artifact::BottomConcatenated),
        )
        .await
        .map_err(|e| WorkerError::stage(JobStage::BottomConcatenated, e))?;
        metrics::record_ffmpeg_duration("concat", start.elapsed().as_secs_f64());
        logger.log_stage(JobStage::BottomConcatenated, "Bottom clips concatenated");

        // BottomConcatenated -> Composed
        let start = Instant::now();
        let output = compose(
            self.encoder.as_ref(),
            &primary.local_path,
            &concatenated,
            graph,
            job.target_duration_seconds,
            &self.policy,
            &workspace.path_for(Artifact::Output),
        )
        .await
        .map_err(|e| WorkerError::stage(JobStage::Composed, e))?;
        metrics::record_ffmpeg_duration("compose", start.elapsed().as_secs_f64());

        if self.verify_output {
            self.verify(&output, job.target_duration_seconds)
                .await
                .map_err(|e| WorkerError::stage(JobStage::Composed, e))?;
        }
        logger.log_stage(JobStage::Composed, "Composite encoded");

        // Composed -> Done
        let delivered = self.sink.deliver(&job.id, &output).await?;
        logger.log_completion(&format!("Output at {}", delivered.display()));

        Ok(delivered)
    }

    async fn fetch(
        &self,
        url: &str,
        workspace: &JobWorkspace,
        role: AssetRole,
    ) -> Result<StagedAsset, MediaError> {
        let start = Instant::now();
        let staged = stage_asset(
            self.fetcher.as_ref(),
            url,
            &workspace.path_for(Artifact::Asset(role)),
            role,
        )
        .await?;

        let label = match role {
            AssetRole::Primary => "primary",
            AssetRole::BottomClip(_) => "bottom_clip",
        };
        metrics::record_fetch_duration(label, start.elapsed().as_secs_f64());

        Ok(staged)
    }

    async fn verify(&self, output: &std::path::Path, target_secs: u32) -> Result<(), MediaError> {
        let info = probe_video(output).await?;
        check_output(&info, self.canvas.width, self.canvas.height, target_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::{mock, Sequence};
    use reelstack_media::{FfmpegCommand, MediaResult};
    use reelstack_models::FailureClass;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    mock! {
        pub Fetcher {}

        #[async_trait]
        impl AssetFetcher for Fetcher {
            async fn fetch(&self, url: &str, destination: &Path) -> MediaResult<PathBuf>;
        }
    }

    /// Writes each command's output file, failing for outputs named in `fail_on`.
    #[derive(Default)]
    struct RecordingEncoder {
        fail_on: Option<&'static str>,
        commands: Mutex<Vec<FfmpegCommand>>,
    }

    impl RecordingEncoder {
        fn failing_on(file_name: &'static str) -> Self {
            Self {
                fail_on: Some(file_name),
                commands: Mutex::new(Vec::new()),
            }
        }

        fn outputs(&self) -> Vec<String> {
            self.commands
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.output().file_name().unwrap().to_string_lossy().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl Encoder for RecordingEncoder {
        async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
            self.commands.lock().unwrap().push(cmd.clone());
            let name = cmd.output().file_name().unwrap().to_string_lossy().to_string();
            if self.fail_on == Some(name.as_str()) {
                return Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with non-zero status",
                    Some("[concat @ 0x1] DTS out of order".to_string()),
                    Some(1),
                ));
            }
            tokio::fs::write(cmd.output(), b"encoded").await?;
            Ok(())
        }
    }

    fn writing_fetcher() -> MockFetcher {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|_, dest| {
            std::fs::write(dest, b"video bytes").unwrap();
            Ok(dest.to_path_buf())
        });
        fetcher
    }

    fn compositor(
        fetcher: MockFetcher,
        encoder: Arc<RecordingEncoder>,
        root: &Path,
    ) -> Compositor {
        Compositor::new(Arc::new(fetcher), encoder, WorkspaceManager::new(root))
    }

    fn job(bottoms: &[&str]) -> CompositionJob {
        CompositionJob::new(
            "https://cdn.test/primary.mp4",
            bottoms.iter().map(|s| s.to_string()).collect(),
            60,
        )
    }

    #[tokio::test]
    async fn test_successful_job_runs_concat_then_compose() {
        let dir = TempDir::new().unwrap();
        let encoder = Arc::new(RecordingEncoder::default());
        let compositor = compositor(writing_fetcher(), encoder.clone(), dir.path());

        let result = compositor
            .submit(job(&["https://cdn.test/a.mp4", "https://cdn.test/b.mp4"]))
            .await;

        assert!(result.is_success(), "{result:?}");
        let output = result.output_path().unwrap();
        assert!(output.ends_with("output.mp4"));
        assert!(output.exists());
        assert_eq!(encoder.outputs(), vec!["bottom_concatenated.mp4", "output.mp4"]);

        let compose_cmd = encoder.commands.lock().unwrap()[1].clone();
        assert_eq!(compose_cmd.expected_duration_ms(), Some(60_000));
        assert_eq!(compose_cmd.inputs().len(), 2);
        assert!(compose_cmd.inputs()[0].path.ends_with("primary.mp4"));
        assert!(compose_cmd.inputs()[1].path.ends_with("bottom_concatenated.mp4"));
        assert_eq!(compose_cmd.inputs()[1].args, vec!["-stream_loop", "-1"]);
    }

    #[tokio::test]
    async fn test_fetch_order_and_manifest_order_follow_input() {
        let dir = TempDir::new().unwrap();
        let encoder = Arc::new(RecordingEncoder::default());

        let mut fetcher = MockFetcher::new();
        let mut seq = Sequence::new();
        for (url, file) in [
            ("https://cdn.test/primary.mp4", "primary.mp4"),
            ("https://cdn.test/z.mp4", "bottom_0.mp4"),
            ("https://cdn.test/y.mp4", "bottom_1.mp4"),
            ("https://cdn.test/x.mp4", "bottom_2.mp4"),
        ] {
            fetcher
                .expect_fetch()
                .withf(move |u, dest| u == url && dest.ends_with(file))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, dest| {
                    std::fs::write(dest, b"clip").unwrap();
                    Ok(dest.to_path_buf())
                });
        }

        let compositor = compositor(fetcher, encoder, dir.path());
        let output = compositor
            .run(&job(&[
                "https://cdn.test/z.mp4",
                "https://cdn.test/y.mp4",
                "https://cdn.test/x.mp4",
            ]))
            .await
            .unwrap();

        let manifest = output.parent().unwrap().join("concat_manifest.txt");
        let text = std::fs::read_to_string(manifest).unwrap();
        let names: Vec<&str> = text
            .lines()
            .map(|l| l.rsplit('/').next().unwrap().trim_end_matches('\''))
            .collect();
        assert_eq!(names, vec!["bottom_0.mp4", "bottom_1.mp4", "bottom_2.mp4"]);
    }

    #[tokio::test]
    async fn test_empty_bottom_list_fails_without_fetching() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(0);
        let encoder = Arc::new(RecordingEncoder::default());
        let compositor = compositor(fetcher, encoder.clone(), dir.path());

        let result = compositor.submit(job(&[])).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.stage, JobStage::Created);
        assert_eq!(failure.class, FailureClass::BadInput);
        assert!(encoder.outputs().is_empty());
    }

    #[tokio::test]
    async fn test_missing_primary_fails_before_workspace_creation() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("work");
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(0);
        let compositor = compositor(fetcher, Arc::new(RecordingEncoder::default()), &root);

        let mut job = job(&["https://cdn.test/a.mp4"]);
        job.primary_source_url = String::new();
        let err = compositor.run(&job).await.unwrap_err();

        assert!(matches!(
            err,
            WorkerError::Validation(ValidationError::MissingPrimaryUrl)
        ));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_remaining_fetches() {
        let dir = TempDir::new().unwrap();
        let encoder = Arc::new(RecordingEncoder::default());

        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|u, _| u.ends_with("primary.mp4") || u.ends_with("a.mp4"))
            .times(2)
            .returning(|_, dest| {
                std::fs::write(dest, b"clip").unwrap();
                Ok(dest.to_path_buf())
            });
        fetcher
            .expect_fetch()
            .withf(|u, _| u.ends_with("b.mp4"))
            .times(1)
            .returning(|u, _| {
                Err(MediaError::HttpStatus {
                    url: u.to_string(),
                    status: 404,
                })
            });
        fetcher
            .expect_fetch()
            .withf(|u, _| u.ends_with("c.mp4"))
            .times(0);

        let compositor = compositor(fetcher, encoder.clone(), dir.path());
        let result = compositor
            .submit(job(&[
                "https://cdn.test/a.mp4",
                "https://cdn.test/b.mp4",
                "https://cdn.test/c.mp4",
            ]))
            .await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.stage, JobStage::AssetsFetched);
        assert_eq!(failure.class, FailureClass::Network);
        assert!(encoder.outputs().is_empty());
    }

    #[tokio::test]
    async fn test_concat_failure_skips_composition() {
        let dir = TempDir::new().unwrap();
        let encoder = Arc::new(RecordingEncoder::failing_on("bottom_concatenated.mp4"));
        let compositor = compositor(writing_fetcher(), encoder.clone(), dir.path());

        let result = compositor
            .submit(job(&["https://cdn.test/a.mp4", "https://cdn.test/b.mp4"]))
            .await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.stage, JobStage::BottomConcatenated);
        assert_eq!(failure.class, FailureClass::Encode);
        assert_eq!(
            failure.diagnostics.as_deref(),
            Some("[concat @ 0x1] DTS out of order")
        );
        assert_eq!(encoder.outputs(), vec!["bottom_concatenated.mp4"]);
    }

    #[tokio::test]
    async fn test_compose_failure_reports_composed_stage() {
        let dir = TempDir::new().unwrap();
        let encoder = Arc::new(RecordingEncoder::failing_on("output.mp4"));
        let compositor = compositor(writing_fetcher(), encoder, dir.path());

        let result = compositor.submit(job(&["https://cdn.test/a.mp4"])).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.stage, JobStage::Composed);
        assert_eq!(failure.class, FailureClass::Encode);
    }

    #[tokio::test]
    async fn test_same_job_twice_uses_distinct_workspaces() {
        let dir = TempDir::new().unwrap();
        let compositor = compositor(
            writing_fetcher(),
            Arc::new(RecordingEncoder::default()),
            dir.path(),
        );
        let job = job(&["https://cdn.test/a.mp4"]);

        let first = compositor.run(&job).await.unwrap();
        let second = compositor.run(&job).await.unwrap();

        assert_ne!(first.parent(), second.parent());
        assert!(first.exists() && second.exists());
    }

    #[tokio::test]
    async fn test_failed_workspace_removed_when_enabled() {
        let dir = TempDir::new().unwrap();
        let compositor = compositor(
            writing_fetcher(),
            Arc::new(RecordingEncoder::failing_on("output.mp4")),
            dir.path(),
        )
        .with_failed_workspace_removal(true);

        let result = compositor.submit(job(&["https://cdn.test/a.mp4"])).await;
        assert!(!result.is_success());

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_invalid_canvas_is_rejected_up_front() {
        let dir = TempDir::new().unwrap();
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(0);
        let compositor = compositor(fetcher, Arc::new(RecordingEncoder::default()), dir.path())
            .with_canvas(Canvas {
                width: 1080,
                height: 1920,
                top_height: 1920,
            });

        let err = compositor
            .run(&job(&["https://cdn.test/a.mp4"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Validation(ValidationError::GeometryMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_workspace_failure_reports_stage_being_entered() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, b"occupied").unwrap();
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(0);
        let compositor = compositor(fetcher, Arc::new(RecordingEncoder::default()), &root);

        let result = compositor.submit(job(&["https://cdn.test/a.mp4"])).await;

        let failure = result.failure().unwrap();
        assert_eq!(failure.stage, JobStage::AssetsFetched);
        assert_eq!(failure.class, FailureClass::Internal);
    }
}
