//! Analysis lifecycle controller.
//!
//! Owns the full lifecycle of one in-flight request: submits it to the
//! backend (fire-and-forget), runs the scripted progress timeline, polls
//! the record store in a concurrent task, and merges whichever finishes
//! first into a single session outcome.
//!
//! The two loops communicate over a single-slot `watch` channel: the
//! poll loop is the sole writer, publishing at most one terminal
//! outcome; the timeline and its finalization step only read. Dropping
//! the sender (poll ceiling reached) is itself a signal, read as "still
//! processing". Resubmitting cancels the previous session's tasks
//! through a shared cancellation token and builds a fresh session, so
//! no state leaks between requests.

pub mod session;
pub mod timeline;

use crate::api::{AnalysisBackend, ContentStore};
use crate::models::{AnalysisRequest, ReportData, UrlStatus};
use crate::report;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use session::AnalysisSession;

/// Terminal result published by the poll loop, at most once.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// Backend finished and the report parsed.
    Completed(ReportData),
    /// Backend recorded a failure for this URL.
    Failed(String),
}

/// Final outcome of one submitted request.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// A report is ready for display/export.
    Completed(ReportData),
    /// The backend reported the analysis failed.
    Failed(String),
    /// The poll ceiling passed with no terminal record. Deliberately not
    /// an error: the job may still land server-side.
    StillProcessing,
    /// A newer `submit` (or explicit cancel) invalidated this session.
    Cancelled,
}

/// Timing knobs for the poll loop and the progress timeline.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Spacing between record-store queries.
    pub poll_interval: Duration,
    /// Poll ceiling; interval times attempts bounds the whole wait.
    pub max_attempts: u32,
    /// Emit a "still processing" heartbeat every Nth processing tick.
    pub heartbeat_every: u32,
    /// How often the timeline checks the results-ready channel.
    pub flag_check_interval: Duration,
    /// Per-step duration once real results exist.
    pub accel_step_duration: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_attempts: 300,
            heartbeat_every: 15,
            flag_check_interval: Duration::from_millis(200),
            accel_step_duration: Duration::from_secs(1),
        }
    }
}

/// Handle to one in-flight analysis.
pub struct RunningAnalysis {
    session: Arc<Mutex<AnalysisSession>>,
    outcome: JoinHandle<SessionOutcome>,
    cancel: CancellationToken,
}

impl RunningAnalysis {
    /// Shared session state, for progress rendering.
    pub fn session(&self) -> Arc<Mutex<AnalysisSession>> {
        Arc::clone(&self.session)
    }

    /// Stop the poll loop and the timeline.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the session to reach its final outcome.
    pub async fn wait(self) -> Result<SessionOutcome> {
        self.outcome.await.context("Analysis task panicked")
    }
}

/// Orchestrates submission, timeline, polling, and result
/// materialization for one request at a time.
pub struct AnalysisController {
    backend: Arc<dyn AnalysisBackend>,
    store: Arc<dyn ContentStore>,
    config: ControllerConfig,
    current: Option<CancellationToken>,
}

impl AnalysisController {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        store: Arc<dyn ContentStore>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            backend,
            store,
            config,
            current: None,
        }
    }

    /// Start analyzing `url`: trigger the backend, start the poll loop
    /// and the progress timeline, and return once both are running.
    ///
    /// Any prior in-flight session is cancelled first, which is what
    /// makes resubmission a full reset.
    pub async fn submit(&mut self, url: &str) -> Result<RunningAnalysis> {
        let url = url.trim();
        if url.is_empty() {
            anyhow::bail!("URL must not be empty");
        }

        if let Some(previous) = self.current.take() {
            debug!("cancelling previous in-flight session");
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.current = Some(cancel.clone());

        let kind = timeline::classify_url(url);
        let steps = timeline::build_steps(kind);
        info!("Classified {} as {} ({} steps)", url, kind, steps.len());

        let session = Arc::new(Mutex::new(AnalysisSession::new(
            url.to_string(),
            kind,
            steps,
        )));
        {
            let mut session = session.lock().await;
            session.log(format!("Submitted for analysis as {}", kind));
        }

        // Fire-and-forget: the response body is never used, and a failed
        // submission does not interrupt polling since the job may still
        // run server-side.
        let backend = Arc::clone(&self.backend);
        let request = AnalysisRequest {
            url: url.to_string(),
        };
        tokio::spawn(async move {
            if let Err(e) = backend.submit(&request).await {
                warn!("Analysis submission failed (continuing to poll): {e:#}");
            }
        });

        let (results_tx, results_rx) = watch::channel(None);

        tokio::spawn(poll_loop(
            url.to_string(),
            Arc::clone(&self.store),
            Arc::clone(&session),
            results_tx,
            self.config.clone(),
            cancel.clone(),
        ));

        let outcome = tokio::spawn(drive_session(
            Arc::clone(&session),
            kind,
            results_rx,
            self.config.clone(),
            cancel.clone(),
        ));

        Ok(RunningAnalysis {
            session,
            outcome,
            cancel,
        })
    }
}

/// Run the timeline to completion, then materialize the final outcome.
async fn drive_session(
    session: Arc<Mutex<AnalysisSession>>,
    kind: crate::models::ContentKind,
    mut results: watch::Receiver<Option<PollOutcome>>,
    config: ControllerConfig,
    cancel: CancellationToken,
) -> SessionOutcome {
    let finished =
        timeline::run_timeline(Arc::clone(&session), kind, results.clone(), &config, cancel.clone())
            .await;
    if !finished {
        return SessionOutcome::Cancelled;
    }

    // Consume a pending result if the poll loop already published one;
    // otherwise keep waiting on the channel. The poll loop carries the
    // cadence and ceiling, so a closed channel means the ceiling passed
    // with nothing to show.
    let outcome = loop {
        if let Some(outcome) = results.borrow_and_update().clone() {
            break Some(outcome);
        }
        tokio::select! {
            _ = cancel.cancelled() => return SessionOutcome::Cancelled,
            changed = results.changed() => {
                if changed.is_err() {
                    break None;
                }
            }
        }
    };

    let mut session = session.lock().await;
    match outcome {
        Some(PollOutcome::Completed(report)) => {
            session.log("Analysis complete");
            session.report = Some(report.clone());
            SessionOutcome::Completed(report)
        }
        Some(PollOutcome::Failed(message)) => {
            session.log(format!("Analysis failed: {}", message));
            SessionOutcome::Failed(message)
        }
        None => {
            session.log("Results are still being compiled");
            SessionOutcome::StillProcessing
        }
    }
}

/// Query the record store on a fixed interval until a terminal record
/// appears or the attempt ceiling is reached.
async fn poll_loop(
    url: String,
    store: Arc<dyn ContentStore>,
    session: Arc<Mutex<AnalysisSession>>,
    results: watch::Sender<Option<PollOutcome>>,
    config: ControllerConfig,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for attempt in 1..=config.max_attempts {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("poll loop cancelled");
                return;
            }
            _ = ticker.tick() => {}
        }

        let record = match store.latest_record(&url).await {
            Ok(record) => record,
            Err(e) => {
                // Transient store trouble is not a reason to give up.
                warn!("Record store query failed (attempt {}): {}", attempt, e);
                continue;
            }
        };

        // No row yet: the backend has not even accepted the job.
        let Some(record) = record else { continue };

        match record.url_status {
            Some(UrlStatus::Completed) => {
                let markdown = record
                    .url_content
                    .and_then(|c| c.result)
                    .filter(|r| !r.trim().is_empty());
                if let Some(markdown) = markdown {
                    let parsed = report::parse(&markdown);
                    info!("Analysis completed after {} poll attempts", attempt);
                    session.lock().await.log("Results received");
                    let _ = results.send(Some(PollOutcome::Completed(parsed)));
                    return;
                }
                // Completed without a report payload: keep polling until
                // it lands.
            }
            Some(UrlStatus::Error) => {
                let message = record
                    .url_content
                    .and_then(|c| c.error)
                    .unwrap_or_else(|| "analysis failed server-side".to_string());
                info!("Backend reported failure after {} attempts: {}", attempt, message);
                let _ = results.send(Some(PollOutcome::Failed(message)));
                return;
            }
            _ => {
                if attempt % config.heartbeat_every == 0 {
                    let elapsed = config.poll_interval * attempt;
                    let line = format!("Still processing after {}s", elapsed.as_secs());
                    info!("{}", line);
                    session.lock().await.log(line);
                }
            }
        }
    }

    debug!("poll ceiling reached for {} with no terminal record", url);
    // Dropping the sender closes the channel, which finalization reads
    // as "still processing".
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StoreError;
    use crate::models::{PollableRecord, UrlContent};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    const SAMPLE_MARKDOWN: &str = "\
## 3. FINAL VERDICT
The claim is true and verified.

## 4. CONFIDENCE SCORE
90%

## 5. EXPLANATION
Every consulted source agrees with the claim.
";

    enum StorePlan {
        NeverReady,
        AlwaysProcessing,
        CompletedAfter(u32),
        ErrorAfter(u32),
    }

    struct ScriptedStore {
        calls: AtomicU32,
        plan: StorePlan,
    }

    impl ScriptedStore {
        fn new(plan: StorePlan) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                plan,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn processing_record(url: &str) -> PollableRecord {
            PollableRecord {
                url: url.to_string(),
                url_status: Some(UrlStatus::Processing),
                url_content: None,
                inserted_at: Utc::now(),
            }
        }

        fn completed_record(url: &str) -> PollableRecord {
            PollableRecord {
                url: url.to_string(),
                url_status: Some(UrlStatus::Completed),
                url_content: Some(UrlContent {
                    success: true,
                    message: "Video analysis completed successfully".to_string(),
                    result: Some(SAMPLE_MARKDOWN.to_string()),
                    error: None,
                }),
                inserted_at: Utc::now(),
            }
        }

        fn error_record(url: &str) -> PollableRecord {
            PollableRecord {
                url: url.to_string(),
                url_status: Some(UrlStatus::Error),
                url_content: Some(UrlContent {
                    success: false,
                    message: "Analysis failed".to_string(),
                    result: None,
                    error: Some("video could not be downloaded".to_string()),
                }),
                inserted_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl ContentStore for ScriptedStore {
        async fn latest_record(&self, url: &str) -> Result<Option<PollableRecord>, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(match self.plan {
                StorePlan::NeverReady => None,
                StorePlan::AlwaysProcessing => Some(Self::processing_record(url)),
                StorePlan::CompletedAfter(n) if call >= n => Some(Self::completed_record(url)),
                StorePlan::CompletedAfter(_) => Some(Self::processing_record(url)),
                StorePlan::ErrorAfter(n) if call >= n => Some(Self::error_record(url)),
                StorePlan::ErrorAfter(_) => None,
            })
        }
    }

    struct CountingBackend {
        submissions: AtomicU32,
        fail: bool,
    }

    impl CountingBackend {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                submissions: AtomicU32::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl AnalysisBackend for CountingBackend {
        async fn submit(&self, _request: &AnalysisRequest) -> Result<()> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }
    }

    fn controller(
        backend: Arc<CountingBackend>,
        store: Arc<ScriptedStore>,
        config: ControllerConfig,
    ) -> AnalysisController {
        AnalysisController::new(backend, store, config)
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_url() {
        let mut controller = controller(
            CountingBackend::new(false),
            ScriptedStore::new(StorePlan::NeverReady),
            ControllerConfig::default(),
        );
        assert!(controller.submit("").await.is_err());
        assert!(controller.submit("   ").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_run_accelerates_remaining_steps() {
        let store = ScriptedStore::new(StorePlan::CompletedAfter(5));
        let mut controller = controller(
            CountingBackend::new(false),
            Arc::clone(&store),
            ControllerConfig::default(),
        );

        let start = Instant::now();
        let running = controller
            .submit("https://www.youtube.com/shorts/abc123")
            .await
            .unwrap();
        let session = running.session();
        let outcome = running.wait().await.unwrap();

        // Results landed ~8s in; the 9-step timeline nominally runs ~295s
        // but must finish shortly after acceleration kicks in.
        let elapsed = start.elapsed();
        assert!(
            elapsed < Duration::from_secs(40),
            "timeline took {:?}, acceleration did not kick in",
            elapsed
        );

        let report = match outcome {
            SessionOutcome::Completed(report) => report,
            other => panic!("expected completion, got {:?}", other),
        };
        assert!((report.authenticity_score - 0.90).abs() < 1e-9);

        let session = session.lock().await;
        assert_eq!(session.completed_count(), session.steps.len());
        assert!(session.steps.iter().all(|s| !s.active));
        let scan = session.steps.iter().find(|s| s.id == "scan").unwrap();
        assert_eq!(scan.progress, Some(100));
        assert!(session.report.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_stops_immediately_on_completion() {
        let store = ScriptedStore::new(StorePlan::CompletedAfter(2));
        let mut controller = controller(
            CountingBackend::new(false),
            Arc::clone(&store),
            ControllerConfig::default(),
        );

        let running = controller.submit("https://example.com/a").await.unwrap();
        let outcome = running.wait().await.unwrap();

        assert!(matches!(outcome, SessionOutcome::Completed(_)));
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_ceiling_leaves_still_processing() {
        let store = ScriptedStore::new(StorePlan::NeverReady);
        let mut controller = controller(
            CountingBackend::new(false),
            Arc::clone(&store),
            ControllerConfig::default(),
        );

        let running = controller
            .submit("https://example.com/blog/article")
            .await
            .unwrap();
        let session = running.session();
        let outcome = running.wait().await.unwrap();

        assert!(matches!(outcome, SessionOutcome::StillProcessing));
        assert_eq!(store.calls(), 300);

        let session = session.lock().await;
        assert!(session.report.is_none());
        // The scripted walk still ran to the end.
        assert_eq!(session.completed_count(), session.steps.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_error_record_fails_session() {
        let store = ScriptedStore::new(StorePlan::ErrorAfter(3));
        let mut controller = controller(
            CountingBackend::new(false),
            Arc::clone(&store),
            ControllerConfig::default(),
        );

        let running = controller.submit("https://example.com/a").await.unwrap();
        let session = running.session();
        let outcome = running.wait().await.unwrap();

        match outcome {
            SessionOutcome::Failed(message) => {
                assert!(message.contains("could not be downloaded"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(store.calls(), 3);
        assert!(session.lock().await.report.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_cancels_and_resets() {
        let store = ScriptedStore::new(StorePlan::NeverReady);
        let mut controller = controller(
            CountingBackend::new(false),
            Arc::clone(&store),
            ControllerConfig::default(),
        );

        let first = controller
            .submit("https://www.tiktok.com/@user/video/1")
            .await
            .unwrap();
        let first_session = first.session();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let second = controller
            .submit("https://example.com/blog/article")
            .await
            .unwrap();

        let first_outcome = first.wait().await.unwrap();
        assert!(matches!(first_outcome, SessionOutcome::Cancelled));

        let old = first_session.lock().await;
        let fresh = second.session();
        let fresh = fresh.lock().await;
        assert_eq!(old.steps.len(), 9);
        assert_eq!(fresh.steps.len(), 6);
        assert!(fresh.steps.iter().all(|s| !s.completed));
        assert!(fresh.report.is_none());
        assert_eq!(fresh.logs.len(), 1);
        drop(fresh);
        second.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_submission_does_not_stop_polling() {
        let store = ScriptedStore::new(StorePlan::CompletedAfter(1));
        let backend = CountingBackend::new(true);
        let mut controller =
            controller(Arc::clone(&backend), Arc::clone(&store), ControllerConfig::default());

        let running = controller.submit("https://example.com/a").await.unwrap();
        let outcome = running.wait().await.unwrap();

        assert!(matches!(outcome, SessionOutcome::Completed(_)));
        assert_eq!(backend.submissions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_heartbeat_logged() {
        let store = ScriptedStore::new(StorePlan::AlwaysProcessing);
        let config = ControllerConfig {
            max_attempts: 16,
            ..ControllerConfig::default()
        };
        let mut controller = controller(CountingBackend::new(false), store, config);

        let running = controller.submit("https://example.com/a").await.unwrap();
        let session = running.session();
        let outcome = running.wait().await.unwrap();

        assert!(matches!(outcome, SessionOutcome::StillProcessing));
        let session = session.lock().await;
        assert!(session
            .logs
            .iter()
            .any(|entry| entry.message.contains("Still processing after 30s")));
    }
}
