//! Scripted progress timeline.
//!
//! Each content kind gets a fixed step sequence with generous nominal
//! durations, sized so the user perceives continuous progress across the
//! whole plausible backend processing window (several minutes end to
//! end). The driver walks the sequence, watching the results-ready
//! channel; the moment real results exist it races through the remaining
//! steps at a short fixed duration instead.

use crate::controller::session::AnalysisSession;
use crate::controller::{ControllerConfig, PollOutcome};
use crate::models::{ContentKind, ProcessStep};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One entry of a fixed per-kind step plan.
#[derive(Debug, Clone, Copy)]
pub struct StepPlan {
    pub id: &'static str,
    pub label: &'static str,
    /// Nominal duration in seconds when no real results exist yet.
    pub nominal_secs: u64,
    /// Whether the step drives a 0–100 sub-progress percentage.
    pub with_progress: bool,
}

const fn step(id: &'static str, label: &'static str, nominal_secs: u64) -> StepPlan {
    StepPlan {
        id,
        label,
        nominal_secs,
        with_progress: false,
    }
}

const fn scan_step(id: &'static str, label: &'static str, nominal_secs: u64) -> StepPlan {
    StepPlan {
        id,
        label,
        nominal_secs,
        with_progress: true,
    }
}

const SHORT_VIDEO_PLAN: &[StepPlan] = &[
    step("fetch", "Fetching video metadata", 5),
    step("download", "Downloading video", 15),
    step("frames", "Extracting key frames", 20),
    scan_step("scan", "Scanning frames for manipulation", 60),
    step("transcribe", "Transcribing audio", 30),
    step("claims", "Extracting factual claims", 35),
    step("research", "Cross-referencing sources", 60),
    step("verify", "Verifying claims", 45),
    step("report", "Compiling report", 25),
];

const IMAGE_POST_PLAN: &[StepPlan] = &[
    step("fetch", "Fetching post metadata", 5),
    step("download", "Downloading image", 10),
    scan_step("scan", "Scanning image for manipulation", 45),
    step("claims", "Extracting claims from caption", 30),
    step("research", "Cross-referencing sources", 60),
    step("verify", "Verifying claims", 45),
    step("report", "Compiling report", 25),
];

const LONG_VIDEO_PLAN: &[StepPlan] = &[
    step("fetch", "Fetching video metadata", 5),
    step("download", "Downloading video", 30),
    step("segments", "Segmenting video chapters", 20),
    step("frames", "Extracting key frames", 25),
    scan_step("scan", "Scanning frames for manipulation", 60),
    step("transcribe", "Transcribing audio", 45),
    step("claims", "Extracting factual claims", 35),
    step("research", "Cross-referencing sources", 60),
    step("verify", "Verifying claims", 45),
    step("report", "Compiling report", 25),
];

const WEB_PAGE_PLAN: &[StepPlan] = &[
    step("fetch", "Fetching page", 5),
    step("extract", "Extracting article text", 10),
    step("claims", "Extracting factual claims", 30),
    step("research", "Cross-referencing sources", 60),
    step("verify", "Verifying claims", 45),
    step("report", "Compiling report", 25),
];

/// Classify a URL into a content kind by substring match against known
/// platform URL shapes. Anything unrecognized is a generic web page.
pub fn classify_url(url: &str) -> ContentKind {
    let url = url.to_lowercase();

    if url.contains("instagram.com/reel")
        || url.contains("youtube.com/shorts")
        || url.contains("tiktok.com")
    {
        ContentKind::ShortVideo
    } else if url.contains("instagram.com/p/") {
        ContentKind::ImagePost
    } else if url.contains("youtube.com/watch") || url.contains("youtu.be/") {
        ContentKind::LongVideo
    } else {
        ContentKind::WebPage
    }
}

/// The fixed step plan for a content kind.
pub fn step_plan(kind: ContentKind) -> &'static [StepPlan] {
    match kind {
        ContentKind::ShortVideo => SHORT_VIDEO_PLAN,
        ContentKind::ImagePost => IMAGE_POST_PLAN,
        ContentKind::LongVideo => LONG_VIDEO_PLAN,
        ContentKind::WebPage => WEB_PAGE_PLAN,
    }
}

/// Build the initial (all-pending) step sequence for a content kind.
pub fn build_steps(kind: ContentKind) -> Vec<ProcessStep> {
    step_plan(kind)
        .iter()
        .map(|plan| ProcessStep::new(plan.id, plan.label, plan.with_progress))
        .collect()
}

/// Walk the step sequence, mutating the shared session as steps start
/// and finish.
///
/// In normal mode each step waits out its nominal duration, checking the
/// results-ready channel on a short interval. Once the channel holds an
/// outcome, every remaining step runs at the fixed accelerated duration
/// and the scan progress jumps straight to 100.
///
/// Returns `false` if the walk was cancelled mid-way.
pub async fn run_timeline(
    session: Arc<Mutex<AnalysisSession>>,
    kind: ContentKind,
    results: watch::Receiver<Option<PollOutcome>>,
    config: &ControllerConfig,
    cancel: CancellationToken,
) -> bool {
    let plan = step_plan(kind);
    let mut accelerated = false;

    for (index, planned) in plan.iter().enumerate() {
        {
            let mut session = session.lock().await;
            session.activate_step(index);
        }
        debug!("step {} ({}) started", index + 1, planned.id);

        if !accelerated && results.borrow().is_some() {
            accelerated = true;
        }

        if accelerated {
            if cancelled_sleep(config.accel_step_duration, &cancel).await {
                return false;
            }
        } else {
            let nominal = Duration::from_secs(planned.nominal_secs);
            let tick = config.flag_check_interval;
            let mut elapsed = Duration::ZERO;

            while elapsed < nominal {
                if cancelled_sleep(tick, &cancel).await {
                    return false;
                }
                elapsed += tick;

                if planned.with_progress {
                    let pct = (elapsed.as_millis() * 100 / nominal.as_millis().max(1)).min(100);
                    let mut session = session.lock().await;
                    session.set_step_progress(index, pct as u8);
                }

                if results.borrow().is_some() {
                    accelerated = true;
                    debug!("results ready, accelerating remaining steps");
                    break;
                }
            }
        }

        let mut session = session.lock().await;
        session.complete_step(index);
    }

    true
}

/// Sleep that returns true if cancellation won the race.
async fn cancelled_sleep(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_short_video_urls() {
        assert_eq!(
            classify_url("https://www.instagram.com/reel/Cxyz123/"),
            ContentKind::ShortVideo
        );
        assert_eq!(
            classify_url("https://www.youtube.com/shorts/abc123"),
            ContentKind::ShortVideo
        );
        assert_eq!(
            classify_url("https://www.tiktok.com/@user/video/123"),
            ContentKind::ShortVideo
        );
    }

    #[test]
    fn test_classify_image_post_url() {
        assert_eq!(
            classify_url("https://www.instagram.com/p/Cxyz123/"),
            ContentKind::ImagePost
        );
    }

    #[test]
    fn test_classify_long_video_urls() {
        assert_eq!(
            classify_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            ContentKind::LongVideo
        );
        assert_eq!(
            classify_url("https://youtu.be/dQw4w9WgXcQ"),
            ContentKind::LongVideo
        );
    }

    #[test]
    fn test_classify_falls_back_to_web_page() {
        assert_eq!(
            classify_url("https://example.com/blog/some-article"),
            ContentKind::WebPage
        );
        assert_eq!(classify_url("not even a url"), ContentKind::WebPage);
    }

    #[test]
    fn test_step_sequences_are_fixed_per_kind() {
        let short: Vec<&str> = build_steps(ContentKind::ShortVideo)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(
            short,
            vec![
                "fetch",
                "download",
                "frames",
                "scan",
                "transcribe",
                "claims",
                "research",
                "verify",
                "report"
            ]
        );

        let image: Vec<&str> = build_steps(ContentKind::ImagePost)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(
            image,
            vec!["fetch", "download", "scan", "claims", "research", "verify", "report"]
        );

        assert_eq!(build_steps(ContentKind::LongVideo).len(), 10);
        assert_eq!(build_steps(ContentKind::WebPage).len(), 6);
    }

    #[test]
    fn test_only_scan_steps_carry_progress() {
        for kind in [
            ContentKind::ShortVideo,
            ContentKind::ImagePost,
            ContentKind::LongVideo,
        ] {
            let steps = build_steps(kind);
            let with_progress: Vec<&str> = steps
                .iter()
                .filter(|s| s.progress.is_some())
                .map(|s| s.id)
                .collect();
            assert_eq!(with_progress, vec!["scan"]);
        }

        let page = build_steps(ContentKind::WebPage);
        assert!(page.iter().all(|s| s.progress.is_none()));
    }

    #[test]
    fn test_steps_start_pending() {
        for step in build_steps(ContentKind::ShortVideo) {
            assert!(!step.completed);
            assert!(!step.active);
        }
    }
}
