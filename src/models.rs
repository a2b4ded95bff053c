//! Data models for the fact-check client.
//!
//! This module contains the core data structures: the externally owned
//! analysis record, the scripted progress steps, and the structured
//! report view model derived from the backend's markdown output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The request body sent to the analysis backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// URL of the content to fact-check.
    pub url: String,
}

/// Backend-written status of an analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlStatus {
    /// The backend accepted the URL and is working on it.
    Processing,
    /// Analysis finished; `url_content` holds the result.
    Completed,
    /// Analysis failed server-side.
    Error,
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlStatus::Processing => write!(f, "processing"),
            UrlStatus::Completed => write!(f, "completed"),
            UrlStatus::Error => write!(f, "error"),
        }
    }
}

/// Structured payload the backend writes into `url_content` at completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlContent {
    /// Whether the backend considers the run successful.
    #[serde(default)]
    pub success: bool,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
    /// The markdown fact-check report, present on success.
    #[serde(default)]
    pub result: Option<String>,
    /// Error detail, present on failure.
    #[serde(default)]
    pub error: Option<String>,
}

/// One row of the hosted analysis table.
///
/// The client only ever reads these; the backend creates a row at
/// request-accept time and mutates it once at completion/failure time.
/// The `url` column is not guaranteed unique, so queries always take the
/// most recently inserted match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollableRecord {
    /// The submitted URL this record belongs to.
    pub url: String,
    /// Null until the backend picks the job up.
    #[serde(default)]
    pub url_status: Option<UrlStatus>,
    /// Null until the job finishes.
    #[serde(default)]
    pub url_content: Option<UrlContent>,
    /// Insertion timestamp, used to pick the newest row per URL.
    pub inserted_at: DateTime<Utc>,
}

/// Content-type classification of a submitted URL.
///
/// Each kind drives a different fixed step sequence in the progress
/// timeline; `WebPage` is the fallback for anything unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Short-form vertical video (reels, shorts, TikTok).
    ShortVideo,
    /// Single image post.
    ImagePost,
    /// Long-form video.
    LongVideo,
    /// Generic article or web page.
    WebPage,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::ShortVideo => write!(f, "short-form video"),
            ContentKind::ImagePost => write!(f, "image post"),
            ContentKind::LongVideo => write!(f, "long-form video"),
            ContentKind::WebPage => write!(f, "web page"),
        }
    }
}

/// One unit of the scripted progress timeline shown during the wait.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStep {
    /// Stable step identifier (e.g. "scan", "verify").
    pub id: &'static str,
    /// User-facing label.
    pub label: &'static str,
    /// Whether the step has finished.
    pub completed: bool,
    /// Whether the step is the one currently running.
    pub active: bool,
    /// Sub-progress percentage for steps that report one (the scan step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl ProcessStep {
    pub fn new(id: &'static str, label: &'static str, with_progress: bool) -> Self {
        Self {
            id,
            label,
            completed: false,
            active: false,
            progress: if with_progress { Some(0) } else { None },
        }
    }
}

/// Verification status of a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClaimStatus {
    True,
    False,
    Misleading,
    Unverified,
}

impl ClaimStatus {
    /// A claim counts as verified only when it checked out as true.
    pub fn is_verified(&self) -> bool {
        matches!(self, ClaimStatus::True)
    }

    /// Emoji marker used in terminal and markdown output.
    pub fn emoji(&self) -> &'static str {
        match self {
            ClaimStatus::True => "✅",
            ClaimStatus::False => "❌",
            ClaimStatus::Misleading => "⚠️",
            ClaimStatus::Unverified => "❓",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimStatus::True => write!(f, "TRUE"),
            ClaimStatus::False => write!(f, "FALSE"),
            ClaimStatus::Misleading => write!(f, "MISLEADING"),
            ClaimStatus::Unverified => write!(f, "UNVERIFIED"),
        }
    }
}

/// Overall sentiment of the report's final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn emoji(&self) -> &'static str {
        match self {
            Sentiment::Positive => "🟢",
            Sentiment::Neutral => "🟡",
            Sentiment::Negative => "🔴",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// A cited source attached to a claim or the report as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// A single fact-checked claim extracted from the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    /// The claim text as stated in the content.
    pub claim: String,
    /// Verification status.
    pub status: ClaimStatus,
    /// Always equal to `status == TRUE`.
    pub verified: bool,
    /// Confidence in the status, 0.0–1.0.
    pub confidence: f64,
    /// Key evidence sentence, if the report stated one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Sources cited for this claim.
    pub sources: Vec<Source>,
}

impl Claim {
    /// Build a claim, deriving `verified` from the status so the
    /// invariant cannot drift.
    pub fn new(claim: String, status: ClaimStatus, confidence: f64) -> Self {
        Self {
            claim,
            status,
            verified: status.is_verified(),
            confidence,
            evidence: None,
            sources: Vec::new(),
        }
    }
}

/// The structured report view model derived from the backend's markdown.
///
/// Recomputed from scratch on every successful poll, never partially
/// updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    /// Verbatim explanation section.
    pub summary: String,
    /// Overall authenticity confidence, 0.0–1.0.
    pub authenticity_score: f64,
    /// Verdict sentiment.
    pub sentiment: Sentiment,
    /// Notable evidence findings.
    pub key_findings: Vec<String>,
    /// Individual fact-checked claims.
    pub claims: Vec<Claim>,
    /// Canned recommendations matching the sentiment.
    pub recommendations: Vec<String>,
    /// All cited sources, de-duplicated by URL.
    #[serde(rename = "allSources")]
    pub all_sources: Vec<Source>,
}

impl Default for ReportData {
    fn default() -> Self {
        Self {
            summary: String::new(),
            authenticity_score: 0.85,
            sentiment: Sentiment::Neutral,
            key_findings: Vec::new(),
            claims: Vec::new(),
            recommendations: Vec::new(),
            all_sources: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_status_deserializes_lowercase() {
        let status: UrlStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(status, UrlStatus::Completed);
        let status: UrlStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(status, UrlStatus::Processing);
    }

    #[test]
    fn test_record_tolerates_null_columns() {
        let json = r#"{
            "url": "https://example.com/article",
            "url_status": null,
            "url_content": null,
            "inserted_at": "2025-05-01T12:00:00Z"
        }"#;
        let record: PollableRecord = serde_json::from_str(json).unwrap();
        assert!(record.url_status.is_none());
        assert!(record.url_content.is_none());
    }

    #[test]
    fn test_claim_verified_invariant() {
        let claim = Claim::new("x".to_string(), ClaimStatus::True, 0.9);
        assert!(claim.verified);

        for status in [
            ClaimStatus::False,
            ClaimStatus::Misleading,
            ClaimStatus::Unverified,
        ] {
            let claim = Claim::new("x".to_string(), status, 0.9);
            assert!(!claim.verified);
        }
    }

    #[test]
    fn test_claim_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ClaimStatus::Misleading).unwrap(),
            "\"MISLEADING\""
        );
    }

    #[test]
    fn test_report_default_baseline_score() {
        let report = ReportData::default();
        assert_eq!(report.authenticity_score, 0.85);
        assert_eq!(report.sentiment, Sentiment::Neutral);
        assert!(report.claims.is_empty());
    }
}
