//! Tolerant markdown report scanner.
//!
//! The backend's report writer emits loosely structured markdown with
//! numbered section headings, repeated "Claim N:" blocks, and free-text
//! evidence/source lines. This is a best-effort pattern scanner over
//! those expected shapes, not a markdown parser: any missing or
//! malformed section degrades to an empty/default field, and nothing
//! here can fail.

use crate::models::{Claim, ClaimStatus, ReportData, Sentiment, Source};
use std::collections::HashSet;

/// Baseline used when the report states no overall confidence score.
const DEFAULT_CONFIDENCE: f64 = 0.85;

/// Convert a markdown fact-check report into the display model.
pub fn parse(markdown: &str) -> ReportData {
    let mut report = ReportData::default();

    if let Some(explanation) = section(markdown, "EXPLANATION") {
        report.summary = explanation.trim().to_string();
    }

    report.authenticity_score = extract_confidence(markdown).unwrap_or(DEFAULT_CONFIDENCE);

    if let Some(verdict) = section(markdown, "FINAL VERDICT") {
        report.sentiment = classify_sentiment(&verdict);
    }

    let mut seen_urls = HashSet::new();

    for block in claim_blocks(markdown) {
        let claim = parse_claim_block(&block, report.authenticity_score);

        if let Some(evidence) = &claim.evidence {
            report.key_findings.push(evidence.clone());
        }
        for source in &claim.sources {
            if seen_urls.insert(source.url.clone()) {
                report.all_sources.push(source.clone());
            }
        }

        report.claims.push(claim);
    }

    if report.claims.is_empty() {
        scan_evidence_fallback(markdown, &mut report, &mut seen_urls);
    }

    report.recommendations = recommendations_for(report.sentiment);

    report
}

/// Extract the body of the first heading whose text contains `key`
/// (case-insensitive), up to the next heading of any level.
fn section(markdown: &str, key: &str) -> Option<String> {
    let mut body: Option<Vec<&str>> = None;

    for line in markdown.lines() {
        let is_heading = line.trim_start().starts_with('#');

        match &mut body {
            Some(lines) => {
                if is_heading {
                    break;
                }
                lines.push(line);
            }
            None => {
                if is_heading && line.to_uppercase().contains(key) {
                    body = Some(Vec::new());
                }
            }
        }
    }

    body.map(|lines| lines.join("\n"))
}

/// The overall confidence score as a 0..1 fraction.
///
/// Tries the CONFIDENCE SCORE section first, then any inline
/// "Confidence Score: NN%" line; first match wins.
fn extract_confidence(markdown: &str) -> Option<f64> {
    if let Some(body) = section(markdown, "CONFIDENCE SCORE") {
        if let Some(score) = extract_percent(&body) {
            return Some(score);
        }
    }

    markdown
        .lines()
        .find(|line| line.to_uppercase().contains("CONFIDENCE SCORE"))
        .and_then(extract_percent)
}

/// First "NN%" or "NN.N%" in the text, as a fraction clamped to 0..1.
fn extract_percent(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        if b != b'%' {
            continue;
        }
        let mut start = i;
        while start > 0 && (bytes[start - 1].is_ascii_digit() || bytes[start - 1] == b'.') {
            start -= 1;
        }
        if start < i {
            if let Ok(value) = text[start..i].parse::<f64>() {
                return Some((value / 100.0).clamp(0.0, 1.0));
            }
        }
    }

    None
}

/// Verdict sentiment by keyword presence; the debunk keywords win when
/// both appear.
fn classify_sentiment(verdict: &str) -> Sentiment {
    let verdict = verdict.to_lowercase();

    if verdict.contains("false") || verdict.contains("misleading") {
        Sentiment::Negative
    } else if verdict.contains("true") || verdict.contains("verified") {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}

/// Does this line open a "Claim N: ..." block?
fn is_claim_header(line: &str) -> bool {
    let text = line
        .trim_start()
        .trim_start_matches('#')
        .trim_start()
        .trim_start_matches('*');

    match text.strip_prefix("Claim ") {
        Some(rest) => {
            rest.contains(':')
                && rest
                    .trim_start()
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Split out every "Claim N:" block, each running until the next claim
/// header or the next major section heading.
fn claim_blocks(markdown: &str) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in markdown.lines() {
        if is_claim_header(line) {
            if let Some(block) = current.take() {
                blocks.push(block.join("\n"));
            }
            current = Some(vec![line]);
        } else if line.trim_start().starts_with("## ") {
            // A major section heading ends the current claim block.
            if let Some(block) = current.take() {
                blocks.push(block.join("\n"));
            }
        } else if let Some(block) = &mut current {
            block.push(line);
        }
    }

    if let Some(block) = current.take() {
        blocks.push(block.join("\n"));
    }

    blocks
}

fn parse_claim_block(block: &str, overall_confidence: f64) -> Claim {
    let mut lines = block.lines();
    let header = lines.next().unwrap_or_default();

    let text = header
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or_default()
        .trim()
        .trim_start_matches('*')
        .trim_end_matches('*')
        .trim()
        .to_string();

    // Field searches skip the header so claim wording cannot shadow the
    // Status/Confidence lines.
    let status = block
        .lines()
        .skip(1)
        .find(|line| line.to_lowercase().contains("status"))
        .map(parse_status_line)
        .unwrap_or(ClaimStatus::Unverified);

    let confidence = block
        .lines()
        .skip(1)
        .find(|line| line.to_lowercase().contains("confidence"))
        .and_then(extract_percent)
        .unwrap_or_else(|| derived_confidence(status, overall_confidence));

    let mut claim = Claim::new(text, status, confidence);
    claim.evidence = block
        .lines()
        .skip(1)
        .find_map(extract_key_evidence)
        .filter(|e| !e.is_empty());
    claim.sources = parse_sources_block(block);

    claim
}

fn parse_status_line(line: &str) -> ClaimStatus {
    let line = line.to_uppercase();

    if line.contains("MISLEADING") {
        ClaimStatus::Misleading
    } else if line.contains("FALSE") {
        ClaimStatus::False
    } else if line.contains("UNVERIFIED") {
        ClaimStatus::Unverified
    } else if line.contains("TRUE") {
        ClaimStatus::True
    } else {
        ClaimStatus::Unverified
    }
}

/// Per-claim confidence when the block states none: a status-dependent
/// discount of the overall score. The multipliers match the backend's
/// report conventions and are compatibility values, not measurements.
fn derived_confidence(status: ClaimStatus, overall: f64) -> f64 {
    match status {
        ClaimStatus::True => overall,
        ClaimStatus::False => overall * 0.95,
        ClaimStatus::Misleading => overall * 0.85,
        ClaimStatus::Unverified => 0.50,
    }
}

/// Pull the sentence out of a "Key Evidence: ..." line.
fn extract_key_evidence(line: &str) -> Option<String> {
    // ASCII-only fold: byte offsets must stay valid in `line`.
    let lower = line.to_ascii_lowercase();
    let pos = lower.find("key evidence")?;

    let rest = &line[pos + "key evidence".len()..];
    let text = rest
        .trim_start_matches(['*', ':'])
        .trim_start_matches(':')
        .trim()
        .trim_end_matches('*')
        .trim();

    Some(text.to_string())
}

/// Parse the "Sources:" sub-block of a claim, accepting both markdown
/// links and plain "Name - URL (Date)" lines.
fn parse_sources_block(block: &str) -> Vec<Source> {
    let mut in_sources = false;
    let mut sources = Vec::new();

    for line in block.lines().skip(1) {
        if !in_sources {
            if line.to_lowercase().contains("sources") {
                in_sources = true;
            }
            continue;
        }
        if let Some(source) = parse_source_line(line) {
            sources.push(source);
        }
    }

    sources
}

/// Parse a single source line in either accepted shape.
pub(crate) fn parse_source_line(line: &str) -> Option<Source> {
    let mut text = line.trim();

    // Strip list markers: "-", "*", "•", "1.", "1)"
    text = text
        .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•')
        .trim_start();
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &text[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            text = stripped.trim_start();
        }
    }

    // Markdown link: [Name](URL), optionally followed by "(Date)"
    if let Some(open) = text.find('[') {
        if let Some(mid) = text[open..].find("](") {
            let name = &text[open + 1..open + mid];
            let after = &text[open + mid + 2..];
            if let Some(close) = after.find(')') {
                let url = after[..close].trim();
                if url.starts_with("http") {
                    return Some(Source {
                        name: name.trim().to_string(),
                        url: url.to_string(),
                        date: trailing_parenthetical(&after[close + 1..]),
                    });
                }
            }
        }
    }

    // Plain form: Name - URL (Date)
    if let Some(split) = text.find(" - ") {
        let name = text[..split].trim();
        let rest = text[split + 3..].trim();
        if !name.is_empty() && rest.starts_with("http") {
            let (url, date) = match rest.find(" (") {
                Some(p) if rest.ends_with(')') => (
                    rest[..p].trim(),
                    Some(rest[p + 2..rest.len() - 1].trim().to_string()),
                ),
                _ => (rest, None),
            };
            return Some(Source {
                name: name.to_string(),
                url: url.to_string(),
                date: date.filter(|d| !d.is_empty()),
            });
        }
    }

    None
}

fn trailing_parenthetical(text: &str) -> Option<String> {
    let text = text.trim();
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let inner = inner.trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

/// When no claim blocks matched at all, mine a generic EVIDENCE section
/// for findings and sources instead.
fn scan_evidence_fallback(
    markdown: &str,
    report: &mut ReportData,
    seen_urls: &mut HashSet<String>,
) {
    let Some(body) = section(markdown, "EVIDENCE") else {
        return;
    };

    for line in body.lines() {
        if let Some(evidence) = extract_key_evidence(line) {
            for finding in evidence.split(". ") {
                let finding = finding.trim().trim_end_matches('.');
                if !finding.is_empty() {
                    report.key_findings.push(finding.to_string());
                }
            }
        }
        if let Some(source) = parse_source_line(line) {
            if seen_urls.insert(source.url.clone()) {
                report.all_sources.push(source);
            }
        }
    }
}

/// Canned recommendations: derived from the verdict sentiment alone,
/// never from claim content.
fn recommendations_for(sentiment: Sentiment) -> Vec<String> {
    let texts: &[&str] = match sentiment {
        Sentiment::Negative => &[
            "Do not share this content before reviewing the cited sources.",
            "Check the listed sources for the corrected information.",
            "Report the content on the platform where you found it.",
        ],
        Sentiment::Neutral => &[
            "Verify the key claims against the cited sources before sharing.",
            "Look for additional independent coverage of the topic.",
        ],
        Sentiment::Positive => &[
            "The content checked out, but cite the original sources when sharing.",
            "Re-check time-sensitive claims if you revisit this content later.",
        ],
    };

    texts.iter().map(|t| t.to_string()).collect()
}
