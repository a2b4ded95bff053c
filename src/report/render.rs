//! Report rendering and export.
//!
//! Formats the parsed `ReportData` three ways: a terminal summary
//! printed after completion, a markdown document, and pretty JSON for
//! export.

use crate::models::{Claim, ReportData, Source};
use anyhow::{Context, Result};

/// Print the completed report to the terminal.
pub fn print_summary(report: &ReportData, url: &str) {
    println!("\n📋 Fact-Check Report");
    println!("   Content: {}", url);
    println!(
        "   Verdict: {} {} | Authenticity score: {:.0}%",
        report.sentiment.emoji(),
        report.sentiment,
        report.authenticity_score * 100.0
    );

    if !report.summary.is_empty() {
        println!("\n   {}", report.summary.replace('\n', "\n   "));
    }

    if !report.claims.is_empty() {
        println!("\n   Claims:");
        for claim in &report.claims {
            println!(
                "   {} [{}] {} ({:.0}% confidence)",
                claim.status.emoji(),
                claim.status,
                claim.claim,
                claim.confidence * 100.0
            );
            if let Some(evidence) = &claim.evidence {
                println!("      {}", evidence);
            }
        }
    }

    if !report.all_sources.is_empty() {
        println!("\n   Sources:");
        for source in &report.all_sources {
            println!("   🔗 {}: {}", source.name, source.url);
        }
    }

    if !report.recommendations.is_empty() {
        println!("\n   Recommendations:");
        for rec in &report.recommendations {
            println!("   • {}", rec);
        }
    }
}

/// Generate a JSON export of the report.
pub fn generate_json_report(report: &ReportData) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

/// Generate a complete markdown report.
pub fn generate_markdown_report(report: &ReportData, url: &str) -> String {
    let mut output = String::new();

    output.push_str("# FactLens Report\n\n");
    output.push_str(&format!("- **Content:** {}\n", url));
    output.push_str(&format!(
        "- **Verdict:** {} {}\n",
        report.sentiment.emoji(),
        report.sentiment
    ));
    output.push_str(&format!(
        "- **Authenticity Score:** {:.0}%\n\n",
        report.authenticity_score * 100.0
    ));

    if !report.summary.is_empty() {
        output.push_str("## Summary\n\n");
        output.push_str(&report.summary);
        output.push_str("\n\n");
    }

    if !report.claims.is_empty() {
        output.push_str("## Claims\n\n");
        for (i, claim) in report.claims.iter().enumerate() {
            output.push_str(&generate_claim_section(i + 1, claim));
        }
    }

    if !report.key_findings.is_empty() {
        output.push_str("## Key Findings\n\n");
        for finding in &report.key_findings {
            output.push_str(&format!("- {}\n", finding));
        }
        output.push('\n');
    }

    if !report.recommendations.is_empty() {
        output.push_str("## Recommendations\n\n");
        for rec in &report.recommendations {
            output.push_str(&format!("- {}\n", rec));
        }
        output.push('\n');
    }

    if !report.all_sources.is_empty() {
        output.push_str("## Sources\n\n");
        for source in &report.all_sources {
            output.push_str(&format!("- {}\n", format_source(source)));
        }
        output.push('\n');
    }

    output.push_str("---\n*Generated by FactLens*\n");

    output
}

fn generate_claim_section(number: usize, claim: &Claim) -> String {
    let mut section = String::new();

    section.push_str(&format!("### Claim {}: {}\n\n", number, claim.claim));
    section.push_str(&format!(
        "- **Status:** {} {}\n",
        claim.status.emoji(),
        claim.status
    ));
    section.push_str(&format!(
        "- **Confidence:** {:.0}%\n",
        claim.confidence * 100.0
    ));
    if let Some(evidence) = &claim.evidence {
        section.push_str(&format!("- **Key Evidence:** {}\n", evidence));
    }
    if !claim.sources.is_empty() {
        section.push_str("- **Sources:**\n");
        for source in &claim.sources {
            section.push_str(&format!("  - {}\n", format_source(source)));
        }
    }
    section.push('\n');

    section
}

fn format_source(source: &Source) -> String {
    match &source.date {
        Some(date) => format!("[{}]({}) ({})", source.name, source.url, date),
        None => format!("[{}]({})", source.name, source.url),
    }
}

/// The message shown when the poll ceiling passes with no result. Not an
/// error: a slow backend job may still land later.
pub fn still_processing_message() -> &'static str {
    "The analysis is still being compiled. Large content can take a while \
     server-side; run again with --no-submit later to pick up the result."
}
