use crate::config::AppConfig;
use anyhow::{Context, Result, bail};
use kognit_client::{
    CompletedSession, HttpAnalysisService, HttpResultSink, SubmissionReport, Submitter,
};
use tracing::warn;

/// Builds a submitter from config. `None` when no persistence service is set.
pub fn submitter(config: &AppConfig) -> Result<Option<Submitter<HttpResultSink, HttpAnalysisService>>> {
    let Some(url) = config.server.url.as_deref() else {
        return Ok(None);
    };
    let Some(user_id) = config.server.user_id else {
        bail!("server.url is set but server.user_id is missing");
    };
    let sink = HttpResultSink::new(url, user_id).context("failed to build result client")?;
    let analyzer =
        HttpAnalysisService::new(config.ai.url.as_str()).context("failed to build analysis client")?;
    Ok(Some(Submitter::new(sink, analyzer)))
}

/// Submits a finished session and reports the outcome on stdout. Failures
/// are reported, never propagated: the local results stand on their own.
pub async fn submit_and_report(config: &AppConfig, session: &CompletedSession) {
    let submitter = match submitter(config) {
        Ok(Some(s)) => s,
        Ok(None) => {
            println!("(offline: results not saved)");
            return;
        }
        Err(err) => {
            warn!(error = %err, "submission disabled");
            println!("Results not saved: {err:#}");
            return;
        }
    };

    match submitter.submit(session).await {
        Ok(Some(report)) => print_report(&report),
        Ok(None) => println!("Results already submitted."),
        Err(err) => println!("Results not saved: {err}. Your scores above are unaffected."),
    }
}

fn print_report(report: &SubmissionReport) {
    println!(
        "Saved as game #{} (cognitive score {}).",
        report.saved.game_id, report.saved.cognitive_score
    );
    match &report.analysis {
        Ok(analysis) => {
            println!(
                "Analysis: {} ({:.0}/100)",
                analysis.level, analysis.cognitive_score
            );
            if let Some(feedback) = &analysis.feedback {
                println!("  {feedback}");
            }
            for tip in &analysis.recommendations {
                println!("  - {tip}");
            }
        }
        Err(_) => println!("No analysis available."),
    }
}
