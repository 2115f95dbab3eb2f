use std::sync::Arc;
use std::time::Instant;

use shared::config::IndexSelection;
use shared::dispatch::ObjectStore;
use shared::findings::FindingsSource;
use shared::generate::TextGenerator;
use shared::models::SecurityFinding;
use shared::pipeline::{PipelineError, analyze_finding, resolve_index_id};
use shared::prompt::ReportMode;
use shared::retrieval::DocumentIndex;
use tracing::{error, info};

/// Upstream handles for the findings sweep.
pub(crate) struct SweepContext {
    pub(crate) findings: Arc<dyn FindingsSource>,
    pub(crate) index: Arc<dyn DocumentIndex>,
    pub(crate) generator: Arc<dyn TextGenerator>,
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) selection: IndexSelection,
}

#[derive(Debug, Default)]
pub(crate) struct SweepMetrics {
    pub(crate) fetched_findings: usize,
    pub(crate) stored_reports: usize,
    pub(crate) failed_reports: usize,
}

/// One reporting pass: pull recent active findings, generate a runbook report
/// for each and store it under the finding's object key. A failure on one
/// finding does not stop the rest of the sweep.
pub(crate) async fn run_findings_sweep(context: &SweepContext) -> SweepMetrics {
    let started = Instant::now();
    let mut metrics = SweepMetrics::default();

    let findings = match context.findings.fetch_recent().await {
        Ok(findings) => findings,
        Err(err) => {
            error!("failed to fetch recent findings: {err}");
            return metrics;
        }
    };
    metrics.fetched_findings = findings.len();

    if findings.is_empty() {
        info!("no active findings in the window, nothing to report");
        return metrics;
    }

    let index_id = match resolve_index_id(context.index.as_ref(), &context.selection).await {
        Ok(index_id) => index_id,
        Err(err) => {
            error!("failed to resolve the document index: {err}");
            return metrics;
        }
    };

    for finding in &findings {
        match report_finding(context, &index_id, finding).await {
            Ok(()) => metrics.stored_reports += 1,
            Err(err) => {
                metrics.failed_reports += 1;
                error!(finding_id = %finding.id, "failed to report finding: {err}");
            }
        }
    }

    info!(
        fetched_findings = metrics.fetched_findings,
        stored_reports = metrics.stored_reports,
        failed_reports = metrics.failed_reports,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "findings sweep finished"
    );

    metrics
}

async fn report_finding(
    context: &SweepContext,
    index_id: &str,
    finding: &SecurityFinding,
) -> Result<(), PipelineError> {
    let analysis = analyze_finding(
        context.index.as_ref(),
        context.generator.as_ref(),
        index_id,
        finding,
        ReportMode::Runbook,
    )
    .await?;

    let object_key = finding.report_object_key();
    context
        .store
        .put_object(object_key.clone(), analysis.report)
        .await?;

    info!(finding_id = %finding.id, object_key = %object_key, "stored incident report");
    Ok(())
}
