use std::error::Error as _;
use std::path::Path;

use tracing::{info, warn};

use crate::cli::EvaluationArgs;
use crate::evaluation::{EvaluationError, EvaluatorConfig, evaluate};
use crate::log_table::record_metric;
use crate::model::{RunManifest, RunPaths};
use crate::model_id::{LogTarget, resolve_log_target};
use crate::util::now_utc_string;

#[derive(Debug, Clone, Default)]
pub(super) struct ReportOutcome {
    pub(super) target: Option<LogTarget>,
    pub(super) metric: Option<f64>,
    pub(super) failure: Option<String>,
}

impl ReportOutcome {
    pub(super) fn status(&self) -> &'static str {
        if self.failure.is_none() {
            "completed"
        } else {
            "completed_without_log"
        }
    }
}

pub(super) fn evaluate_and_log(
    model_name: &str,
    ranking_path: &Path,
    args: &EvaluationArgs,
) -> ReportOutcome {
    let mut outcome = ReportOutcome::default();

    if let Err(err) = record(model_name, ranking_path, args, &mut outcome) {
        warn!(stage = err.stage(), error = %err, "log save error");
        let mut source = err.source();
        while let Some(cause) = source {
            warn!(cause = %cause, "caused by");
            source = cause.source();
        }
        outcome.failure = Some(format!("{}: {err}", err.stage()));
    }

    outcome
}

fn record(
    model_name: &str,
    ranking_path: &Path,
    args: &EvaluationArgs,
    outcome: &mut ReportOutcome,
) -> Result<(), EvaluationError> {
    let config = EvaluatorConfig::from_args(args);
    let metric = evaluate(&config, ranking_path)?;
    outcome.metric = Some(metric);
    info!(metric, "evaluation complete");

    let target = resolve_log_target(model_name, args.step, args.finetuning_type.as_deref())?;
    outcome.target = Some(target.clone());

    let previous = record_metric(&args.log_path, &target, metric)?;
    info!(
        path = %args.log_path.display(),
        step = target.step,
        finetuning_type = %target.finetuning_type,
        metric,
        previous = %previous.unwrap_or_default(),
        "successfully saved log"
    );

    Ok(())
}

pub(super) fn run_paths(
    jsonl_file_path: Option<&Path>,
    tsv_file_path: &Path,
    args: &EvaluationArgs,
) -> RunPaths {
    RunPaths {
        jsonl_file_path: jsonl_file_path.map(|path| path.display().to_string()),
        tsv_file_path: tsv_file_path.display().to_string(),
        qrels_path: args.qrels_path.display().to_string(),
        log_path: args.log_path.display().to_string(),
    }
}

pub(super) fn manifest(
    command: &str,
    run_id: String,
    started_at: String,
    model_name: &str,
    paths: RunPaths,
    outcome: &ReportOutcome,
) -> RunManifest {
    RunManifest {
        manifest_version: 1,
        run_id,
        command: command.to_string(),
        status: outcome.status().to_string(),
        started_at,
        updated_at: now_utc_string(),
        model_name: model_name.to_string(),
        device: None,
        reranker_backend: None,
        seed: None,
        top_k: None,
        paths,
        counts: None,
        input_sha256: None,
        log_step: outcome.target.as_ref().map(|target| target.step),
        finetuning_type: outcome
            .target
            .as_ref()
            .map(|target| target.finetuning_type.clone()),
        metric: outcome.metric,
        failure_reason: outcome.failure.clone(),
    }
}
