use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::cli::EvaluationArgs;
use crate::log_table::LogError;
use crate::model_id::ModelIdError;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("failed to execute evaluator {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("evaluator {program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("evaluator printed {lines} line(s); the metric is expected on line 2")]
    MissingLine { lines: usize },
    #[error("evaluator metric line is blank")]
    MissingToken,
    #[error("evaluator metric {token:?} is not a number")]
    InvalidMetric { token: String },
    #[error(transparent)]
    ModelId(#[from] ModelIdError),
    #[error(transparent)]
    Log(#[from] LogError),
}

impl EvaluationError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Spawn { .. } | Self::Failed { .. } => "evaluator subprocess",
            Self::MissingLine { .. } | Self::MissingToken | Self::InvalidMetric { .. } => {
                "metric parse"
            }
            Self::ModelId(_) => "log target",
            Self::Log(_) => "log update",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub program: String,
    pub leading_args: Vec<String>,
    pub qrels_path: PathBuf,
}

impl EvaluatorConfig {
    pub fn from_args(args: &EvaluationArgs) -> Self {
        let mut leading_args = args.evaluator_args.clone();
        if !args.no_evaluator_script {
            leading_args.extend(args.evaluator_script.iter().cloned());
        }

        Self {
            program: args.evaluator_program.clone(),
            leading_args,
            qrels_path: args.qrels_path.clone(),
        }
    }
}

pub fn run_evaluator(
    config: &EvaluatorConfig,
    ranking_path: &Path,
) -> Result<String, EvaluationError> {
    info!(
        program = %config.program,
        qrels = %config.qrels_path.display(),
        ranking = %ranking_path.display(),
        "running evaluator"
    );

    let output = Command::new(&config.program)
        .args(&config.leading_args)
        .arg(&config.qrels_path)
        .arg(ranking_path)
        .output()
        .map_err(|source| EvaluationError::Spawn {
            program: config.program.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EvaluationError::Failed {
            program: config.program.clone(),
            status: output.status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    debug!(stdout = %stdout.trim(), "evaluator output");
    Ok(stdout)
}

pub fn parse_metric(stdout: &str) -> Result<f64, EvaluationError> {
    let lines = stdout.split('\n').collect::<Vec<&str>>();
    let line = lines
        .get(1)
        .ok_or(EvaluationError::MissingLine { lines: lines.len() })?;

    let token = line
        .split_whitespace()
        .last()
        .ok_or(EvaluationError::MissingToken)?;

    token
        .parse::<f64>()
        .map_err(|_| EvaluationError::InvalidMetric {
            token: token.to_string(),
        })
}

pub fn evaluate(config: &EvaluatorConfig, ranking_path: &Path) -> Result<f64, EvaluationError> {
    let stdout = run_evaluator(config, ranking_path)?;
    parse_metric(&stdout)
}
