use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "rerank-eval",
    version,
    about = "Passage reranking evaluation and training-log tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rerank candidates, write the ranking TSV, evaluate it and update the log.
    Rerank(RerankArgs),
    /// Evaluate an existing ranking TSV and update the log.
    Score(ScoreArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RerankArgs {
    /// Model identifier, conventionally `.../<finetuning_type>/<prefix>-<step>`.
    #[arg(long)]
    pub model_name: String,

    #[arg(long)]
    pub tsv_file_path: PathBuf,

    #[arg(long)]
    pub jsonl_file_path: PathBuf,

    #[arg(long, default_value_t = 100)]
    pub top_k: usize,

    #[command(flatten)]
    pub reranker: RerankerArgs,

    #[command(flatten)]
    pub evaluation: EvaluationArgs,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[arg(long)]
    pub model_name: String,

    #[arg(long)]
    pub tsv_file_path: PathBuf,

    #[command(flatten)]
    pub evaluation: EvaluationArgs,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RerankerBackend {
    Command,
    Http,
}

impl RerankerBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Http => "http",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RerankerArgs {
    #[arg(long = "reranker", value_enum, default_value_t = RerankerBackend::Command)]
    pub backend: RerankerBackend,

    /// Reranker program for `--reranker command`.
    ///
    /// Started once as `<program> [--reranker-arg ..] --model-name <m> --device <d> --seed <s>`.
    /// It reads one JSON request per line on stdin,
    /// `{"query": "...", "documents": ["..."], "top_k": 100}`,
    /// and answers each with one JSON line on stdout,
    /// `{"results": [{"index": 2, "relevance_score": 0.93}, ...]}` or `{"error": "..."}`.
    #[arg(long, default_value = "bge-rerank")]
    pub reranker_program: String,

    /// Leading reranker program arguments, placed before the model flags.
    #[arg(long = "reranker-arg", allow_hyphen_values = true)]
    pub reranker_args: Vec<String>,

    #[arg(long, default_value = "http://127.0.0.1:8080/rerank")]
    pub reranker_url: String,

    /// Request timeout for the HTTP backend.
    #[arg(long, default_value_t = 300)]
    pub reranker_timeout_secs: u64,

    #[arg(long, default_value = "cuda:0")]
    pub device: String,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluationArgs {
    #[arg(long, default_value = "python")]
    pub evaluator_program: String,

    /// Extra evaluator arguments, placed before the script.
    #[arg(long = "evaluator-arg", allow_hyphen_values = true)]
    pub evaluator_args: Vec<String>,

    /// Script handed to the evaluator program before the qrels and ranking paths.
    #[arg(long, default_value = "msmarco/ms_marco_eval.py")]
    pub evaluator_script: Option<String>,

    /// Run the evaluator program as `<program> <qrels> <ranking>`.
    #[arg(long, default_value_t = false, conflicts_with = "evaluator_script")]
    pub no_evaluator_script: bool,

    #[arg(long, default_value = "msmarco_test/data/test_qrels.tsv")]
    pub qrels_path: PathBuf,

    #[arg(long, default_value = "msmarco_test/result/result/log.csv")]
    pub log_path: PathBuf,

    /// Training step; derived from the model name when omitted.
    #[arg(long)]
    pub step: Option<i64>,

    /// Log column to update; derived from the model name when omitted.
    #[arg(long)]
    pub finetuning_type: Option<String>,
}
