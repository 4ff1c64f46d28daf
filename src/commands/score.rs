use anyhow::{Result, bail};
use chrono::Utc;
use tracing::info;

use crate::cli::ScoreArgs;
use crate::commands::report::{evaluate_and_log, manifest, run_paths};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

pub fn run(args: ScoreArgs) -> Result<()> {
    if !args.tsv_file_path.is_file() {
        bail!("ranking file not found: {}", args.tsv_file_path.display());
    }

    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("score-{}", utc_compact_string(started_ts));

    info!(
        run_id = %run_id,
        model = %args.model_name,
        ranking = %args.tsv_file_path.display(),
        "scoring existing ranking file"
    );

    let outcome = evaluate_and_log(&args.model_name, &args.tsv_file_path, &args.evaluation);

    if let Some(manifest_path) = &args.run_manifest_path {
        let paths = run_paths(None, &args.tsv_file_path, &args.evaluation);
        let run_manifest = manifest(
            "score",
            run_id,
            started_at,
            &args.model_name,
            paths,
            &outcome,
        );
        write_json_pretty(manifest_path, &run_manifest)?;
        info!(path = %manifest_path.display(), "wrote run manifest");
    }

    info!(status = outcome.status(), "scoring finished");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use super::run;
    use crate::cli::{EvaluationArgs, ScoreArgs};

    fn score_args(
        dir: &std::path::Path,
        step: Option<i64>,
        finetuning_type: Option<&str>,
    ) -> ScoreArgs {
        ScoreArgs {
            model_name: "BAAI/bge-reranker-base".to_string(),
            tsv_file_path: dir.join("run.tsv"),
            evaluation: EvaluationArgs {
                evaluator_program: "sh".to_string(),
                evaluator_args: vec![
                    "-c".to_string(),
                    "printf '#\\nMRR @10: 0.5\\n'".to_string(),
                    "eval".to_string(),
                ],
                evaluator_script: None,
                no_evaluator_script: false,
                qrels_path: PathBuf::from("qrels.tsv"),
                log_path: dir.join("log.csv"),
                step,
                finetuning_type: finetuning_type.map(ToOwned::to_owned),
            },
            run_manifest_path: None,
        }
    }

    #[test]
    fn explicit_step_and_type_bypass_model_name_parsing() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("run.tsv"), "1\tp\t1\n").expect("tsv");
        std::fs::write(dir.path().join("log.csv"), "step,base\n0,\n").expect("log");

        run(score_args(dir.path(), Some(0), Some("base"))).expect("score");

        assert_eq!(
            std::fs::read_to_string(dir.path().join("log.csv")).expect("log"),
            "step,base\n0,0.5\n"
        );
    }

    #[test]
    fn underivable_target_is_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("run.tsv"), "1\tp\t1\n").expect("tsv");
        std::fs::write(dir.path().join("log.csv"), "step,base\n0,\n").expect("log");

        run(score_args(dir.path(), None, None)).expect("guarded failure");

        assert_eq!(
            std::fs::read_to_string(dir.path().join("log.csv")).expect("log"),
            "step,base\n0,\n"
        );
    }

    #[test]
    fn missing_ranking_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(run(score_args(dir.path(), Some(0), Some("base"))).is_err());
    }
}
