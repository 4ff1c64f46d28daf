use anyhow::{Result, bail};
use chrono::Utc;
use tracing::info;

use crate::candidates::load_candidates;
use crate::cli::RerankArgs;
use crate::commands::report::{evaluate_and_log, manifest, run_paths};
use crate::model::RunCounts;
use crate::ranking::{progress_bar, rank_candidates};
use crate::reranker::{RerankerConfig, build_reranker};
use crate::results::write_rankings;
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: RerankArgs) -> Result<()> {
    if args.top_k == 0 {
        bail!("--top-k must be at least 1");
    }

    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("rerank-{}", utc_compact_string(started_ts));

    info!(
        run_id = %run_id,
        model = %args.model_name,
        input = %args.jsonl_file_path.display(),
        output = %args.tsv_file_path.display(),
        "starting rerank evaluation"
    );

    let candidates = load_candidates(&args.jsonl_file_path)?;
    let input_sha256 = match &args.run_manifest_path {
        Some(_) => Some(sha256_file(&args.jsonl_file_path)?),
        None => None,
    };

    let config = RerankerConfig::from_args(&args.reranker, &args.model_name);
    let mut reranker = build_reranker(&config)?;
    let progress = progress_bar(candidates.len());
    let rows = rank_candidates(reranker.as_mut(), &candidates, args.top_k, &progress)?;
    drop(reranker);

    write_rankings(&args.tsv_file_path, &rows)?;

    let outcome = evaluate_and_log(&args.model_name, &args.tsv_file_path, &args.evaluation);

    if let Some(manifest_path) = &args.run_manifest_path {
        let paths = run_paths(
            Some(&args.jsonl_file_path),
            &args.tsv_file_path,
            &args.evaluation,
        );
        let mut run_manifest = manifest(
            "rerank",
            run_id,
            started_at,
            &args.model_name,
            paths,
            &outcome,
        );
        run_manifest.device = Some(args.reranker.device.clone());
        run_manifest.reranker_backend = Some(args.reranker.backend.as_str().to_string());
        run_manifest.seed = Some(args.reranker.seed);
        run_manifest.top_k = Some(args.top_k);
        run_manifest.counts = Some(RunCounts {
            candidates: candidates.len(),
            passages: candidates
                .iter()
                .map(|candidate| candidate.passage.len())
                .sum(),
            ranking_rows: rows.len(),
        });
        run_manifest.input_sha256 = input_sha256;
        write_json_pretty(manifest_path, &run_manifest)?;
        info!(path = %manifest_path.display(), "wrote run manifest");
    }

    info!(status = outcome.status(), rows = rows.len(), "rerank evaluation finished");
    Ok(())
}
