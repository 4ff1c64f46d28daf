use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::model::Candidate;

pub fn load_candidates(path: &Path) -> Result<Vec<Candidate>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut candidates = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| {
            format!("failed to read line {line_number} of {}", path.display())
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let candidate: Candidate = serde_json::from_str(&line).with_context(|| {
            format!("failed to parse line {line_number} of {}", path.display())
        })?;

        if candidate.pid.len() != candidate.passage.len() {
            bail!(
                "line {line_number} of {}: qid {} has {} pids but {} passages",
                path.display(),
                candidate.qid,
                candidate.pid.len(),
                candidate.passage.len()
            );
        }

        candidates.push(candidate);
    }

    let passages = candidates
        .iter()
        .map(|candidate| candidate.passage.len())
        .sum::<usize>();
    info!(
        path = %path.display(),
        candidates = candidates.len(),
        passages,
        "loaded candidates"
    );

    Ok(candidates)
}
