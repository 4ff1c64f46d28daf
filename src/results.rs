use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::model::RankingRow;
use crate::util::ensure_parent_directory;

pub fn write_rankings(path: &Path, rows: &[RankingRow]) -> Result<usize> {
    ensure_parent_directory(path)?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write ranking row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    info!(path = %path.display(), rows = rows.len(), "wrote ranking file");
    Ok(rows.len())
}
