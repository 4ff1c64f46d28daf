use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::model::{Candidate, RankingRow};
use crate::reranker::Reranker;

pub fn rank_candidates(
    reranker: &mut dyn Reranker,
    candidates: &[Candidate],
    top_k: usize,
    progress: &ProgressBar,
) -> Result<Vec<RankingRow>> {
    info!(
        reranker = %reranker.name(),
        model = %reranker.model(),
        candidates = candidates.len(),
        top_k,
        "reranking candidates"
    );

    let mut rows = Vec::new();
    for candidate in candidates {
        let depth = top_k.min(candidate.passage.len());
        if depth > 0 {
            let hits = reranker.rerank(&candidate.query, &candidate.passage, depth)?;

            for (position, hit) in hits.iter().take(depth).enumerate() {
                let Some(pid) = candidate.pid.get(hit.index) else {
                    bail!(
                        "reranker returned index {} for qid {} which has {} passages",
                        hit.index,
                        candidate.qid,
                        candidate.pid.len()
                    );
                };
                rows.push(RankingRow {
                    qid: candidate.qid,
                    pid: pid.clone(),
                    rank: position + 1,
                });
            }
        }
        progress.inc(1);
    }
    progress.finish();

    info!(rows = rows.len(), "reranking complete");
    Ok(rows)
}

pub fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40}] {pos}/{len} ({eta})")
    {
        bar.set_style(style);
    }
    bar.set_message("Reranking");
    bar
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use indicatif::ProgressBar;

    use super::rank_candidates;
    use crate::model::{Candidate, RankingRow};
    use crate::reranker::{RerankHit, Reranker};

    struct StubReranker {
        indices: Option<Vec<usize>>,
        requested: Vec<usize>,
    }

    impl StubReranker {
        fn reverse() -> Self {
            Self {
                indices: None,
                requested: Vec::new(),
            }
        }

        fn fixed(indices: Vec<usize>) -> Self {
            Self {
                indices: Some(indices),
                requested: Vec::new(),
            }
        }
    }

    impl Reranker for StubReranker {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        fn rerank(
            &mut self,
            _query: &str,
            documents: &[String],
            top_k: usize,
        ) -> Result<Vec<RerankHit>> {
            self.requested.push(top_k);
            let indices = match &self.indices {
                Some(indices) => indices.clone(),
                None => (0..documents.len()).rev().take(top_k).collect(),
            };
            Ok(indices
                .into_iter()
                .map(|index| RerankHit {
                    index,
                    relevance_score: 0.0,
                })
                .collect())
        }
    }

    fn candidate(qid: i64, count: usize) -> Candidate {
        Candidate {
            qid,
            query: format!("query {qid}"),
            pid: (0..count).map(|index| format!("p{qid}-{index}")).collect(),
            passage: (0..count).map(|index| format!("passage {index}")).collect(),
        }
    }

    #[test]
    fn maps_hit_indices_back_to_pids_with_one_based_ranks() {
        let candidates = vec![Candidate {
            qid: 5,
            query: "q".to_string(),
            pid: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            passage: vec!["d1".to_string(), "d2".to_string(), "d3".to_string()],
        }];
        let mut reranker = StubReranker::fixed(vec![2, 0]);

        let rows = rank_candidates(&mut reranker, &candidates, 100, &ProgressBar::hidden())
            .expect("rank");
        assert_eq!(
            rows,
            vec![
                RankingRow {
                    qid: 5,
                    pid: "c".to_string(),
                    rank: 1,
                },
                RankingRow {
                    qid: 5,
                    pid: "a".to_string(),
                    rank: 2,
                },
            ]
        );
    }

    #[test]
    fn row_count_is_sum_of_clamped_depths_in_input_order() {
        let candidates = vec![candidate(1, 3), candidate(2, 150), candidate(3, 0)];
        let mut reranker = StubReranker::reverse();

        let rows = rank_candidates(&mut reranker, &candidates, 100, &ProgressBar::hidden())
            .expect("rank");
        assert_eq!(rows.len(), 3 + 100);
        assert_eq!(reranker.requested, vec![3, 100]);

        let first_qid_two = rows.iter().position(|row| row.qid == 2).expect("qid 2");
        assert!(rows[..first_qid_two].iter().all(|row| row.qid == 1));
        for (offset, row) in rows[first_qid_two..].iter().enumerate() {
            assert_eq!(row.rank, offset + 1);
        }
        assert_eq!(rows[0].pid, "p1-2");
    }

    #[test]
    fn surplus_hits_are_truncated_to_depth() {
        let candidates = vec![candidate(9, 4)];
        let mut reranker = StubReranker::fixed(vec![3, 2, 1, 0]);

        let rows = rank_candidates(&mut reranker, &candidates, 2, &ProgressBar::hidden())
            .expect("rank");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].pid, "p9-2");
    }

    #[test]
    fn out_of_range_index_is_fatal() {
        let candidates = vec![candidate(4, 2)];
        let mut reranker = StubReranker::fixed(vec![0, 5]);

        let err = rank_candidates(&mut reranker, &candidates, 100, &ProgressBar::hidden())
            .expect_err("index 5 does not exist");
        assert!(err.to_string().contains("index 5"));
    }
}
