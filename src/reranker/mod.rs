mod command;
mod http;

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::cli::{RerankerArgs, RerankerBackend};

pub use command::CommandReranker;
pub use http::HttpReranker;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RerankHit {
    pub index: usize,
    #[serde(default)]
    pub relevance_score: f64,
}

pub trait Reranker {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn rerank(&mut self, query: &str, documents: &[String], top_k: usize)
    -> Result<Vec<RerankHit>>;
}

#[derive(Debug, Clone)]
pub struct RerankerConfig {
    pub backend: RerankerBackend,
    pub program: String,
    pub program_args: Vec<String>,
    pub url: String,
    pub timeout: Duration,
    pub model_name: String,
    pub device: String,
    pub seed: u64,
}

impl RerankerConfig {
    pub fn from_args(args: &RerankerArgs, model_name: &str) -> Self {
        Self {
            backend: args.backend,
            program: args.reranker_program.clone(),
            program_args: args.reranker_args.clone(),
            url: args.reranker_url.clone(),
            timeout: Duration::from_secs(args.reranker_timeout_secs),
            model_name: model_name.to_string(),
            device: args.device.clone(),
            seed: args.seed,
        }
    }
}

pub fn build_reranker(config: &RerankerConfig) -> Result<Box<dyn Reranker>> {
    match config.backend {
        RerankerBackend::Command => Ok(Box::new(CommandReranker::spawn(config)?)),
        RerankerBackend::Http => Ok(Box::new(HttpReranker::new(config)?)),
    }
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    #[serde(default)]
    results: Vec<RerankHit>,
    #[serde(default)]
    error: Option<String>,
}

fn sort_by_relevance(hits: &mut [RerankHit]) {
    hits.sort_by(|left, right| right.relevance_score.total_cmp(&left.relevance_score));
}

#[cfg(test)]
mod tests {
    use super::{RerankHit, sort_by_relevance};

    #[test]
    fn sort_by_relevance_is_descending_and_stable() {
        let mut hits = vec![
            RerankHit {
                index: 0,
                relevance_score: 0.1,
            },
            RerankHit {
                index: 1,
                relevance_score: 0.7,
            },
            RerankHit {
                index: 2,
                relevance_score: 0.7,
            },
        ];

        sort_by_relevance(&mut hits);
        let order = hits.iter().map(|hit| hit.index).collect::<Vec<_>>();
        assert_eq!(order, vec![1, 2, 0]);
    }
}
