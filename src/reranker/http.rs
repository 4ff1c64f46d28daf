use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use tracing::{debug, info};

use super::{RerankHit, RerankResponse, Reranker, RerankerConfig, sort_by_relevance};

/// Reranker served over HTTP.
///
/// Posts `{"model", "query", "documents", "top_n"}` and expects the common
/// `{"results": [{"index", "relevance_score"}]}` response shape. Device
/// placement is the server's concern.
pub struct HttpReranker {
    client: Client,
    url: String,
    model: String,
}

impl HttpReranker {
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client for reranker")?;

        info!(
            url = %config.url,
            model = %config.model_name,
            device = %config.device,
            "using HTTP reranker; device placement is left to the server"
        );

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model_name.clone(),
        })
    }
}

impl Reranker for HttpReranker {
    fn name(&self) -> &str {
        &self.url
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn rerank(
        &mut self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<RerankHit>> {
        let payload = serde_json::json!({
            "model": self.model,
            "query": query,
            "documents": documents,
            "top_n": top_k,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .with_context(|| format!("rerank request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!(
                "rerank endpoint {} returned {status}: {}",
                self.url,
                body.trim()
            );
        }

        let parsed: RerankResponse = response
            .json()
            .with_context(|| format!("failed to parse rerank response from {}", self.url))?;
        if let Some(error) = parsed.error {
            bail!("rerank endpoint {} reported an error: {error}", self.url);
        }

        let mut hits = parsed.results;
        sort_by_relevance(&mut hits);
        hits.truncate(top_k);
        debug!(documents = documents.len(), hits = hits.len(), "reranked query");

        Ok(hits)
    }
}
