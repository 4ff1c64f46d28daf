use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{debug, info};

use super::{RerankHit, RerankResponse, Reranker, RerankerConfig, sort_by_relevance};

/// Reranker backed by a long-lived child process.
///
/// The child is started as
/// `<program> [args..] --model-name <model> --device <device> --seed <seed>`
/// and receives one JSON request per line on stdin:
/// `{"query": "...", "documents": ["..."], "top_k": 100}`.
/// It answers each request with one JSON line on stdout:
/// `{"results": [{"index": 2, "relevance_score": 0.93}, ...]}` or
/// `{"error": "..."}`. Its stderr is passed through.
pub struct CommandReranker {
    program: String,
    model: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
    top_k: usize,
}

impl CommandReranker {
    pub fn spawn(config: &RerankerConfig) -> Result<Self> {
        let mut child = Command::new(&config.program)
            .args(&config.program_args)
            .arg("--model-name")
            .arg(&config.model_name)
            .arg("--device")
            .arg(&config.device)
            .arg("--seed")
            .arg(config.seed.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to execute reranker program {}", config.program))?;

        let stdin = child.stdin.take().context("reranker stdin was not captured")?;
        let stdout = child
            .stdout
            .take()
            .context("reranker stdout was not captured")?;

        info!(
            program = %config.program,
            model = %config.model_name,
            device = %config.device,
            seed = config.seed,
            pid = child.id(),
            "started reranker process"
        );

        Ok(Self {
            program: config.program.clone(),
            model: config.model_name.clone(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        })
    }
}

impl Reranker for CommandReranker {
    fn name(&self) -> &str {
        &self.program
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
        let request = RerankRequest {
            query,
            documents,
            top_k,
        };
        let mut line =
            serde_json::to_string(&request).context("failed to serialize rerank request")?;
        line.push('\n');

        let stdin = self
            .stdin
            .as_mut()
            .context("reranker stdin is already closed")?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|()| stdin.flush())
            .with_context(|| format!("failed to send rerank request to {}", self.program))?;

        let mut response_line = String::new();
        let read = self
            .stdout
            .read_line(&mut response_line)
            .with_context(|| format!("failed to read rerank response from {}", self.program))?;
        if read == 0 {
            let status = self
                .child
                .try_wait()
                .ok()
                .flatten()
                .map(|status| status.to_string())
                .unwrap_or_else(|| "still running".to_string());
            bail!(
                "reranker {} closed its output before answering ({status})",
                self.program
            );
        }

        let response: RerankResponse = serde_json::from_str(response_line.trim())
            .with_context(|| format!("failed to parse rerank response from {}", self.program))?;
        if let Some(error) = response.error {
            bail!("reranker {} reported an error: {error}", self.program);
        }

        let mut hits = response.results;
        sort_by_relevance(&mut hits);
        hits.truncate(top_k);
        debug!(documents = documents.len(), hits = hits.len(), "reranked query");

        Ok(hits)
    }
}

impl Drop for CommandReranker {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}
