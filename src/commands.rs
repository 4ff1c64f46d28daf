pub mod rerank;
mod report;
pub mod score;
