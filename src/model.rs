use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(deserialize_with = "deserialize_qid")]
    pub qid: i64,
    pub query: String,
    #[serde(deserialize_with = "deserialize_pids")]
    pub pid: Vec<String>,
    pub passage: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingRow {
    pub qid: i64,
    pub pid: String,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub command: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub model_name: String,
    pub device: Option<String>,
    pub reranker_backend: Option<String>,
    pub seed: Option<u64>,
    pub top_k: Option<usize>,
    pub paths: RunPaths,
    pub counts: Option<RunCounts>,
    pub input_sha256: Option<String>,
    pub log_step: Option<i64>,
    pub finetuning_type: Option<String>,
    pub metric: Option<f64>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunPaths {
    pub jsonl_file_path: Option<String>,
    pub tsv_file_path: String,
    pub qrels_path: String,
    pub log_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounts {
    pub candidates: usize,
    pub passages: usize,
    pub ranking_rows: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

fn integral(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.fract() == 0.0 && in_range).then_some(value as i64)
}

fn deserialize_qid<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IdValue::deserialize(deserializer)? {
        IdValue::Integer(value) => Ok(value),
        IdValue::Float(value) => integral(value).ok_or_else(|| {
            serde::de::Error::custom(format!("qid is not an integer: {value}"))
        }),
        IdValue::Text(text) => text.trim().parse::<i64>().map_err(|_| {
            serde::de::Error::custom(format!("qid is not an integer: {text:?}"))
        }),
    }
}

fn deserialize_pids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<IdValue>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| match value {
            IdValue::Integer(value) => value.to_string(),
            IdValue::Float(value) => integral(value)
                .map(|value| value.to_string())
                .unwrap_or_else(|| value.to_string()),
            IdValue::Text(text) => text,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::Candidate;

    #[test]
    fn candidate_accepts_string_and_integer_ids() {
        let raw = r#"{"qid": "5", "query": "q", "pid": ["a", 7], "passage": ["d1", "d2"]}"#;
        let candidate: Candidate = serde_json::from_str(raw).expect("candidate should parse");
        assert_eq!(candidate.qid, 5);
        assert_eq!(candidate.pid, vec!["a".to_string(), "7".to_string()]);

        let raw = r#"{"qid": 12, "query": "q", "pid": [], "passage": []}"#;
        let candidate: Candidate = serde_json::from_str(raw).expect("candidate should parse");
        assert_eq!(candidate.qid, 12);
    }

    #[test]
    fn integral_float_ids_are_accepted() {
        let raw = r#"{"qid": 5.0, "query": "q", "pid": [7.0, "b"], "passage": ["d1", "d2"]}"#;
        let candidate: Candidate = serde_json::from_str(raw).expect("candidate should parse");
        assert_eq!(candidate.qid, 5);
        assert_eq!(candidate.pid, vec!["7".to_string(), "b".to_string()]);
    }

    #[test]
    fn fractional_float_qid_is_rejected() {
        let raw = r#"{"qid": 5.5, "query": "q", "pid": [], "passage": []}"#;
        let err = serde_json::from_str::<Candidate>(raw).expect_err("qid must be integral");
        assert!(err.to_string().contains("qid is not an integer"));
    }

    #[test]
    fn candidate_rejects_non_integer_qid() {
        let raw = r#"{"qid": "q-5", "query": "q", "pid": [], "passage": []}"#;
        let err = serde_json::from_str::<Candidate>(raw).expect_err("qid must be an integer");
        assert!(err.to_string().contains("qid is not an integer"));
    }
}
