use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelIdError {
    #[error("cannot derive step from model name {model_name:?}: {segment:?} is not an integer")]
    InvalidStep { model_name: String, segment: String },
    #[error("cannot derive finetuning type from model name {model_name:?}: no parent path segment")]
    MissingFinetuningType { model_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub step: i64,
    pub finetuning_type: String,
}

pub fn resolve_log_target(
    model_name: &str,
    step: Option<i64>,
    finetuning_type: Option<&str>,
) -> Result<LogTarget, ModelIdError> {
    let step = match step {
        Some(step) => step,
        None => derive_step(model_name)?,
    };
    let finetuning_type = match finetuning_type {
        Some(value) => value.to_string(),
        None => derive_finetuning_type(model_name)?.to_string(),
    };

    Ok(LogTarget {
        step,
        finetuning_type,
    })
}

pub fn derive_step(model_name: &str) -> Result<i64, ModelIdError> {
    let last_segment = model_name.rsplit('/').next().unwrap_or(model_name);
    let token = last_segment.rsplit('-').next().unwrap_or(last_segment);

    token
        .trim()
        .parse::<i64>()
        .map_err(|_| ModelIdError::InvalidStep {
            model_name: model_name.to_string(),
            segment: token.to_string(),
        })
}

pub fn derive_finetuning_type(model_name: &str) -> Result<&str, ModelIdError> {
    let mut segments = model_name.rsplit('/');
    segments.next();
    segments
        .next()
        .ok_or_else(|| ModelIdError::MissingFinetuningType {
            model_name: model_name.to_string(),
        })
}
