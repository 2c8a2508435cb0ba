use thiserror::Error;

/// Failure of a flow invocation. Callers only ever see this wrapped as
/// [`DecisionError::AnalysisFailed`].
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("failed to render prompt for {flow}: {source}")]
    Prompt {
        flow: &'static str,
        #[source]
        source: minijinja::Error,
    },
    #[error("model call failed: {0:#}")]
    Model(#[source] anyhow::Error),
    #[error("model output is not valid JSON for {flow}: {source}")]
    MalformedOutput {
        flow: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("model output violates {flow} schema: {reason}")]
    SchemaViolation { flow: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("Please provide at least two options to choose from.")]
    NotEnoughOptions,
    #[error("Too many requests. Please wait {retry_after_seconds} seconds before trying again.")]
    RateLimited { retry_after_seconds: u64 },
    #[error("A decision is already being made. Please wait for it to finish.")]
    Busy,
    #[error("Something went wrong. Please try again later.")]
    AnalysisFailed(#[source] FlowError),
}

impl DecisionError {
    /// Short heading shown above the message.
    pub fn title(&self) -> &'static str {
        match self {
            DecisionError::NotEnoughOptions => "Not enough options",
            DecisionError::RateLimited { .. } => "Slow down",
            DecisionError::Busy => "Still thinking",
            DecisionError::AnalysisFailed(_) => "An error occurred",
        }
    }

    /// Stable machine-readable kind, used by the JSON API.
    pub fn kind(&self) -> &'static str {
        match self {
            DecisionError::NotEnoughOptions => "validation",
            DecisionError::RateLimited { .. } => "rate_limited",
            DecisionError::Busy => "busy",
            DecisionError::AnalysisFailed(_) => "analysis_failed",
        }
    }

    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            DecisionError::RateLimited { retry_after_seconds } => Some(*retry_after_seconds),
            _ => None,
        }
    }
}

impl From<FlowError> for DecisionError {
    fn from(err: FlowError) -> Self {
        DecisionError::AnalysisFailed(err)
    }
}
