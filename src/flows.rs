//! Named prompt flows with schema-checked output.
//!
//! A flow renders its prompt template from a typed input, hands the prompt and
//! the output JSON schema to a [`LanguageModel`], and only returns the reply
//! once it parses into the output type and passes the flow's field checks.

use minijinja::Environment;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::constants::MAX_REASONING_CHARS;
use crate::error::FlowError;
use crate::llm_interaction::{CompletionRequest, LanguageModel};

pub trait Flow {
    /// Flow identity, used in logs and errors.
    const NAME: &'static str;
    /// minijinja template rendered against `Input`.
    const PROMPT: &'static str;

    type Input: Serialize + Sync;
    type Output: DeserializeOwned + Send;

    fn output_schema() -> Value;

    /// Field constraints serde cannot express.
    fn check(_output: &Self::Output) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsInput {
    pub options: Vec<String>,
}

impl OptionsInput {
    pub fn new(options: Vec<String>) -> Self {
        Self { options }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub best_option: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
}

/// Picks the best of at least two options.
pub struct BestOptionFlow;

impl Flow for BestOptionFlow {
    const NAME: &'static str = "analyzeOptionsAndReturnBestFlow";
    const PROMPT: &'static str = "You are a quirky and fun AI assistant who loves making decisions! 🤪 \
Given a list of options, you will choose the best one and explain your reasoning in a fun, \
slightly eccentric way. Keep your reasoning under 240 characters.

Options:
{% for option in options %}- {{ option }}
{% endfor %}";

    type Input = OptionsInput;
    type Output = DecisionResult;

    fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "bestOption": {
                    "type": "string",
                    "description": "The best option chosen by the AI."
                },
                "reasoning": {
                    "type": "string",
                    "maxLength": MAX_REASONING_CHARS,
                    "description": "The AI reasoning behind choosing the best option. Be quirky and use an emoji!"
                }
            },
            "required": ["bestOption", "reasoning"]
        })
    }

    fn check(output: &DecisionResult) -> Result<(), String> {
        // Counted in UTF-16 code units, the way the web page measures it
        let len = output.reasoning.encode_utf16().count();
        if len > MAX_REASONING_CHARS {
            return Err(format!(
                "reasoning is {} UTF-16 units, limit is {}",
                len, MAX_REASONING_CHARS
            ));
        }
        Ok(())
    }
}

/// Produces a short description of a list of options.
pub struct SummarizeOptionsFlow;

impl Flow for SummarizeOptionsFlow {
    const NAME: &'static str = "summarizeOptionsFlow";
    const PROMPT: &'static str = "You are an AI expert in summarizing information.

Given the following list of options, provide a concise summary that captures the essence of each option:

Options:
{% for option in options %}- {{ option }}
{% endfor %}";

    type Input = OptionsInput;
    type Output = Summary;

    fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "A short summary of all the options."
                }
            },
            "required": ["summary"]
        })
    }
}

pub fn render_prompt<F: Flow>(input: &F::Input) -> Result<String, FlowError> {
    // render_str templates are not auto-escaped, options go in verbatim
    Environment::new()
        .render_str(F::PROMPT, input)
        .map_err(|source| FlowError::Prompt { flow: F::NAME, source })
}

/// Parse and validate raw model text against the flow's output contract.
pub fn parse_output<F: Flow>(raw: &str) -> Result<F::Output, FlowError> {
    let output: F::Output = serde_json::from_str(strip_code_fence(raw))
        .map_err(|source| FlowError::MalformedOutput { flow: F::NAME, source })?;
    F::check(&output).map_err(|reason| FlowError::SchemaViolation { flow: F::NAME, reason })?;
    Ok(output)
}

/// Run a flow once. No retries.
pub async fn run<F: Flow>(model: &dyn LanguageModel, input: &F::Input) -> Result<F::Output, FlowError> {
    let prompt = render_prompt::<F>(input)?;
    let schema = F::output_schema();
    let raw = model
        .complete(CompletionRequest {
            flow: F::NAME,
            prompt: &prompt,
            output_schema: &schema,
        })
        .await
        .map_err(FlowError::Model)?;
    debug!(flow = F::NAME, raw = %raw, "Flow received model output");
    parse_output::<F>(&raw)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop the language tag, whatever its case
        let rest = match rest.split_once('\n') {
            Some((tag, body)) if !tag.trim_start().starts_with('{') => body,
            _ => rest,
        };
        if let Some(body) = rest.strip_suffix("```") {
            return body.trim();
        }
    }
    trimmed
}
