pub mod chat;
pub mod client;
pub mod constants;
pub mod countdown;
pub mod error;
pub mod flows;
pub mod llm_interaction;
pub mod options;
pub mod rate_limiter;
pub mod web_server;

pub use client::DecisionClient;
pub use error::{DecisionError, FlowError};
pub use flows::{BestOptionFlow, DecisionResult, Flow, OptionsInput, Summary, SummarizeOptionsFlow};
pub use llm_interaction::{CompletionRequest, LanguageModel, OllamaModel};
pub use options::OptionSet;
pub use rate_limiter::{try_acquire, Acquire, RateWindow};
