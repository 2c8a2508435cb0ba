// Defaults loaded from the environment, plus the fixed rate limit.

use std::env;

/// Maximum number of decision requests per trailing window.
pub const RATE_LIMIT_MAX_REQUESTS: usize = 5;

/// Length of the trailing rate window in milliseconds (6 minutes).
pub const RATE_LIMIT_WINDOW_MS: i64 = 6 * 60 * 1000;

/// Longest reasoning string the best-option flow accepts, in UTF-16 code units.
pub const MAX_REASONING_CHARS: usize = 240;

/// Minimum number of usable options for a decision request.
pub const MIN_OPTIONS: usize = 2;

// Use lazy_static to initialize static variables safely.
lazy_static::lazy_static! {
    pub static ref OLLAMA_URL: String = env::var("OLLAMA_URL").unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());
    pub static ref DECISION_MODEL: String = env::var("DECISIONWISE_MODEL").unwrap_or_else(|_| "gemma3:12b".to_string());
    pub static ref STATIC_DIR: String = env::var("DECISIONWISE_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
}
