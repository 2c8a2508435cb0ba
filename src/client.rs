use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::DecisionError;
use crate::flows::{self, BestOptionFlow, DecisionResult, OptionsInput, Summary, SummarizeOptionsFlow};
use crate::llm_interaction::LanguageModel;
use crate::options::OptionSet;
use crate::rate_limiter::RateWindow;

/// One user session: the model handle, the session's rate window and its
/// loading flag.
pub struct DecisionClient {
    model: Arc<dyn LanguageModel>,
    window: Mutex<RateWindow>,
    in_flight: AtomicBool,
}

/// Clears the loading flag when the dispatched request finishes, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DecisionClient {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            window: Mutex::new(RateWindow::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn decide(&self, raw_options: &[String]) -> Result<DecisionResult, DecisionError> {
        self.decide_at(chrono::Utc::now().timestamp_millis(), raw_options)
            .await
    }

    /// Gate, validate, record and dispatch a decision request at `now` (ms since epoch).
    ///
    /// The timestamp is recorded once the request is dispatched, so a failed
    /// model call still counts against the window. Rejections before that
    /// point leave the window as it was.
    pub async fn decide_at(
        &self,
        now: i64,
        raw_options: &[String],
    ) -> Result<DecisionResult, DecisionError> {
        let (options, _in_flight) = {
            let mut window = self.window.lock().await;

            if self.in_flight.load(Ordering::Acquire) {
                return Err(DecisionError::Busy);
            }

            let acquire = window.check(now);
            if !acquire.allowed {
                warn!(
                    retry_after_seconds = acquire.retry_after_seconds,
                    recent = acquire.recent.len(),
                    "Decision request rate limited"
                );
                return Err(DecisionError::RateLimited {
                    retry_after_seconds: acquire.retry_after_seconds,
                });
            }

            let options = OptionSet::from_raw(raw_options)?;

            self.in_flight.store(true, Ordering::Release);
            window.record(now);
            (options, InFlight(&self.in_flight))
        };

        info!(options = options.as_slice().len(), "Dispatching decision request");

        let input = OptionsInput::new(options.into_inner());
        flows::run::<BestOptionFlow>(self.model.as_ref(), &input)
            .await
            .map_err(|err| {
                error!(error = %err, "Decision analysis failed");
                DecisionError::from(err)
            })
    }

    /// Summarize a list of options. Not rate limited and no minimum count.
    pub async fn summarize(&self, options: &[String]) -> Result<Summary, DecisionError> {
        info!(options = options.len(), "Dispatching summary request");
        let input = OptionsInput::new(options.to_vec());
        flows::run::<SummarizeOptionsFlow>(self.model.as_ref(), &input)
            .await
            .map_err(|err| {
                error!(error = %err, "Summary failed");
                DecisionError::from(err)
            })
    }

    /// Timestamps currently held in the session's rate window.
    pub async fn history(&self) -> Vec<i64> {
        self.window.lock().await.timestamps().to_vec()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}
