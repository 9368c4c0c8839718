use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use trackline_core::Command;
use trackline_provider::SearchProvider;

use crate::engine::Input;

/// Runs at most one search at a time. Scheduling a new query cancels the
/// pending one, whether it is still waiting out the delay or in flight.
pub struct SearchDebouncer {
    delay: Duration,
    provider: Arc<dyn SearchProvider>,
    pending: Option<CancellationToken>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration, provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            delay,
            provider,
            pending: None,
        }
    }

    pub fn schedule(&mut self, batch_id: String, query: String, tx: mpsc::Sender<Input>) {
        self.cancel();
        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        let provider = Arc::clone(&self.provider);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            tracing::debug!(batch_id = %batch_id, query = %query, "running search");
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                result = provider.search(&batch_id, &query) => result,
            };
            let command = match outcome {
                Ok(ids) => Command::SearchResolved { query, ids },
                Err(err) => Command::SearchFailed {
                    query,
                    error: format!("{err:#}"),
                },
            };
            if token.is_cancelled() {
                return;
            }
            let _ = tx.send(Input::Command(command)).await;
        });
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
