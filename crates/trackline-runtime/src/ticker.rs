use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use trackline_core::Command;

use crate::engine::Input;

/// Wall-clock driver for one playback. Each tick is tagged with the
/// generation it was started for so the session can drop late ones.
pub struct PlaybackTicker {
    generation: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PlaybackTicker {
    pub fn spawn(generation: u64, period: Duration, tx: mpsc::Sender<Input>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let tick = Input::Command(Command::Tick { generation });
                        if tx.send(tick).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::trace!(generation, "ticker stopped");
        });
        Self {
            generation,
            cancel,
            handle,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PlaybackTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_carry_generation_at_each_period() {
        let (tx, mut rx) = mpsc::channel(16);
        let started = Instant::now();
        let ticker = PlaybackTicker::spawn(7, Duration::from_millis(100), tx);

        for expected in 1..=3u64 {
            let input = rx.recv().await.unwrap();
            assert!(matches!(
                input,
                Input::Command(Command::Tick { generation: 7 })
            ));
            assert_eq!(started.elapsed(), Duration::from_millis(100 * expected));
        }
        assert_eq!(ticker.generation(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_stream() {
        let (tx, mut rx) = mpsc::channel(16);
        let ticker = PlaybackTicker::spawn(1, Duration::from_millis(100), tx);
        rx.recv().await.unwrap();

        ticker.stop();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(ticker.is_finished());
        assert!(rx.recv().await.is_none());
    }
}
