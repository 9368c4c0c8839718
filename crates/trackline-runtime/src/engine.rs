//! The async driver around [`TimelineSession`].
//!
//! Every input (user commands, ticks, search results, loads) is funnelled
//! through one queue and applied in arrival order. The engine executes the
//! effects each transition reports and publishes the results on the bus.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use trackline_bus::{BusPublisher, EventBus};
use trackline_core::{Command, Effect, EngineConfig, EngineError, TimelineSession, Transition};
use trackline_provider::{BatchLoader, SearchProvider};
use trackline_schema::{BusMessage, EventId, Notice, Region, Snapshot};

use crate::debounce::SearchDebouncer;
use crate::ticker::PlaybackTicker;

const INPUT_QUEUE: usize = 256;

pub enum Input {
    Command(Command),
    Load {
        batch_id: String,
        status_filter: String,
    },
    Snapshot(oneshot::Sender<Snapshot>),
    Shutdown,
}

pub struct Engine {
    session: TimelineSession,
    loader: Arc<dyn BatchLoader>,
    bus: BusPublisher,
    rx: mpsc::Receiver<Input>,
    tx: mpsc::WeakSender<Input>,
    ticker: Option<PlaybackTicker>,
    debouncer: SearchDebouncer,
    tick_period: Duration,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        loader: Arc<dyn BatchLoader>,
        search: Arc<dyn SearchProvider>,
        bus: &EventBus,
    ) -> Result<(Self, EngineHandle)> {
        config.validate()?;
        let tick_period = Duration::from_millis(config.tick_interval_ms);
        let debounce = Duration::from_millis(config.search_debounce_ms);
        let session = TimelineSession::new(config)?;

        let (tx, rx) = mpsc::channel(INPUT_QUEUE);
        let engine = Self {
            session,
            loader,
            bus: bus.publisher(),
            rx,
            tx: tx.downgrade(),
            ticker: None,
            debouncer: SearchDebouncer::new(debounce, search),
            tick_period,
        };
        Ok((engine, EngineHandle { tx }))
    }

    /// Runs until [`EngineHandle::shutdown`] or until every handle is dropped.
    pub async fn run(mut self) {
        info!("timeline engine started");
        while let Some(input) = self.rx.recv().await {
            match input {
                Input::Command(command) => self.apply(command).await,
                Input::Load {
                    batch_id,
                    status_filter,
                } => self.load(batch_id, status_filter).await,
                Input::Snapshot(reply) => {
                    let _ = reply.send(self.session.snapshot());
                }
                Input::Shutdown => break,
            }
        }
        self.stop_ticker();
        self.debouncer.cancel();
        info!("timeline engine stopped");
    }

    async fn load(&mut self, batch_id: String, status_filter: String) {
        info!(batch_id = %batch_id, filter = %status_filter, "loading batch");
        match self.loader.load(&batch_id, &status_filter).await {
            Ok(events) => self.apply(Command::Load { batch_id, events }).await,
            Err(err) => {
                error!(batch_id = %batch_id, error = %format!("{err:#}"), "batch load failed");
                self.notify(Notice::error(format!(
                    "Failed to load batch {batch_id}: {err:#}"
                )))
                .await;
            }
        }
    }

    async fn apply(&mut self, command: Command) {
        match self.session.dispatch(command) {
            Ok(transition) => self.execute(transition).await,
            Err(err) => {
                warn!(error = %err, "command rejected");
                self.notify(notice_for(&err)).await;
            }
        }
    }

    async fn execute(&mut self, transition: Transition) {
        for effect in transition.effects {
            match effect {
                Effect::StartTicker { generation } => self.start_ticker(generation),
                Effect::StopTicker => self.stop_ticker(),
                Effect::ScheduleSearch { batch_id, query } => match self.tx.upgrade() {
                    Some(tx) => self.debouncer.schedule(batch_id, query, tx),
                    None => debug!("engine shutting down, search not scheduled"),
                },
                Effect::CancelSearch => self.debouncer.cancel(),
                Effect::Notify(notice) => self.notify(notice).await,
                Effect::PlaybackStopped { rolled_over } => {
                    self.publish(BusMessage::PlaybackStopped {
                        batch_id: self.session.batch_id().map(str::to_string),
                        rolled_over,
                    })
                    .await
                }
                Effect::SearchSettled { query, matches } => {
                    self.publish(BusMessage::SearchSettled { query, matches })
                        .await
                }
            }
        }
        if transition.changed {
            self.publish(BusMessage::SnapshotReady {
                snapshot: self.session.snapshot(),
            })
            .await;
        }
    }

    fn start_ticker(&mut self, generation: u64) {
        self.stop_ticker();
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        debug!(generation, period_ms = self.tick_period.as_millis() as u64, "starting ticker");
        self.ticker = Some(PlaybackTicker::spawn(generation, self.tick_period, tx));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    async fn notify(&self, notice: Notice) {
        self.publish(BusMessage::NoticeRaised { notice }).await;
    }

    async fn publish(&self, msg: BusMessage) {
        if let Err(err) = self.bus.publish(msg).await {
            warn!(error = %err, "bus publish failed");
        }
    }
}

fn notice_for(err: &EngineError) -> Notice {
    match err {
        EngineError::EmptyResult { batch_id } => {
            Notice::warning(format!("No events found for batch {batch_id}"))
        }
        other => Notice::warning(other.to_string()),
    }
}

/// Cloneable front door to a running [`Engine`].
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Input>,
}

impl EngineHandle {
    async fn send(&self, input: Input) -> Result<()> {
        self.tx
            .send(input)
            .await
            .map_err(|_| anyhow!("timeline engine is not running"))
    }

    async fn command(&self, command: Command) -> Result<()> {
        self.send(Input::Command(command)).await
    }

    pub async fn load(
        &self,
        batch_id: impl Into<String>,
        status_filter: impl Into<String>,
    ) -> Result<()> {
        self.send(Input::Load {
            batch_id: batch_id.into(),
            status_filter: status_filter.into(),
        })
        .await
    }

    pub async fn seek(&self, time_ms: i64) -> Result<()> {
        self.command(Command::Seek(time_ms)).await
    }

    pub async fn play(&self) -> Result<()> {
        self.command(Command::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.command(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.command(Command::Reset).await
    }

    pub async fn set_speed(&self, speed: f64) -> Result<()> {
        self.command(Command::SetSpeed(speed)).await
    }

    pub async fn cycle_speed(&self) -> Result<()> {
        self.command(Command::CycleSpeed).await
    }

    pub async fn click(&self, id: impl Into<EventId>) -> Result<()> {
        self.command(Command::Click(id.into())).await
    }

    pub async fn set_query(&self, query: impl Into<String>) -> Result<()> {
        self.command(Command::SetQuery(query.into())).await
    }

    pub async fn set_region(&self, region: Option<Region>) -> Result<()> {
        self.command(Command::SetRegion(region)).await
    }

    /// State after every input queued before this call has been applied.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::Snapshot(reply)).await?;
        rx.await
            .map_err(|_| anyhow!("timeline engine stopped before answering"))
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Input::Shutdown).await
    }
}
