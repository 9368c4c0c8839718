use anyhow::{bail, Result};
use tokio::sync::mpsc;
use trackline_bus::{EventBus, Topic};
use trackline_provider::timecode::format_epoch_ms;
use trackline_runtime::{Engine, EngineHandle};
use trackline_schema::{BusMessage, NoticeLevel, Region, Snapshot};

use super::BatchArgs;
use crate::config::AppConfig;

pub struct ReplayOptions {
    pub speed: Option<f64>,
    pub max_ticks: Option<usize>,
}

/// How a replay ended.
#[derive(Debug, Default)]
pub struct ReplayOutcome {
    pub reached_end: bool,
    pub last_snapshot: Option<Snapshot>,
}

/// Plays one batch through the async engine, printing every snapshot.
pub async fn run(
    config: &AppConfig,
    args: &BatchArgs,
    options: ReplayOptions,
) -> Result<ReplayOutcome> {
    let region = args.region()?;
    let (loader, search) = args.collaborators(&config.provider);
    let bus = EventBus::new(config.engine.bus_capacity);
    let rx = Receivers {
        snapshots: bus.subscribe(Topic::SnapshotReady).await,
        stopped: bus.subscribe(Topic::PlaybackStopped).await,
        notices: bus.subscribe(Topic::NoticeRaised).await,
        settled: bus.subscribe(Topic::SearchSettled).await,
    };

    let (engine, handle) = Engine::new(config.engine.clone(), loader, search, &bus)?;
    let engine_task = tokio::spawn(engine.run());

    let filter = args.status_filter(&config.provider);
    let result = drive(&handle, args, &filter, region, options, rx).await;

    handle.shutdown().await.ok();
    let _ = engine_task.await;
    result
}

struct Receivers {
    snapshots: mpsc::Receiver<BusMessage>,
    stopped: mpsc::Receiver<BusMessage>,
    notices: mpsc::Receiver<BusMessage>,
    settled: mpsc::Receiver<BusMessage>,
}

async fn drive(
    handle: &EngineHandle,
    args: &BatchArgs,
    filter: &str,
    region: Option<Region>,
    options: ReplayOptions,
    mut rx: Receivers,
) -> Result<ReplayOutcome> {
    handle.load(args.batch.as_str(), filter).await?;
    let loaded = handle.snapshot().await?;
    drain_notices(&mut rx.notices);
    if loaded.batch_id.as_deref() != Some(args.batch.as_str()) {
        bail!("batch {} could not be loaded", args.batch);
    }
    println!(
        "Loaded batch {}: {} events, {} .. {}",
        args.batch,
        loaded.display_count,
        format_epoch_ms(loaded.start_ms),
        format_epoch_ms(loaded.end_ms)
    );

    if let Some(query) = &args.query {
        handle.set_query(query.clone()).await?;
        // A blank query only clears the text filter; no search settles.
        if !query.trim().is_empty() {
            wait_for_search(&mut rx.settled, query).await;
        }
        drain_notices(&mut rx.notices);
    }
    if region.is_some() {
        handle.set_region(region).await?;
    }
    if let Some(speed) = options.speed {
        handle.set_speed(speed).await?;
    }

    // Only snapshots published after play count as ticks.
    while rx.snapshots.try_recv().is_ok() {}
    handle.play().await?;

    let mut outcome = ReplayOutcome::default();
    let mut playing_snapshots = 0usize;
    loop {
        tokio::select! {
            biased;
            Some(msg) = rx.snapshots.recv() => {
                let BusMessage::SnapshotReady { snapshot } = msg else {
                    continue;
                };
                print_snapshot(&snapshot);
                if snapshot.is_playing {
                    playing_snapshots += 1;
                }
                outcome.last_snapshot = Some(snapshot);
                // The first playing snapshot comes from the play command itself.
                if let Some(max) = options.max_ticks {
                    if playing_snapshots > max {
                        handle.pause().await?;
                        println!("Stopped after {max} ticks.");
                        break;
                    }
                }
            }
            Some(msg) = rx.stopped.recv() => {
                if let BusMessage::PlaybackStopped { rolled_over: true, .. } = msg {
                    // The rewound snapshot is published right after this message.
                    handle.snapshot().await?;
                    while let Ok(BusMessage::SnapshotReady { snapshot }) = rx.snapshots.try_recv() {
                        print_snapshot(&snapshot);
                        outcome.last_snapshot = Some(snapshot);
                    }
                    println!("Reached the end of the batch.");
                    outcome.reached_end = true;
                    break;
                }
            }
            Some(msg) = rx.notices.recv() => print_notice(&msg),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, stopping replay");
                break;
            }
        }
    }
    Ok(outcome)
}

async fn wait_for_search(settled: &mut mpsc::Receiver<BusMessage>, query: &str) {
    while let Some(msg) = settled.recv().await {
        if let BusMessage::SearchSettled {
            query: settled_query,
            matches,
        } = msg
        {
            if settled_query == query {
                match matches {
                    Some(n) => println!("Search {query:?}: {n} matching ids"),
                    None => println!("Search {query:?} failed, showing all events"),
                }
                return;
            }
        }
    }
}

fn drain_notices(notices: &mut mpsc::Receiver<BusMessage>) {
    while let Ok(msg) = notices.try_recv() {
        print_notice(&msg);
    }
}

fn print_notice(msg: &BusMessage) {
    if let BusMessage::NoticeRaised { notice } = msg {
        let level = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{level}] {}", notice.message);
    }
}

fn print_snapshot(snapshot: &Snapshot) {
    let selected = snapshot
        .selected_id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let labels: Vec<&str> = snapshot.events.iter().map(|e| e.label.as_str()).collect();
    println!(
        "{} +{:>6.1}s {}x selected={} visible={}/{} {}",
        format_epoch_ms(snapshot.current_time_ms),
        (snapshot.current_time_ms - snapshot.start_ms) as f64 / 1_000.0,
        snapshot.speed,
        selected,
        snapshot.events.len(),
        snapshot.display_count,
        labels.join(", ")
    );
}
