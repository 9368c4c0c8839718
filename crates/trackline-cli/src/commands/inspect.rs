use anyhow::{Context, Result};
use trackline_core::{Command, Effect, TimelineSession};
use trackline_provider::timecode::format_epoch_ms;

use super::{print_event, BatchArgs};
use crate::config::AppConfig;

/// Loads one batch, applies the requested filters and prints the display set.
pub async fn run(config: &AppConfig, args: &BatchArgs, json: bool) -> Result<()> {
    let region = args.region()?;
    let (loader, search) = args.collaborators(&config.provider);
    let filter = args.status_filter(&config.provider);

    let events = loader
        .load(&args.batch, &filter)
        .await
        .with_context(|| format!("loading batch {}", args.batch))?;
    let mut session = TimelineSession::new(config.engine.clone())?;
    session.dispatch(Command::Load {
        batch_id: args.batch.clone(),
        events,
    })?;

    if let Some(query) = &args.query {
        let transition = session.dispatch(Command::SetQuery(query.clone()))?;
        let scheduled = transition
            .effects
            .iter()
            .any(|effect| matches!(effect, Effect::ScheduleSearch { .. }));
        if scheduled {
            let ids = search
                .search(&args.batch, query)
                .await
                .with_context(|| format!("searching for {query:?}"))?;
            session.dispatch(Command::SearchResolved {
                query: query.clone(),
                ids,
            })?;
        }
    }
    if region.is_some() {
        session.dispatch(Command::SetRegion(region))?;
    }

    let snapshot = session.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!(
        "Batch {}: {} of {} events, {} .. {}",
        args.batch,
        snapshot.display_count,
        session.raw_events().len(),
        format_epoch_ms(snapshot.start_ms),
        format_epoch_ms(snapshot.end_ms),
    );
    for event in session.display() {
        print_event(event, false);
    }
    Ok(())
}
