use blitzweek_core::countdown::Snapshot;
use blitzweek_core::{Config, CountdownEngine, Event, Phase};
use clap::Subcommand;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

#[derive(Subcommand)]
pub enum CountdownAction {
    /// Print the current phase and remaining time as JSON
    Status {
        /// Correct the local clock against the backend first
        #[arg(long)]
        sync: bool,
    },
    /// Tick every second until the event ends or Ctrl-C
    Watch {
        /// Skip the startup clock sync
        #[arg(long)]
        no_sync: bool,
    },
    /// Learn and print the backend clock offset
    Sync,
}

fn build_engine(config: &Config) -> Result<CountdownEngine, Box<dyn std::error::Error>> {
    let window = config.event_window()?;
    let title = config.event.title.clone();
    Ok(CountdownEngine::builder(window)
        .tick_epsilon(config.tick_epsilon())
        .on_live(move || {
            println!("{}", json!({ "type": "live", "title": title }));
        })
        .build())
}

fn snapshot_json(config: &Config, engine: &CountdownEngine, snap: &Snapshot) -> serde_json::Value {
    let window = engine.window();
    json!({
        "title": config.event.title,
        "location": config.event.location,
        "start": window.start(),
        "end": window.end(),
        "now": engine.now(),
        "phase": snap.phase,
        "remaining": snap.remaining.to_string(),
        "remaining_secs": snap.remaining.total_secs(),
        "synced": snap.synced,
        "offset_ms": engine.clock_state().offset_ms,
        "notice": snap.notice.map(|n| n.message()),
    })
}

fn print_events(events: &[Event]) -> Result<(), serde_json::Error> {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

pub async fn run(action: CountdownAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();

    match action {
        CountdownAction::Status { sync } => {
            let engine = build_engine(&config)?;
            if sync {
                engine.sync(&config.api_client()?).await;
            } else {
                engine.tick();
            }
            let snap = engine.snapshot();
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshot_json(&config, &engine, &snap))?
            );
        }
        CountdownAction::Sync => {
            let engine = build_engine(&config)?;
            let events = engine.sync(&config.api_client()?).await;
            print_events(&events)?;
            if !engine.clock_state().synced {
                return Err("clock sync failed, see event above".into());
            }
        }
        CountdownAction::Watch { no_sync } => {
            let engine = build_engine(&config)?;
            let mut events = engine.subscribe_events();
            engine.start();

            if config.countdown.sync_on_start && !no_sync {
                let client = config.api_client()?;
                let syncer = engine.clone();
                tokio::spawn(async move {
                    syncer.sync(&client).await;
                });
            }

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            loop {
                tokio::select! {
                    _ = &mut ctrl_c => break,
                    received = events.recv() => match received {
                        Ok(event) => {
                            println!("{}", serde_json::to_string(&event)?);
                            if matches!(event, Event::CountdownTick { phase: Phase::Ended, .. }) {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event output fell behind");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }

            if let Some(event) = engine.stop() {
                print_events(&[event])?;
            }
        }
    }
    Ok(())
}
