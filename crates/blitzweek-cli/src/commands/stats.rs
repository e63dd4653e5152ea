use blitzweek_core::{Config, LiveStats, StatsDelta, StatsHistory};
use clap::Subcommand;
use serde_json::json;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Fetch the current registration counts
    Live,
    /// Refresh counts periodically and print changes
    Watch {
        /// Override stats.refresh_secs
        #[arg(long)]
        interval: Option<u64>,
    },
}

fn stats_json(stats: &LiveStats, delta: Option<&StatsDelta>) -> serde_json::Value {
    json!({
        "total": stats.total,
        "blitz": stats.blitz,
        "ignite": stats.ignite,
        "both": stats.both,
        "delta": delta,
    })
}

pub async fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let client = config.api_client()?;

    match action {
        StatsAction::Live => {
            let live = client.live_count().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&stats_json(&live.stats, None))?
            );
        }
        StatsAction::Watch { interval } => {
            let period = interval
                .map(|s| std::time::Duration::from_secs(s.max(1)))
                .unwrap_or_else(|| config.stats_refresh());
            let mut history = StatsHistory::new();
            let mut ticker = tokio::time::interval(period);

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            loop {
                tokio::select! {
                    _ = &mut ctrl_c => break,
                    _ = ticker.tick() => {
                        match client.live_count().await {
                            Ok(live) => {
                                let delta = history.record(live.stats);
                                println!("{}", stats_json(&live.stats, delta.as_ref()));
                            }
                            // keep the last reading on screen
                            Err(e) => tracing::warn!(error = %e, "live count refresh failed"),
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
