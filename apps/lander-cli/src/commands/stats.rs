// stats.rs — `lander stats`: statistics rebuilt from persisted records.

use lander_core::LandingStrategy;
use lander_orchestrator::Statistics;

use crate::context::LanderPaths;

pub fn execute(paths: &LanderPaths) -> anyhow::Result<()> {
    let records = paths.store()?.list()?;
    let stats = Statistics::from_records(&records);

    println!("Landing attempts: {}", stats.total_attempts);
    println!("Reviews created:  {}", stats.reviews_created);
    println!("Merged:           {}", stats.merged);
    println!("Rolled back:      {}", stats.rolled_back);
    println!("Failed:           {}", stats.failed);
    println!();
    println!(
        "{:<20} {:>8} {:>10} {:>8}",
        "STRATEGY", "ATTEMPTS", "SUCCESSES", "RATE"
    );
    for strategy in LandingStrategy::ALL {
        let s = stats.strategy(strategy);
        println!(
            "{:<20} {:>8} {:>10} {:>7.1}%",
            strategy.to_string(),
            s.attempts,
            s.successes,
            s.success_rate() * 100.0
        );
    }
    Ok(())
}
