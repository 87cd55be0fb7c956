// Demonstration: play sandbox episodes through the bridge and evaluate a baseline policy.
//
// Run from the repo root:
//   cargo run --example bridge_demo -- --policy heuristic --episodes 3 --minutes 10
//
// Set RUST_LOG=rts_bridge=debug to follow the driver threads.

use std::env;

use qtty::Quantity;
use rts_bridge::config::{EnvConfig, ObservationMode, PoolConfig};
use rts_bridge::metrics::RolloutMetrics;
use rts_bridge::policy::{BuildOrderPolicy, HeuristicPolicy, Policy, RandomPolicy};
use rts_bridge::sandbox::{SandboxConfig, SandboxEngine};
use rts_bridge::world::engine_factory;
use rts_bridge::{Action, EnvPool, GameEnv};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let policy_name = arg_value(&args, "--policy").unwrap_or("heuristic");
    let episodes: usize = arg_value(&args, "--episodes")
        .and_then(|s| s.parse().ok())
        .unwrap_or(3);
    let seed: u64 = arg_value(&args, "--seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    let minutes: f64 = arg_value(&args, "--minutes")
        .and_then(|s| s.parse().ok())
        .unwrap_or(10.0);
    let observation = match arg_value(&args, "--mode").unwrap_or("features") {
        "features" => ObservationMode::default_features(),
        "raster" => ObservationMode::Raster {
            height: 64,
            width: 64,
        },
        other => {
            eprintln!("Unknown --mode '{}'; expected 'features' or 'raster'.", other);
            std::process::exit(2);
        }
    };

    let config = EnvConfig {
        observation,
        time_ceiling: Quantity::new(minutes * 60.0),
        victory_time_bonus: true,
        seed: Some(seed),
        ..EnvConfig::default()
    };
    let sandbox = SandboxConfig {
        seed: Some(seed),
        ..SandboxConfig::default()
    };
    let factory = engine_factory(move || SandboxEngine::new(sandbox.clone()));

    let mut policy: Box<dyn Policy> = match policy_name {
        "random" => Box::new(RandomPolicy::new(Some(seed))),
        "build-order" => Box::new(BuildOrderPolicy::default()),
        "heuristic" => Box::new(HeuristicPolicy::default()),
        other => {
            eprintln!(
                "Unknown --policy '{}'; expected 'heuristic', 'build-order' or 'random'.",
                other
            );
            std::process::exit(2);
        }
    };

    let mut env = match GameEnv::new(config.clone(), factory.clone()) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    match RolloutMetrics::evaluate(&mut env, policy.as_mut(), episodes) {
        Ok(metrics) => {
            println!("Policy: {}", policy.name());
            println!("{}", metrics);
        }
        Err(e) => {
            eprintln!("rollout failed: {e}");
            std::process::exit(1);
        }
    }
    if let Some(mean) = env.history().moving_average(10).last() {
        println!("Moving average (last 10): {mean:.2}");
    }

    // A few vectorized steps across a small pool.
    let pool_config = PoolConfig {
        size: 3,
        auto_reset: true,
    };
    let mut pool = match EnvPool::new(pool_config, config, factory) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("pool failed to start: {e}");
            std::process::exit(1);
        }
    };
    let started = pool.reset_all().iter().filter(|r| r.is_ok()).count();
    println!("Pool: {started}/{} members started", pool.size());
    for _ in 0..20 {
        match pool.step_all(&[Action::Expand, Action::BuildSupply, Action::BuildMilitaryUnit]) {
            Ok(results) => {
                let rewards: Vec<String> = results
                    .iter()
                    .map(|r| match r {
                        Ok(step) => format!("{:+.2}", step.reward),
                        Err(e) => format!("error: {e}"),
                    })
                    .collect();
                println!("  {}", rewards.join("  "));
            }
            Err(e) => {
                eprintln!("pool step failed: {e}");
                break;
            }
        }
    }
    pool.close();
}

fn arg_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}
