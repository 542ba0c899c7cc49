// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `poolscale validate` command - Validate configuration file.

use poolscale_core::ConfigLoader;

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            let controller = &config.controller;
            println!("✓ Configuration is valid");
            println!();
            println!("Controller Settings:");
            println!("  Pool Floor:          {}", controller.min_pool_size);
            println!("  Destroy Threshold:   {}", controller.destroy_threshold);
            println!("  Idle Hit Threshold:  {} ticks", controller.idle_hit_threshold);
            println!(
                "  Tick Interval:       {}ms",
                controller.tick_interval.as_millis()
            );
            println!();
            println!("Growth Bands ({}):", controller.policy.bands().len());
            for band in controller.policy.bands() {
                println!(
                    "  - [{:.2}, {:.2}] → x{:.2}",
                    band.lower, band.upper, band.multiplier
                );
            }
            println!();
            println!("Kinds ({}):", config.kinds.len());
            for kind in &config.kinds {
                println!("  - {}", kind);
            }
            if let Some(sim) = &config.simulation {
                println!();
                println!(
                    "Simulation: {} ticks, boot delay {} tick(s), {} workload(s)",
                    sim.ticks,
                    sim.boot_delay_ticks,
                    sim.workloads.len()
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
