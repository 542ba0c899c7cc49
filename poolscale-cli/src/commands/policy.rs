// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `poolscale policy` command - Show and evaluate the growth policy.
//!
//! Falls back to the built-in bands when no configuration file exists.

use std::path::Path;

use poolscale_core::{ConfigLoader, ScalingPolicy, Utilization};

pub async fn execute(
    config_path: &str,
    utilization: Option<f64>,
    size: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let policy = if Path::new(config_path).exists() {
        ConfigLoader::load_file(config_path)?.controller.policy
    } else {
        tracing::info!(config = %config_path, "No configuration file, using default bands");
        ScalingPolicy::default()
    };

    println!("╔══════════════════════════════════════════════╗");
    println!("║                 GROWTH POLICY                ║");
    println!("╠═══════╦═══════════════════╦══════════════════╣");
    println!("║ Band  ║ Utilization       ║ Multiplier       ║");
    println!("╠═══════╬═══════════════════╬══════════════════╣");
    for (index, band) in policy.bands().iter().enumerate() {
        println!(
            "║ {:<5} ║ {:<17} ║ {:<16} ║",
            index,
            format!("{:.2} - {:.2}", band.lower, band.upper),
            format!("x{:.2}", band.multiplier)
        );
    }
    println!("╚═══════╩═══════════════════╩══════════════════╝");

    if let Some(value) = utilization {
        let utilization = Utilization::new(value)?;
        println!();
        println!("{}", describe(&policy, utilization, size));
    }

    Ok(())
}

/// One-line verdict for a group of `size` instances at `utilization`.
fn describe(policy: &ScalingPolicy, utilization: Utilization, size: usize) -> String {
    let extra = policy.additional_instances(utilization.value(), size);
    match policy.band_for(utilization.value()) {
        Some(band) if extra > 0 => format!(
            "Group of {} at {} matches x{:.2}: request {} more instance(s)",
            size, utilization, band.multiplier, extra
        ),
        Some(band) => format!(
            "Group of {} at {} matches x{:.2} but needs no growth",
            size, utilization, band.multiplier
        ),
        None => format!(
            "Group of {} at {} matches no band: no growth",
            size, utilization
        ),
    }
}
