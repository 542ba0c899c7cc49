// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `poolscale simulate` command - Drive the controller against a simulated cloud.
//!
//! Runs the configured workload tick by tick, either as fast as possible or
//! paced at the controller's tick interval until Ctrl+C. With a metrics port
//! the endpoint stays up after the run until Ctrl+C.

use std::future::Future;
use std::net::SocketAddr;

use poolscale_core::{ConfigLoader, Simulation, SimulationSummary, TickReport};

use crate::metrics;

pub async fn execute(
    config_path: &str,
    paced: bool,
    json: bool,
    metrics_port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    run(config_path, paced, json, metrics_port, |addr| async move {
        eprintln!("Serving metrics on port {} (Ctrl+C to exit)", addr.port());
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    })
    .await
}

/// Run the simulation, then hand the metrics address to `linger` and wait on
/// it before returning. `linger` is skipped without a metrics port or after
/// an interrupted paced run.
async fn run<F, Fut>(
    config_path: &str,
    paced: bool,
    json: bool,
    metrics_port: Option<u16>,
    linger: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(SocketAddr) -> Fut,
    Fut: Future<Output = ()>,
{
    tracing::info!(config = %config_path, paced = %paced, "Starting simulation");

    let config = ConfigLoader::load_file(config_path)?;
    let tick_interval = config.controller.tick_interval;
    let mut simulation = Simulation::from_config(&config)?;

    tracing::info!(
        kinds = config.kinds.len(),
        ticks = simulation.ticks(),
        "Configuration validated successfully"
    );

    let metrics_addr = match metrics_port {
        Some(port) => Some(metrics::start_metrics_server(port).await?),
        None => None,
    };

    let mut summary = SimulationSummary::default();
    let mut interrupted = false;

    if paced {
        let mut interval = tokio::time::interval(tick_interval);
        for _ in 0..simulation.ticks() {
            tokio::select! {
                _ = interval.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, stopping simulation");
                    interrupted = true;
                    break;
                }
            }
            let report = simulation.step();
            observe(&report, json)?;
            summary.absorb(&report);
        }
    } else {
        for _ in 0..simulation.ticks() {
            let report = simulation.step();
            observe(&report, json)?;
            summary.absorb(&report);
        }
    }

    summary.finish(&simulation.cloud().running_sizes());

    if json {
        println!("{}", summary.to_json()?);
    } else {
        print_summary(&summary);
    }

    if let Some(addr) = metrics_addr {
        if !interrupted {
            linger(addr).await;
        }
    }

    Ok(())
}

fn observe(report: &TickReport, json: bool) -> Result<(), serde_json::Error> {
    metrics::observe_tick(report);
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else if !report.is_quiet() {
        println!(
            "tick {:>5}: +{} -{}{}",
            report.tick,
            report.total_provisioned(),
            report.total_destroyed(),
            if report.retired.is_empty() {
                String::new()
            } else {
                format!(
                    " retired [{}]",
                    report
                        .retired
                        .iter()
                        .map(|k| k.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        );
    }
    Ok(())
}

fn print_summary(summary: &SimulationSummary) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ Simulation: {:<6} ticks                                     ║", summary.ticks);
    println!("╠══════════════════╦════════╦════════╦══════╦═══════╦══════════╣");
    println!("║ Kind             ║ Added  ║ Freed  ║ Peak ║ Final ║ Retired  ║");
    println!("╠══════════════════╬════════╬════════╬══════╬═══════╬══════════╣");
    for (kind, stats) in &summary.kinds {
        let retired = stats
            .retired_at
            .map(|t| format!("tick {}", t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "║ {:<16} ║ {:<6} ║ {:<6} ║ {:<4} ║ {:<5} ║ {:<8} ║",
            kind.as_str(),
            stats.provisioned,
            stats.destroyed,
            stats.peak_pool_size,
            stats.final_pool_size,
            retired
        );
    }
    println!("╚══════════════════╩════════╩════════╩══════╩═══════╩══════════╝");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> String {
        let path = dir.path().join("poolscale.yaml");
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_simulate_runs_configured_ticks() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
controller:
  min_pool_size: 2
kinds: [web]
simulation:
  ticks: 5
  workloads:
    - kind: web
      phases:
        - { ticks: 5, utilization: 0.95, busy: true }
"#,
        );

        assert!(execute(&path, false, false, None).await.is_ok());
        assert!(execute(&path, false, true, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_metrics_endpoint_outlives_unpaced_run() {
        use std::sync::{Arc, Mutex};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
kinds: [scrape-web]
simulation:
  ticks: 3
"#,
        );

        let scraped = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&scraped);
        run(&path, false, false, Some(0), |addr| async move {
            let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", addr.port()))
                .await
                .unwrap();
            stream.write_all(b"GET /metrics HTTP/1.0\r\n\r\n").await.unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            *sink.lock().unwrap() = response;
        })
        .await
        .unwrap();

        let response = scraped.lock().unwrap();
        assert!(response.contains("poolscale_ticks_total"));
        assert!(response.contains("poolscale_instance_requests_total{kind=\"scrape-web\"}"));
    }

    #[tokio::test]
    async fn test_linger_skipped_without_metrics_port() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "kinds: [web]\nsimulation:\n  ticks: 2\n");

        let mut lingered = false;
        run(&path, false, false, None, |_| {
            lingered = true;
            async {}
        })
        .await
        .unwrap();

        assert!(!lingered);
    }

    #[tokio::test]
    async fn test_simulate_requires_simulation_section() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "kinds: [web]\n");

        assert!(execute(&path, false, false, None).await.is_err());
    }

    #[tokio::test]
    async fn test_simulate_missing_config() {
        let result = execute("/nonexistent/poolscale.yaml", false, false, None).await;
        assert!(result.is_err());
    }
}
