use std::net::SocketAddr;

use lazy_static::lazy_static;
use poolscale_core::TickReport;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge_vec, IntCounter,
    IntCounterVec, IntGaugeVec,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

lazy_static! {
    pub static ref INSTANCE_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "poolscale_instance_requests_total",
        "Total number of instance provisioning requests issued",
        &["kind"]
    )
    .unwrap();
    pub static ref INSTANCE_DESTROYS: IntCounterVec = register_int_counter_vec!(
        "poolscale_instance_destroys_total",
        "Total number of instance destruction requests issued",
        &["kind"]
    )
    .unwrap();
    pub static ref POOL_SIZE: IntGaugeVec = register_int_gauge_vec!(
        "poolscale_pool_size",
        "Running instances per kind observed at the start of the last tick",
        &["kind"]
    )
    .unwrap();
    pub static ref TICKS: IntCounter = register_int_counter!(
        "poolscale_ticks_total",
        "Total number of controller ticks executed"
    )
    .unwrap();
}

/// Fold a tick report into the exported metrics.
pub fn observe_tick(report: &TickReport) {
    TICKS.inc();
    for (kind, size) in &report.pool_sizes {
        POOL_SIZE
            .with_label_values(&[kind.as_str()])
            .set(*size as i64);
    }
    for (kind, count) in &report.provisioned {
        INSTANCE_REQUESTS
            .with_label_values(&[kind.as_str()])
            .inc_by(*count as u64);
    }
    for (kind, ids) in &report.destroyed {
        INSTANCE_DESTROYS
            .with_label_values(&[kind.as_str()])
            .inc_by(ids.len() as u64);
    }
    for kind in &report.retired {
        POOL_SIZE.with_label_values(&[kind.as_str()]).set(0);
    }
}

/// Bind the metrics endpoint on `port` and serve it from a background task.
///
/// Binding happens before returning so that a busy port is reported to the
/// caller. Port 0 picks a free port; the bound address is returned.
pub async fn start_metrics_server(port: u16) -> std::io::Result<SocketAddr> {
    lazy_static::initialize(&INSTANCE_REQUESTS);
    lazy_static::initialize(&INSTANCE_DESTROYS);
    lazy_static::initialize(&POOL_SIZE);
    lazy_static::initialize(&TICKS);

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "Serving poolscale metrics");

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, peer)) => {
                    tokio::spawn(async move {
                        // Every path gets the text exposition; the request is only drained.
                        let mut request = [0u8; 1024];
                        let _ = socket.read(&mut request).await;

                        let body = metrics_handler();
                        let response = format!(
                            "HTTP/1.0 200 OK\r\nConnection: close\r\nContent-Length: {}\r\n\
                             Content-Type: text/plain; version=0.0.4\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        if let Err(e) = socket.write_all(response.as_bytes()).await {
                            tracing::debug!(peer = %peer, error = %e, "Metrics scrape aborted");
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(e) => tracing::warn!(error = %e, "Failed to accept metrics connection"),
            }
        }
    });

    Ok(addr)
}

fn metrics_handler() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("Encoding error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolscale_core::{InstanceGroup, InstanceId, Kind, ScalingAction};

    #[test]
    fn test_observe_tick_updates_counters() {
        let kind = Kind::new("metrics-test").unwrap();
        let mut report = TickReport::new(0, &[InstanceGroup::new(kind.clone(), Vec::new())]);
        report.record(&ScalingAction::Provision { kind: kind.clone() });
        report.record(&ScalingAction::Destroy {
            kind: kind.clone(),
            instance: InstanceId::new(1),
        });

        let requests_before = INSTANCE_REQUESTS.with_label_values(&["metrics-test"]).get();
        observe_tick(&report);

        assert_eq!(
            INSTANCE_REQUESTS.with_label_values(&["metrics-test"]).get(),
            requests_before + 1
        );
        assert!(INSTANCE_DESTROYS.with_label_values(&["metrics-test"]).get() >= 1);
        assert!(metrics_handler().contains("poolscale_ticks_total"));
    }

    #[tokio::test]
    async fn test_metrics_server_serves_text_format() {
        let addr = start_metrics_server(0).await.unwrap();
        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", addr.port()))
            .await
            .unwrap();
        stream.write_all(b"GET /metrics HTTP/1.0\r\n\r\n").await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.0 200 OK"));
        assert!(response.contains("poolscale_ticks_total"));
    }
}
