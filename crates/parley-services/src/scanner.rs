//! Subnet scanner — probe the local /24 for other directory instances.
//!
//! The scan is a one-shot read: it reports what answered, and the caller
//! decides whether to connect. Hosts are probed in fixed-size batches
//! with a short pause between batches so a full sweep stays polite on
//! small networks.

use std::net::Ipv4Addr;
use std::time::Duration;

use parley_core::config::ScanConfig;
use parley_core::NodeError;
use serde::{Deserialize, Serialize};

/// What a probed host turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    /// Answered `GET /status` with 2xx, so it speaks our protocol.
    Peer,
    /// Something HTTP is listening there, but it is not one of us.
    HttpResponder,
}

/// One responsive host found during a sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHit {
    pub ip: String,
    pub kind: ScanKind,
}

/// Sweep the /24 around `base_ip`, probing every host except the base
/// itself on `port`. Returns hits in address order.
pub async fn scan(base_ip: &str, port: u16, config: &ScanConfig) -> Result<Vec<ScanHit>, NodeError> {
    let base: Ipv4Addr = base_ip
        .parse()
        .map_err(|_| NodeError::InvalidAddress(base_ip.to_string()))?;
    let octets = base.octets();
    let prefix = format!("{}.{}.{}", octets[0], octets[1], octets[2]);
    let own_host = octets[3];

    let http = reqwest::Client::new();
    let probe_timeout = Duration::from_millis(config.probe_timeout_ms);

    let hosts: Vec<u8> = (1..=254u8).filter(|h| *h != own_host).collect();
    let mut hits = Vec::new();

    tracing::info!(subnet = %prefix, port, hosts = hosts.len(), "scan started");

    for batch in hosts.chunks(config.batch_size) {
        let probes = batch.iter().map(|host| {
            let ip = format!("{prefix}.{host}");
            let http = http.clone();
            async move {
                probe_host(&http, &ip, port, probe_timeout)
                    .await
                    .map(|kind| ScanHit { ip, kind })
            }
        });

        for hit in futures::future::join_all(probes).await.into_iter().flatten() {
            hits.push(hit);
        }

        tokio::time::sleep(Duration::from_millis(config.batch_delay_ms)).await;
    }

    tracing::info!(found = hits.len(), "scan finished");
    Ok(hits)
}

/// Classify one host within a single timeout budget. `/status` answering
/// 2xx marks a peer; any other HTTP answer (on `/status` or `/`) marks a
/// plain responder; silence marks nothing.
async fn probe_host(
    http: &reqwest::Client,
    ip: &str,
    port: u16,
    budget: Duration,
) -> Option<ScanKind> {
    let classify = async {
        match http.get(format!("http://{ip}:{port}/status")).send().await {
            Ok(resp) if resp.status().is_success() => Some(ScanKind::Peer),
            Ok(_) => Some(ScanKind::HttpResponder),
            Err(_) => match http.get(format!("http://{ip}:{port}/")).send().await {
                Ok(_) => Some(ScanKind::HttpResponder),
                Err(_) => None,
            },
        }
    };
    tokio::time::timeout(budget, classify).await.ok().flatten()
}
