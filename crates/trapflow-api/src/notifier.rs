//! Throttled alert delivery to Alertmanager.
//!
//! The engine hands finished alerts to a [`Notifier`]; the production
//! implementation posts them to the Alertmanager v1 alerts endpoint,
//! optionally pacing large batches so one trap storm does not saturate the
//! receiver. Firing and clearing sub-batches are submitted by the caller as
//! independent `notify` calls so one sub-batch's failure does not block the
//! other.

use crate::config::Settings;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};
use trapflow_types::Alert;

/// The only interface the engine requires of the downstream transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one batch of alerts. Retry, if any, is the transport's
    /// responsibility; the caller counts the batch as processed either way.
    async fn notify(&self, alerts: &[Alert]) -> Result<()>;
}

/// Alertmanager client with optional throttled delivery.
pub struct AlertmanagerClient {
    am_url: String,
    user_agent: String,
    throttle: bool,
    post_time: u64,
    sleep_time: u64,
    send_time: u64,
    dry_run: bool,
    client: reqwest::Client,
}

impl AlertmanagerClient {
    /// Build a client from the handler settings.
    pub fn new(settings: &Settings, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.am_timeout))
            .build()?;
        Ok(Self {
            am_url: settings.am_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            throttle: settings.throttle,
            post_time: settings.post_time,
            sleep_time: settings.sleep_time,
            send_time: settings.send_time,
            dry_run: settings.dry_run,
            client,
        })
    }

    async fn post(&self, alerts: &[Alert]) -> Result<()> {
        let url = format!("{}/api/v1/alerts", self.am_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .json(alerts)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("POST to Alertmanager on {url} returned HTTP {status}: {body}"));
        }
        debug!(count = alerts.len(), "Posted alerts to Alertmanager");
        Ok(())
    }
}

#[async_trait]
impl Notifier for AlertmanagerClient {
    async fn notify(&self, alerts: &[Alert]) -> Result<()> {
        if self.dry_run {
            for alert in alerts {
                info!(
                    labels = ?alert.labels,
                    annotations = ?alert.annotations,
                    starts_at = ?alert.starts_at,
                    ends_at = ?alert.ends_at,
                    generator_url = %alert.generator_url,
                    "Dry run."
                );
            }
            return Ok(());
        }

        let total = alerts.len();
        if total == 0 {
            return Ok(());
        }

        // One post covers the batch when throttling is off or the send
        // window cannot fit more than a single post anyway.
        if !self.throttle || self.send_time <= self.post_time + self.sleep_time {
            return self.post(alerts).await;
        }

        let max_requests = (self.send_time / (self.post_time + self.sleep_time)) as usize;
        let bounds = chunk_bounds(total, max_requests);
        let chunks = bounds.len();
        let mut failed = 0usize;
        for (start, end) in bounds {
            if let Err(err) = self.post(&alerts[start..end]).await {
                error!(error = %err, start, end, "Failed to send alerts chunk");
                failed += 1;
            }
            tokio::time::sleep(Duration::from_millis(self.sleep_time)).await;
        }
        if failed > 0 {
            return Err(anyhow!("{failed} of {chunks} alert chunks failed to deliver"));
        }
        Ok(())
    }
}

/// Split `total` alerts into at most `max_requests` evenly sized chunks,
/// with a trailing remainder chunk when the division is uneven. A batch
/// that already fits in `max_requests` posts goes out whole.
fn chunk_bounds(total: usize, max_requests: usize) -> Vec<(usize, usize)> {
    let mut bounds = Vec::new();
    let mut start = 0;

    if max_requests > 0 && total > max_requests {
        let chunk_size = total / max_requests;
        let mut end = chunk_size;
        while end <= total {
            bounds.push((start, end));
            start = end;
            end += chunk_size;
        }
    }

    if start < total {
        bounds.push((start, total));
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_chunk_bounds_small_batch_goes_whole() {
        assert_eq!(chunk_bounds(3, 5), vec![(0, 3)]);
        assert_eq!(chunk_bounds(5, 5), vec![(0, 5)]);
        assert_eq!(chunk_bounds(0, 5), Vec::<(usize, usize)>::new());
    }

    #[test]
    fn test_chunk_bounds_divides_large_batch() {
        assert_eq!(chunk_bounds(9, 3), vec![(0, 3), (3, 6), (6, 9)]);
        // Uneven division leaves a remainder chunk.
        assert_eq!(chunk_bounds(10, 3), vec![(0, 3), (3, 6), (6, 9), (9, 10)]);
    }

    #[test]
    fn test_chunk_bounds_cover_every_alert_once() {
        for total in 1..50 {
            for max_requests in 1..10 {
                let bounds = chunk_bounds(total, max_requests);
                let mut covered = 0;
                for (start, end) in &bounds {
                    assert!(start < end);
                    assert_eq!(*start, covered);
                    covered = *end;
                }
                assert_eq!(covered, total, "total={total} max={max_requests}");
            }
        }
    }

    #[tokio::test]
    async fn test_dry_run_skips_delivery() {
        let settings = Settings {
            listen_address: String::new(),
            am_url: "http://localhost:1".to_string(),
            am_timeout: 1,
            config_dir: String::new(),
            mibs_dir: String::new(),
            cache_file: "none".to_string(),
            throttle: false,
            post_time: 300,
            sleep_time: 100,
            send_time: 30000,
            forward_unknown: false,
            log_unknown: false,
            dry_run: true,
            log_json: false,
        };
        let client = AlertmanagerClient::new(&settings, "trapflow-test").unwrap();
        let alerts = vec![Alert {
            labels: HashMap::from([("dryRun".to_string(), "true".to_string())]),
            ..Default::default()
        }];
        // Nothing listens on port 1; dry run must not try to connect.
        client.notify(&alerts).await.unwrap();
    }
}
