//! Periodic public key refresh task.
//!
//! Re-fetches the inter-server public key on a fixed interval so a rotated
//! key is picked up without waiting for a cache miss. A failed refresh keeps
//! the previous key.
//!
//! # Graceful Shutdown
//!
//! The task exits when the cancellation token is cancelled.

use crate::auth::PublicKeyStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Start the key refresh background task.
///
/// The first refresh happens one `interval` after start; the startup fetch
/// is done by `PublicKeyStore::initialize`.
///
/// # Arguments
///
/// * `key_store` - Store to refresh
/// * `interval` - Time between refreshes
/// * `cancel_token` - Token for graceful shutdown
#[instrument(skip_all, name = "ext.task.key_refresh")]
pub async fn start_key_refresh(
    key_store: Arc<PublicKeyStore>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "ext.task.key_refresh",
        interval_seconds = interval.as_secs(),
        "Starting key refresh task"
    );

    let Some(first_tick) = Instant::now().checked_add(interval) else {
        warn!(
            target: "ext.task.key_refresh",
            interval_seconds = interval.as_secs(),
            "Key refresh interval out of range, task not started"
        );
        return;
    };

    let mut ticker = interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match key_store.refresh().await {
                    Ok(key) => {
                        info!(
                            target: "ext.task.key_refresh",
                            fetched_at = %key.fetched_at(),
                            "Inter-server public key refreshed"
                        );
                    }
                    Err(e) => {
                        // Previous key stays in service
                        warn!(
                            target: "ext.task.key_refresh",
                            error = %e,
                            key_loaded = key_store.is_loaded(),
                            "Key refresh failed"
                        );
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "ext.task.key_refresh",
                    "Key refresh task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "ext.task.key_refresh", "Key refresh task stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ext_test_utils::crypto_fixtures::test_keypair;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> Arc<PublicKeyStore> {
        Arc::new(
            PublicKeyStore::new(
                format!("{}/key", server.uri()),
                Duration::from_secs(1),
                Duration::from_secs(1),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_cancelled_task_exits_without_fetching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let cancel_token = CancellationToken::new();
        cancel_token.cancel();

        tokio::time::timeout(
            Duration::from_secs(5),
            start_key_refresh(store_for(&server), Duration::from_secs(60), cancel_token),
        )
        .await
        .expect("task should exit promptly once cancelled");
    }

    #[tokio::test]
    async fn test_out_of_range_interval_exits_without_panicking() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        tokio::time::timeout(
            Duration::from_secs(5),
            start_key_refresh(store_for(&server), Duration::MAX, CancellationToken::new()),
        )
        .await
        .expect("task should return instead of overflowing the first tick");
    }

    #[tokio::test]
    async fn test_task_refreshes_on_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(test_keypair().public_key_spki_base64()),
            )
            .mount(&server)
            .await;

        let key_store = store_for(&server);
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(start_key_refresh(
            key_store.clone(),
            Duration::from_millis(50),
            cancel_token.clone(),
        ));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !key_store.is_loaded() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        cancel_token.cancel();
        handle.await.unwrap();

        assert!(key_store.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(test_keypair().public_key_spki_base64()),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/key"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let key_store = store_for(&server);
        let original = key_store.refresh().await.unwrap();

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(start_key_refresh(
            key_store.clone(),
            Duration::from_millis(20),
            cancel_token.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel_token.cancel();
        handle.await.unwrap();

        let current = key_store.cached().unwrap();
        assert!(Arc::ptr_eq(&original, &current));
    }
}
