use crate::relay::{
    ConnectError, EndpointState, PublishError, PublishResult, QueryError, RelayConnection,
    RelayConnector,
};
use crate::{dedup_by_id, Event, Filter, RelaySet};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("relays still not ready after {0} attempts")]
    Timeout(u32),
}

/// how long callers wait for `connect_all` before giving up
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_attempts: 20,
        }
    }
}

/// fans queries and publishes out to every relay in the relay set
#[derive(Clone)]
pub struct RelayGateway {
    connector: Arc<dyn RelayConnector>,
    relay_set: Arc<RelaySet>,
    relays: Arc<DashMap<String, Arc<dyn RelayConnection>>>,
    connecting: Arc<DashMap<String, Arc<Mutex<()>>>>,
    states: Arc<DashMap<String, EndpointState>>,
    ready: Arc<watch::Sender<bool>>,
    readiness: ReadinessPolicy,
    timeout: Duration,
}

impl RelayGateway {
    pub fn new(
        connector: Arc<dyn RelayConnector>,
        relay_set: Arc<RelaySet>,
        readiness: ReadinessPolicy,
        timeout: Duration,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            connector,
            relay_set,
            relays: Arc::new(DashMap::new()),
            connecting: Arc::new(DashMap::new()),
            states: Arc::new(DashMap::new()),
            ready: Arc::new(ready),
            readiness,
            timeout,
        }
    }

    pub fn relay_set(&self) -> &Arc<RelaySet> {
        &self.relay_set
    }

    /// get or create a relay connection to the given url, at most one connect in flight per url
    pub async fn ensure_relay(&self, url: &Url) -> Result<Arc<dyn RelayConnection>, ConnectError> {
        let key = url.to_string();
        if let Some(relay) = self.relays.get(&key) {
            return Ok(relay.clone());
        }

        let lock = self.connecting.entry(key.clone()).or_default().clone();
        let _connecting = lock.lock().await;

        // whoever held the lock before us may have connected already
        if let Some(relay) = self.relays.get(&key) {
            return Ok(relay.clone());
        }

        self.states.insert(key.clone(), EndpointState::Connecting);
        let result = match tokio::time::timeout(self.timeout, self.connector.connect(url)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectError::Timeout),
        };

        match result {
            Ok(relay) => {
                log::info!("[{}] connected", url);
                self.relays.insert(key.clone(), relay.clone());
                self.states.insert(key, EndpointState::Connected);
                Ok(relay)
            }
            Err(err) => {
                self.states.insert(key, EndpointState::Failed);
                Err(err)
            }
        }
    }

    /// the connection is dropped from the map so the next call reconnects
    fn forget(&self, url: &Url) {
        let key = url.to_string();
        self.relays.remove(&key);
        self.states.insert(key, EndpointState::Failed);
    }

    pub fn endpoint_state(&self, url: &Url) -> EndpointState {
        self.states
            .get(url.as_str())
            .map(|state| *state)
            .unwrap_or(EndpointState::Unconnected)
    }

    pub fn connected_count(&self) -> usize {
        self.relays.len()
    }

    /// try every endpoint at once and mark the gateway ready when all attempts settle
    pub async fn connect_all(&self, endpoints: Vec<Url>) {
        let total = endpoints.len();
        let attempts: Vec<_> = endpoints
            .into_iter()
            .map(|url| {
                let gateway = self.clone();
                tokio::spawn(async move {
                    match gateway.ensure_relay(&url).await {
                        Ok(_) => true,
                        Err(err) => {
                            log::warn!("[{}] failed to connect: {}", url, err);
                            false
                        }
                    }
                })
            })
            .collect();

        let connected = futures::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|attempt| matches!(attempt, Ok(true)))
            .count();

        log::info!("connected to {}/{} relays", connected, total);
        self.ready.send_replace(true);
    }

    /// `connect_all` over the current relay set
    pub async fn connect_relay_set(&self) {
        self.connect_all(self.relay_set.endpoints()).await
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// flips to `true` once, when the first `connect_all` settles
    pub fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// wait for readiness, re-checking at most `max_attempts` times
    pub async fn wait_until_ready(&self) -> Result<(), GatewayError> {
        let mut ready = self.ready.subscribe();
        for attempt in 1..=self.readiness.max_attempts {
            let is_ready = *ready.borrow_and_update();
            if is_ready {
                return Ok(());
            }
            log::debug!(
                "relays not ready yet, attempt {}/{}",
                attempt,
                self.readiness.max_attempts
            );
            let _ = tokio::time::timeout(self.readiness.poll_interval, ready.changed()).await;
        }

        let is_ready = *ready.borrow();
        if is_ready {
            Ok(())
        } else {
            Err(GatewayError::Timeout(self.readiness.max_attempts))
        }
    }

    async fn query_one(&self, url: &Url, filter: &Filter) -> Result<Vec<Event>, QueryError> {
        let relay = self.ensure_relay(url).await?;
        match tokio::time::timeout(self.timeout, relay.query(filter)).await {
            Ok(Ok(events)) => Ok(events),
            Ok(Err(err)) => {
                self.forget(url);
                Err(err)
            }
            Err(_) => {
                self.forget(url);
                Err(QueryError::Timeout)
            }
        }
    }

    /// query every relay at once and merge what comes back, one event per id.
    /// relays that fail are logged and skipped, so this only errors when the
    /// gateway never became ready.
    pub async fn query(&self, filter: Filter) -> Result<Vec<Event>, GatewayError> {
        self.wait_until_ready().await?;

        let urls = self.relay_set.endpoints();
        if urls.is_empty() {
            log::warn!("no relays to query");
            return Ok(Vec::new());
        }

        let total = urls.len();
        let (tx, mut rx) = mpsc::channel(total);
        for url in urls {
            let gateway = self.clone();
            let filter = filter.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let result = gateway.query_one(&url, &filter).await;
                let _ = tx.send((url, result)).await;
            });
        }
        drop(tx);

        let mut events = Vec::with_capacity(filter.limit.unwrap_or(100));
        let mut failures = 0;
        while let Some((url, result)) = rx.recv().await {
            match result {
                Ok(batch) => {
                    for event in batch {
                        if event.check_id() {
                            events.push(event);
                        } else {
                            log::debug!("[{}] dropping event with a bad id {}", url, event.id);
                        }
                    }
                }
                Err(err) => {
                    failures += 1;
                    log::warn!("[{}] query failed: {}", url, err);
                }
            }
        }

        if failures == total {
            log::warn!("all {} relays failed to answer {}", total, filter);
        }

        Ok(dedup_by_id(events))
    }

    async fn publish_one(&self, url: &Url, event: &Event) -> Result<(), PublishError> {
        let relay = self.ensure_relay(url).await?;
        match tokio::time::timeout(self.timeout, relay.publish(event)).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::Timeout),
        }
    }

    /// send a signed event to every relay in the set. individual rejections are
    /// reported in the results but never turn into an error.
    pub async fn publish(&self, event: &Event) -> Result<Vec<PublishResult>, GatewayError> {
        self.wait_until_ready().await?;

        let urls = self.relay_set.endpoints();
        let total = urls.len();
        let (tx, mut rx) = mpsc::unbounded_channel();

        for url in urls {
            let tx = tx.clone();
            let event = event.clone();
            let gateway = self.clone();

            tokio::spawn(async move {
                let result = match gateway.publish_one(&url, &event).await {
                    Ok(_) => PublishResult {
                        error: None,
                        relay_url: url.to_string(),
                    },
                    Err(err) => {
                        log::warn!("[{}] failed to publish {}: {}", url, event.id, err);
                        PublishResult {
                            error: Some(err.to_string()),
                            relay_url: url.to_string(),
                        }
                    }
                };

                let _ = tx.send(result);
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }

        let accepted = results.iter().filter(|r| r.error.is_none()).count();
        log::info!("published {} to {}/{} relays", event.id, accepted, total);
        Ok(results)
    }
}
