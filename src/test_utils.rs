//! in-memory stand-ins for relays, the signer and the well-known document

use crate::relay::{ConnectError, PublishError, QueryError, RelayConnection, RelayConnector};
use crate::signer::{Signer, SignerError};
use crate::whitelist::{FetchError, WellKnownFetcher};
use crate::{Event, EventTemplate, Filter, Kind, PubKey, Signature, Tags, Timestamp};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub fn pk(n: u8) -> PubKey {
    PubKey::from_bytes([n; 32])
}

/// a kind-1 note with a correct id and a dummy signature
pub fn note(author: PubKey, created_at: u32, tags: &[Vec<&str>], content: &str) -> Event {
    let template = EventTemplate {
        created_at: Timestamp(created_at),
        kind: Kind::TEXT_NOTE,
        tags: Tags(
            tags.iter()
                .map(|t| t.iter().map(|s| s.to_string()).collect())
                .collect(),
        ),
        content: content.to_string(),
    };

    Event {
        id: template.id_for(&author),
        pubkey: author,
        created_at: template.created_at,
        kind: template.kind,
        tags: template.tags,
        content: template.content,
        sig: Signature::from_bytes([0; 64]),
    }
}

#[derive(Default, Clone)]
struct Behavior {
    fail_connect: bool,
    fail_query: bool,
    reject_publish: bool,
    ignore_filter: bool,
    connect_delay: Duration,
    query_delay: Duration,
}

/// a scripted relay
#[derive(Clone)]
pub struct MockRelay {
    url: Url,
    behavior: Behavior,
    events: Arc<Mutex<Vec<Event>>>,
    published: Arc<Mutex<Vec<Event>>>,
    queries: Arc<AtomicUsize>,
}

impl MockRelay {
    pub fn new(url: &str) -> Self {
        Self {
            url: crate::normalize_url(url).unwrap(),
            behavior: Behavior::default(),
            events: Arc::new(Mutex::new(Vec::new())),
            published: Arc::new(Mutex::new(Vec::new())),
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn events(self, events: Vec<Event>) -> Self {
        *self.events.lock().unwrap() = events;
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.behavior.fail_connect = true;
        self
    }

    pub fn failing_query(mut self) -> Self {
        self.behavior.fail_query = true;
        self
    }

    pub fn rejecting_publish(mut self) -> Self {
        self.behavior.reject_publish = true;
        self
    }

    /// answer every query with everything we have, like a sloppy relay would
    pub fn ignoring_filter(mut self) -> Self {
        self.behavior.ignore_filter = true;
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.behavior.connect_delay = delay;
        self
    }

    pub fn query_delay(mut self, delay: Duration) -> Self {
        self.behavior.query_delay = delay;
        self
    }

    pub fn published(&self) -> Arc<Mutex<Vec<Event>>> {
        self.published.clone()
    }

    pub fn query_counter(&self) -> Arc<AtomicUsize> {
        self.queries.clone()
    }
}

#[async_trait]
impl RelayConnection for MockRelay {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<Event>, QueryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.behavior.query_delay.is_zero() {
            tokio::time::sleep(self.behavior.query_delay).await;
        }
        if self.behavior.fail_query {
            return Err(QueryError::Closed("error: shutting down".to_string()));
        }

        let events = self.events.lock().unwrap();
        let mut matched: Vec<Event> = events
            .iter()
            .filter(|e| self.behavior.ignore_filter || filter.matches(e))
            .cloned()
            .collect();
        if let (Some(limit), false) = (filter.limit, self.behavior.ignore_filter) {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn publish(&self, event: &Event) -> Result<(), PublishError> {
        self.published.lock().unwrap().push(event.clone());
        if self.behavior.reject_publish {
            return Err(PublishError::NotOK("blocked: not allowed".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// hands out the relays it was given, failing for anything else
#[derive(Default)]
pub struct MockConnector {
    relays: HashMap<String, MockRelay>,
    connects: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, relay: MockRelay) -> Self {
        self.relays.insert(relay.url.to_string(), relay);
        self
    }

    pub fn connect_counter(&self) -> Arc<AtomicUsize> {
        self.connects.clone()
    }
}

#[async_trait]
impl RelayConnector for MockConnector {
    async fn connect(&self, url: &Url) -> Result<Arc<dyn RelayConnection>, ConnectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let relay = self
            .relays
            .get(url.as_str())
            .ok_or_else(|| ConnectError::Websocket(format!("no such relay {}", url)))?;

        if !relay.behavior.connect_delay.is_zero() {
            tokio::time::sleep(relay.behavior.connect_delay).await;
        }
        if relay.behavior.fail_connect {
            return Err(ConnectError::Websocket("connection refused".to_string()));
        }

        Ok(Arc::new(relay.clone()))
    }
}

/// signs by computing the real id, keeps count of how often it was asked
#[derive(Clone)]
pub struct MockSigner {
    pubkey: PubKey,
    sign_calls: Arc<AtomicUsize>,
    encrypt_calls: Arc<AtomicUsize>,
}

impl MockSigner {
    pub fn new(pubkey: PubKey) -> Self {
        Self {
            pubkey,
            sign_calls: Arc::new(AtomicUsize::new(0)),
            encrypt_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Signer for MockSigner {
    async fn get_public_key(&self) -> Result<PubKey, SignerError> {
        Ok(self.pubkey)
    }

    async fn sign_event(&self, template: EventTemplate) -> Result<Event, SignerError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Event {
            id: template.id_for(&self.pubkey),
            pubkey: self.pubkey,
            created_at: template.created_at,
            kind: template.kind,
            tags: template.tags,
            content: template.content,
            sig: Signature::from_bytes([1; 64]),
        })
    }

    async fn encrypt(&self, recipient: &PubKey, plaintext: &str) -> Result<String, SignerError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("enc[{}]:{}", recipient.short(), plaintext))
    }
}

/// serves a fixed document, or fails every time
pub struct StaticFetcher(Option<serde_json::Value>);

impl StaticFetcher {
    pub fn document(doc: serde_json::Value) -> Self {
        Self(Some(doc))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl WellKnownFetcher for StaticFetcher {
    async fn fetch(&self) -> Result<serde_json::Value, FetchError> {
        self.0
            .clone()
            .ok_or_else(|| FetchError::Other("connection refused".to_string()))
    }
}
