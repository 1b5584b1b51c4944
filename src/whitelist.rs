//! the verified-users directory
//!
//! the site publishes a NIP-05 `/.well-known/nostr.json` document and treats every
//! key listed under `names` as whitelisted. the directory loads it once at startup
//! (and again whenever asked), swapping in a new snapshot only when the load
//! finishes, so readers always see a complete, if possibly stale, directory.

use crate::PubKey;
use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

lazy_static::lazy_static! {
    static ref NIP05_REGEX: Regex = Regex::new(r"^(?:([\w.+-]+)@)?([\w_-]+(\.[\w_-]+)+)$").unwrap();
    static ref NAME_REGEX: Regex = Regex::new(r"^[\w.+-]+$").unwrap();
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error("{0}")]
    Other(String),
}

/// check if an identifier is valid according to NIP-05 format
pub fn is_valid_identifier(input: &str) -> bool {
    NIP05_REGEX.is_match(input)
}

/// parse a NIP-05 identifier into name and domain parts, `_` standing for a bare domain
pub fn parse_identifier(fullname: &str) -> Option<(String, String)> {
    let captures = NIP05_REGEX.captures(fullname)?;
    let name = captures.get(1).map(|m| m.as_str()).unwrap_or("_");
    let domain = captures.get(2)?.as_str();
    Some((name.to_string(), domain.to_string()))
}

/// something that can hand us the raw well-known document
#[async_trait]
pub trait WellKnownFetcher: Send + Sync {
    async fn fetch(&self) -> Result<serde_json::Value, FetchError>;
}

/// fetches the document over https with reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl WellKnownFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<serde_json::Value, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}

/// one immutable load of the document
#[derive(Debug, Default)]
struct Snapshot {
    names: HashMap<String, PubKey>,
    keys: HashSet<PubKey>,
    by_key: HashMap<PubKey, String>,
    relays: HashMap<PubKey, Vec<String>>,
}

impl Snapshot {
    /// anything that isn't `{ "names": { name: hex } }` counts as an empty whitelist
    fn from_document(doc: &serde_json::Value) -> Self {
        let mut snapshot = Snapshot::default();

        let Some(names) = doc.get("names").and_then(|n| n.as_object()) else {
            return snapshot;
        };

        for (name, value) in names {
            if !NAME_REGEX.is_match(name) {
                log::warn!("skipping whitelist entry with invalid name '{}'", name);
                continue;
            }
            let pubkey = match value.as_str().map(PubKey::from_hex) {
                Some(Ok(pk)) => pk,
                _ => {
                    log::warn!("skipping whitelist entry '{}': invalid public key", name);
                    continue;
                }
            };

            snapshot.names.insert(name.clone(), pubkey);
            snapshot.keys.insert(pubkey);
            // with several names for the same key the smallest one wins so lookups are stable
            match snapshot.by_key.get(&pubkey) {
                Some(existing) if existing <= name => {}
                _ => {
                    snapshot.by_key.insert(pubkey, name.clone());
                }
            }
        }

        if let Some(relays) = doc.get("relays").and_then(|r| r.as_object()) {
            for (key, urls) in relays {
                let (Ok(pubkey), Some(urls)) = (PubKey::from_hex(key), urls.as_array()) else {
                    continue;
                };
                if !snapshot.keys.contains(&pubkey) {
                    continue;
                }
                snapshot.relays.insert(
                    pubkey,
                    urls.iter()
                        .filter_map(|u| u.as_str().map(str::to_string))
                        .collect(),
                );
            }
        }

        snapshot
    }
}

/// answers "is this key verified?" and "what is this key's name?"
pub struct WhitelistDirectory {
    fetcher: Arc<dyn WellKnownFetcher>,
    domain: String,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl WhitelistDirectory {
    pub fn new(fetcher: Arc<dyn WellKnownFetcher>, domain: impl Into<String>) -> Self {
        Self {
            fetcher,
            domain: domain.into(),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    /// fetch and replace the directory; on any failure the directory becomes empty
    pub async fn load(&self) {
        let snapshot = match self.fetcher.fetch().await {
            Ok(doc) => Snapshot::from_document(&doc),
            Err(err) => {
                log::warn!("failed to load whitelisted users: {}", err);
                Snapshot::default()
            }
        };

        log::info!("loaded {} whitelisted users", snapshot.keys.len());
        *self.snapshot.write() = Arc::new(snapshot);
    }

    /// replace the directory from an already-fetched document
    pub fn load_from_str(&self, json: &str) {
        let snapshot = match serde_json::from_str::<serde_json::Value>(json) {
            Ok(doc) => Snapshot::from_document(&doc),
            Err(err) => {
                log::warn!("failed to parse whitelist document: {}", err);
                Snapshot::default()
            }
        };
        *self.snapshot.write() = Arc::new(snapshot);
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    pub fn is_whitelisted(&self, pubkey: &PubKey) -> bool {
        self.current().keys.contains(pubkey)
    }

    pub fn display_name(&self, pubkey: &PubKey) -> Option<String> {
        self.current().by_key.get(pubkey).cloned()
    }

    /// `name@domain` for verified keys
    pub fn identifier(&self, pubkey: &PubKey) -> Option<String> {
        self.display_name(pubkey)
            .map(|name| format!("{}@{}", name, self.domain))
    }

    /// the name to show next to a note, falling back to the truncated key
    pub fn author_label(&self, pubkey: &PubKey) -> String {
        self.display_name(pubkey).unwrap_or_else(|| pubkey.short())
    }

    pub fn lookup(&self, name: &str) -> Option<PubKey> {
        self.current().names.get(name).copied()
    }

    pub fn relay_hints(&self, pubkey: &PubKey) -> Vec<String> {
        self.current()
            .relays
            .get(pubkey)
            .cloned()
            .unwrap_or_default()
    }

    /// every whitelisted key, sorted so the resulting filters are stable
    pub fn pubkeys(&self) -> Vec<PubKey> {
        let mut keys: Vec<PubKey> = self.current().keys.iter().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.current().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().keys.is_empty()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}
