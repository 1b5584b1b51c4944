//! turns raw relay results into the discussion feed
//!
//! a load goes `Idle -> Loading -> Loaded | Failed` and can be re-entered at any
//! time. only one load runs at once: a `load_feed` call that lands while another
//! is in flight returns `LoadOutcome::Skipped` without touching the network,
//! which is what keeps the refresh timer and a manual refresh from piling up.
//!
//! the write path (posts, comments, direct messages) checks everything it can
//! locally before the signer or any relay is contacted. the whitelist check
//! here is a courtesy to the user; relays enforce the real policy.

use crate::config::Config;
use crate::gateway::{GatewayError, RelayGateway};
use crate::nip19::parse_pubkey;
use crate::signer::{finalize, Signer, SignerError};
use crate::topics::{merge_topics, suggest_topics};
use crate::whitelist::{is_valid_identifier, WhitelistDirectory};
use crate::{
    dedup_by_id, Event, EventTemplate, Filter, Kind, PubKey, TagQuery, Timestamp, ID,
};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("relays did not become ready in time")]
    Timeout(#[from] GatewayError),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("not connected to nostr")]
    NotConnected,

    #[error("no nostr signer found, install an extension like nos2x or Alby")]
    NoSigner,

    #[error("comment threads are disabled")]
    ThreadsDisabled,

    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
}

/// the loaded discussion: top-level posts plus how many replies each one has
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub posts: Vec<Event>,
    pub reply_counts: HashMap<ID, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// newest first
    Recent,
    /// most replies first, newest first among equals
    Discussed,
}

impl Feed {
    pub fn replies_to(&self, post: &ID) -> usize {
        self.reply_counts.get(post).copied().unwrap_or(0)
    }

    pub fn sort(&mut self, mode: SortMode) {
        match mode {
            SortMode::Recent => sort_newest_first(&mut self.posts),
            SortMode::Discussed => {
                let counts = &self.reply_counts;
                glidesort::sort_by_key(&mut self.posts, |post| {
                    (
                        Reverse(counts.get(&post.id).copied().unwrap_or(0)),
                        Reverse(post.created_at),
                    )
                });
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedState {
    Idle,
    Loading,
    Loaded(Feed),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    /// another load was already running
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// something worth telling the user about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// split events into (top-level, replies) by the presence of an `e` tag
pub fn partition_replies(events: Vec<Event>) -> (Vec<Event>, Vec<Event>) {
    events
        .into_iter()
        .partition(|event| event.tags.reply_to().is_none())
}

/// keep only events whose author is in the directory
pub fn retain_whitelisted(whitelist: &WhitelistDirectory, events: Vec<Event>) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| whitelist.is_whitelisted(&event.pubkey))
        .collect()
}

fn sort_newest_first(events: &mut [Event]) {
    glidesort::sort_by_key(events, |event| Reverse(event.created_at));
}

fn sort_oldest_first(events: &mut [Event]) {
    glidesort::sort_by_key(events, |event| event.created_at);
}

/// resets the loading flag however the load ends, cancellation included
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct FeedAssembler {
    config: Arc<Config>,
    whitelist: Arc<WhitelistDirectory>,
    gateway: RelayGateway,
    signer: Option<Arc<dyn Signer>>,
    session: RwLock<Option<PubKey>>,
    loading: AtomicBool,
    state: watch::Sender<FeedState>,
    notifications: broadcast::Sender<Notification>,
}

impl FeedAssembler {
    pub fn new(
        config: Arc<Config>,
        whitelist: Arc<WhitelistDirectory>,
        gateway: RelayGateway,
        signer: Option<Arc<dyn Signer>>,
    ) -> Self {
        let (state, _) = watch::channel(FeedState::Idle);
        let (notifications, _) = broadcast::channel(32);
        Self {
            config,
            whitelist,
            gateway,
            signer,
            session: RwLock::new(None),
            loading: AtomicBool::new(false),
            state,
            notifications,
        }
    }

    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        // nobody listening is fine
        let _ = self.notifications.send(Notification {
            level,
            message: message.into(),
        });
    }

    // session

    /// ask the signer who we are
    pub async fn connect(&self) -> Result<PubKey, FeedError> {
        let signer = self.signer.as_ref().ok_or(FeedError::NoSigner)?;
        let pubkey = signer.get_public_key().await?;
        *self.session.write() = Some(pubkey);
        log::info!("connected to nostr as {}", pubkey);

        if self.config.discussion.require_whitelist && !self.whitelist.is_whitelisted(&pubkey) {
            self.notify(
                NotificationLevel::Warning,
                "You are not in the NIP-05 verified users list. Request access below.",
            );
        }
        Ok(pubkey)
    }

    pub fn disconnect(&self) {
        *self.session.write() = None;
    }

    pub fn current_user(&self) -> Option<PubKey> {
        *self.session.read()
    }

    pub fn can_post(&self) -> bool {
        match self.current_user() {
            Some(pubkey) => {
                self.signer.is_some()
                    && (!self.config.discussion.require_whitelist
                        || self.whitelist.is_whitelisted(&pubkey))
            }
            None => false,
        }
    }

    fn session(&self) -> Result<(&Arc<dyn Signer>, PubKey), FeedError> {
        let signer = self.signer.as_ref().ok_or(FeedError::NoSigner)?;
        let pubkey = self.current_user().ok_or(FeedError::NotConnected)?;
        Ok((signer, pubkey))
    }

    fn authorize(&self, action: &str) -> Result<(&Arc<dyn Signer>, PubKey), FeedError> {
        let (signer, pubkey) = self.session()?;
        if self.config.discussion.require_whitelist && !self.whitelist.is_whitelisted(&pubkey) {
            return Err(FeedError::NotAuthorized(format!(
                "not whitelisted for {}",
                action
            )));
        }
        Ok((signer, pubkey))
    }

    // read path

    /// the query for the top-level feed
    pub fn post_filter(&self, limit: usize) -> Filter {
        // an empty directory usually means it hasn't loaded (or failed to), so ask by topic only
        let authors = if self.config.discussion.require_whitelist && !self.whitelist.is_empty() {
            Some(self.whitelist.pubkeys())
        } else {
            None
        };

        Filter {
            kinds: Some(vec![Kind::TEXT_NOTE]),
            authors,
            tags: Some(vec![TagQuery::new("t", &self.config.feed.topics)]),
            since: Some(Timestamp::days_ago(self.config.feed.post_lookback_days)),
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn comment_filter(&self, post_id: &ID) -> Filter {
        Filter {
            kinds: Some(vec![Kind::TEXT_NOTE]),
            tags: Some(vec![TagQuery::new("e", &[post_id.to_hex()])]),
            limit: Some(self.config.feed.comment_limit),
            ..Default::default()
        }
    }

    fn check_viewing(&self) -> Result<(), FeedError> {
        if !self.config.discussion.allow_anonymous_viewing && self.current_user().is_none() {
            return Err(FeedError::NotAuthorized(
                "sign in to view discussions".to_string(),
            ));
        }
        Ok(())
    }

    fn enforce_whitelist(&self, events: Vec<Event>) -> Vec<Event> {
        if self.config.discussion.require_whitelist {
            retain_whitelisted(&self.whitelist, events)
        } else {
            events
        }
    }

    pub async fn try_load_posts(&self, limit: usize) -> Result<Feed, FeedError> {
        self.check_viewing()?;

        let filter = self.post_filter(limit);
        log::debug!("loading posts with {}", filter);
        let events = dedup_by_id(self.gateway.query(filter).await?);

        let (posts, replies) = partition_replies(events);
        let mut posts: Vec<Event> = self
            .enforce_whitelist(posts)
            .into_iter()
            .filter(|event| event.kind == Kind::TEXT_NOTE)
            .collect();
        sort_newest_first(&mut posts);

        let mut reply_counts: HashMap<ID, usize> = HashMap::new();
        for reply in self.enforce_whitelist(replies) {
            if let Some(parent) = reply.tags.reply_to().and_then(|id| ID::from_hex(id).ok()) {
                if posts.iter().any(|post| post.id == parent) {
                    *reply_counts.entry(parent).or_default() += 1;
                }
            }
        }

        log::info!("loaded {} posts", posts.len());
        Ok(Feed {
            posts,
            reply_counts,
        })
    }

    /// newest-first top-level posts; failures are reported as a notification and an empty list
    pub async fn load_posts(&self, limit: usize) -> Vec<Event> {
        match self.try_load_posts(limit).await {
            Ok(feed) => feed.posts,
            Err(err) => {
                log::warn!("failed to load posts: {}", err);
                self.notify(NotificationLevel::Error, "Failed to load discussions");
                Vec::new()
            }
        }
    }

    pub async fn try_load_comments(&self, post_id: &ID) -> Result<Vec<Event>, FeedError> {
        self.check_viewing()?;

        let hex = post_id.to_hex();
        let events = dedup_by_id(self.gateway.query(self.comment_filter(post_id)).await?);

        // relays are allowed to be sloppy with tag matching, we are not
        let replies: Vec<Event> = events
            .into_iter()
            .filter(|event| event.kind == Kind::TEXT_NOTE && event.tags.references(&hex))
            .collect();

        let mut comments = self.enforce_whitelist(replies);
        sort_oldest_first(&mut comments);
        Ok(comments)
    }

    /// oldest-first replies to `post_id`; failures are reported and yield an empty list
    pub async fn load_comments(&self, post_id: &ID) -> Vec<Event> {
        match self.try_load_comments(post_id).await {
            Ok(comments) => comments,
            Err(err) => {
                log::warn!("failed to load comments for {}: {}", post_id, err);
                self.notify(NotificationLevel::Error, "Failed to load comments");
                Vec::new()
            }
        }
    }

    /// (re)load the feed unless a load is already running
    pub async fn load_feed(&self) -> LoadOutcome {
        if self.loading.swap(true, Ordering::SeqCst) {
            log::debug!("feed load already in progress, skipping");
            return LoadOutcome::Skipped;
        }
        let _guard = LoadingGuard(&self.loading);

        self.state.send_replace(FeedState::Loading);
        match self.try_load_posts(self.config.feed.post_limit).await {
            Ok(feed) => {
                let count = feed.posts.len();
                self.state.send_replace(FeedState::Loaded(feed));
                LoadOutcome::Loaded(count)
            }
            Err(err) => {
                log::warn!("failed to load feed: {}", err);
                self.notify(NotificationLevel::Error, "Failed to load discussions");
                self.state.send_replace(FeedState::Failed(err.to_string()));
                LoadOutcome::Failed
            }
        }
    }

    /// re-sort the loaded feed in place
    pub fn sort_feed(&self, mode: SortMode) {
        self.state.send_if_modified(|state| match state {
            FeedState::Loaded(feed) => {
                feed.sort(mode);
                true
            }
            _ => false,
        });
    }

    // write path

    fn validate_content(&self, content: &str) -> Result<String, FeedError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(FeedError::Validation(
                "post content cannot be empty".to_string(),
            ));
        }

        let max = self.config.discussion.max_post_length;
        let length = content.chars().count();
        if length > max {
            return Err(FeedError::Validation(format!(
                "post is {} characters long, the limit is {}",
                length, max
            )));
        }
        Ok(content.to_string())
    }

    async fn sign_and_publish(
        &self,
        signer: &Arc<dyn Signer>,
        author: &PubKey,
        template: EventTemplate,
    ) -> Result<Event, FeedError> {
        let event = finalize(signer.as_ref(), author, template).await?;
        self.gateway.publish(&event).await?;
        Ok(event)
    }

    /// publish a top-level post tagged with the feed topics
    pub async fn publish_post(
        &self,
        content: &str,
        subject: Option<&str>,
    ) -> Result<Event, FeedError> {
        let (signer, author) = self.authorize("posting")?;
        let content = self.validate_content(content)?;
        let subject = subject.map(str::trim).filter(|s| !s.is_empty());

        let topics = merge_topics(&self.config.feed.topics, &suggest_topics(&content));
        let template = EventTemplate::note(&content, &topics, subject);
        let event = self.sign_and_publish(signer, &author, template).await?;

        self.state.send_if_modified(|state| match state {
            FeedState::Loaded(feed) => {
                feed.posts.insert(0, event.clone());
                true
            }
            _ => false,
        });
        self.notify(NotificationLevel::Success, "Post published successfully!");
        Ok(event)
    }

    /// publish a reply to `post_id`
    pub async fn publish_comment(&self, post_id: &ID, content: &str) -> Result<Event, FeedError> {
        if !self.config.discussion.enable_threads {
            return Err(FeedError::ThreadsDisabled);
        }
        let (signer, author) = self.authorize("commenting")?;
        let content = self.validate_content(content)?;

        let template = EventTemplate::reply(post_id, &content, &self.config.feed.comment_topics);
        let event = self.sign_and_publish(signer, &author, template).await?;

        self.state.send_if_modified(|state| match state {
            FeedState::Loaded(feed) if feed.posts.iter().any(|p| p.id == *post_id) => {
                *feed.reply_counts.entry(*post_id).or_default() += 1;
                true
            }
            _ => false,
        });
        Ok(event)
    }

    /// send an encrypted kind-4 message; needs a session but not a whitelist entry
    pub async fn send_direct_message(
        &self,
        recipient: &PubKey,
        content: &str,
    ) -> Result<Event, FeedError> {
        if content.trim().is_empty() {
            return Err(FeedError::Validation(
                "message cannot be empty".to_string(),
            ));
        }
        let (signer, author) = self.session()?;

        let ciphertext = signer.encrypt(recipient, content).await?;
        let template = EventTemplate::direct_message(recipient, ciphertext);
        self.sign_and_publish(signer, &author, template).await
    }

    /// ask the admin to add `name` to the whitelist, for `pubkey` (npub or hex) or ourselves
    pub async fn send_access_request(
        &self,
        name: &str,
        reason: &str,
        pubkey: Option<&str>,
    ) -> Result<Event, FeedError> {
        let (name, reason) = (name.trim(), reason.trim());
        if name.is_empty() || reason.is_empty() {
            return Err(FeedError::Validation(
                "name and reason are both required".to_string(),
            ));
        }

        let domain = &self.config.site.domain;
        if !is_valid_identifier(&format!("{}@{}", name, domain)) {
            return Err(FeedError::Validation(format!(
                "'{}' can't be used as a name on {}",
                name, domain
            )));
        }

        let requester = match pubkey.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => parse_pubkey(raw)
                .map_err(|err| FeedError::Validation(format!("invalid npub format: {}", err)))?,
            None => self.current_user().ok_or(FeedError::NotConnected)?,
        };
        let admin = parse_pubkey(&self.config.admin).map_err(|err| {
            FeedError::Validation(format!("invalid admin identifier: {}", err))
        })?;

        let content = format!(
            "WHITELIST REQUEST - {site}\n\n\
             Name: {name}\n\
             Public Key: {requester}\n\
             Domain: {domain}\n\n\
             Reason for joining:\n{reason}\n\n\
             Please add this user to the NIP-05 whitelist at {domain}/.well-known/nostr.json\n\n\
             This is an automated request from the festival website.",
            site = self.config.site.name,
            name = name,
            requester = requester.to_hex(),
            domain = domain,
            reason = reason,
        );

        let event = self.send_direct_message(&admin, &content).await?;
        self.notify(
            NotificationLevel::Success,
            "NIP-05 verification request sent successfully! You will be notified when approved.",
        );
        Ok(event)
    }
}
