//! # festival-feed
//!
//! a whitelist-gated nostr discussion feed
//!
//! this library keeps a NIP-05 whitelist loaded from a domain's well-known
//! document, fans queries and publishes out over a set of relays, and assembles
//! the results into a feed where only whitelisted authors are shown and may post.
//! the websocket client and the event signer are plugged in from outside through
//! the [`RelayConnector`] and [`Signer`] traits.

pub mod client;
pub mod config;
pub mod event;
pub mod event_template;
pub mod feed;
pub mod filter;
pub mod gateway;
pub mod keys;
pub mod nip19;
pub mod relay;
pub mod relay_set;
pub mod signer;
pub mod timestamp;
pub mod topics;
pub mod whitelist;

mod normalize;
mod tags;
mod types;

#[cfg(test)]
mod test_utils;

// re-export commonly used types
pub use client::FestivalClient;
pub use config::Config;
pub use event::{dedup_by_id, Event};
pub use event_template::EventTemplate;
pub use feed::{Feed, FeedAssembler, FeedError, FeedState, Notification, SortMode};
pub use filter::{Filter, TagQuery};
pub use gateway::{GatewayError, ReadinessPolicy, RelayGateway};
pub use keys::PubKey;
pub use normalize::*;
pub use relay::{PublishResult, RelayConnection, RelayConnector};
pub use relay_set::RelaySet;
pub use signer::Signer;
pub use tags::{Tag, Tags};
pub use timestamp::Timestamp;
pub use types::*;
pub use whitelist::{WellKnownFetcher, WhitelistDirectory};
