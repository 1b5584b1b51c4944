use crate::{Kind, PubKey, Signature, Tags, Timestamp, ID};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// represents a signed nostr event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: ID,
    pub pubkey: PubKey,
    pub created_at: Timestamp,
    pub kind: Kind,
    pub tags: Tags,
    pub content: String,
    pub sig: Signature,
}

impl Event {
    /// check if the event ID matches the computed ID
    pub fn check_id(&self) -> bool {
        compute_id(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content) == self.id
    }

    /// a kind-1 note that replies to something
    pub fn is_reply(&self) -> bool {
        self.kind == Kind::TEXT_NOTE && self.tags.reply_to().is_some()
    }

    /// a kind-1 note that starts a discussion
    pub fn is_post(&self) -> bool {
        self.kind == Kind::TEXT_NOTE && self.tags.reply_to().is_none()
    }
}

/// serialize an event for ID computation and hash it
pub(crate) fn compute_id(
    pubkey: &PubKey,
    created_at: Timestamp,
    kind: Kind,
    tags: &Tags,
    content: &str,
) -> ID {
    let array = serde_json::json!([0, pubkey, created_at.0, kind, tags, content]);
    let hash = Sha256::digest(array.to_string().as_bytes());
    ID::from_bytes(hash.into())
}

/// drop every event whose id was already seen, keeping the first occurrence in order
pub fn dedup_by_id(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::with_capacity(events.len());
    events
        .into_iter()
        .filter(|event| seen.insert(event.id))
        .collect()
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(err) => write!(f, "Event({} >> {})", self.id, err),
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl std::hash::Hash for Event {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{note, pk};

    #[test]
    fn test_check_id() {
        let mut event = note(pk(1), 100, &[vec!["t", "agriculture"]], "hello");
        assert!(event.check_id());

        event.content = "tampered".to_string();
        assert!(!event.check_id());
    }

    #[test]
    fn test_dedup_keeps_first() {
        let a = note(pk(1), 100, &[], "a");
        let b = note(pk(2), 200, &[], "b");
        let mut a_again = a.clone();
        a_again.sig = Signature::from_bytes([9; 64]);

        let deduped = dedup_by_id(vec![a.clone(), b.clone(), a_again, b.clone()]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, a.id);
        assert_eq!(deduped[0].sig, a.sig);
        assert_eq!(deduped[1].id, b.id);
    }

    #[test]
    fn test_post_or_reply() {
        let post = note(pk(1), 100, &[vec!["t", "agriculture"]], "post");
        let reply = note(pk(1), 100, &[vec!["e", post.id.to_hex().as_str()]], "reply");
        assert!(post.is_post() && !post.is_reply());
        assert!(reply.is_reply() && !reply.is_post());
    }

    #[test]
    fn test_json_roundtrip_shape() {
        let event = note(pk(3), 1_700_000_000, &[vec!["t", "x"]], "hi");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], 1);
        assert_eq!(value["created_at"], 1_700_000_000);
        assert_eq!(value["pubkey"], pk(3).to_hex());
        assert_eq!(value["tags"][0][0], "t");
    }
}
