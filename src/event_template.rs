use crate::{event::compute_id, Kind, PubKey, Tags, Timestamp, ID};

/// represents an unsigned nostr event, the thing we hand over to a signer
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EventTemplate {
    pub created_at: Timestamp,
    pub kind: Kind,
    pub tags: Tags,
    pub content: String,
}

impl EventTemplate {
    /// a top-level discussion note tagged with `topics` and an optional NIP-14 subject
    pub fn note<S: AsRef<str>>(content: &str, topics: &[S], subject: Option<&str>) -> Self {
        let mut tags = Tags::default();
        for topic in topics {
            tags.push("t", topic.as_ref());
        }
        if let Some(subject) = subject {
            tags.push("subject", subject);
        }

        Self {
            created_at: Timestamp::now(),
            kind: Kind::TEXT_NOTE,
            tags,
            content: content.to_string(),
        }
    }

    /// a note replying to `post_id`
    pub fn reply<S: AsRef<str>>(post_id: &ID, content: &str, topics: &[S]) -> Self {
        let mut tags = Tags::default();
        tags.push("e", post_id.to_hex());
        for topic in topics {
            tags.push("t", topic.as_ref());
        }

        Self {
            created_at: Timestamp::now(),
            kind: Kind::TEXT_NOTE,
            tags,
            content: content.to_string(),
        }
    }

    /// a kind-4 message addressed to `recipient`, content must already be encrypted
    pub fn direct_message(recipient: &PubKey, ciphertext: String) -> Self {
        let mut tags = Tags::default();
        tags.push("p", recipient.to_hex());

        Self {
            created_at: Timestamp::now(),
            kind: Kind::DIRECT_MESSAGE,
            tags,
            content: ciphertext,
        }
    }

    /// the id an event built from this template must carry once `pubkey` signs it
    pub fn id_for(&self, pubkey: &PubKey) -> ID {
        compute_id(pubkey, self.created_at, self.kind, &self.tags, &self.content)
    }
}

impl std::fmt::Display for EventTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EventTemplate({}, {}, {}, {})",
            self.kind, self.created_at, self.tags, self.content
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::pk;

    #[test]
    fn test_note_tags() {
        let tmpl = EventTemplate::note("hello", &["a", "b"], Some("greetings"));
        assert_eq!(tmpl.kind, Kind::TEXT_NOTE);
        assert_eq!(tmpl.tags.topics().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(tmpl.tags.subject(), Some("greetings"));
        assert_eq!(tmpl.tags.reply_to(), None);
    }

    #[test]
    fn test_reply_tags() {
        let post = ID::from_bytes([1; 32]);
        let tmpl = EventTemplate::reply(&post, "yes", &["agriculture"]);
        assert_eq!(tmpl.tags.reply_to(), Some(post.to_hex().as_str()));
        assert_eq!(tmpl.tags.0[0][0], "e");
    }

    #[test]
    fn test_direct_message() {
        let tmpl = EventTemplate::direct_message(&pk(5), "ciphertext".to_string());
        assert_eq!(tmpl.kind, Kind::DIRECT_MESSAGE);
        assert_eq!(
            tmpl.tags.recipients().collect::<Vec<_>>(),
            vec![pk(5).to_hex().as_str()]
        );
    }

    #[test]
    fn test_id_depends_on_author() {
        let tmpl = EventTemplate::note("same", &["t"], None);
        assert_ne!(tmpl.id_for(&pk(1)), tmpl.id_for(&pk(2)));
        assert_eq!(tmpl.id_for(&pk(1)), tmpl.id_for(&pk(1)));
    }
}
