use crate::{Event, EventTemplate, PubKey};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("unauthorized by user")]
    Unauthorized,

    #[error("signer unavailable: {0}")]
    Unavailable(String),

    #[error("signer returned an event that doesn't match the request")]
    Mismatch,
}

/// key custody lives outside of us (a browser extension, a bunker, ...): it knows the
/// user's key, signs templates and encrypts direct messages
#[async_trait]
pub trait Signer: Send + Sync {
    async fn get_public_key(&self) -> Result<PubKey, SignerError>;

    async fn sign_event(&self, template: EventTemplate) -> Result<Event, SignerError>;

    /// NIP-04 encrypt `plaintext` for `recipient`
    async fn encrypt(&self, recipient: &PubKey, plaintext: &str) -> Result<String, SignerError>;
}

/// sign `template` and make sure we got back what we asked for
pub(crate) async fn finalize(
    signer: &dyn Signer,
    author: &PubKey,
    template: EventTemplate,
) -> Result<Event, SignerError> {
    let expected = template.id_for(author);
    let event = signer.sign_event(template).await?;

    // the id commits to every field, so a matching id means nothing was rewritten
    if event.id != expected || event.pubkey != *author || !event.check_id() {
        log::warn!(
            "signer returned event {} by {} while we expected {} by {}",
            event.id,
            event.pubkey,
            expected,
            author
        );
        return Err(SignerError::Mismatch);
    }

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{pk, MockSigner};
    use crate::{Kind, Signature};

    /// signs properly, but not what it was asked to
    struct RewritingSigner(PubKey);

    #[async_trait]
    impl Signer for RewritingSigner {
        async fn get_public_key(&self) -> Result<PubKey, SignerError> {
            Ok(self.0)
        }

        async fn sign_event(&self, mut template: EventTemplate) -> Result<Event, SignerError> {
            template.content = "something else entirely".to_string();
            template.kind = Kind(7);
            Ok(Event {
                id: template.id_for(&self.0),
                pubkey: self.0,
                created_at: template.created_at,
                kind: template.kind,
                tags: template.tags,
                content: template.content,
                sig: Signature::from_bytes([2; 64]),
            })
        }

        async fn encrypt(&self, _: &PubKey, plaintext: &str) -> Result<String, SignerError> {
            Ok(plaintext.to_string())
        }
    }

    fn draft() -> EventTemplate {
        EventTemplate::note("hay prices are up", &["agriculture"], None)
    }

    #[tokio::test]
    async fn test_finalize() {
        let signer = MockSigner::new(pk(1));
        let template = draft();
        let event = finalize(&signer, &pk(1), template.clone()).await.unwrap();
        assert_eq!(event.id, template.id_for(&pk(1)));
        assert_eq!(event.content, "hay prices are up");
        assert_eq!(signer.sign_calls(), 1);
    }

    #[tokio::test]
    async fn test_finalize_rejects_rewritten_event() {
        let result = finalize(&RewritingSigner(pk(1)), &pk(1), draft()).await;
        assert!(matches!(result, Err(SignerError::Mismatch)));
    }

    #[tokio::test]
    async fn test_finalize_rejects_other_author() {
        let result = finalize(&MockSigner::new(pk(2)), &pk(1), draft()).await;
        assert!(matches!(result, Err(SignerError::Mismatch)));
    }
}
