//! NIP-19: bech32-encoded public keys
//!
//! only `npub` is needed here: the admin identifier and access requests may be
//! given either as `npub1...` or as plain hex.

use crate::PubKey;
use bech32::{self, FromBase32, ToBase32, Variant};

#[derive(thiserror::Error, Debug)]
pub enum Nip19Error {
    #[error("bech32 error: {0}")]
    Bech32(#[from] bech32::Error),

    #[error("expected an npub, got '{0}'")]
    WrongPrefix(String),

    #[error("npub should be 32 bytes ({0})")]
    InvalidLength(usize),

    #[error("invalid hex public key: {0}")]
    Hex(#[from] crate::keys::PubKeyError),
}

/// decode an `npub1...` string
pub fn decode_npub(npub: &str) -> Result<PubKey, Nip19Error> {
    let (prefix, data, _variant) = bech32::decode(npub)?;
    if prefix != "npub" {
        return Err(Nip19Error::WrongPrefix(prefix));
    }

    let data = Vec::<u8>::from_base32(&data)?;
    let bytes: [u8; 32] = data
        .as_slice()
        .try_into()
        .map_err(|_| Nip19Error::InvalidLength(data.len()))?;

    Ok(PubKey::from_bytes(bytes))
}

pub fn encode_npub(pk: &PubKey) -> Result<String, Nip19Error> {
    Ok(bech32::encode("npub", pk.as_bytes().to_base32(), Variant::Bech32)?)
}

/// accept either an npub or a 64-char hex key
pub fn parse_pubkey(input: &str) -> Result<PubKey, Nip19Error> {
    let input = input.trim();
    if input.starts_with("npub1") {
        decode_npub(input)
    } else {
        Ok(PubKey::from_hex(input)?)
    }
}
