//! Opaque, URL-safe identifiers issued by the datastore layer.
//!
//! Both keys and cursors are a kind tag followed by the 16 bytes of a UUID,
//! base64url-encoded without padding. Callers outside the datastore layer
//! only ever see the encoded string; the tag stops a cursor from being
//! accepted where a key is expected and vice versa.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;
use uuid::Uuid;

const KEY_TAG: &[u8] = b"Cat\x00";
const CURSOR_TAG: &[u8] = b"Cat\x01";

/// Reasons an encoded key or cursor could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unexpected kind tag")]
    Kind,
    #[error("malformed identifier: {0}")]
    Identifier(#[from] uuid::Error),
}

/// Storage key of a single cat record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatKey(Uuid);

impl CatKey {
    /// Allocate a fresh key for a record about to be inserted
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    pub fn to_urlsafe(&self) -> String {
        encode(KEY_TAG, self.0)
    }

    pub fn from_urlsafe(encoded: &str) -> Result<Self, DecodeError> {
        decode(KEY_TAG, encoded).map(Self)
    }
}

/// Position in the key-ordered scan over all cats.
///
/// A cursor remembers the last key handed out; the next page starts
/// strictly after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor(Uuid);

impl PageCursor {
    pub fn after(key: &CatKey) -> Self {
        Self(key.uuid())
    }

    /// Key of the last record returned before this cursor was issued
    pub fn last_key(&self) -> CatKey {
        CatKey(self.0)
    }

    pub fn to_urlsafe(&self) -> String {
        encode(CURSOR_TAG, self.0)
    }

    pub fn from_urlsafe(encoded: &str) -> Result<Self, DecodeError> {
        decode(CURSOR_TAG, encoded).map(Self)
    }
}

fn encode(tag: &[u8], id: Uuid) -> String {
    let mut raw = Vec::with_capacity(tag.len() + 16);
    raw.extend_from_slice(tag);
    raw.extend_from_slice(id.as_bytes());
    URL_SAFE_NO_PAD.encode(raw)
}

fn decode(tag: &[u8], encoded: &str) -> Result<Uuid, DecodeError> {
    let raw = URL_SAFE_NO_PAD.decode(encoded)?;
    let id = raw.strip_prefix(tag).ok_or(DecodeError::Kind)?;
    Ok(Uuid::from_slice(id)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_urlsafe_round_trip() {
        let key = CatKey::generate();
        let encoded = key.to_urlsafe();

        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(CatKey::from_urlsafe(&encoded).unwrap(), key);
    }

    #[test]
    fn test_key_rejects_garbage() {
        assert!(CatKey::from_urlsafe("not-a-real-key").is_err());
        assert!(CatKey::from_urlsafe("").is_err());
        assert!(matches!(
            CatKey::from_urlsafe("!!!"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_key_rejects_truncated_identifier() {
        let encoded = URL_SAFE_NO_PAD.encode(b"Cat\x00short");
        assert!(matches!(
            CatKey::from_urlsafe(&encoded),
            Err(DecodeError::Identifier(_))
        ));
    }

    #[test]
    fn test_cursor_and_key_are_not_interchangeable() {
        let key = CatKey::generate();
        let cursor = PageCursor::after(&key);

        assert!(matches!(
            CatKey::from_urlsafe(&cursor.to_urlsafe()),
            Err(DecodeError::Kind)
        ));
        assert!(matches!(
            PageCursor::from_urlsafe(&key.to_urlsafe()),
            Err(DecodeError::Kind)
        ));
    }

    #[test]
    fn test_cursor_remembers_last_key() {
        let key = CatKey::generate();
        let cursor = PageCursor::from_urlsafe(&PageCursor::after(&key).to_urlsafe()).unwrap();
        assert_eq!(cursor.last_key(), key);
    }
}
