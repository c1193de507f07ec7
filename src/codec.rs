//! State serialization for cells.
//!
//! A [`Codec`] turns the in-memory state of a store into bytes and
//! back. Map-shaped states serialize as canonical JSON: states are
//! `BTreeMap`s, so keys come out lexicographically sorted without any
//! extra bookkeeping and the same state always produces the same bytes.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StoreError};
use crate::ttl::TtlEntry;

/// In-memory state of a preference store.
pub type PrefState = BTreeMap<String, String>;

/// In-memory state of a TTL store.
pub type TtlState = BTreeMap<String, TtlEntry>;

/// Serializes a store's state to bytes and back.
pub trait Codec<T>: Send + Sync + 'static {
    /// The state adopted when the backing file is missing, empty, or
    /// unreadable.
    fn default_value(&self) -> T;

    /// Encode state to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] if serialization fails.
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode state from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] if the bytes are not a valid
    /// serialization of `T`.
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// Canonical JSON codec for any serde-compatible state with a default.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Default + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn default_value(&self) -> T {
        T::default()
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(StoreError::codec)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(StoreError::codec)
    }
}

/// Identity codec over a single UTF-8 string; used by the document
/// store. Default value is the empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec<String> for TextCodec {
    fn default_value(&self) -> String {
        String::new()
    }

    fn encode(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.clone().into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(StoreError::codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_codec_round_trips() {
        let codec: JsonCodec<PrefState> = JsonCodec::new();
        let mut state = PrefState::new();
        state.insert("name".to_string(), "Santiago".to_string());
        state.insert("age".to_string(), "30".to_string());

        let bytes = codec.encode(&state).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), state);
    }

    #[test]
    fn map_codec_sorts_keys() {
        let codec: JsonCodec<PrefState> = JsonCodec::new();
        let mut state = PrefState::new();
        state.insert("zebra".to_string(), "1".to_string());
        state.insert("apple".to_string(), "2".to_string());

        let json = String::from_utf8(codec.encode(&state).unwrap()).unwrap();
        assert_eq!(json, r#"{"apple":"2","zebra":"1"}"#);
    }

    #[test]
    fn map_codec_rejects_garbage() {
        let codec: JsonCodec<PrefState> = JsonCodec::new();
        assert!(codec.decode(b"not json").is_err());
    }

    #[test]
    fn text_codec_is_identity() {
        let codec = TextCodec;
        let bytes = codec.encode(&"hello world".to_string()).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), "hello world");
        assert_eq!(codec.default_value(), "");
    }
}
