use std::fmt;

use bw_core::{StateBlob, StoryInterpreter};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ExploreError;

/// Content hash of a state blob. Serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateHash([u8; 32]);

impl StateHash {
    pub fn of(blob: &StateBlob) -> Self {
        Self(*blake3::hash(blob.as_bytes()).as_bytes())
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    pub fn from_hex(raw: &str) -> Result<Self, blake3::HexError> {
        blake3::Hash::from_hex(raw).map(|hash| Self(*hash.as_bytes()))
    }

    /// First 12 hex digits, for log lines.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl From<[u8; 32]> for StateHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateHash({})", self.short())
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for StateHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        StateHash::from_hex(&raw).map_err(D::Error::custom)
    }
}

pub fn encode<I>(interp: &I) -> Result<StateBlob, ExploreError>
where
    I: StoryInterpreter + ?Sized,
{
    interp.capture_state().map_err(ExploreError::Codec)
}

pub fn decode<I>(interp: &mut I, blob: &StateBlob) -> Result<(), ExploreError>
where
    I: StoryInterpreter + ?Sized,
{
    interp.restore_state(blob).map_err(ExploreError::Codec)
}

pub fn hash(blob: &StateBlob) -> StateHash {
    StateHash::of(blob)
}
