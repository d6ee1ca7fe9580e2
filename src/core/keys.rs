//! Content-addressed asset keys.
//!
//! Key = SHA-256 over `name==<timeline len>x<track len>:<meta>@<load counter>`.
//! The load counter makes every load unique, even for identical content.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};

use super::asset::AssetData;

/// Length of the truncated display form
pub const SHORT_KEY_LEN: usize = 10;

/// Opaque asset address: full hex digest plus a truncated display form.
///
/// Equality and hashing use the full digest only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetKey {
    hex: String,
    short: String,
}

impl AssetKey {
    /// Wrap an existing hex digest (e.g. a key echoed back by a client)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        let hex = hex.into();
        let short = hex.chars().take(SHORT_KEY_LEN).collect();
        Self { hex, short }
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    pub fn short(&self) -> &str {
        &self.short
    }
}

impl PartialEq for AssetKey {
    fn eq(&self, other: &Self) -> bool {
        self.hex == other.hex
    }
}

impl Eq for AssetKey {}

impl Hash for AssetKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hex.hash(state);
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short)
    }
}

/// Identifying fields hashed into a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFields<'a> {
    pub name: &'a str,
    pub timeline_len: usize,
    pub track_len: usize,
    pub meta_signature: String,
}

impl<'a> KeyFields<'a> {
    pub fn from_data(data: &'a AssetData) -> Self {
        Self {
            name: &data.name,
            timeline_len: data.timeline.len(),
            track_len: data.track.len(),
            meta_signature: data.meta_signature(),
        }
    }
}

/// Derive the key for one load event. Pure and deterministic.
pub fn generate_key(fields: &KeyFields<'_>, load_counter: u64) -> AssetKey {
    let input = format!(
        "{}=={}x{}:{}@{}",
        fields.name, fields.timeline_len, fields.track_len, fields.meta_signature, load_counter
    );

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let hex = format!("{:x}", hasher.finalize());

    AssetKey::from_hex(hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::Rgb;
    use std::collections::HashSet;

    fn fields() -> KeyFields<'static> {
        KeyFields {
            name: "chase",
            timeline_len: 3,
            track_len: 0,
            meta_signature: "null".into(),
        }
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = generate_key(&fields(), 7);
        let b = generate_key(&fields(), 7);
        assert_eq!(a, b);
        assert_eq!(a.hex().len(), 64);
        assert_eq!(a.short().len(), SHORT_KEY_LEN);
        assert!(a.hex().starts_with(a.short()));
    }

    #[test]
    fn test_counter_changes_key() {
        let keys: HashSet<AssetKey> = (0..100).map(|n| generate_key(&fields(), n)).collect();
        assert_eq!(keys.len(), 100);
    }

    #[test]
    fn test_fields_from_data() {
        let data = AssetData::new("wash", vec![Rgb::ZERO, Rgb::ZERO])
            .with_track(vec![serde_json::json!(1)])
            .with_meta(serde_json::json!({"a": 1}));
        let f = KeyFields::from_data(&data);
        assert_eq!(f.name, "wash");
        assert_eq!(f.timeline_len, 2);
        assert_eq!(f.track_len, 1);
        assert_eq!(f.meta_signature, r#"{"a":1}"#);
    }

    #[test]
    fn test_display_uses_short_form() {
        let key = AssetKey::from_hex("0123456789abcdef");
        assert_eq!(key.to_string(), "0123456789");
    }
}
