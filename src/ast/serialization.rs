//! JSON helpers for domain and instance definitions.
//!
//! Serde provides the encoding; these helpers centralize error mapping and
//! keep formatting stable for files produced by external parsers.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{SimError, SimResult};

/// Serialize a definition to pretty JSON.
pub fn to_json_pretty<T: Serialize>(value: &T) -> SimResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| SimError::internal(format!("serialize definition: {e}")))
}

/// Deserialize a definition from JSON.
///
/// Callers should then invoke `validate()` (or ground the definition, which
/// validates) before use.
pub fn from_json<T: DeserializeOwned>(s: &str) -> SimResult<T> {
    serde_json::from_str::<T>(s).map_err(|e| SimError::internal(format!("deserialize definition: {e}")))
}

/// Read and deserialize a JSON definition file.
pub fn from_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> SimResult<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| SimError::internal(format!("read {}: {e}", path.display())))?;
    from_json(&text)
}
