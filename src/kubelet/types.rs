//! Kubelet Stats Summary Types
//!
//! Rust definitions for the subset of the kubelet `/stats/summary` document the
//! exporter consumes. Unknown fields are ignored so newer kubelets keep decoding.
//!
//! # Design Notes
//!
//! - **Optional quantities**: every capacity and inode figure is `Option<u64>`;
//!   the kubelet omits them for volumes it cannot measure.
//! - **Null values**: an explicit JSON `null` decodes like a missing key, so
//!   `"pods": null` is an empty pod list and `"namespace": null` an empty string.
//! - **Ephemeral storage**: decoded for completeness, never exported.
//! - **Dead Code**: some fields (`uid`, `node_name`) are informational only.

#![allow(dead_code)]
use crate::error::Result;
use serde::{Deserialize, Deserializer};

/// Decoded `/stats/summary` response
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Summary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub node: NodeStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pods: Vec<PodStats>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub node_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub pod_ref: PodReference,
    #[serde(default, rename = "volume", deserialize_with = "null_as_default")]
    pub volumes: Vec<VolumeStats>,
    #[serde(default, rename = "ephemeral-storage")]
    pub ephemeral_storage: Option<VolumeStats>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PodReference {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub namespace: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uid: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub pvc_ref: Option<PvcReference>,
    #[serde(default)]
    pub capacity_bytes: Option<u64>,
    #[serde(default)]
    pub used_bytes: Option<u64>,
    #[serde(default)]
    pub available_bytes: Option<u64>,
    #[serde(default, rename = "inodes")]
    pub inodes_total: Option<u64>,
    #[serde(default)]
    pub inodes_free: Option<u64>,
    #[serde(default)]
    pub inodes_used: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PvcReference {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub namespace: String,
}

/// Decode `null` as the type's default instead of failing
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Summary {
    /// Decode a raw response body.
    ///
    /// Fails with [`ExporterError::Decode`](crate::error::ExporterError::Decode)
    /// on malformed JSON or on fields of the wrong shape.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}
