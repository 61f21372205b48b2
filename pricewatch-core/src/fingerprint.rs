//! Dataset fingerprinting: content identity of a bar series.
//!
//! Two requests that return byte-identical bars (and use the same feature
//! and classifier settings) train identical models, so the fingerprint is a
//! safe cache key.

use crate::domain::{Bar, DatasetHash, Interval, Period};
use serde::Serialize;

/// BLAKE3 hash over every bar field, in series order.
pub fn dataset_hash(bars: &[Bar]) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    DatasetHash(hasher.finalize().to_hex().to_string())
}

/// Hash of bars plus any serializable settings that shape the result.
///
/// Settings that cannot be serialized are an error, never silently left
/// out of the hash.
pub fn dataset_hash_with<S: Serialize>(
    bars: &[Bar],
    settings: &S,
) -> Result<DatasetHash, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(dataset_hash(bars).0.as_bytes());
    serde_json::to_writer(&mut hasher, settings)?;
    Ok(DatasetHash(hasher.finalize().to_hex().to_string()))
}

/// Cache identity of a trained model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
    pub dataset: DatasetHash,
}

impl ModelKey {
    pub fn new<S: Serialize>(
        symbol: &str,
        period: Period,
        bars: &[Bar],
        settings: &S,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            symbol: symbol.to_string(),
            period,
            interval: period.interval(),
            dataset: dataset_hash_with(bars, settings)?,
        })
    }
}
