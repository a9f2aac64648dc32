//! SenML Pack - collection of SenML records

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use crate::config::Config;
use crate::resolve::{self, Measurement};
use crate::{Result, SenMLError, SenMLRecord, json};

/// A SenML Pack represents an ordered collection of SenML records
///
/// According to RFC 8428, a SenML Pack is an array of SenML Records. Base
/// fields on a record apply to that record and every later one until
/// overridden, so record order is significant. The resolved measurements are
/// computed on demand and cached, keyed by the `now` they were resolved
/// against, until the records change.
///
/// Equality compares records only.
#[derive(Debug, Clone, Default)]
pub struct SenMLPack {
    records: Vec<SenMLRecord>,
    resolved: Option<Resolved>,
}

#[derive(Debug, Clone)]
struct Resolved {
    now: OffsetDateTime,
    measurements: Vec<Measurement>,
}

impl SenMLPack {
    /// Create a new empty pack
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<SenMLRecord>) -> Self {
        Self {
            records,
            resolved: None,
        }
    }

    /// Build a pack in resolved form: one base-free record per measurement
    pub fn from_measurements(measurements: &[Measurement]) -> Self {
        measurements.iter().map(Measurement::to_record).collect()
    }

    /// Add a record to this pack
    pub fn add_record(&mut self, record: SenMLRecord) {
        self.resolved = None;
        self.records.push(record);
    }

    /// Add multiple records to this pack
    pub fn add_records<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = SenMLRecord>,
    {
        self.resolved = None;
        self.records.extend(records);
    }

    pub fn records(&self) -> &[SenMLRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SenMLRecord> {
        self.records
    }

    /// Get the number of records in this pack
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if this pack is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in this pack
    pub fn iter(&self) -> std::slice::Iter<'_, SenMLRecord> {
        self.records.iter()
    }

    /// Version declared by the first record, 10 if absent
    pub fn version(&self) -> i64 {
        resolve::pack_version(&self.records)
    }

    /// Resolve all records, anchoring relative times to `now`.
    ///
    /// The result is cached and reused while `now` and the records stay the
    /// same.
    pub fn resolve(&mut self, now: OffsetDateTime) -> Result<&[Measurement]> {
        let resolved = match self.resolved.take() {
            Some(cached) if cached.now == now => cached,
            _ => Resolved {
                now,
                measurements: resolve::resolve(&self.records, now)?,
            },
        };
        Ok(self.resolved.insert(resolved).measurements.as_slice())
    }

    /// Resolve against the system clock
    pub fn resolve_now(&mut self) -> Result<&[Measurement]> {
        self.resolve(OffsetDateTime::now_utc())
    }

    /// Resolved measurements, if [`SenMLPack::resolve`] has run
    pub fn measurements(&self) -> Option<&[Measurement]> {
        self.resolved.as_ref().map(|r| r.measurements.as_slice())
    }

    /// The moment relative times were anchored to in the cached measurements
    pub fn resolved_at(&self) -> Option<OffsetDateTime> {
        self.resolved.as_ref().map(|r| r.now)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Resolved measurements whose name contains `pattern`
    pub fn matching(&self, pattern: &str) -> Vec<&Measurement> {
        self.measurements()
            .unwrap_or_default()
            .iter()
            .filter(|m| m.name.contains(pattern))
            .collect()
    }

    /// Earliest and latest resolved time
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.measurements()?
            .iter()
            .map(|m| m.time)
            .fold(None, |range, t| match range {
                None => Some((t, t)),
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            })
    }
}

// Convenience methods for serialization
impl SenMLPack {
    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_bytes(json.as_bytes())
    }

    /// Deserialize SenML pack from JSON bytes
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        json::decode(bytes).map(Self::from_records)
    }

    /// Deserialize, then resolve if the config asks for it
    pub fn from_json_with(bytes: &[u8], config: &Config) -> Result<Self> {
        let mut pack = Self::from_json_bytes(bytes)?;
        if config.resolve {
            pack.resolve(config.now())?;
        }
        Ok(pack)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String> {
        String::from_utf8(self.to_json_bytes()?).map_err(|e| SenMLError::serialization(e.to_string()))
    }

    /// Serialize to pretty JSON string
    pub fn to_json_pretty(&self) -> Result<String> {
        String::from_utf8(json::encode_pretty(&self.records)?)
            .map_err(|e| SenMLError::serialization(e.to_string()))
    }

    /// Serialize SenML pack to JSON bytes
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        json::encode(&self.records)
    }
}

impl PartialEq for SenMLPack {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Serialize for SenMLPack {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SenMLPack {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<SenMLRecord>::deserialize(deserializer).map(Self::from_records)
    }
}

impl From<Vec<SenMLRecord>> for SenMLPack {
    fn from(records: Vec<SenMLRecord>) -> Self {
        Self::from_records(records)
    }
}

impl FromIterator<SenMLRecord> for SenMLPack {
    fn from_iter<I: IntoIterator<Item = SenMLRecord>>(iter: I) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

impl IntoIterator for SenMLPack {
    type Item = SenMLRecord;
    type IntoIter = std::vec::IntoIter<SenMLRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a SenMLPack {
    type Item = &'a SenMLRecord;
    type IntoIter = std::slice::Iter<'a, SenMLRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
