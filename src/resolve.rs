//! SenML resolution - applying base values to produce self-contained measurements
//!
//! Resolution walks the records of a pack once, in order. Base fields found
//! on a record overwrite the matching slot of a [`BaseContext`] and stay in
//! effect for every later record until overwritten again. Each record then
//! yields exactly one [`Measurement`] carrying an absolute name, an absolute
//! time and its unit, sum and value with the active offsets applied.

use serde::{Serialize, Serializer};
use time::OffsetDateTime;

use crate::error::{RecordError, Result, SenMLError};
use crate::record::{SenMLRecord, SenMLValue};

/// Times with a magnitude below 2^28 are relative to "now" (RFC 8428 4.5.3)
pub const RELATIVE_TIME_THRESHOLD: f64 = 268_435_456.0;

/// Version assumed when the first record carries no `bver`
pub const DEFAULT_VERSION: i64 = 10;

/// A fully resolved SenML record with all base values applied
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Base name + record name, never empty
    pub name: String,
    /// Record unit, else the active base unit
    pub unit: Option<String>,
    /// Absolute time in seconds since the Unix epoch
    pub time: f64,
    /// Base sum + record sum, if either is present
    pub sum: Option<f64>,
    /// Record value, numeric values offset by the base value
    pub value: SenMLValue,
    /// Update time (unchanged)
    pub update_time: Option<f64>,
}

impl Measurement {
    /// Convert into a base-free record, the RFC 8428 "resolved" wire form
    pub fn to_record(&self) -> SenMLRecord {
        SenMLRecord {
            name: Some(self.name.clone()),
            unit: self.unit.clone(),
            time: Some(self.time),
            sum: self.sum,
            update_time: self.update_time,
            ..SenMLRecord::new(self.value.clone())
        }
    }

    /// Absolute time as a UTC date-time, if it is representable
    pub fn timestamp(&self) -> Option<OffsetDateTime> {
        if !self.time.is_finite() {
            return None;
        }
        let nanos = (self.time * 1e9).round() as i128;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }

    /// Prefix of the name up to and including the last `/` or `:`
    pub fn base_prefix(&self) -> Option<&str> {
        self.name
            .rfind(['/', ':'])
            .map(|pos| &self.name[..pos + 1])
    }

    /// Part of the name after the last `/` or `:`
    pub fn local_name(&self) -> &str {
        match self.name.rfind(['/', ':']) {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }
}

impl Serialize for Measurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// Base values in effect at some point of a resolve pass
#[derive(Debug, Clone, PartialEq)]
pub struct BaseContext {
    pub base_name: String,
    pub base_time: f64,
    pub base_unit: Option<String>,
    pub base_value: Option<f64>,
    pub base_sum: Option<f64>,
    pub version: i64,
}

impl Default for BaseContext {
    fn default() -> Self {
        Self {
            base_name: String::new(),
            base_time: 0.0,
            base_unit: None,
            base_value: None,
            base_sum: None,
            version: DEFAULT_VERSION,
        }
    }
}

impl BaseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite every slot the record carries a base field for
    pub fn absorb(
        &mut self,
        index: usize,
        record: &SenMLRecord,
    ) -> std::result::Result<(), RecordError> {
        if let Some(version) = record.base_version {
            if index != 0 {
                return Err(RecordError::VersionNotOnFirstRecord);
            }
            self.version = version;
        }
        if let Some(ref bn) = record.base_name {
            self.base_name.clone_from(bn);
        }
        if let Some(bt) = record.base_time {
            self.base_time = bt;
        }
        if let Some(ref bu) = record.base_unit {
            // An empty base unit clears it
            self.base_unit = Some(bu.clone()).filter(|u| !u.is_empty());
        }
        if let Some(bv) = record.base_value {
            self.base_value = Some(bv);
        }
        if let Some(bs) = record.base_sum {
            self.base_sum = Some(bs);
        }
        Ok(())
    }

    /// Resolve a record against the current base values.
    ///
    /// `now` is only used when the combined time falls below
    /// [`RELATIVE_TIME_THRESHOLD`].
    pub fn measure(
        &self,
        record: &SenMLRecord,
        now: f64,
    ) -> std::result::Result<Measurement, RecordError> {
        let mut name = self.base_name.clone();
        if let Some(ref n) = record.name {
            name.push_str(n);
        }
        if name.is_empty() {
            return Err(RecordError::EmptyResolvedName);
        }

        let candidate = self.base_time + record.time.unwrap_or(0.0);
        let time = if candidate.abs() < RELATIVE_TIME_THRESHOLD {
            now + candidate
        } else {
            candidate
        };

        let unit = record
            .unit
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| self.base_unit.clone());

        let sum = match (self.base_sum, record.sum) {
            (None, None) => None,
            (base, own) => Some(base.unwrap_or(0.0) + own.unwrap_or(0.0)),
        };

        let value = match (&record.value, self.base_value) {
            (SenMLValue::Float(v), Some(bv)) => SenMLValue::Float(bv + v),
            (value, _) => value.clone(),
        };

        Ok(Measurement {
            name,
            unit,
            time,
            sum,
            value,
            update_time: record.update_time,
        })
    }
}

/// Streaming resolver over a sequence of records.
///
/// Yields one `Result<Measurement>` per record and stops after the first
/// error.
#[derive(Debug)]
pub struct Resolver<I> {
    records: I,
    context: BaseContext,
    now: f64,
    index: usize,
    failed: bool,
}

impl<I> Resolver<I> {
    pub fn new<'a, T>(records: T, now: OffsetDateTime) -> Self
    where
        T: IntoIterator<IntoIter = I>,
        I: Iterator<Item = &'a SenMLRecord>,
    {
        Self {
            records: records.into_iter(),
            context: BaseContext::new(),
            now: epoch_seconds(now),
            index: 0,
            failed: false,
        }
    }

    /// Pack version seen so far (first record's `bver`, else 10)
    pub fn version(&self) -> i64 {
        self.context.version
    }

    /// Base values in effect after the last yielded record
    pub fn context(&self) -> &BaseContext {
        &self.context
    }
}

impl<'a, I> Iterator for Resolver<I>
where
    I: Iterator<Item = &'a SenMLRecord>,
{
    type Item = Result<Measurement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let record = self.records.next()?;
        let index = self.index;
        self.index += 1;

        let resolved = self
            .context
            .absorb(index, record)
            .and_then(|()| self.context.measure(record, self.now))
            .map_err(|kind| SenMLError::record(index, kind));

        match resolved {
            Ok(measurement) => {
                tracing::trace!(
                    index,
                    name = %measurement.name,
                    time = measurement.time,
                    "resolved record"
                );
                Some(Ok(measurement))
            }
            Err(err) => {
                self.failed = true;
                tracing::debug!(index, error = %err, "resolution failed");
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, self.records.size_hint().1)
        }
    }
}

/// Resolve a whole pack. Fails without partial output on the first bad record.
pub fn resolve(records: &[SenMLRecord], now: OffsetDateTime) -> Result<Vec<Measurement>> {
    tracing::debug!(records = records.len(), "resolving SenML pack");
    let measurements = Resolver::new(records, now).collect::<Result<Vec<_>>>()?;
    tracing::debug!(
        measurements = measurements.len(),
        version = pack_version(records),
        "resolved SenML pack"
    );
    Ok(measurements)
}

/// Version declared by the first record, else [`DEFAULT_VERSION`]
pub fn pack_version(records: &[SenMLRecord]) -> i64 {
    records
        .first()
        .and_then(|record| record.base_version)
        .unwrap_or(DEFAULT_VERSION)
}

pub(crate) fn epoch_seconds(now: OffsetDateTime) -> f64 {
    now.unix_timestamp_nanos() as f64 / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(NOW).unwrap()
    }

    fn names(measurements: &[Measurement]) -> Vec<&str> {
        measurements.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_single_record_verbatim() {
        let records = vec![SenMLRecord::with_value("temp", 22.5).with_unit("Cel")];
        let resolved = resolve(&records, now()).unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "temp");
        assert_eq!(resolved[0].unit.as_deref(), Some("Cel"));
        assert_eq!(resolved[0].value, SenMLValue::Float(22.5));
        assert_eq!(resolved[0].time, NOW as f64);
        assert_eq!(resolved[0].sum, None);
    }

    #[test]
    fn test_base_name_is_sticky() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0).with_base_name("X"),
            SenMLRecord::with_value("b", 2.0),
            SenMLRecord::with_value("c", 3.0).with_base_name("Y"),
        ];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(names(&resolved), ["Xa", "Xb", "Yc"]);
    }

    #[test]
    fn test_new_base_name_keeps_other_bases() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0)
                .with_base_name("X")
                .with_base_unit("V")
                .with_base_time(1.5e9),
            SenMLRecord::with_value("b", 2.0).with_base_name("Y"),
        ];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(resolved[1].name, "Yb");
        assert_eq!(resolved[1].unit.as_deref(), Some("V"));
        assert_eq!(resolved[1].time, 1.5e9);
    }

    #[test]
    fn test_name_falls_back_to_base_name() {
        let records = vec![SenMLRecord::new(1.0).with_base_name("urn:dev:ow:1")];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(resolved[0].name, "urn:dev:ow:1");
    }

    #[test]
    fn test_empty_resolved_name() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0),
            SenMLRecord::new(2.0),
        ];
        let err = resolve(&records, now()).unwrap_err();
        assert_eq!(err, SenMLError::record(1, RecordError::EmptyResolvedName));
    }

    #[test]
    fn test_absolute_time_against_base_time() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0).with_base_time(1.276020076e9),
            SenMLRecord::with_value("a", 2.0).with_time(-5.0),
        ];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(resolved[0].time, 1.276020076e9);
        assert_eq!(resolved[1].time, 1.276020076e9 - 5.0);
    }

    #[test]
    fn test_relative_time_without_base_time() {
        let records = vec![SenMLRecord::with_value("a", 1.0).with_time(5.0)];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(resolved[0].time, NOW as f64 + 5.0);
    }

    #[test]
    fn test_threshold_applies_to_combined_time() {
        // Small base time plus small offset stays relative
        let records = vec![
            SenMLRecord::with_value("a", 1.0)
                .with_base_time(100.0)
                .with_time(-10.0),
        ];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(resolved[0].time, NOW as f64 + 90.0);

        // Exactly 2^28 counts as absolute
        let records = vec![SenMLRecord::with_value("a", 1.0).with_time(RELATIVE_TIME_THRESHOLD)];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(resolved[0].time, RELATIVE_TIME_THRESHOLD);

        // Large negative values are absolute too
        let records = vec![SenMLRecord::with_value("a", 1.0).with_time(-3.0e8)];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(resolved[0].time, -3.0e8);
    }

    #[test]
    fn test_unit_replaces_base_unit() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0).with_base_unit("A"),
            SenMLRecord::with_value("b", 2.0).with_unit("V"),
            SenMLRecord::with_value("c", 3.0),
        ];
        let resolved = resolve(&records, now()).unwrap();
        let units: Vec<_> = resolved.iter().map(|m| m.unit.as_deref()).collect();
        assert_eq!(units, [Some("A"), Some("V"), Some("A")]);
    }

    #[test]
    fn test_empty_unit_is_no_unit() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0).with_unit(""),
            SenMLRecord::with_value("b", 2.0).with_base_unit(""),
            SenMLRecord::with_value("c", 3.0).with_base_unit("A").with_unit(""),
            SenMLRecord::with_value("d", 4.0).with_base_unit(""),
        ];
        let resolved = resolve(&records, now()).unwrap();
        let units: Vec<_> = resolved.iter().map(|m| m.unit.as_deref()).collect();
        assert_eq!(units, [None, None, Some("A"), None]);
    }

    #[test]
    fn test_sum_resolution() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0),
            SenMLRecord::with_value("b", 1.0).with_sum(4.0),
            SenMLRecord::with_value("c", 1.0).with_base_sum(100.0),
            SenMLRecord::with_value("d", 1.0).with_sum(5.0),
        ];
        let resolved = resolve(&records, now()).unwrap();
        let sums: Vec<_> = resolved.iter().map(|m| m.sum).collect();
        assert_eq!(sums, [None, Some(4.0), Some(100.0), Some(105.0)]);
    }

    #[test]
    fn test_base_value_only_offsets_numbers() {
        let records = vec![
            SenMLRecord::with_value("a", 2.5).with_base_value(20.0),
            SenMLRecord::with_string_value("b", "OK"),
            SenMLRecord::with_bool_value("c", true),
            SenMLRecord::with_data_value("d", vec![1, 2]),
            SenMLRecord::with_value("e", -1.0),
        ];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(resolved[0].value, SenMLValue::Float(22.5));
        assert_eq!(resolved[1].value, SenMLValue::Text("OK".into()));
        assert_eq!(resolved[2].value, SenMLValue::Boolean(true));
        assert_eq!(resolved[3].value, SenMLValue::Opaque(vec![1, 2]));
        assert_eq!(resolved[4].value, SenMLValue::Float(19.0));
    }

    #[test]
    fn test_update_time_passes_through() {
        let records = vec![SenMLRecord::with_value("a", 1.0).with_update_time(30.0)];
        let resolved = resolve(&records, now()).unwrap();
        assert_eq!(resolved[0].update_time, Some(30.0));
    }

    #[test]
    fn test_version_on_first_record() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0).with_base_version(5),
            SenMLRecord::with_value("b", 1.0),
        ];
        let mut resolver = Resolver::new(&records, now());
        assert_eq!(resolver.version(), DEFAULT_VERSION);
        assert!(resolver.next().unwrap().is_ok());
        assert_eq!(resolver.version(), 5);
        assert_eq!(pack_version(&records), 5);
        assert_eq!(pack_version(&records[1..]), DEFAULT_VERSION);
    }

    #[test]
    fn test_version_not_on_first_record() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0),
            SenMLRecord::with_value("b", 1.0).with_base_version(10),
        ];
        let err = resolve(&records, now()).unwrap_err();
        assert_eq!(err, SenMLError::record(1, RecordError::VersionNotOnFirstRecord));
    }

    #[test]
    fn test_resolver_stops_after_error() {
        let records = vec![
            SenMLRecord::new(1.0),
            SenMLRecord::with_value("b", 1.0),
        ];
        let mut resolver = Resolver::new(&records, now());
        assert!(resolver.next().unwrap().is_err());
        assert!(resolver.next().is_none());
    }

    #[test]
    fn test_context_tracks_bases() {
        let records = vec![
            SenMLRecord::with_value("a", 1.0)
                .with_base_name("dev/")
                .with_base_sum(2.0),
        ];
        let mut resolver = Resolver::new(&records, now());
        resolver.next();
        assert_eq!(resolver.context().base_name, "dev/");
        assert_eq!(resolver.context().base_sum, Some(2.0));
        assert_eq!(resolver.context().base_value, None);
    }

    #[test]
    fn test_measurement_name_parts() {
        let m = Measurement {
            name: "urn:dev:ow:10e2073a01080063:voltage".into(),
            unit: None,
            time: 0.0,
            sum: None,
            value: SenMLValue::Float(1.0),
            update_time: None,
        };
        assert_eq!(m.base_prefix(), Some("urn:dev:ow:10e2073a01080063:"));
        assert_eq!(m.local_name(), "voltage");
    }

    #[test]
    fn test_measurement_to_record_and_timestamp() {
        let records = vec![
            SenMLRecord::with_value("temp", 1.0)
                .with_base_name("dev/")
                .with_base_time(1.32006746e9)
                .with_base_unit("Cel"),
        ];
        let resolved = resolve(&records, now()).unwrap();
        let record = resolved[0].to_record();

        assert!(!record.has_base_fields());
        assert_eq!(record.name.as_deref(), Some("dev/temp"));
        assert_eq!(record.unit.as_deref(), Some("Cel"));
        assert_eq!(record.time, Some(1.32006746e9));
        assert_eq!(
            resolved[0].timestamp().map(|t| t.unix_timestamp()),
            Some(1_320_067_460)
        );

        let json = serde_json::to_string(&resolved[0]).unwrap();
        assert_eq!(json, r#"{"n":"dev/temp","u":"Cel","v":1.0,"t":1320067460.0}"#);
    }
}
