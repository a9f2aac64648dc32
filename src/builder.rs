//! Builder pattern for creating SenML packs

use time::OffsetDateTime;

use crate::resolve::epoch_seconds;
use crate::{SenMLPack, SenMLRecord};

/// Builder for creating SenML packs with a fluent API
///
/// Base values end up on the first record of the built pack, where they
/// apply to every record.
#[derive(Debug, Default)]
pub struct SenMLBuilder {
    base_name: Option<String>,
    base_time: Option<f64>,
    base_unit: Option<String>,
    base_value: Option<f64>,
    base_sum: Option<f64>,
    base_version: Option<i64>,
    records: Vec<SenMLRecord>,
}

impl SenMLBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base name for all records
    pub fn base_name<S: Into<String>>(mut self, name: S) -> Self {
        self.base_name = Some(name.into());
        self
    }

    /// Set the base time for all records
    pub fn base_time(mut self, time: f64) -> Self {
        self.base_time = Some(time);
        self
    }

    /// Set the base unit for all records
    pub fn base_unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.base_unit = Some(unit.into());
        self
    }

    /// Set the base value to add to all numeric values
    pub fn base_value(mut self, value: f64) -> Self {
        self.base_value = Some(value);
        self
    }

    /// Set the base sum value
    pub fn base_sum(mut self, sum: f64) -> Self {
        self.base_sum = Some(sum);
        self
    }

    pub fn base_version(mut self, version: i64) -> Self {
        self.base_version = Some(version);
        self
    }

    /// Add a record with a numeric value
    pub fn add_value<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.records.push(SenMLRecord::with_value(name, value));
        self
    }

    /// Add a record with a string value
    pub fn add_string_value<S: Into<String>, V: Into<String>>(mut self, name: S, value: V) -> Self {
        self.records.push(SenMLRecord::with_string_value(name, value));
        self
    }

    /// Add a record with a boolean value
    pub fn add_bool_value<S: Into<String>>(mut self, name: S, value: bool) -> Self {
        self.records.push(SenMLRecord::with_bool_value(name, value));
        self
    }

    /// Add a record with binary data
    pub fn add_data_value<S: Into<String>>(mut self, name: S, data: Vec<u8>) -> Self {
        self.records.push(SenMLRecord::with_data_value(name, data));
        self
    }

    /// Add a measurement with timestamp
    pub fn add_measurement<S: Into<String>>(mut self, name: S, value: f64, time: f64) -> Self {
        self.records
            .push(SenMLRecord::with_value(name, value).with_time(time));
        self
    }

    /// Add a measurement with unit and timestamp
    pub fn add_measurement_with_unit<S: Into<String>, U: Into<String>>(
        mut self,
        name: S,
        value: f64,
        unit: U,
        time: f64,
    ) -> Self {
        self.records.push(
            SenMLRecord::with_value(name, value)
                .with_unit(unit)
                .with_time(time),
        );
        self
    }

    /// Add an existing record
    pub fn add_record(mut self, record: SenMLRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Add multiple records at once
    pub fn add_records<I>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = SenMLRecord>,
    {
        self.records.extend(records);
        self
    }

    /// Build the SenML pack. Base values are dropped if no record was added.
    pub fn build(self) -> SenMLPack {
        let mut records = self.records;

        if let Some(first) = records.first_mut() {
            if self.base_name.is_some() {
                first.base_name = self.base_name;
            }
            if self.base_time.is_some() {
                first.base_time = self.base_time;
            }
            if self.base_unit.is_some() {
                first.base_unit = self.base_unit;
            }
            if self.base_value.is_some() {
                first.base_value = self.base_value;
            }
            if self.base_sum.is_some() {
                first.base_sum = self.base_sum;
            }
            if self.base_version.is_some() {
                first.base_version = self.base_version;
            }
        }

        SenMLPack::from_records(records)
    }
}

/// Specialized builder for time-series data
///
/// All readings share the base name, so every record's own name is empty
/// and the series resolves to one fully qualified name.
#[derive(Debug)]
pub struct TimeSeriesBuilder {
    base_name: String,
    base_time: f64,
    base_unit: Option<String>,
    measurements: Vec<(f64, f64)>, // (relative_time, value)
}

impl TimeSeriesBuilder {
    /// Create a new time series builder
    pub fn new<S: Into<String>>(base_name: S, base_time: f64) -> Self {
        Self {
            base_name: base_name.into(),
            base_time,
            base_unit: None,
            measurements: Vec::new(),
        }
    }

    /// Set the unit for all measurements
    pub fn unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.base_unit = Some(unit.into());
        self
    }

    /// Add a measurement at a relative time
    pub fn measurement(mut self, relative_time: f64, value: f64) -> Self {
        self.measurements.push((relative_time, value));
        self
    }

    /// Add measurements from an iterator
    pub fn measurements<I>(mut self, measurements: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        self.measurements.extend(measurements);
        self
    }

    /// Add measurement with current timestamp
    pub fn measurement_now(mut self, value: f64) -> Self {
        let relative_time = epoch_seconds(OffsetDateTime::now_utc()) - self.base_time;
        self.measurements.push((relative_time, value));
        self
    }

    /// Build the time series pack
    pub fn build(self) -> SenMLPack {
        let mut builder = SenMLBuilder::new()
            .base_name(self.base_name)
            .base_time(self.base_time);

        if let Some(unit) = self.base_unit {
            builder = builder.base_unit(unit);
        }

        for (time, value) in self.measurements {
            builder = builder.add_record(SenMLRecord::new(value).with_time(time));
        }

        builder.build()
    }
}
