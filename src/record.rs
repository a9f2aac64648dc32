//! SenML Record types and values
//!
//! A [`SenMLRecord`] is one element of the wire array in its *unresolved*
//! form: base fields are kept exactly as they appeared on the wire and are
//! only applied by [`crate::resolve`].

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::RecordError;

/// Wire keys of the JSON representation (RFC 8428 section 4)
pub mod keys {
    pub const BASE_NAME: &str = "bn";
    pub const BASE_TIME: &str = "bt";
    pub const BASE_UNIT: &str = "bu";
    pub const BASE_VALUE: &str = "bv";
    pub const BASE_SUM: &str = "bs";
    pub const BASE_VERSION: &str = "bver";
    pub const NAME: &str = "n";
    pub const UNIT: &str = "u";
    pub const SUM: &str = "s";
    pub const TIME: &str = "t";
    pub const UPDATE_TIME: &str = "ut";
    pub const VALUE: &str = "v";
    pub const STRING_VALUE: &str = "vs";
    pub const BOOL_VALUE: &str = "vb";
    pub const DATA_VALUE: &str = "vd";

    /// Discriminant keys, one of which selects the value variant
    pub const VALUE_KEYS: [&str; 4] = [VALUE, STRING_VALUE, BOOL_VALUE, DATA_VALUE];
}

/// The value carried by a record
#[derive(Debug, Clone, PartialEq)]
pub enum SenMLValue {
    /// Numeric value (`v`)
    Float(f64),
    /// String value (`vs`)
    Text(String),
    /// Boolean value (`vb`)
    Boolean(bool),
    /// Binary data (`vd`, base64 on the wire)
    Opaque(Vec<u8>),
}

impl SenMLValue {
    /// Wire key that carries this variant
    pub fn key(&self) -> &'static str {
        match self {
            Self::Float(_) => keys::VALUE,
            Self::Text(_) => keys::STRING_VALUE,
            Self::Boolean(_) => keys::BOOL_VALUE,
            Self::Opaque(_) => keys::DATA_VALUE,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Opaque(d) => Some(d.as_slice()),
            _ => None,
        }
    }
}

impl From<f64> for SenMLValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for SenMLValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SenMLValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for SenMLValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<u8>> for SenMLValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Opaque(value)
    }
}

impl Serialize for SenMLValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Opaque(d) => serializer.serialize_str(&encode_base64(d)),
        }
    }
}

/// A SenML Record represents a single sensor measurement or device parameter
///
/// Every field except the value is optional. Base fields (`base_*`) set
/// defaults that the resolver carries forward to later records of the same
/// pack until another record overrides them.
#[derive(Debug, Clone, PartialEq)]
pub struct SenMLRecord {
    /// Base Name - prefix prepended to this and later names
    pub base_name: Option<String>,
    /// Base Time - time origin for this and later records
    pub base_time: Option<f64>,
    /// Base Unit - default unit for this and later records
    pub base_unit: Option<String>,
    /// Base Value - offset added to numeric values
    pub base_value: Option<f64>,
    /// Base Sum - offset added to sums
    pub base_sum: Option<f64>,
    /// Base Version - only meaningful on the first record of a pack
    pub base_version: Option<i64>,
    /// Name - suffix appended to the base name
    pub name: Option<String>,
    /// Unit - SI unit or custom unit string
    pub unit: Option<String>,
    /// Sum - integrated sum of values over time
    pub sum: Option<f64>,
    /// Time - offset from base time, or absolute
    pub time: Option<f64>,
    /// Update Time - maximum time before next update
    pub update_time: Option<f64>,
    /// The reading itself
    pub value: SenMLValue,
}

impl SenMLRecord {
    /// Create a record carrying only a value
    pub fn new<V: Into<SenMLValue>>(value: V) -> Self {
        Self {
            base_name: None,
            base_time: None,
            base_unit: None,
            base_value: None,
            base_sum: None,
            base_version: None,
            name: None,
            unit: None,
            sum: None,
            time: None,
            update_time: None,
            value: value.into(),
        }
    }

    /// Create a record with a numeric value
    pub fn with_value<S: Into<String>>(name: S, value: f64) -> Self {
        Self::new(value).with_name(name)
    }

    /// Create a record with a string value
    pub fn with_string_value<S: Into<String>, V: Into<String>>(name: S, value: V) -> Self {
        Self::new(SenMLValue::Text(value.into())).with_name(name)
    }

    /// Create a record with a boolean value
    pub fn with_bool_value<S: Into<String>>(name: S, value: bool) -> Self {
        Self::new(value).with_name(name)
    }

    /// Create a record with binary data
    pub fn with_data_value<S: Into<String>>(name: S, data: Vec<u8>) -> Self {
        Self::new(data).with_name(name)
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_sum(mut self, sum: f64) -> Self {
        self.sum = Some(sum);
        self
    }

    pub fn with_update_time(mut self, ut: f64) -> Self {
        self.update_time = Some(ut);
        self
    }

    pub fn with_base_name<S: Into<String>>(mut self, base_name: S) -> Self {
        self.base_name = Some(base_name.into());
        self
    }

    pub fn with_base_time(mut self, base_time: f64) -> Self {
        self.base_time = Some(base_time);
        self
    }

    pub fn with_base_unit<S: Into<String>>(mut self, base_unit: S) -> Self {
        self.base_unit = Some(base_unit.into());
        self
    }

    pub fn with_base_value(mut self, base_value: f64) -> Self {
        self.base_value = Some(base_value);
        self
    }

    pub fn with_base_sum(mut self, base_sum: f64) -> Self {
        self.base_sum = Some(base_sum);
        self
    }

    pub fn with_base_version(mut self, version: i64) -> Self {
        self.base_version = Some(version);
        self
    }

    /// Check if this record sets any base field
    pub fn has_base_fields(&self) -> bool {
        self.base_name.is_some()
            || self.base_time.is_some()
            || self.base_unit.is_some()
            || self.base_value.is_some()
            || self.base_sum.is_some()
            || self.base_version.is_some()
    }

    /// The form this record takes after an encode/decode round trip:
    /// optional fields holding their zero value are dropped.
    pub fn without_zero_fields(mut self) -> Self {
        fn text(field: &mut Option<String>) {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }
        fn number(field: &mut Option<f64>) {
            if *field == Some(0.0) {
                *field = None;
            }
        }

        text(&mut self.base_name);
        text(&mut self.base_unit);
        text(&mut self.name);
        text(&mut self.unit);
        number(&mut self.base_time);
        number(&mut self.base_value);
        number(&mut self.base_sum);
        number(&mut self.sum);
        number(&mut self.time);
        number(&mut self.update_time);
        if self.base_version == Some(0) {
            self.base_version = None;
        }
        self
    }

    /// Decode one record from an untyped JSON object.
    ///
    /// Exactly one of `v`, `vs`, `vb`, `vd` must be present. Unknown keys
    /// are ignored.
    pub fn from_json_object(obj: &Map<String, Value>) -> Result<Self, RecordError> {
        let present: Vec<&'static str> = keys::VALUE_KEYS
            .iter()
            .copied()
            .filter(|key| obj.contains_key(*key))
            .collect();

        let value = match present.len() {
            0 => return Err(RecordError::MissingValueKind),
            1 => decode_value(obj, present[0])?,
            _ => return Err(RecordError::AmbiguousValueKind { keys: present }),
        };

        Ok(Self {
            base_name: string_field(obj, keys::BASE_NAME)?,
            base_time: number_field(obj, keys::BASE_TIME)?,
            base_unit: string_field(obj, keys::BASE_UNIT)?,
            base_value: number_field(obj, keys::BASE_VALUE)?,
            base_sum: number_field(obj, keys::BASE_SUM)?,
            base_version: integer_field(obj, keys::BASE_VERSION)?,
            name: string_field(obj, keys::NAME)?,
            unit: string_field(obj, keys::UNIT)?,
            sum: number_field(obj, keys::SUM)?,
            time: number_field(obj, keys::TIME)?,
            update_time: number_field(obj, keys::UPDATE_TIME)?,
            value,
        })
    }

    /// Decode one record from any JSON value, rejecting non-objects
    pub fn from_json_value(value: &Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(obj) => Self::from_json_object(obj),
            _ => Err(RecordError::NotAnObject),
        }
    }
}

fn decode_value(obj: &Map<String, Value>, key: &'static str) -> Result<SenMLValue, RecordError> {
    let value = match key {
        keys::VALUE => number_field(obj, key)?.map(SenMLValue::Float),
        keys::STRING_VALUE => string_field(obj, key)?.map(SenMLValue::Text),
        keys::BOOL_VALUE => bool_field(obj, key)?.map(SenMLValue::Boolean),
        _ => match string_field(obj, key)? {
            Some(text) => Some(SenMLValue::Opaque(
                decode_base64(&text)
                    .ok_or_else(|| RecordError::field_type(key, "a base64 string"))?,
            )),
            None => None,
        },
    };
    value.ok_or(RecordError::MissingValueKind)
}

fn number_field(obj: &Map<String, Value>, key: &'static str) -> Result<Option<f64>, RecordError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| RecordError::field_type(key, "a number")),
    }
}

fn integer_field(obj: &Map<String, Value>, key: &'static str) -> Result<Option<i64>, RecordError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| RecordError::field_type(key, "an integer")),
    }
}

fn string_field(
    obj: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, RecordError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_owned()))
            .ok_or_else(|| RecordError::field_type(key, "a string")),
    }
}

fn bool_field(obj: &Map<String, Value>, key: &'static str) -> Result<Option<bool>, RecordError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| RecordError::field_type(key, "a boolean")),
    }
}

impl Serialize for SenMLRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        fn text<M: SerializeMap>(
            map: &mut M,
            key: &'static str,
            field: &Option<String>,
        ) -> Result<(), M::Error> {
            match field.as_deref() {
                Some(s) if !s.is_empty() => map.serialize_entry(key, s),
                _ => Ok(()),
            }
        }
        fn number<M: SerializeMap>(
            map: &mut M,
            key: &'static str,
            field: Option<f64>,
        ) -> Result<(), M::Error> {
            match field {
                Some(n) if n != 0.0 => map.serialize_entry(key, &n),
                _ => Ok(()),
            }
        }

        let mut map = serializer.serialize_map(None)?;
        text(&mut map, keys::BASE_NAME, &self.base_name)?;
        number(&mut map, keys::BASE_TIME, self.base_time)?;
        text(&mut map, keys::BASE_UNIT, &self.base_unit)?;
        number(&mut map, keys::BASE_VALUE, self.base_value)?;
        number(&mut map, keys::BASE_SUM, self.base_sum)?;
        if let Some(version) = self.base_version.filter(|v| *v != 0) {
            map.serialize_entry(keys::BASE_VERSION, &version)?;
        }
        text(&mut map, keys::NAME, &self.name)?;
        text(&mut map, keys::UNIT, &self.unit)?;
        map.serialize_entry(self.value.key(), &self.value)?;
        number(&mut map, keys::SUM, self.sum)?;
        number(&mut map, keys::TIME, self.time)?;
        number(&mut map, keys::UPDATE_TIME, self.update_time)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for SenMLRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let obj = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_json_object(&obj).map_err(de::Error::custom)
    }
}

/// RFC 8428 uses the URL-safe alphabet without padding
pub(crate) fn encode_base64(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Accepts URL-safe and standard alphabets, padded or not
pub(crate) fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let trimmed = text.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()
}
