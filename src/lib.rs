//! # SenML - Sensor Measurement Lists for Rust
//!
//! Decoding, resolution and encoding of the JSON representation of
//! [RFC 8428](https://tools.ietf.org/html/rfc8428) Sensor Measurement Lists.
//!
//! A SenML pack is a JSON array of records. Records may carry *base fields*
//! (`bn`, `bt`, `bu`, `bv`, `bs`) that apply to themselves and to every later
//! record until overridden. Resolution applies those rules and turns each
//! record into a self-contained [`Measurement`].
//!
//! ## Quick Start
//!
//! ```rust
//! use senml::{SenMLPack, Result};
//! use time::OffsetDateTime;
//!
//! fn example() -> Result<()> {
//!     let json = br#"[
//!         {"bn":"urn:dev:ow:10e2073a01080063:","bt":1.276020076e9,"n":"voltage","u":"V","v":120.1},
//!         {"n":"current","t":-5,"u":"A","v":1.2}
//!     ]"#;
//!
//!     let mut pack = SenMLPack::from_json_bytes(json)?;
//!     for m in pack.resolve(OffsetDateTime::now_utc())? {
//!         println!("{} = {:?} {:?} @ {}", m.name, m.value, m.unit, m.time);
//!     }
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! The free functions [`decode`], [`resolve()`] and [`encode`] expose the
//! same pipeline without the [`SenMLPack`] container.

pub mod builder;
pub mod config;
pub mod error;
pub mod json;
pub mod pack;
pub mod record;
pub mod resolve;

// Re-export main types
pub use builder::{SenMLBuilder, TimeSeriesBuilder};
pub use config::Config;
pub use error::{RecordError, Result, SenMLError};
pub use json::{decode, encode};
pub use pack::SenMLPack;
pub use record::{SenMLRecord, SenMLValue};
pub use resolve::{BaseContext, Measurement, Resolver, resolve};

/// Media types for SenML payloads
pub mod content_type {
    pub use crate::json::SENML_JSON_CONTENT_TYPE as SENML_JSON;
}
