//! Decode a SenML pack, resolve it and print both forms
//!
//! Reads a pack from the file named on the command line, or uses a built-in
//! sample. Set `RUST_LOG=senml=trace` to see per-record resolution.

use senml::{SenMLPack, SenMLValue};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = r#"[
  {"bn":"urn:dev:ow:10e2073a0108006:","bt":1.276020076001e+09,"bu":"A","bver":5,"n":"voltage","u":"V","v":120.1},
  {"n":"current","t":-5,"v":1.2},
  {"n":"current","t":-4,"v":1.3},
  {"n":"current","v":1.7},
  {"n":"label","vs":"Machine Room"},
  {"n":"open","vb":false}
]"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let input = match std::env::args().nth(1) {
        Some(path) => std::fs::read(path)?,
        None => SAMPLE.as_bytes().to_vec(),
    };

    let mut pack = SenMLPack::from_json_bytes(&input)?;
    println!("Decoded {} records (version {})", pack.len(), pack.version());

    for m in pack.resolve(OffsetDateTime::now_utc())? {
        let when = m
            .timestamp()
            .and_then(|t| t.format(&Rfc3339).ok())
            .unwrap_or_else(|| m.time.to_string());
        let value = match &m.value {
            SenMLValue::Float(v) => v.to_string(),
            SenMLValue::Text(s) => format!("{s:?}"),
            SenMLValue::Boolean(b) => b.to_string(),
            SenMLValue::Opaque(d) => format!("{} bytes", d.len()),
        };
        println!(
            "  {:<45} {:>10} {:<4} {}",
            m.name,
            value,
            m.unit.as_deref().unwrap_or(""),
            when
        );
    }

    let resolved = SenMLPack::from_measurements(pack.measurements().unwrap_or_default());
    println!("Resolved form:\n{}", resolved.to_json_pretty()?);
    Ok(())
}
