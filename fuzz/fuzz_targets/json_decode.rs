#![no_main]

use libfuzzer_sys::fuzz_target;
use senml::{decode, encode, resolve};
use time::OffsetDateTime;

fuzz_target!(|data: &[u8]| {
    let Ok(records) = decode(data) else {
        return;
    };

    // Whatever decodes must encode, and the encoding must decode again
    let bytes = encode(&records).expect("encode decoded records");
    let again = decode(&bytes).expect("decode encoded records");
    assert_eq!(again.len(), records.len());

    let _ = resolve(&records, OffsetDateTime::UNIX_EPOCH);
});
