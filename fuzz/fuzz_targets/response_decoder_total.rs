#![no_main]

use libfuzzer_sys::fuzz_target;
use triage_core::{decode_turn, TurnPayload, MAX_REQUESTED_FILES};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let decoded = decode_turn(&raw);
    assert_eq!(decoded, decode_turn(&raw));
    assert!(decoded.requested_files().len() <= MAX_REQUESTED_FILES);
    if let TurnPayload::Malformed(text) = &decoded.payload {
        assert_eq!(text.as_str(), raw.as_ref());
    }
    if let Some(response) = decoded.response() {
        if !matches!(decoded.payload, TurnPayload::Malformed(_)) {
            assert!(!response.trim().is_empty());
        }
    }
});
