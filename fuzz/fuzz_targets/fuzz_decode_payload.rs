#![no_main]

use libfuzzer_sys::fuzz_target;

use ecovault_execution::message::{decode_payload, encode_payload, PAYLOAD_LEN};

fuzz_target!(|data: &[u8]| {
    match decode_payload(data) {
        Ok(decoded) => {
            assert_eq!(data.len(), PAYLOAD_LEN);
            let encoded = encode_payload(&decoded.asset_id, &decoded.recipient, &decoded.esg_metrics);
            assert_eq!(&encoded.as_bytes()[..], data);
        }
        Err(_) => assert!(data.len() != PAYLOAD_LEN || data[..2] != [0x00, 0x01]),
    }
});
