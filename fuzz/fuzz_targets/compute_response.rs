#![no_main]

use libfuzzer_sys::fuzz_target;
use qosverify_core::types::{Port, Server, ServerStatus};

fuzz_target!(|data: &[u8]| {
    if let Ok(server) = serde_json::from_slice::<Server>(data) {
        let status = ServerStatus::from(server.status.as_str().to_owned());
        assert_eq!(status, server.status);
    }
    if let Ok(port) = serde_json::from_slice::<Port>(data) {
        let _ = port.binding_allocation();
    }
});
