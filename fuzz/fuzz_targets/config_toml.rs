#![no_main]

use libfuzzer_sys::fuzz_target;
use qosverify_core::config::QosVerifyConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = QosVerifyConfig::parse(s) {
            let _ = config.validate();
            let _ = config.compute.microversion();
            let _ = config.placement.microversion();
        }
    }
});
