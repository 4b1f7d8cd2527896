#![no_main]

use libfuzzer_sys::fuzz_target;
use qosverify_core::types::Microversion;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(v) = s.parse::<Microversion>() {
            // 표시 형식은 다시 같은 값으로 파싱되어야 함
            let again: Microversion = v.to_string().parse().expect("display must re-parse");
            assert_eq!(v, again);
        }
    }
});
