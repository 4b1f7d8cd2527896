#![no_main]

use libfuzzer_sys::fuzz_target;
use qosverify_core::types::{Allocations, INGRESS_RESOURCE_CLASS, Port};
use qosverify_scenario::assertions::check_allocation;

fuzz_target!(|data: &[u8]| {
    // 입력: allocations JSON과 port JSON을 0x00으로 구분
    let Some(split) = data.iter().position(|b| *b == 0) else {
        return;
    };
    let (allocs, port) = data.split_at(split);
    let (Ok(allocations), Ok(port)) = (
        serde_json::from_slice::<Allocations>(allocs),
        serde_json::from_slice::<Port>(&port[1..]),
    ) else {
        return;
    };

    if let Ok(provider) = check_allocation(&allocations, &port) {
        assert_eq!(allocations.providers_with(INGRESS_RESOURCE_CLASS), vec![provider.as_str()]);
        assert_eq!(port.binding_allocation(), Some(provider.as_str()));
    }
});
