#![no_main]

//! Fuzz target for gateway envelope decoding.
//!
//! Arbitrary bytes are parsed as a proxy envelope and, when they parse,
//! turned into a request and checked for a decodable body. None of it may
//! panic.

use hookgate_api::gateway::GatewayEvent;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(event) = serde_json::from_slice::<GatewayEvent>(data) else {
        return;
    };

    let request = event.into_request();
    let _ = request.credential();
    let _ = request.signature();

    if let Ok(raw) = request.raw_body() {
        let _ = hookgate_core::ValidatedEvent::parse(&raw);
    }
});
