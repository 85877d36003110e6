#![no_main]

use connector_wire::options::{ConnectOptions, ValidationContext, Validator};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(options) = ConnectOptions::from_json(json) {
        let _ = Validator::new(ValidationContext::default()).validate(&options);
    }
});
