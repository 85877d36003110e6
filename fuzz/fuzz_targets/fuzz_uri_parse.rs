#![no_main]

use connector_wire::client::{parse_host_list, ConnectionUri};
use connector_wire::options::{ValidationContext, Validator};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let _ = parse_host_list(input);

    if let Ok(uri) = ConnectionUri::parse(input) {
        if let Ok(options) = uri.into_options() {
            let _ = Validator::new(ValidationContext::default()).validate(&options);
        }
    }
});
