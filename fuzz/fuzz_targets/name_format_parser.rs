#![no_main]

use decotrace::{CallableMeta, NameFormat};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Strict parsing must never panic; accepted templates must resolve
        if let Ok(format) = NameFormat::parse_strict(input) {
            let meta = CallableMeta::method("Fuzz", "target", "fuzz.module");
            let _ = format.resolve(&meta);
        }
        let _ = NameFormat::new(input).resolve(&CallableMeta::function("f", "m"));
    }
});
