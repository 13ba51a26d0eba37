//! Fuzz target for parsing the `ch_val` rendering ("X (88)").
//!
//! Any text accepted must yield a restore value that renders back to a
//! parseable form with the same code.

#![no_main]

use kparam_check::param::{CharRendering, ParamName};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Some(parsed) = CharRendering::parse(text) {
        let restore = ParamName::ChVal
            .restore_text(text)
            .expect("parsed rendering must give a restore value");
        assert_eq!(restore, parsed.code.to_string());
        let again = CharRendering::parse(&parsed.to_string()).expect("rendering reparses");
        assert_eq!(again.code, parsed.code);
    }
});
