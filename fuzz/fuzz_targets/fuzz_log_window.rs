//! Fuzz target for tailing and filtering kernel log text.

#![no_main]

use arbitrary::Arbitrary;
use kparam_check::accessor::{LogFilter, LogWindow};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    text: &'a str,
    module: &'a str,
    max_lines: u8,
}

fuzz_target!(|input: Input<'_>| {
    let filter = LogFilter::for_component(input.module);
    let window = LogWindow::tail(input.text, &filter, input.max_lines as usize);
    assert!(window.lines().len() <= input.max_lines as usize);
    for line in window.lines() {
        assert!(filter.matches(line));
    }
    let _ = window.to_string();
});
