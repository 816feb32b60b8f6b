//! Fuzz target for the ANSI interpreter and link splitter
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary escape sequences
//! - No empty spans
//! - Link splitting preserves the text

#![no_main]

use bbslink_core::{AnsiInterpreter, links::split_line, strip_ansi};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|lines: Vec<String>| {
    let mut interpreter = AnsiInterpreter::new();
    for line in &lines {
        let spans = interpreter.interpret(line);
        assert!(spans.iter().all(|s| !s.text.is_empty()));

        let text: String = spans.iter().map(|s| s.text.as_str()).collect();
        let linked: String = split_line(&spans).iter().map(|s| s.text.as_str()).collect();
        assert_eq!(text, linked);

        let _ = strip_ansi(line);
    }
});
