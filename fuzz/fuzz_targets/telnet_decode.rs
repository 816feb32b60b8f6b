//! Fuzz target for the telnet parser and negotiator
//!
//! # Strategy
//!
//! - Arbitrary host bytes, split at arbitrary points across reads
//! - Every decoded command answered by a negotiator
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Data bytes are the same however the input is split
//! - Negotiator replies are well-formed: they start with IAC

#![no_main]

use arbitrary::Arbitrary;
use bbslink_proto::{
    Negotiator, TelnetEvent, TelnetParser, TerminalIdentity, cp437, telnet::IAC,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    bytes: Vec<u8>,
    cuts: Vec<u16>,
}

fn data(events: &[TelnetEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            TelnetEvent::Data(d) => Some(d.as_slice()),
            _ => None,
        })
        .flatten()
        .copied()
        .collect()
}

fuzz_target!(|input: Input| {
    let whole = TelnetParser::new().feed(&input.bytes);

    let mut cuts: Vec<usize> =
        input.cuts.iter().map(|&c| c as usize % (input.bytes.len() + 1)).collect();
    cuts.sort_unstable();

    let mut parser = TelnetParser::new();
    let mut negotiator = Negotiator::new(TerminalIdentity::default());
    let mut split = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(input.bytes.len())) {
        for event in parser.feed(&input.bytes[start..cut]) {
            let reply = negotiator.respond(&event);
            assert!(reply.is_empty() || reply[0] == IAC);
            split.push(event);
        }
        start = cut;
    }

    let data_whole = data(&whole);
    assert_eq!(data_whole, data(&split));
    let _ = cp437::decode(&data_whole);
});
