//! Property-based tests for the telnet parser.
//!
//! The parser must decode the same commands and the same data no matter how
//! the byte stream is cut into reads.

use bbslink_proto::{TelnetEvent, TelnetParser, escape_iac, telnet};
use proptest::prelude::*;

/// Collapse adjacent `Data` events so differently-split streams compare equal.
fn normalize(events: Vec<TelnetEvent>) -> Vec<TelnetEvent> {
    let mut out: Vec<TelnetEvent> = Vec::new();
    for event in events {
        if let TelnetEvent::Data(next) = &event
            && let Some(TelnetEvent::Data(prev)) = out.last_mut()
        {
            prev.extend_from_slice(next);
            continue;
        }
        out.push(event);
    }
    out
}

fn decode_in_pieces(bytes: &[u8], cuts: &[usize]) -> Vec<TelnetEvent> {
    let mut parser = TelnetParser::new();
    let mut events = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        let end = cut.clamp(start, bytes.len());
        events.extend(parser.feed(&bytes[start..end]));
        start = end;
    }
    events.extend(parser.feed(&bytes[start..]));
    normalize(events)
}

/// A stream segment: either escaped data or a complete command.
fn segment_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        3 => prop::collection::vec(any::<u8>(), 0..32).prop_map(|d| escape_iac(&d)),
        1 => (prop_oneof![
            Just(telnet::WILL),
            Just(telnet::WONT),
            Just(telnet::DO),
            Just(telnet::DONT)
        ], any::<u8>())
            .prop_map(|(cmd, opt)| vec![telnet::IAC, cmd, opt]),
        1 => prop::collection::vec(0u8..250, 0..8).prop_map(|payload| {
            let mut sb = vec![telnet::IAC, telnet::SB, telnet::opt::TTYPE];
            sb.extend(payload);
            sb.extend([telnet::IAC, telnet::SE]);
            sb
        }),
    ]
}

proptest! {
    #[test]
    fn prop_split_reads_decode_identically(
        segments in prop::collection::vec(segment_strategy(), 0..16),
        cuts in prop::collection::vec(0usize..512, 0..8),
    ) {
        let stream: Vec<u8> = segments.concat();
        let mut sorted_cuts = cuts;
        sorted_cuts.sort_unstable();

        let whole = decode_in_pieces(&stream, &[]);
        let split = decode_in_pieces(&stream, &sorted_cuts);
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn prop_escaped_data_round_trips(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let events = decode_in_pieces(&escape_iac(&data), &[]);
        let decoded: Vec<u8> = events
            .into_iter()
            .flat_map(|e| match e {
                TelnetEvent::Data(d) => d,
                _ => Vec::new(),
            })
            .collect();
        prop_assert_eq!(decoded, data);
    }
}
