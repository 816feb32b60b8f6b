//! Fuzz target for the inbound line pipeline
//!
//! Drives the App with arbitrary host text in arbitrary chunks: reassembly,
//! classification, ANSI interpretation, link splitting, roster extraction,
//! chatlog parsing and triggers all run on every complete line.
//!
//! # Invariants
//!
//! - NEVER panic on any host output
//! - Chatlog stays within its cap
//! - Nothing is transmitted while disconnected

#![no_main]

use arbitrary::Arbitrary;
use bbslink_app::{App, AppAction, AppConfig, AppEvent};
use bbslink_core::{Trigger, env::SystemEnv};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    connected: bool,
    cap: u16,
    triggers: Vec<(String, String)>,
    chunks: Vec<String>,
}

fuzz_target!(|input: Input| {
    let cap = usize::from(input.cap);
    let config = AppConfig {
        host: "fuzz".into(),
        username: "fuzzer".into(),
        auto_login: true,
        chatlog_cap: cap,
        ..AppConfig::default()
    };
    let mut app = App::new(SystemEnv::new(), config);
    app.handle(AppEvent::SetTriggers(
        input.triggers.iter().map(|(p, r)| Trigger::new(p, r)).collect(),
    ));
    if input.connected {
        app.handle(AppEvent::Connect { host: None, port: None });
        app.handle(AppEvent::Connected { host: "fuzz".into(), port: 23 });
    }

    for chunk in input.chunks {
        let actions = app.handle(AppEvent::Chunk(chunk));
        if !input.connected {
            assert!(!actions.iter().any(|a| matches!(a, AppAction::Transmit(_))));
        }
        assert!(app.chatlog().serialized_len() <= cap.max(2));
    }
    app.handle(AppEvent::Tick);
});
