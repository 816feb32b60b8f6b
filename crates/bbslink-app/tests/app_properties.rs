//! Property-based tests for the App state machine.
//!
//! Invariants checked under arbitrary event sequences:
//! - nothing is transmitted unless the connection is up
//! - the chatlog never exceeds its cap
//! - how the host's output is split into chunks does not change what the App
//!   extracts from it

use bbslink_app::{App, AppAction, AppConfig, AppEvent, CannedAction};
use bbslink_core::{ConnectionState, Trigger, env::SystemEnv};
use proptest::prelude::*;

const LINES: [&str; 8] = [
    "From Bob: Hello there",
    "From Alice (to you): secret",
    "You are in the Lobby.",
    "Topic: General Chat Bob, Alice and Carol are here with you.",
    "A new player has arrived",
    "\x1b[1;31mFrom Carol: \x1b[0mred alert",
    "Enter your password:",
    "plain old text",
];

fn line_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(LINES.to_vec()).prop_map(|l| format!("{l}\r\n"))
}

/// Generate random app events.
fn event_strategy() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        1 => Just(AppEvent::Tick),
        1 => Just(AppEvent::Connect { host: None, port: None }),
        1 => Just(AppEvent::Connected { host: "bbs.test".into(), port: 23 }),
        1 => Just(AppEvent::Disconnect),
        1 => Just(AppEvent::Disconnected),
        2 => "[a-z ]{0,12}".prop_map(AppEvent::SendText),
        1 => Just(AppEvent::SendAction { action: CannedAction::Smile, target: None }),
        1 => any::<bool>().prop_map(AppEvent::SetMudMode),
        4 => line_strategy().prop_map(AppEvent::Chunk),
    ]
}

fn app(chatlog_cap: usize) -> App<SystemEnv> {
    let mut app = App::new(
        SystemEnv::new(),
        AppConfig {
            host: "bbs.test".into(),
            username: "nate".into(),
            chatlog_cap,
            ..AppConfig::default()
        },
    );
    app.handle(AppEvent::SetTriggers(vec![Trigger::new("new player", "wave")]));
    app
}

proptest! {
    #[test]
    fn no_transmit_without_connection(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut app = app(1 << 20);
        for event in events {
            let connected = app.connection_state() == ConnectionState::Connected;
            let actions = app.handle(event);
            if !connected {
                prop_assert!(!actions.iter().any(|a| matches!(a, AppAction::Transmit(_))));
            }
        }
    }

    #[test]
    fn chatlog_stays_under_cap(
        cap in 0usize..400,
        lines in prop::collection::vec(line_strategy(), 0..80),
    ) {
        let mut app = app(cap);
        for line in lines {
            app.handle(AppEvent::Chunk(line));
            prop_assert!(app.chatlog().serialized_len() <= cap.max(2));
        }
    }

    #[test]
    fn chunking_does_not_change_extraction(
        lines in prop::collection::vec(line_strategy(), 1..30),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
    ) {
        let text: String = lines.concat();

        let mut whole = app(1 << 20);
        whole.handle(AppEvent::Chunk(text.clone()));

        let mut points: Vec<usize> = cuts
            .iter()
            .map(|i| i.index(text.len() + 1))
            .filter(|&p| text.is_char_boundary(p))
            .collect();
        points.sort_unstable();
        points.dedup();

        let mut split = app(1 << 20);
        let mut start = 0;
        for point in points.into_iter().chain(std::iter::once(text.len())) {
            split.handle(AppEvent::Chunk(text[start..point].to_string()));
            start = point;
        }

        prop_assert_eq!(whole.roster().snapshot().members, split.roster().snapshot().members);
        prop_assert_eq!(whole.chatlog().len(), split.chatlog().len());
        prop_assert_eq!(whole.partial_line(), split.partial_line());
    }
}
