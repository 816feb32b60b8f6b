//! Property tests for the chatlog cap and roster replacement.

use std::collections::BTreeSet;

use bbslink_core::{Chatlog, Roster, roster::extract_members};
use proptest::prelude::*;

fn appends() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (prop_oneof![Just("Ann"), Just("Bob"), Just("Cy"), Just("Dee")], "[ -~\t\"\\\\é]{0,24}")
            .prop_map(|(s, m)| (s.to_string(), m)),
        1..40,
    )
}

proptest! {
    #[test]
    fn prop_chatlog_stays_under_cap(entries in appends(), cap in 2usize..600) {
        let mut log = Chatlog::new(cap);
        for (sender, message) in entries {
            log.append(&sender, message);
            let encoded = serde_json::to_vec(&log.snapshot()).unwrap().len();
            prop_assert_eq!(encoded, log.serialized_len());
            prop_assert!(encoded <= cap);
        }
    }

    #[test]
    fn prop_trimming_drops_oldest_first(entries in appends(), cap in 2usize..400) {
        let mut log = Chatlog::new(cap);
        let mut unbounded = Chatlog::new(usize::MAX);
        for (sender, message) in entries {
            log.append(&sender, message.clone());
            unbounded.append(&sender, message);
        }
        // What survives for each sender is a suffix of everything it sent.
        for sender in log.senders() {
            let kept = log.messages(sender);
            let all = unbounded.messages(sender);
            prop_assert!(all.ends_with(&kept));
        }
    }

    #[test]
    fn prop_roster_replacement_is_idempotent(
        names in prop::collection::btree_set("[A-Z][a-z]{1,8}", 0..10),
    ) {
        let banner = vec![
            "You are in the Lobby.".to_string(),
            format!(
                "Topic: General Chat {} are here with you.",
                names.iter().cloned().collect::<Vec<_>>().join(", ")
            ),
        ];
        let extracted = extract_members(&banner);

        let mut roster = Roster::new();
        roster.replace(extracted.clone(), 1);
        let first: BTreeSet<String> = roster.names().map(str::to_string).collect();
        let update = roster.replace(extract_members(&banner), 2);
        let second: BTreeSet<String> = roster.names().map(str::to_string).collect();

        prop_assert!(update.is_empty());
        prop_assert_eq!(first, second);
    }
}
