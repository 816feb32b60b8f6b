//! Application state machine.
//!
//! [`App`] owns everything the session knows: connection lifecycle, the line
//! pipeline, roster, chatlog, triggers and the queue of delayed sends. It
//! consumes [`AppEvent`]s and returns [`AppAction`]s; it never performs I/O.
//!
//! # Line pipeline
//!
//! ```text
//! Chunk ─> LineReassembler ─> SessionClassifier ─┬─> transcript (every line)
//!                                                ├─> roster (completed banner)
//!                                                ├─> directed view + attention
//!                                                └─> plain: attention, triggers,
//!                                                    chatlog, login prompts
//! ```

use std::collections::VecDeque;

use bbslink_core::{
    AnsiInterpreter, Chatlog, ChatlogSnapshot, Classification, ClassifiedLine, ConnectTarget,
    Connection, ConnectionAction, ConnectionError, ConnectionState, LineReassembler, LoginPrompt,
    Roster, RosterSnapshot, SessionClassifier, Trigger, TriggerSet,
    chatlog::{format_entry, parse_chat_message},
    classifier::wants_attention,
    env::{Environment, timestamp_prefix},
    links::split_line,
    login::{LOGIN_SEND_DELAY, detect_login_prompt},
    roster::extract_members,
};

use crate::{AppAction, AppConfig, AppEvent, DisplayEvent, PersistTarget};

/// Notice shown when the user sends without a connection.
pub(crate) const NOT_CONNECTED: &str = "Not connected to any BBS.";

/// A line scheduled for later transmission.
#[derive(Debug, Clone)]
struct DelayedSend<I> {
    due: I,
    text: String,
}

/// Application state machine.
///
/// Pure: time comes from the [`Environment`], I/O happens in the runtime.
#[derive(Debug)]
pub struct App<E: Environment> {
    env: E,
    config: AppConfig,
    connection: Connection,
    reassembler: LineReassembler,
    ansi: AnsiInterpreter,
    classifier: SessionClassifier,
    roster: Roster,
    chatlog: Chatlog,
    triggers: TriggerSet,
    /// Due-ordered; delays are constant so arrival order is due order.
    delayed: VecDeque<DelayedSend<E::Instant>>,
}

impl<E: Environment> App<E> {
    /// Create an App with empty roster, chatlog and triggers.
    pub fn new(env: E, config: AppConfig) -> Self {
        let mut connection = Connection::new();
        // Nothing is live yet, so no action comes back.
        let _ = connection.set_keep_alive(config.keep_alive);
        Self {
            env,
            connection,
            reassembler: LineReassembler::new(),
            ansi: AnsiInterpreter::new(),
            classifier: SessionClassifier::new(),
            roster: Roster::new(),
            chatlog: Chatlog::new(config.chatlog_cap),
            triggers: TriggerSet::default(),
            delayed: VecDeque::new(),
            config,
        }
    }

    /// Replace the roster with a stored one.
    pub fn restore_roster(&mut self, snapshot: RosterSnapshot) {
        self.roster = Roster::from_snapshot(snapshot);
    }

    /// Replace the chatlog with a stored one, trimming to the configured cap.
    pub fn restore_chatlog(&mut self, snapshot: ChatlogSnapshot) {
        self.chatlog = Chatlog::from_snapshot(snapshot, self.config.chatlog_cap);
    }

    /// Replace triggers with stored ones.
    pub fn restore_triggers(&mut self, triggers: Vec<Trigger>) {
        self.triggers = TriggerSet::new(triggers);
    }

    /// Current configuration, including runtime toggles.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Connection lifecycle state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Current roster.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Chat history.
    pub fn chatlog(&self) -> &Chatlog {
        &self.chatlog
    }

    /// Configured triggers.
    pub fn triggers(&self) -> &TriggerSet {
        &self.triggers
    }

    /// Text received since the last line terminator.
    pub fn partial_line(&self) -> &str {
        self.reassembler.partial()
    }

    /// Number of sends waiting for their delay to pass.
    pub fn pending_sends(&self) -> usize {
        self.delayed.len()
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Connect { host, port } => self.connect(host, port),
            AppEvent::Disconnect => self.disconnect(),
            AppEvent::Quit => {
                let mut actions = self.disconnect();
                actions.push(AppAction::Quit);
                actions
            },
            AppEvent::SendText(text) => {
                let line = if text.trim().is_empty() {
                    String::new()
                } else if self.config.mud_mode {
                    format!("Gos {text}")
                } else {
                    text
                };
                self.transmit(line)
            },
            AppEvent::SendAction { action, target } => {
                let line = match target {
                    Some(member) => format!("{} {member}", action.verb()),
                    None => action.verb().to_string(),
                };
                self.transmit(line)
            },
            AppEvent::SendUsername => self.transmit(self.config.username.clone()),
            AppEvent::SendPassword => self.transmit(self.config.password.clone()),
            AppEvent::SetKeepAlive(enabled) => {
                self.config.keep_alive = enabled;
                self.connection.set_keep_alive(enabled).into_iter().map(connection_action).collect()
            },
            AppEvent::SetAutomation(enabled) => {
                self.config.auto_login = enabled;
                if !enabled {
                    self.delayed.clear();
                }
                vec![]
            },
            AppEvent::SetMudMode(enabled) => {
                self.config.mud_mode = enabled;
                vec![]
            },
            AppEvent::SetTriggers(triggers) => {
                self.triggers = TriggerSet::new(triggers);
                vec![AppAction::Persist(PersistTarget::Triggers)]
            },
            AppEvent::AddTrigger(trigger) => {
                if !trigger.is_active() {
                    return vec![notice("A trigger needs a pattern.")];
                }
                self.triggers.push(trigger);
                vec![AppAction::Persist(PersistTarget::Triggers)]
            },
            AppEvent::ClearChatlog { sender } => {
                if self.chatlog.clear_sender(&sender) {
                    vec![
                        AppAction::Persist(PersistTarget::Chatlog),
                        notice(format!("Cleared chat history for {sender}.")),
                    ]
                } else {
                    vec![notice(format!("No chat history for {sender}."))]
                }
            },
            AppEvent::ShowMembers => {
                vec![AppAction::Present(DisplayEvent::Members(self.roster.members()))]
            },
            AppEvent::ShowChatlog { sender } => {
                let entries = self.chatlog.messages(&sender).into_iter().map(str::to_string).collect();
                vec![AppAction::Present(DisplayEvent::Chatlog { sender, entries })]
            },
            AppEvent::ShowTriggers => {
                vec![AppAction::Present(DisplayEvent::Triggers(self.triggers.triggers().to_vec()))]
            },
            AppEvent::Connected { host, port } => {
                if let Err(e) = self.connection.on_established() {
                    tracing::warn!(error = %e, "connected in unexpected state");
                    return vec![];
                }
                tracing::info!(%host, port, "session established");
                vec![
                    AppAction::Present(DisplayEvent::Status(ConnectionState::Connected)),
                    notice(format!("Connected to {host}:{port}")),
                ]
            },
            AppEvent::Chunk(text) => {
                let lines = self.reassembler.feed(&text);
                lines.into_iter().flat_map(|line| self.process_line(&line)).collect()
            },
            AppEvent::Notice(text) => vec![notice(text)],
            AppEvent::Disconnected => {
                self.connection.on_closed();
                self.reassembler.reset();
                self.classifier.reset();
                self.ansi.reset();
                self.delayed.clear();
                vec![AppAction::Present(DisplayEvent::Status(ConnectionState::Disconnected))]
            },
            AppEvent::Tick => self.release_due(),
        }
    }

    fn connect(&mut self, host: Option<String>, port: Option<u16>) -> Vec<AppAction> {
        let target = ConnectTarget {
            host: host.unwrap_or_else(|| self.config.host.clone()),
            port: port.unwrap_or(self.config.port),
            identity: self.config.identity.clone(),
        };
        let label = format!("{}:{}", target.host, target.port);

        match self.connection.request_connect(target) {
            Ok(connection_actions) => {
                let mut actions = vec![
                    AppAction::Present(DisplayEvent::Status(ConnectionState::Connecting)),
                    notice(format!("Connecting to {label}...")),
                ];
                actions.extend(connection_actions.into_iter().map(connection_action));
                actions
            },
            Err(e) if e.is_already_connected() => vec![notice("Already connected.")],
            Err(ConnectionError::EmptyHost) => vec![notice("No host given.")],
            Err(e) => {
                tracing::warn!(error = %e, "connect rejected");
                vec![notice(format!("Cannot connect now: {e}"))]
            },
        }
    }

    fn disconnect(&mut self) -> Vec<AppAction> {
        let closing: Vec<AppAction> =
            self.connection.request_disconnect().into_iter().map(connection_action).collect();
        if closing.is_empty() {
            return closing;
        }
        let mut actions = vec![AppAction::Present(DisplayEvent::Status(ConnectionState::Disconnecting))];
        actions.extend(closing);
        actions
    }

    fn transmit(&self, line: String) -> Vec<AppAction> {
        if self.connection.is_connected() {
            vec![AppAction::Transmit(line)]
        } else {
            vec![notice(NOT_CONNECTED)]
        }
    }

    fn release_due(&mut self) -> Vec<AppAction> {
        let now = self.env.now();
        let mut actions = Vec::new();
        while self.delayed.front().is_some_and(|send| send.due <= now) {
            if let Some(send) = self.delayed.pop_front()
                && self.connection.is_connected()
            {
                actions.push(AppAction::Transmit(send.text));
            }
        }
        actions
    }

    fn process_line(&mut self, raw: &str) -> Vec<AppAction> {
        let line = self.classifier.classify(raw);
        let spans = split_line(&self.ansi.interpret(&line.raw));
        let mut actions = vec![AppAction::Present(DisplayEvent::Transcript(spans.clone()))];

        match &line.kind {
            Classification::RosterStart { .. } | Classification::RosterContinuation { .. } => {
                if let Some(banner) = line.kind.completed_banner() {
                    actions.extend(self.apply_banner(banner));
                }
            },
            Classification::Directed { sender, message } => {
                tracing::debug!(%sender, "directed message");
                actions.push(AppAction::Present(DisplayEvent::Directed {
                    timestamp: timestamp_prefix(&self.env.local_time()),
                    sender: sender.clone(),
                    message: message.clone(),
                    spans,
                }));
                actions.push(AppAction::Present(DisplayEvent::Attention));
            },
            Classification::Plain => actions.extend(self.process_plain(&line)),
        }
        actions
    }

    fn apply_banner(&mut self, banner: &[String]) -> Vec<AppAction> {
        let names = extract_members(banner);
        let update = self.roster.replace(names, self.env.unix_time());
        tracing::debug!(members = self.roster.len(), joined = ?update.joined, left = ?update.left, "roster replaced");
        vec![
            AppAction::Present(DisplayEvent::RosterChanged {
                members: self.roster.members(),
                joined: update.joined,
                left: update.left,
            }),
            AppAction::Persist(PersistTarget::Roster),
        ]
    }

    fn process_plain(&mut self, line: &ClassifiedLine) -> Vec<AppAction> {
        let mut actions = Vec::new();

        if wants_attention(&line.stripped) {
            actions.push(AppAction::Present(DisplayEvent::Attention));
        }

        for response in self.triggers.evaluate(&line.stripped) {
            tracing::debug!(%response, "trigger fired");
            actions.extend(self.transmit(response));
        }

        if let Some(message) = parse_chat_message(&line.stripped, &self.config.username) {
            if let Some(recipient) = &message.recipient {
                tracing::debug!(sender = %message.sender, %recipient, "addressed chat line");
            }
            let entry = format_entry(&self.env.local_time(), &message.message);
            self.chatlog.append(&message.sender, entry);
            actions.push(AppAction::Persist(PersistTarget::Chatlog));
        }

        if self.config.auto_login
            && let Some(prompt) = detect_login_prompt(&line.stripped)
        {
            let text = match prompt {
                LoginPrompt::Username => self.config.username.clone(),
                LoginPrompt::Password => self.config.password.clone(),
            };
            tracing::debug!(?prompt, "login prompt, scheduling credential");
            self.delayed.push_back(DelayedSend { due: self.env.now() + LOGIN_SEND_DELAY, text });
        }

        actions
    }
}

fn connection_action(action: ConnectionAction) -> AppAction {
    match action {
        ConnectionAction::Open { target, keep_alive } => AppAction::Connect { target, keep_alive },
        ConnectionAction::Close => AppAction::Disconnect,
        ConnectionAction::SetKeepAlive(enabled) => AppAction::SetKeepAlive(enabled),
    }
}

fn notice(text: impl Into<String>) -> AppAction {
    AppAction::Present(DisplayEvent::Notice(text.into()))
}
