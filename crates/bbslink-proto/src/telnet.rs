//! Telnet protocol parser and option negotiation.
//!
//! [`TelnetParser`] is a pure byte-stream FSM: feed it raw bytes from the host
//! and it returns [`TelnetEvent`]s. Data bytes come out in order, commands are
//! split out, and an escaped `IAC IAC` becomes a literal `0xFF`.
//!
//! [`Negotiator`] answers the host's option requests. The client only ever
//! agrees to identify its terminal type (TTYPE) and report its window size
//! (NAWS); everything else is refused.
//!
//! # Parser states
//!
//! ```text
//!            IAC               WILL/WONT/DO/DONT
//! ┌────────┐────>┌─────┐───────────────────────────>┌─────┐
//! │ Normal │     │ Iac │                            │ Cmd │──opt──> Normal
//! └────────┘<────└─────┘──SB──>┌────┐──opt──>┌────────┐
//!      ^     other              │ Sb │        │ SbData │<──IAC IAC──┐
//!      │                        └────┘        └────────┘            │
//!      │                                          │ IAC         ┌───────┐
//!      └───────────────────SE─────────────────────┴────────────>│ SbIac │
//!                                                               └───────┘
//! ```

/// Interpret As Command. Starts every telnet command sequence.
pub const IAC: u8 = 255;
/// Subnegotiation Begin.
pub const SB: u8 = 250;
/// Subnegotiation End.
pub const SE: u8 = 240;
/// Go Ahead.
pub const GA: u8 = 249;
/// Sender will enable the option.
pub const WILL: u8 = 251;
/// Sender will not enable the option.
pub const WONT: u8 = 252;
/// Sender asks the receiver to enable the option.
pub const DO: u8 = 253;
/// Sender asks the receiver to disable the option.
pub const DONT: u8 = 254;

/// Telnet option numbers the client recognises.
pub mod opt {
    /// Binary transmission.
    pub const BINARY: u8 = 0;
    /// Remote echo.
    pub const ECHO: u8 = 1;
    /// Suppress go-ahead.
    pub const SGA: u8 = 3;
    /// Terminal type.
    pub const TTYPE: u8 = 24;
    /// Negotiate about window size.
    pub const NAWS: u8 = 31;
}

/// TTYPE subnegotiation verb: `IS`.
const TTYPE_IS: u8 = 0;
/// TTYPE subnegotiation verb: `SEND`.
const TTYPE_SEND: u8 = 1;

/// A decoded event produced by [`TelnetParser::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetEvent {
    /// Plain data bytes.
    Data(Vec<u8>),
    /// Host sent `IAC WILL <opt>`.
    Will(u8),
    /// Host sent `IAC WONT <opt>`.
    Wont(u8),
    /// Host sent `IAC DO <opt>`.
    Do(u8),
    /// Host sent `IAC DONT <opt>`.
    Dont(u8),
    /// Host sent `IAC SB <opt> <payload> IAC SE`.
    Subneg(u8, Vec<u8>),
    /// Host sent `IAC GA`.
    GoAhead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Iac,
    /// Holds the WILL/WONT/DO/DONT byte while waiting for the option.
    Cmd(u8),
    Sb,
    SbData,
    SbIac,
}

/// Byte-stream telnet parser.
///
/// Holds partial command state across calls, so a command split between two
/// reads is still decoded correctly.
#[derive(Debug)]
pub struct TelnetParser {
    state: State,
    data_buf: Vec<u8>,
    sb_buf: Vec<u8>,
    sb_opt: u8,
}

impl Default for TelnetParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetParser {
    /// Create a parser in the `Normal` state.
    pub fn new() -> Self {
        Self { state: State::Normal, data_buf: Vec::new(), sb_buf: Vec::new(), sb_opt: 0 }
    }

    /// Feed raw bytes and return every event decoded from them.
    ///
    /// Data accumulated at the end of the slice is flushed as a final
    /// [`TelnetEvent::Data`], so no data byte waits for the next read.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<TelnetEvent> {
        let mut events = Vec::new();
        for &b in bytes {
            self.step(b, &mut events);
        }
        self.flush_data(&mut events);
        events
    }

    fn flush_data(&mut self, events: &mut Vec<TelnetEvent>) {
        if !self.data_buf.is_empty() {
            events.push(TelnetEvent::Data(std::mem::take(&mut self.data_buf)));
        }
    }

    fn step(&mut self, b: u8, events: &mut Vec<TelnetEvent>) {
        match self.state {
            State::Normal => {
                if b == IAC {
                    self.flush_data(events);
                    self.state = State::Iac;
                } else {
                    self.data_buf.push(b);
                }
            },
            State::Iac => {
                self.state = match b {
                    IAC => {
                        self.data_buf.push(IAC);
                        State::Normal
                    },
                    WILL | WONT | DO | DONT => State::Cmd(b),
                    SB => State::Sb,
                    GA => {
                        events.push(TelnetEvent::GoAhead);
                        State::Normal
                    },
                    // NOP, DM, AYT and friends carry no payload
                    _ => State::Normal,
                };
            },
            State::Cmd(cmd) => {
                let event = match cmd {
                    WILL => TelnetEvent::Will(b),
                    WONT => TelnetEvent::Wont(b),
                    DO => TelnetEvent::Do(b),
                    _ => TelnetEvent::Dont(b),
                };
                events.push(event);
                self.state = State::Normal;
            },
            State::Sb => {
                self.sb_opt = b;
                self.sb_buf.clear();
                self.state = State::SbData;
            },
            State::SbData => {
                if b == IAC {
                    self.state = State::SbIac;
                } else {
                    self.sb_buf.push(b);
                }
            },
            State::SbIac => match b {
                SE => {
                    let payload = std::mem::take(&mut self.sb_buf);
                    events.push(TelnetEvent::Subneg(self.sb_opt, payload));
                    self.state = State::Normal;
                },
                IAC => {
                    self.sb_buf.push(IAC);
                    self.state = State::SbData;
                },
                _ => {
                    // Malformed subnegotiation: drop it and resync.
                    self.sb_buf.clear();
                    self.state = State::Normal;
                },
            },
        }
    }
}

/// Terminal identity announced to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalIdentity {
    /// Terminal type string sent in reply to `TTYPE SEND`.
    pub terminal_type: String,
    /// Screen width in columns.
    pub cols: u16,
    /// Screen height in rows.
    pub rows: u16,
}

impl Default for TerminalIdentity {
    fn default() -> Self {
        Self { terminal_type: "ansi".to_string(), cols: 136, rows: 50 }
    }
}

/// Telnet option negotiation for the client side.
///
/// Replies are produced only when an option actually changes state, which is
/// what keeps two endpoints from bouncing WILL/DO at each other forever.
#[derive(Debug)]
pub struct Negotiator {
    identity: TerminalIdentity,
    /// Options active on our side (host sent DO, we agreed).
    us: [bool; 256],
    /// Options active on the host side (host sent WILL, we agreed).
    them: [bool; 256],
}

impl Negotiator {
    /// Create a negotiator announcing the given identity.
    pub fn new(identity: TerminalIdentity) -> Self {
        Self { identity, us: [false; 256], them: [false; 256] }
    }

    /// Identity this negotiator announces.
    pub fn identity(&self) -> &TerminalIdentity {
        &self.identity
    }

    /// Whether the option is active on our side.
    pub fn is_enabled_locally(&self, option: u8) -> bool {
        self.us[option as usize]
    }

    /// Bytes to write back in response to `event`. Empty if none.
    ///
    /// [`TelnetEvent::Data`] and [`TelnetEvent::GoAhead`] never need a reply.
    pub fn respond(&mut self, event: &TelnetEvent) -> Vec<u8> {
        match event {
            TelnetEvent::Do(option) => self.receive_do(*option),
            TelnetEvent::Dont(option) => self.receive_dont(*option),
            TelnetEvent::Will(option) => self.receive_will(*option),
            TelnetEvent::Wont(option) => self.receive_wont(*option),
            TelnetEvent::Subneg(option, payload) => self.receive_subneg(*option, payload),
            TelnetEvent::Data(_) | TelnetEvent::GoAhead => Vec::new(),
        }
    }

    fn receive_do(&mut self, option: u8) -> Vec<u8> {
        let i = option as usize;
        match option {
            opt::TTYPE | opt::SGA if !self.us[i] => {
                self.us[i] = true;
                vec![IAC, WILL, option]
            },
            opt::NAWS if !self.us[i] => {
                self.us[i] = true;
                let mut reply = vec![IAC, WILL, option];
                reply.extend(self.window_size());
                reply
            },
            // A repeated DO NAWS is a request for the current size.
            opt::NAWS => self.window_size(),
            opt::TTYPE | opt::SGA => Vec::new(),
            _ => {
                tracing::debug!(option, "refusing DO");
                vec![IAC, WONT, option]
            },
        }
    }

    fn receive_dont(&mut self, option: u8) -> Vec<u8> {
        let i = option as usize;
        if self.us[i] {
            self.us[i] = false;
            vec![IAC, WONT, option]
        } else {
            Vec::new()
        }
    }

    fn receive_will(&mut self, option: u8) -> Vec<u8> {
        let i = option as usize;
        if self.them[i] {
            return Vec::new();
        }
        if matches!(option, opt::ECHO | opt::SGA | opt::BINARY) {
            self.them[i] = true;
            vec![IAC, DO, option]
        } else {
            tracing::debug!(option, "refusing WILL");
            vec![IAC, DONT, option]
        }
    }

    fn receive_wont(&mut self, option: u8) -> Vec<u8> {
        let i = option as usize;
        if self.them[i] {
            self.them[i] = false;
            vec![IAC, DONT, option]
        } else {
            Vec::new()
        }
    }

    fn receive_subneg(&mut self, option: u8, payload: &[u8]) -> Vec<u8> {
        if option == opt::TTYPE && payload.first() == Some(&TTYPE_SEND) {
            let mut reply = vec![IAC, SB, opt::TTYPE, TTYPE_IS];
            reply.extend(escape_iac(self.identity.terminal_type.as_bytes()));
            reply.extend([IAC, SE]);
            return reply;
        }
        Vec::new()
    }

    /// `IAC SB NAWS <cols> <rows> IAC SE` for the configured geometry.
    fn window_size(&self) -> Vec<u8> {
        let mut size = Vec::with_capacity(4);
        size.extend(self.identity.cols.to_be_bytes());
        size.extend(self.identity.rows.to_be_bytes());

        let mut out = vec![IAC, SB, opt::NAWS];
        out.extend(escape_iac(&size));
        out.extend([IAC, SE]);
        out
    }
}

/// Double every `0xFF` so data bytes are never mistaken for `IAC`.
pub fn escape_iac(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        out.push(b);
        if b == IAC {
            out.push(IAC);
        }
    }
    out
}
