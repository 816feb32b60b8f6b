//! Scripted telnet host for simulation.
//!
//! `SimBbs` listens on turmoil TCP, negotiates terminal type and window size
//! the way a real board does, sends a greeting, and answers received lines
//! from a [`BbsScript`]. Everything it sends and receives is stamped with
//! virtual time in a shared [`BbsLog`] for tests to inspect.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use bbslink_proto::telnet::{DO, IAC, SB, SE, TelnetEvent, TelnetParser, opt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, WriteHalf},
    time::Instant,
};
use turmoil::net::{TcpListener, TcpStream};

/// Port the simulated board listens on.
pub const BBS_PORT: u16 = 23;

/// TTYPE subnegotiation `SEND`.
const TTYPE_SEND: u8 = 1;
/// TTYPE subnegotiation `IS`.
const TTYPE_IS: u8 = 0;

/// Largest fragment when writes are split.
const MAX_FRAGMENT: usize = 16;

/// Lines sent in answer to one received line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Received line that triggers the reply (exact, after trimming)
    pub on: String,
    /// Lines sent back, in order
    pub send: Vec<String>,
}

impl Reply {
    /// Reply with `send` whenever `on` arrives.
    pub fn new(on: impl Into<String>, send: &[&str]) -> Self {
        Self { on: on.into(), send: send.iter().map(|l| (*l).to_string()).collect() }
    }
}

/// What the board says and when.
#[derive(Debug, Clone, Default)]
pub struct BbsScript {
    /// Lines sent right after negotiation starts
    pub greeting: Vec<String>,
    /// Answers to received lines; first match wins
    pub replies: Vec<Reply>,
    /// Received line that makes the board hang up
    pub hang_up_on: Option<String>,
    /// Split every write into random small fragments with this seed
    pub fragment_seed: Option<u64>,
}

impl BbsScript {
    /// Script with the given greeting and no replies.
    pub fn greeting(lines: &[&str]) -> Self {
        Self { greeting: lines.iter().map(|l| (*l).to_string()).collect(), ..Self::default() }
    }

    /// Add a reply.
    #[must_use]
    pub fn reply(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }

    /// Hang up when `line` arrives.
    #[must_use]
    pub fn hang_up_on(mut self, line: impl Into<String>) -> Self {
        self.hang_up_on = Some(line.into());
        self
    }

    /// Fragment writes using `seed`.
    #[must_use]
    pub fn fragmented(mut self, seed: u64) -> Self {
        self.fragment_seed = Some(seed);
        self
    }
}

/// A line and the virtual time it crossed the wire, relative to board start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped {
    /// Time since the board started listening
    pub at: Duration,
    /// Line without terminator
    pub text: String,
}

/// Everything the board observed.
#[derive(Debug, Clone, Default)]
pub struct BbsLog {
    /// Accepted connections
    pub connections: usize,
    /// Terminal type reported by the client
    pub terminal_type: Option<String>,
    /// Window size (cols, rows) reported by the client
    pub window: Option<(u16, u16)>,
    /// Lines received, in order
    pub received: Vec<Stamped>,
    /// Lines sent, in order
    pub sent: Vec<Stamped>,
}

impl BbsLog {
    /// Received lines that are not keep-alive blanks.
    pub fn received_text(&self) -> Vec<&str> {
        self.received.iter().map(|l| l.text.as_str()).filter(|t| !t.is_empty()).collect()
    }

    /// Times blank lines arrived.
    pub fn blank_lines(&self) -> Vec<Duration> {
        self.received.iter().filter(|l| l.text.is_empty()).map(|l| l.at).collect()
    }

    /// When `text` was first sent.
    pub fn sent_at(&self, text: &str) -> Option<Duration> {
        self.sent.iter().find(|l| l.text == text).map(|l| l.at)
    }

    /// When `text` was first received.
    pub fn received_at(&self, text: &str) -> Option<Duration> {
        self.received.iter().find(|l| l.text == text).map(|l| l.at)
    }
}

/// Scripted board.
#[derive(Debug, Clone)]
pub struct SimBbs {
    script: Arc<BbsScript>,
    log: Arc<Mutex<BbsLog>>,
}

impl SimBbs {
    /// Board following `script`.
    pub fn new(script: BbsScript) -> Self {
        Self { script: Arc::new(script), log: Arc::new(Mutex::new(BbsLog::default())) }
    }

    /// Copy of the log so far.
    pub fn log(&self) -> BbsLog {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Register the board as turmoil host `name`.
    pub fn install(&self, sim: &mut turmoil::Sim<'_>, name: &str) {
        let bbs = self.clone();
        sim.host(name, move || {
            let bbs = bbs.clone();
            async move { bbs.serve().await.map_err(Into::into) }
        });
    }

    /// Accept connections forever, one at a time.
    ///
    /// # Errors
    ///
    /// Fails if the listener cannot bind or accept.
    pub async fn serve(self) -> io::Result<()> {
        let listener = TcpListener::bind(format!("0.0.0.0:{BBS_PORT}")).await?;
        let origin = Instant::now();
        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::debug!(%peer, "board accepted connection");
            self.with_log(|log| log.connections += 1);
            if let Err(e) = self.session(stream, origin).await {
                tracing::debug!(error = %e, "board session ended with error");
            }
        }
    }

    async fn session(&self, stream: TcpStream, origin: Instant) -> io::Result<()> {
        let (mut reader, writer) = tokio::io::split(stream);
        let mut out = Outbound {
            writer,
            rng: self.script.fragment_seed.map(ChaCha8Rng::seed_from_u64),
            origin,
            log: Arc::clone(&self.log),
        };

        out.raw(&[IAC, DO, opt::TTYPE, IAC, DO, opt::NAWS]).await?;
        out.lines(&self.script.greeting).await?;

        let mut parser = TelnetParser::new();
        let mut pending = String::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }

            for event in parser.feed(&buf[..n]) {
                match event {
                    TelnetEvent::Will(opt::TTYPE) => {
                        out.raw(&[IAC, SB, opt::TTYPE, TTYPE_SEND, IAC, SE]).await?;
                    },
                    TelnetEvent::Subneg(opt::TTYPE, payload) => {
                        if let Some((&TTYPE_IS, name)) = payload.split_first() {
                            let name = String::from_utf8_lossy(name).into_owned();
                            self.with_log(|log| log.terminal_type = Some(name));
                        }
                    },
                    TelnetEvent::Subneg(opt::NAWS, payload) => {
                        if let [c1, c2, r1, r2] = payload[..] {
                            let size = (u16::from_be_bytes([c1, c2]), u16::from_be_bytes([r1, r2]));
                            self.with_log(|log| log.window = Some(size));
                        }
                    },
                    TelnetEvent::Data(data) => pending.push_str(&String::from_utf8_lossy(&data)),
                    _ => {},
                }
            }

            while let Some(end) = pending.find('\n') {
                let line: String = pending.drain(..=end).collect();
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                let at = Instant::now() - origin;
                self.with_log(|log| log.received.push(Stamped { at, text: line.clone() }));

                if self.script.hang_up_on.as_deref() == Some(line.trim()) {
                    tracing::debug!(%line, "board hanging up");
                    return Ok(());
                }
                if let Some(reply) = self.script.replies.iter().find(|r| r.on == line.trim()) {
                    out.lines(&reply.send).await?;
                }
            }
        }
    }

    fn with_log(&self, f: impl FnOnce(&mut BbsLog)) {
        f(&mut self.log.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Write side of one board session.
struct Outbound {
    writer: WriteHalf<TcpStream>,
    rng: Option<ChaCha8Rng>,
    origin: Instant,
    log: Arc<Mutex<BbsLog>>,
}

impl Outbound {
    async fn raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        match &mut self.rng {
            Some(rng) => {
                let mut rest = bytes;
                while !rest.is_empty() {
                    let take = rng.gen_range(1..=MAX_FRAGMENT).min(rest.len());
                    let (head, tail) = rest.split_at(take);
                    self.writer.write_all(head).await?;
                    self.writer.flush().await?;
                    rest = tail;
                }
                Ok(())
            },
            None => {
                self.writer.write_all(bytes).await?;
                self.writer.flush().await
            },
        }
    }

    async fn lines(&mut self, lines: &[String]) -> io::Result<()> {
        for line in lines {
            let at = Instant::now() - self.origin;
            self.log
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .sent
                .push(Stamped { at, text: line.clone() });
            self.raw(format!("{line}\r\n").as_bytes()).await?;
        }
        Ok(())
    }
}
