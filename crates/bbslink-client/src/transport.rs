//! Telnet session over a byte stream.
//!
//! [`open`] connects over TCP and spawns the session task; [`open_with`] takes
//! any connect future (the simulation harness passes a turmoil one) and
//! [`spawn_with_stream`] drives an already-connected stream.
//!
//! The session task is the only code that touches the stream. It loops over
//! four sources:
//!
//! - the stop signal from [`Dispatcher::disconnect`]
//! - outbound commands (text lines, keep-alive toggles)
//! - the keep-alive tick, while keep-alive is on
//! - socket reads
//!
//! Connect failures and read errors are reported as [`Inbound::Notice`] text
//! on the delivery queue, followed by exactly one [`Inbound::Disconnected`].

use std::{future::Future, io, sync::Arc, time::Duration};

use bbslink_proto::{Negotiator, TelnetEvent, TelnetParser, TerminalIdentity, cp437, escape_iac};
use bytes::BytesMut;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, WriteHalf},
    net::TcpStream,
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

/// Default time allowed for the TCP connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default socket read size.
pub const DEFAULT_READ_BUFFER: usize = 4096;

/// Default keep-alive period.
pub const DEFAULT_KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(60);

/// Notice delivered when the session ends for any reason.
pub const DISCONNECTED_NOTICE: &str = "Disconnected from BBS.";

/// Transport errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Session task has ended; nothing more can be sent.
    #[error("session closed")]
    Closed,
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Terminal type and geometry announced during negotiation
    pub identity: TerminalIdentity,
    /// Time allowed for the connect
    pub connect_timeout: Duration,
    /// Bytes requested per socket read
    pub read_buffer: usize,
    /// Interval between keep-alive line terminators
    pub keep_alive_period: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 23,
            identity: TerminalIdentity::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_buffer: DEFAULT_READ_BUFFER,
            keep_alive_period: DEFAULT_KEEP_ALIVE_PERIOD,
        }
    }
}

impl TransportConfig {
    /// Config for `host:port` with default identity and timings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, ..Self::default() }
    }
}

/// Everything the session task reports to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// TCP connection established
    Connected {
        /// Remote host
        host: String,
        /// Remote port
        port: u16,
    },
    /// Decoded text, with telnet commands removed. May end mid-line.
    Chunk(String),
    /// Informational line from the transport itself
    Notice(String),
    /// Session ended. Sent exactly once per session, always last.
    Disconnected,
}

/// Producer side of the delivery queue.
pub type DeliverySender = mpsc::UnboundedSender<Inbound>;

/// Consumer side of the delivery queue.
#[derive(Debug)]
pub struct DeliveryQueue {
    rx: mpsc::UnboundedReceiver<Inbound>,
}

impl DeliveryQueue {
    /// Take everything currently queued, in arrival order, without waiting.
    pub fn drain(&mut self) -> Vec<Inbound> {
        let mut out = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            out.push(item);
        }
        out
    }

    /// Wait for the next item. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Inbound> {
        self.rx.recv().await
    }
}

/// Create a delivery queue.
pub fn delivery_channel() -> (DeliverySender, DeliveryQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, DeliveryQueue { rx })
}

#[derive(Debug)]
enum Command {
    Send(String),
    KeepAlive(bool),
}

/// Outbound handle to a session. Clones share the session.
///
/// Every sender funnels into one FIFO, so lines reach the wire in the order
/// they were dispatched.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    commands: mpsc::UnboundedSender<Command>,
    stop: Arc<watch::Sender<bool>>,
}

impl Dispatcher {
    /// Queue `text` to be sent followed by `\r\n`.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] if the session has ended.
    pub fn send(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.commands.send(Command::Send(text.into())).map_err(|_| TransportError::Closed)
    }

    /// Arm or disarm the keep-alive timer.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] if the session has ended.
    pub fn set_keep_alive(&self, enabled: bool) -> Result<(), TransportError> {
        self.commands.send(Command::KeepAlive(enabled)).map_err(|_| TransportError::Closed)
    }

    /// Ask the session to close. Idempotent and never blocks.
    pub fn disconnect(&self) {
        self.stop.send_replace(true);
    }

    /// Whether the session task has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// A running session.
#[derive(Debug)]
pub struct SessionHandle {
    dispatcher: Dispatcher,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Outbound handle.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Wait for the session task to finish.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "session task ended abnormally");
        }
    }
}

/// Channel ends owned by the session task.
struct SessionChannels {
    commands: mpsc::UnboundedReceiver<Command>,
    stop: watch::Receiver<bool>,
    delivery: DeliverySender,
}

fn session_channels(delivery: DeliverySender) -> (Dispatcher, SessionChannels) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let dispatcher = Dispatcher { commands: commands_tx, stop: Arc::new(stop_tx) };
    (dispatcher, SessionChannels { commands: commands_rx, stop: stop_rx, delivery })
}

/// Connect over TCP and run the session.
pub fn open(config: TransportConfig, keep_alive: bool, delivery: DeliverySender) -> SessionHandle {
    let addr = (config.host.clone(), config.port);
    open_with(config, keep_alive, delivery, async move { TcpStream::connect(addr).await })
}

/// Run the session over the stream produced by `connect`.
///
/// The connect is bounded by [`TransportConfig::connect_timeout`] and can be
/// abandoned through [`Dispatcher::disconnect`].
pub fn open_with<F, S>(
    config: TransportConfig,
    keep_alive: bool,
    delivery: DeliverySender,
    connect: F,
) -> SessionHandle
where
    F: Future<Output = io::Result<S>> + Send + 'static,
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (dispatcher, mut channels) = session_channels(delivery);
    let task = tokio::spawn(async move {
        tracing::info!(host = %config.host, port = config.port, "connecting");
        let connected = tokio::select! {
            _ = channels.stop.changed() => Err(TransportError::Closed),
            result = tokio::time::timeout(config.connect_timeout, connect) => match result {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(e)) => Err(TransportError::Connection(e.to_string())),
                Err(_) => Err(TransportError::Connection(format!(
                    "timed out after {:?}",
                    config.connect_timeout
                ))),
            },
        };

        match connected {
            Ok(stream) => run_session(stream, &config, keep_alive, channels).await,
            Err(e) => {
                tracing::warn!(error = %e, "connect failed");
                if let TransportError::Connection(reason) = &e {
                    deliver(&channels.delivery, Inbound::Notice(format!("Connection failed: {reason}")));
                }
                deliver(&channels.delivery, Inbound::Disconnected);
            },
        }
    });
    SessionHandle { dispatcher, task }
}

/// Run the session over an already-connected stream.
pub fn spawn_with_stream<S>(
    stream: S,
    config: TransportConfig,
    keep_alive: bool,
    delivery: DeliverySender,
) -> SessionHandle
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (dispatcher, channels) = session_channels(delivery);
    let task = tokio::spawn(async move { run_session(stream, &config, keep_alive, channels).await });
    SessionHandle { dispatcher, task }
}

fn deliver(delivery: &DeliverySender, item: Inbound) {
    if delivery.send(item).is_err() {
        tracing::debug!("delivery queue closed");
    }
}

/// Read loop and writer for one connected stream.
async fn run_session<S>(
    stream: S,
    config: &TransportConfig,
    mut keep_alive: bool,
    mut channels: SessionChannels,
) where
    S: AsyncRead + AsyncWrite,
{
    tracing::info!(host = %config.host, port = config.port, "connected");
    deliver(&channels.delivery, Inbound::Connected { host: config.host.clone(), port: config.port });

    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut parser = TelnetParser::new();
    let mut negotiator = Negotiator::new(config.identity.clone());
    let mut buf = BytesMut::with_capacity(config.read_buffer);

    let period = config.keep_alive_period;
    let mut keep_alive_timer = tokio::time::interval_at(Instant::now() + period, period);
    keep_alive_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        buf.reserve(config.read_buffer);
        tokio::select! {
            _ = channels.stop.changed() => {
                tracing::debug!("stop requested");
                flush_pending(&mut channels.commands, &mut writer).await;
                break;
            },
            command = channels.commands.recv() => match command {
                Some(Command::Send(text)) => write(&mut writer, &encode_line(&text)).await,
                Some(Command::KeepAlive(enabled)) => {
                    tracing::debug!(enabled, "keep-alive toggled");
                    keep_alive = enabled;
                    keep_alive_timer.reset();
                },
                None => break,
            },
            _ = keep_alive_timer.tick(), if keep_alive => {
                tracing::trace!("keep-alive");
                write(&mut writer, b"\r\n").await;
            },
            read = reader.read_buf(&mut buf) => match read {
                Ok(0) => {
                    tracing::info!("server closed the connection");
                    break;
                },
                Ok(_) => {
                    let bytes = buf.split();
                    let text = decode(&bytes, &mut parser, &mut negotiator, &mut writer).await;
                    if !text.is_empty() {
                        deliver(&channels.delivery, Inbound::Chunk(text));
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "read failed");
                    deliver(&channels.delivery, Inbound::Notice(format!("Error reading from server: {e}")));
                    break;
                },
            },
        }
    }

    if let Err(e) = writer.shutdown().await {
        tracing::debug!(error = %e, "shutdown failed");
    }
    tracing::info!("disconnected");
    deliver(&channels.delivery, Inbound::Notice(DISCONNECTED_NOTICE.to_string()));
    deliver(&channels.delivery, Inbound::Disconnected);
}

/// Write every line queued before the stop request, in order.
async fn flush_pending<W: AsyncWrite>(
    commands: &mut mpsc::UnboundedReceiver<Command>,
    writer: &mut WriteHalf<W>,
) {
    commands.close();
    while let Ok(command) = commands.try_recv() {
        if let Command::Send(text) = command {
            write(writer, &encode_line(&text)).await;
        }
    }
}

fn encode_line(text: &str) -> Vec<u8> {
    let mut bytes = escape_iac(&cp437::encode(text));
    bytes.extend_from_slice(b"\r\n");
    bytes
}

/// Strip telnet commands from `bytes`, answer negotiation, decode the rest.
async fn decode<W: AsyncWrite>(
    bytes: &[u8],
    parser: &mut TelnetParser,
    negotiator: &mut Negotiator,
    writer: &mut WriteHalf<W>,
) -> String {
    let mut text = String::new();
    for event in parser.feed(bytes) {
        match event {
            TelnetEvent::Data(data) => text.push_str(&cp437::decode(&data)),
            other => {
                tracing::trace!(event = ?other, "telnet command");
                let reply = negotiator.respond(&other);
                if !reply.is_empty() {
                    write(writer, &reply).await;
                }
            },
        }
    }
    text
}

/// Write and flush. Failures are logged; the read side decides when the
/// session is over.
async fn write<W: AsyncWrite>(writer: &mut WriteHalf<W>, bytes: &[u8]) {
    let result = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    }
    .await;
    if let Err(e) = result {
        tracing::warn!(error = %e, "write failed");
    }
}

#[cfg(test)]
mod tests {
    use bbslink_proto::telnet::{DO, IAC, SB, SE, WILL, opt};
    use tokio::io::duplex;

    use super::*;

    async fn next(queue: &mut DeliveryQueue) -> Inbound {
        tokio::time::timeout(Duration::from_secs(5), queue.recv()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn chunks_are_decoded_and_stripped() {
        let (client, mut server) = duplex(1024);
        let (tx, mut queue) = delivery_channel();
        let _session = spawn_with_stream(client, TransportConfig::new("bbs", 23), false, tx);

        assert_eq!(next(&mut queue).await, Inbound::Connected { host: "bbs".into(), port: 23 });

        server.write_all(&[b'h', b'i', IAC, IAC, 0xB0, b'\r', b'\n']).await.unwrap();
        assert_eq!(next(&mut queue).await, Inbound::Chunk("hi\u{a0}░\r\n".into()));
    }

    #[tokio::test]
    async fn negotiation_is_answered() {
        let (client, mut server) = duplex(1024);
        let (tx, mut queue) = delivery_channel();
        let _session = spawn_with_stream(client, TransportConfig::new("bbs", 23), false, tx);
        next(&mut queue).await;

        server.write_all(&[IAC, DO, opt::NAWS]).await.unwrap();
        let mut reply = [0u8; 12];
        server.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [IAC, WILL, opt::NAWS, IAC, SB, opt::NAWS, 0, 136, 0, 50, IAC, SE]);
    }

    #[tokio::test]
    async fn sends_are_terminated_and_encoded() {
        let (client, mut server) = duplex(1024);
        let (tx, mut queue) = delivery_channel();
        let session = spawn_with_stream(client, TransportConfig::new("bbs", 23), false, tx);
        next(&mut queue).await;

        session.dispatcher().send("wave").unwrap();
        session.dispatcher().send("░").unwrap();
        let mut out = [0u8; 9];
        server.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"wave\r\n\xB0\r\n");
    }

    #[tokio::test]
    async fn remote_close_reports_once() {
        let (client, server) = duplex(64);
        let (tx, mut queue) = delivery_channel();
        let session = spawn_with_stream(client, TransportConfig::new("bbs", 23), false, tx);
        next(&mut queue).await;

        drop(server);
        assert_eq!(next(&mut queue).await, Inbound::Notice(DISCONNECTED_NOTICE.into()));
        assert_eq!(next(&mut queue).await, Inbound::Disconnected);

        let dispatcher = session.dispatcher().clone();
        session.join().await;
        assert!(dispatcher.is_closed());
        assert_eq!(dispatcher.send("late"), Err(TransportError::Closed));
        assert!(queue.recv().await.is_none());
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let (client, _server) = duplex(64);
        let (tx, mut queue) = delivery_channel();
        let session = spawn_with_stream(client, TransportConfig::new("bbs", 23), false, tx);
        next(&mut queue).await;

        session.dispatcher().disconnect();
        session.dispatcher().disconnect();
        session.join().await;

        let rest = queue.drain();
        assert_eq!(rest, vec![Inbound::Notice(DISCONNECTED_NOTICE.into()), Inbound::Disconnected]);
    }

    #[tokio::test]
    async fn lines_queued_before_disconnect_are_flushed() {
        for _ in 0..50 {
            let (client, mut server) = duplex(1024);
            let (tx, mut queue) = delivery_channel();
            let session = spawn_with_stream(client, TransportConfig::new("bbs", 23), false, tx);
            next(&mut queue).await;

            session.dispatcher().send("so long").unwrap();
            session.dispatcher().send("bye").unwrap();
            session.dispatcher().disconnect();
            let dispatcher = session.dispatcher().clone();
            session.join().await;
            assert_eq!(dispatcher.send("late"), Err(TransportError::Closed));

            let mut out = Vec::new();
            server.read_to_end(&mut out).await.unwrap();
            assert_eq!(out, b"so long\r\nbye\r\n");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn keep_alive_sends_line_terminators() {
        let (client, mut server) = duplex(64);
        let (tx, mut queue) = delivery_channel();
        let session = spawn_with_stream(client, TransportConfig::new("bbs", 23), true, tx);
        next(&mut queue).await;

        let mut out = [0u8; 4];
        server.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"\r\n\r\n");

        session.dispatcher().set_keep_alive(false).unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;
        session.dispatcher().send("x").unwrap();
        let mut out = [0u8; 3];
        server.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"x\r\n");
    }

    #[tokio::test]
    async fn connect_failure_is_a_notice() {
        let (tx, mut queue) = delivery_channel();
        let _session = open_with(TransportConfig::new("bbs", 23), false, tx, async {
            Err::<tokio::io::DuplexStream, _>(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        });

        assert_eq!(next(&mut queue).await, Inbound::Notice("Connection failed: refused".into()));
        assert_eq!(next(&mut queue).await, Inbound::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_timeout_is_a_notice() {
        let (tx, mut queue) = delivery_channel();
        let config = TransportConfig { connect_timeout: Duration::from_secs(1), ..TransportConfig::new("bbs", 23) };
        let _session = open_with(config, false, tx, std::future::pending::<io::Result<tokio::io::DuplexStream>>());

        match next(&mut queue).await {
            Inbound::Notice(text) => assert!(text.starts_with("Connection failed: timed out")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(next(&mut queue).await, Inbound::Disconnected);
    }
}
