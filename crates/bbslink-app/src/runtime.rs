//! Generic runtime for application orchestration.
//!
//! The runtime is the consumer loop. Each cycle it:
//! 1. polls the driver for user input (up to [`POLL_TIMEOUT`])
//! 2. drains the delivery queue into the [`App`]
//! 3. ticks the App so delayed sends go out
//!
//! and executes every action produced along the way. On quit the driver gets
//! [`SHUTDOWN_GRACE`] to flush and close the transport, and whatever the
//! transport delivered while closing is still handed to the App.

use std::time::Duration;

use bbslink_core::{Store, env::Environment};

use crate::{App, AppAction, AppEvent, Driver, PersistTarget};

/// How long one cycle waits for user input.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// How long quitting waits for the transport to close.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Generic runtime that orchestrates App, Driver and Store.
///
/// # Type Parameters
///
/// - `D`: platform-specific I/O driver
/// - `S`: persistence
/// - `E`: clock
pub struct Runtime<D, S, E>
where
    D: Driver,
    S: Store,
    E: Environment,
{
    driver: D,
    store: S,
    app: App<E>,
}

impl<D, S, E> Runtime<D, S, E>
where
    D: Driver,
    S: Store,
    E: Environment,
{
    /// Create a runtime, loading stored documents into `app`.
    ///
    /// A document that fails to load is logged and left empty; the session
    /// runs regardless.
    pub fn new(driver: D, store: S, mut app: App<E>) -> Self {
        match store.load_roster() {
            Ok(roster) => app.restore_roster(roster),
            Err(e) => tracing::warn!(error = %e, "failed to load roster"),
        }
        match store.load_chatlog() {
            Ok(chatlog) => app.restore_chatlog(chatlog),
            Err(e) => tracing::warn!(error = %e, "failed to load chatlog"),
        }
        match store.load_triggers() {
            Ok(triggers) => app.restore_triggers(triggers),
            Err(e) => tracing::warn!(error = %e, "failed to load triggers"),
        }
        Self { driver, store, app }
    }

    /// Run until the App asks to quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<Self, D::Error> {
        loop {
            if self.cycle().await? {
                break;
            }
        }
        self.shutdown().await?;
        Ok(self)
    }

    async fn shutdown(&mut self) -> Result<(), D::Error> {
        self.driver.stop(SHUTDOWN_GRACE).await;
        for inbound in self.driver.drain_delivery() {
            // The transport is gone; only presentation and persistence apply.
            for action in self.app.handle(inbound.into()) {
                match action {
                    AppAction::Present(event) => self.driver.present(&event)?,
                    AppAction::Persist(target) => self.persist(target),
                    _ => {},
                }
            }
        }
        Ok(())
    }

    /// One pass of the consumer loop. Returns `true` once the App has quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn cycle(&mut self) -> Result<bool, D::Error> {
        if let Some(event) = self.driver.poll_event(POLL_TIMEOUT).await?
            && self.dispatch(event)?
        {
            return Ok(true);
        }

        for inbound in self.driver.drain_delivery() {
            if self.dispatch(inbound.into())? {
                return Ok(true);
            }
        }

        self.dispatch(AppEvent::Tick)
    }

    /// Feed one event to the App and execute the resulting actions.
    ///
    /// Returns `true` if the App asked to quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub fn dispatch(&mut self, event: AppEvent) -> Result<bool, D::Error> {
        let actions = self.app.handle(event);
        self.execute(actions)
    }

    fn execute(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        for action in actions {
            match action {
                AppAction::Transmit(text) => {
                    if let Err(e) = self.driver.transmit(&text) {
                        tracing::warn!(error = %e, "transmit failed");
                    }
                },
                AppAction::Connect { target, keep_alive } => {
                    self.driver.connect(&target, keep_alive)?;
                },
                AppAction::Disconnect => self.driver.disconnect(),
                AppAction::SetKeepAlive(enabled) => {
                    if let Err(e) = self.driver.set_keep_alive(enabled) {
                        tracing::warn!(error = %e, "keep-alive toggle failed");
                    }
                },
                AppAction::Present(event) => self.driver.present(&event)?,
                AppAction::Persist(target) => self.persist(target),
                AppAction::Quit => return Ok(true),
            }
        }
        Ok(false)
    }

    /// Save a document. Failures are logged; memory stays authoritative.
    fn persist(&self, target: PersistTarget) {
        let result = match target {
            PersistTarget::Chatlog => self.store.save_chatlog(&self.app.chatlog().snapshot()),
            PersistTarget::Roster => self.store.save_roster(&self.app.roster().snapshot()),
            PersistTarget::Triggers => self.store.save_triggers(self.app.triggers().triggers()),
        };
        if let Err(e) = result {
            tracing::warn!(?target, error = %e, "persist failed");
        }
    }

    /// The App.
    pub fn app(&self) -> &App<E> {
        &self.app
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable driver access.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// The store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
