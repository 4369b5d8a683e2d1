//! # Application Shell
//!
//! [`ApplicationDelegate`] is what an application implements: one hook for
//! startup, one per inbound connection, one for shutdown.
//!
//! [`ApplicationShell`] wraps a delegate in an explicit lifecycle state
//! machine so the host runtime cannot call the hooks out of order:
//!
//! ```text
//! Created ─initialize─▶ Initialized ─configure─▶ Accepting ─quit─▶ Quitting ─▶ Terminated
//! ```
//!
//! `quit` from `Created` skips straight to `Terminated` without calling the
//! delegate; `quit` from `Initialized` goes through `Quitting` like any other.
//!
//! Out-of-order calls are reported as [`ProtocolViolation`]s, never silently
//! absorbed.
//!
//! ## Concurrency
//!
//! `configure_incoming_connection` takes `&self` on both the shell and the
//! delegate, so a host may configure distinct connections from several tasks
//! at once. `initialize` and `quit` take the delegate exclusively; `quit`
//! therefore waits for every configuration call already in flight.

use crate::framework::connection::{ConfiguredConnection, Connection};
use crate::framework::core::RuntimeHandle;
use crate::framework::error::{panic_message, ProtocolViolation, ServiceError, ShellError};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// What the host hands the application at startup: a handle to the
/// enclosing shell environment.
#[derive(Debug, Clone)]
pub struct ShellContext {
    shell_url: String,
    runtime: RuntimeHandle,
}

impl ShellContext {
    pub fn new(shell_url: impl Into<String>, runtime: RuntimeHandle) -> Self {
        Self {
            shell_url: shell_url.into(),
            runtime,
        }
    }

    pub fn shell_url(&self) -> &str {
        &self.shell_url
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }
}

/// Application-side lifecycle hooks.
pub trait ApplicationDelegate: Send + Sync + 'static {
    /// Called once, before any connection is configured. Should only store
    /// what it needs; it must not block.
    fn initialize(
        &mut self,
        _shell: ShellContext,
        _args: &[String],
        _url: &str,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Called once per inbound connection, before any bind request reaches
    /// it. Registers factories on `connection` and returns `false` to reject
    /// it outright.
    ///
    /// May run concurrently for distinct connections; any state shared
    /// between calls needs its own synchronization.
    fn configure_incoming_connection(&self, connection: &mut Connection) -> bool;

    /// Called at most once, after the last configuration call. Releases
    /// whatever the application acquired.
    fn quit(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Lifecycle states of an [`ApplicationShell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Created,
    Initialized,
    Accepting,
    Quitting,
    Terminated,
}

impl fmt::Display for ShellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShellState::Created => "created",
            ShellState::Initialized => "initialized",
            ShellState::Accepting => "accepting",
            ShellState::Quitting => "quitting",
            ShellState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Lifecycle owner wrapping an [`ApplicationDelegate`].
pub struct ApplicationShell<D: ApplicationDelegate> {
    state: Mutex<ShellState>,
    delegate: RwLock<D>,
}

impl<D: ApplicationDelegate> ApplicationShell<D> {
    pub fn new(delegate: D) -> Self {
        Self {
            state: Mutex::new(ShellState::Created),
            delegate: RwLock::new(delegate),
        }
    }

    pub fn state(&self) -> ShellState {
        *self.state.lock()
    }

    /// Runs `f` with shared access to the delegate.
    pub fn with_delegate<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&self.delegate.read())
    }

    /// `Created → Initialized`.
    pub fn initialize(
        &self,
        shell: ShellContext,
        args: &[String],
        url: &str,
    ) -> Result<(), ShellError> {
        // Lock order everywhere: delegate before state.
        let mut delegate = self.delegate.write();
        let mut state = self.state.lock();
        match *state {
            ShellState::Created => {}
            ShellState::Quitting | ShellState::Terminated => {
                return Err(ProtocolViolation::ShellTerminated.into())
            }
            ShellState::Initialized | ShellState::Accepting => {
                return Err(ProtocolViolation::AlreadyInitialized.into())
            }
        }

        delegate
            .initialize(shell, args, url)
            .map_err(|source| ShellError::Lifecycle {
                phase: "initialize",
                source,
            })?;
        *state = ShellState::Initialized;
        info!(url, args = args.len(), "Shell initialized");
        Ok(())
    }

    /// Offers `connection` to the delegate.
    ///
    /// Returns `Ok(Some(_))` with the frozen connection if the delegate
    /// accepted it, `Ok(None)` if it rejected it. The `Connection` is
    /// consumed either way, so it cannot be configured twice.
    pub fn configure_incoming_connection(
        &self,
        mut connection: Connection,
    ) -> Result<Option<ConfiguredConnection>, ShellError> {
        // Hold the read guard across the whole call: quit() needs the write
        // guard and so waits for us.
        let delegate = self.delegate.read();
        self.enter_accepting()?;

        let connection_id = connection.id();
        if !delegate.configure_incoming_connection(&mut connection) {
            warn!(connection = %connection_id, requestor = connection.requestor_url(), "Connection rejected");
            return Ok(None);
        }

        let registry = connection.registry();
        if registry.has_conflicts() {
            warn!(
                connection = %connection_id,
                conflicts = registry.conflicts().len(),
                "Connection configured with duplicate registrations"
            );
        }
        info!(
            connection = %connection_id,
            requestor = connection.requestor_url(),
            services = registry.len(),
            "Connection configured"
        );
        Ok(Some(connection.into_configured()))
    }

    /// Shuts the application down. Safe to call any number of times, in any
    /// state; only the first call from an initialized shell reaches the
    /// delegate.
    ///
    /// Waits for configuration calls already in flight. A delegate that fails
    /// or panics in `quit` is reported as [`ShellError::Lifecycle`], and the
    /// shell is `Terminated` either way.
    pub fn quit(&self) -> Result<(), ShellError> {
        {
            let mut state = self.state.lock();
            match *state {
                ShellState::Created => {
                    *state = ShellState::Terminated;
                    info!("Shell quit before initialize");
                    return Ok(());
                }
                ShellState::Quitting | ShellState::Terminated => {
                    debug!(state = %*state, "Shell already quitting");
                    return Ok(());
                }
                ShellState::Initialized | ShellState::Accepting => {
                    *state = ShellState::Quitting;
                }
            }
        }

        // A panicking delegate still ends in Terminated; otherwise later
        // calls would see Quitting forever.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.delegate.write().quit()));
        *self.state.lock() = ShellState::Terminated;
        info!("Shell terminated");
        match outcome {
            Ok(result) => result.map_err(|source| ShellError::Lifecycle {
                phase: "quit",
                source,
            }),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%message, "Delegate panicked in quit");
                Err(ShellError::Lifecycle {
                    phase: "quit",
                    source: message.into(),
                })
            }
        }
    }

    fn enter_accepting(&self) -> Result<(), ProtocolViolation> {
        let mut state = self.state.lock();
        match *state {
            ShellState::Created => Err(ProtocolViolation::NotInitialized),
            ShellState::Quitting | ShellState::Terminated => Err(ProtocolViolation::ShellTerminated),
            ShellState::Initialized => {
                *state = ShellState::Accepting;
                Ok(())
            }
            ShellState::Accepting => Ok(()),
        }
    }
}

impl<D: ApplicationDelegate> fmt::Debug for ApplicationShell<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationShell")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::connection::ConnectionId;
    use crate::framework::mock::RecordingDelegate;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    /// Blocks inside configuration until told to go on, and records whether
    /// that call had finished by the time `quit` ran.
    struct SlowConfigureDelegate {
        entered: parking_lot::Mutex<Option<mpsc::Sender<()>>>,
        configure_done: Arc<AtomicBool>,
        quit_saw_configure_done: Arc<AtomicBool>,
    }

    impl ApplicationDelegate for SlowConfigureDelegate {
        fn configure_incoming_connection(&self, _connection: &mut Connection) -> bool {
            if let Some(entered) = self.entered.lock().take() {
                let _ = entered.send(());
            }
            std::thread::sleep(Duration::from_millis(150));
            self.configure_done.store(true, Ordering::SeqCst);
            true
        }

        fn quit(&mut self) -> Result<(), ServiceError> {
            let done = self.configure_done.load(Ordering::SeqCst);
            self.quit_saw_configure_done.store(done, Ordering::SeqCst);
            Ok(())
        }
    }

    struct PanickingQuitDelegate;

    impl ApplicationDelegate for PanickingQuitDelegate {
        fn configure_incoming_connection(&self, _connection: &mut Connection) -> bool {
            true
        }

        fn quit(&mut self) -> Result<(), ServiceError> {
            panic!("cleanup blew up");
        }
    }

    fn context() -> ShellContext {
        ShellContext::new("shell://test", RuntimeHandle::new(4))
    }

    fn connection(id: u64) -> Connection {
        Connection::new(ConnectionId::from(id), "app://peer")
    }

    #[test]
    fn test_full_lifecycle() {
        let shell = ApplicationShell::new(RecordingDelegate::serving(&["Auth"]));
        assert_eq!(shell.state(), ShellState::Created);

        shell
            .initialize(context(), &["--flag".to_string()], "app://auth")
            .unwrap();
        assert_eq!(shell.state(), ShellState::Initialized);

        let configured = shell
            .configure_incoming_connection(connection(1))
            .unwrap()
            .expect("delegate accepts");
        assert!(configured.registry().contains("Auth"));
        assert_eq!(shell.state(), ShellState::Accepting);

        shell.quit().unwrap();
        assert_eq!(shell.state(), ShellState::Terminated);

        shell.with_delegate(|delegate| {
            assert_eq!(delegate.initialized_with(), Some(("app://auth".to_string(), 1)));
            assert_eq!(delegate.configured_connections(), vec![ConnectionId::from(1)]);
            assert_eq!(delegate.quit_calls(), 1);
        });
    }

    #[test]
    fn test_configure_before_initialize_is_violation() {
        let shell = ApplicationShell::new(RecordingDelegate::serving(&["Auth"]));
        let err = shell.configure_incoming_connection(connection(1)).unwrap_err();
        assert!(matches!(err, ShellError::Protocol(ProtocolViolation::NotInitialized)));
        shell.with_delegate(|d| assert!(d.configured_connections().is_empty()));
    }

    #[test]
    fn test_configure_after_quit_is_violation() {
        let shell = ApplicationShell::new(RecordingDelegate::serving(&["Auth"]));
        shell.initialize(context(), &[], "app://auth").unwrap();
        shell.quit().unwrap();
        let err = shell.configure_incoming_connection(connection(1)).unwrap_err();
        assert!(matches!(err, ShellError::Protocol(ProtocolViolation::ShellTerminated)));
    }

    #[test]
    fn test_double_initialize_is_violation() {
        let shell = ApplicationShell::new(RecordingDelegate::serving(&[]));
        shell.initialize(context(), &[], "app://auth").unwrap();
        let err = shell.initialize(context(), &[], "app://auth").unwrap_err();
        assert!(matches!(err, ShellError::Protocol(ProtocolViolation::AlreadyInitialized)));
    }

    #[test]
    fn test_quit_is_idempotent_without_connections() {
        let shell = ApplicationShell::new(RecordingDelegate::serving(&[]));
        shell.quit().unwrap();
        shell.quit().unwrap();
        assert_eq!(shell.state(), ShellState::Terminated);
        // Never initialized, so the delegate never sees quit.
        shell.with_delegate(|d| assert_eq!(d.quit_calls(), 0));

        let shell = ApplicationShell::new(RecordingDelegate::serving(&[]));
        shell.initialize(context(), &[], "app://auth").unwrap();
        shell.quit().unwrap();
        shell.quit().unwrap();
        shell.with_delegate(|d| assert_eq!(d.quit_calls(), 1));
    }

    #[test]
    fn test_rejected_connection_yields_none() {
        let shell = ApplicationShell::new(RecordingDelegate::rejecting());
        shell.initialize(context(), &[], "app://auth").unwrap();
        assert!(shell
            .configure_incoming_connection(connection(3))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_initialize_failure_keeps_shell_created() {
        let shell = ApplicationShell::new(RecordingDelegate::failing_initialize("no platform"));
        let err = shell.initialize(context(), &[], "app://auth").unwrap_err();
        assert!(matches!(err, ShellError::Lifecycle { phase: "initialize", .. }));
        assert_eq!(shell.state(), ShellState::Created);
    }

    #[test]
    fn test_concurrent_configuration() {
        let shell = Arc::new(ApplicationShell::new(RecordingDelegate::serving(&["Auth"])));
        shell.initialize(context(), &[], "app://auth").unwrap();

        let handles: Vec<_> = (1..=8)
            .map(|id| {
                let shell = shell.clone();
                std::thread::spawn(move || {
                    shell
                        .configure_incoming_connection(connection(id))
                        .unwrap()
                        .is_some()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        shell.quit().unwrap();
        shell.with_delegate(|d| {
            let mut seen = d.configured_connections();
            seen.sort();
            assert_eq!(seen, (1..=8).map(ConnectionId::from).collect::<Vec<_>>());
        });
    }

    #[test]
    fn test_quit_waits_for_configuration_in_flight() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let configure_done = Arc::new(AtomicBool::new(false));
        let quit_saw_configure_done = Arc::new(AtomicBool::new(false));
        let shell = Arc::new(ApplicationShell::new(SlowConfigureDelegate {
            entered: parking_lot::Mutex::new(Some(entered_tx)),
            configure_done: configure_done.clone(),
            quit_saw_configure_done: quit_saw_configure_done.clone(),
        }));
        shell.initialize(context(), &[], "app://auth").unwrap();

        let configuring = {
            let shell = shell.clone();
            std::thread::spawn(move || shell.configure_incoming_connection(connection(1)))
        };

        // Quit only once the delegate is inside its configuration hook.
        entered_rx.recv().unwrap();
        assert!(!configure_done.load(Ordering::SeqCst));
        shell.quit().unwrap();

        let configured = configuring.join().unwrap().unwrap();
        assert!(configured.is_some());
        assert!(quit_saw_configure_done.load(Ordering::SeqCst));
        assert_eq!(shell.state(), ShellState::Terminated);
    }

    #[test]
    fn test_panicking_quit_still_terminates() {
        let shell = ApplicationShell::new(PanickingQuitDelegate);
        shell.initialize(context(), &[], "app://auth").unwrap();

        let err = shell.quit().unwrap_err();
        match err {
            ShellError::Lifecycle { phase, source } => {
                assert_eq!(phase, "quit");
                assert_eq!(source.to_string(), "cleanup blew up");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(shell.state(), ShellState::Terminated);

        // Later calls see a terminated shell.
        shell.quit().unwrap();
        assert!(matches!(
            shell.configure_incoming_connection(connection(1)),
            Err(ShellError::Protocol(ProtocolViolation::ShellTerminated))
        ));
    }
}
