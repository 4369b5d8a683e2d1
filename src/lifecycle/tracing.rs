//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the process-wide `tracing` subscriber.
//!
//! ## Configuration
//!
//! Verbosity comes from `RUST_LOG`. Module paths are hidden
//! (`with_target(false)`); every event carries the structured fields that
//! identify it instead.
//!
//! ## What Gets Traced
//!
//! | Level | Events | Fields |
//! |-------|--------|--------|
//! | `info` | shell transitions, connections configured / closed, host start and stop | `connection`, `requestor`, `services` |
//! | `debug` | every bind, factory registration | `connection`, `interface`, `endpoint` |
//! | `warn` | unsupported interface, duplicate registration, rejected connection | `interface`, `previous_registrations` |
//! | `error` | construction failures and panics, protocol violations | `error`, `message` |
//! | `trace` | pipe creation and endpoint closure | `endpoint` |
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle only
//! RUST_LOG=info cargo run
//!
//! # Every bind request
//! RUST_LOG=debug cargo run
//!
//! # Endpoint traffic
//! RUST_LOG=app_shell::framework::channel=trace cargo run
//! ```
//!
//! ## Workflow Trace Example
//!
//! ```text
//! INFO Host started
//! INFO Shell initialized url="app://authentication" args=0
//! INFO Connection configured connection=conn_1 requestor="app://demo" services=1
//! DEBUG Bind connection=conn_1 interface="authentication.AuthenticationService" endpoint=ep_4
//! INFO Shell terminated
//! ```

/// Initializes the tracing subscriber. Call once, at startup.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
