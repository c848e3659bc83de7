//! Runtime initialization helpers for embedding shells.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a shell that has no subscriber of its own.
///
/// Respects `RUST_LOG`; defaults to `info`. Safe to call more than once —
/// later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Install the process-wide TLS crypto provider.
///
/// Must run before the first transport or webhook connection; safe to call
/// more than once.
pub fn init_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
