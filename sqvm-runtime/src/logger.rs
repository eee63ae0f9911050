//! Bridge between the VM `Logger` and `tracing`

use sqvm_core::diagnostics::LogSink;
use sqvm_core::Severity;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Sends every rendered diagnostic to `tracing` (target `sqvm::diagnostics`)
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Fatal | Severity::Error => {
                tracing::error!(target: "sqvm::diagnostics", severity = %severity, "{}", message)
            }
            Severity::Warning => tracing::warn!(target: "sqvm::diagnostics", "{}", message),
            Severity::Info => tracing::info!(target: "sqvm::diagnostics", "{}", message),
            Severity::Verbose => tracing::debug!(target: "sqvm::diagnostics", "{}", message),
            Severity::Trace => tracing::trace!(target: "sqvm::diagnostics", "{}", message),
        }
    }
}

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by `default_filter`
/// when the variable is unset.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
