use std::io;

use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::Registry;

use crate::error::InitError;
use crate::fields::DIAGNOSTICS_TARGET;
use crate::layer::EventLogLayer;
use crate::logger::Logger;

/// Configuration of the global `tracing` bridge.
///
/// **Fields**
/// - `enable_stderr_diagnostics`: if `true`, the crate's own diagnostics
///   (serialization anomalies, failed writes) are printed to stderr by a
///   `fmt` layer next to the bridge.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub enable_stderr_diagnostics: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enable_stderr_diagnostics: true,
        }
    }
}

fn diagnostics_layer<S>() -> impl Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(filter_fn(|meta| meta.target() == DIAGNOSTICS_TARGET))
}

/// Print the crate's own diagnostics to stderr.
///
/// Installs a global subscriber holding only the diagnostics `fmt` layer.
/// Use this when events are logged through [`Logger`] directly and no
/// other subscriber is installed.
pub fn init_diagnostics() -> Result<(), InitError> {
    let subscriber = Registry::default().with(diagnostics_layer());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Route every `tracing` event in the process through `logger`.
///
/// **Parameters**
/// - `logger`: logger whose writer, scope fields and request-scoped
///   identifiers every bridged event inherits.
/// - `config`: [`BridgeConfig`] controlling diagnostics output.
///
/// **Returns**
/// - `Err(InitError)` if a global subscriber was already installed.
pub fn init_tracing_with_config(logger: Logger, config: BridgeConfig) -> Result<(), InitError> {
    let layer = EventLogLayer::new(logger);

    if config.enable_stderr_diagnostics {
        let subscriber = Registry::default().with(layer).with(diagnostics_layer());
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Initialize the bridge with [`BridgeConfig::default`].
pub fn init_tracing(logger: Logger) -> Result<(), InitError> {
    init_tracing_with_config(logger, BridgeConfig::default())
}
