use amber_core::Config;
use amber_relay::Relay;

/// Shared, read-only after startup.
pub struct AppState {
    pub config: Config,
    pub relay: Relay,
}
