//! Relay configuration.

use serde::{Deserialize, Serialize};

/// Configuration shared by every relay actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Capacity of each actor's command channel. When it fills up,
    /// connection handlers wait before forwarding more frames.
    pub command_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { command_buffer: 64 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_default() {
        assert_eq!(RelayConfig::default().command_buffer, 64);
    }
}
