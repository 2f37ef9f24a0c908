//! Matchmaker configuration.

/// Settings for the matchmaker actor.
#[derive(Debug, Clone)]
pub struct MatchmakerConfig {
    /// Capacity of the command channel. When it fills up, connection
    /// handlers wait before their command is accepted.
    pub command_buffer: usize,
}

impl Default for MatchmakerConfig {
    fn default() -> Self {
        Self { command_buffer: 64 }
    }
}
