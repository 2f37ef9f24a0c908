//! Reconnect bookkeeping, kept free of I/O so it can be tested directly.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;

// ---------------------------------------------------------------------------
// ReconnectPolicy
// ---------------------------------------------------------------------------

/// Backoff settings.
///
/// The delay before retry `n` (starting at 0) is `base_delay * 2^n`. With the
/// defaults that is 1, 2, 4, 8 and 16 seconds, then the client gives up.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_retries: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_retries: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given retry, saturating instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

// ---------------------------------------------------------------------------
// LinkStatus
// ---------------------------------------------------------------------------

/// What the UI should show about the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Not started yet.
    Idle,
    Connecting,
    Connected,
    /// Waiting `delay` before retry number `attempt` (1-based).
    Reconnecting { attempt: u32, delay: Duration },
    /// Out of retries. Terminal.
    Lost,
    /// The user left. Terminal.
    Closed,
}

impl LinkStatus {
    /// Returns `true` once no further connection attempts will be made.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Lost | Self::Closed)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Reconnecting { attempt, delay } => write!(
                f,
                "reconnecting in {}s (attempt {attempt})",
                delay.as_secs_f32()
            ),
            Self::Lost => f.write_str("connection lost, cannot continue"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// ReconnectController
// ---------------------------------------------------------------------------

/// What to do after the link dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Wait `delay`, then make retry number `attempt` (1-based).
    Retry { attempt: u32, delay: Duration },
    /// Out of retries.
    GiveUp,
}

/// Tracks reconnect attempts and publishes [`LinkStatus`] changes.
///
/// A completed handshake counts as a successful connection and resets the
/// attempt counter. A failed connect consumes a retry like any other loss.
#[derive(Debug)]
pub struct ReconnectController {
    policy: ReconnectPolicy,
    attempt: u32,
    status: watch::Sender<LinkStatus>,
}

impl ReconnectController {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let (status, _) = watch::channel(LinkStatus::Idle);
        Self {
            policy,
            attempt: 0,
            status,
        }
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.subscribe()
    }

    /// The current status.
    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    /// Retries used since the last successful connection.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn on_connecting(&mut self) {
        self.status.send_replace(LinkStatus::Connecting);
    }

    /// A connection was established; the retry budget is restored.
    pub fn on_connected(&mut self) {
        self.attempt = 0;
        self.status.send_replace(LinkStatus::Connected);
    }

    /// The link dropped without the user asking for it.
    pub fn on_link_lost(&mut self) -> Decision {
        if self.attempt >= self.policy.max_retries {
            self.status.send_replace(LinkStatus::Lost);
            return Decision::GiveUp;
        }

        let delay = self.policy.delay_for(self.attempt);
        self.attempt += 1;
        self.status.send_replace(LinkStatus::Reconnecting {
            attempt: self.attempt,
            delay,
        });
        Decision::Retry {
            attempt: self.attempt,
            delay,
        }
    }

    /// The user closed the session. No retry follows.
    pub fn on_user_exit(&mut self) {
        self.status.send_replace(LinkStatus::Closed);
    }
}
