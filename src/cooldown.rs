//! Add-to-cart cooldown

use std::time::Duration;

use tokio::time::Instant;

/// A single global window during which repeat triggers are ignored.
#[derive(Debug, Clone)]
pub struct Cooldown {
    window: Duration,
    started: Option<Instant>,
}

impl Cooldown {
    /// Create an idle cooldown with the given window.
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            started: None,
        }
    }

    /// Whether a window is currently open.
    pub fn is_active(&self) -> bool {
        self.started
            .is_some_and(|started| started.elapsed() < self.window)
    }

    /// Open a new window starting now.
    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }
}
