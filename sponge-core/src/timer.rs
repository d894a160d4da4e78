//! The retransmission timer.
//!
//! Time is virtual: the owner reports elapsed milliseconds through
//! [`RetransmissionTimer::tick`] and polls [`RetransmissionTimer::expired`].
//! The retransmission timeout (RTO) starts at the configured initial value,
//! doubles on every back-off, and returns to the initial value once the peer
//! acknowledges new data.

/// A single countdown with exponential back-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmissionTimer {
    /// The RTO restored by [`reset`](Self::reset)
    initial_rto: u64,
    /// The RTO after any back-off
    current_rto: u64,
    /// Milliseconds since the timer was last started
    elapsed: u64,
    running: bool,
}

impl RetransmissionTimer {
    /// Creates a stopped timer with the given initial RTO in milliseconds.
    pub fn new(initial_rto: u64) -> Self {
        Self {
            initial_rto,
            current_rto: initial_rto,
            elapsed: 0,
            running: false,
        }
    }

    /// Starts counting from zero.
    pub fn start(&mut self) {
        self.elapsed = 0;
        self.running = true;
    }

    /// Stops counting. The elapsed time and RTO are left as they are.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Restores the RTO to its initial value.
    pub fn reset(&mut self) {
        self.current_rto = self.initial_rto;
    }

    /// Doubles the RTO. Capping the number of doublings is left to the
    /// owner's retry policy.
    pub fn reset_double(&mut self) {
        self.current_rto = self.current_rto.saturating_mul(2);
    }

    /// Advances the timer by `ms` milliseconds if it is running.
    pub fn tick(&mut self, ms: u64) {
        if self.running {
            self.elapsed = self.elapsed.saturating_add(ms);
        }
    }

    /// Whether the timer is running and the RTO has elapsed.
    pub fn expired(&self) -> bool {
        self.running && self.elapsed >= self.current_rto
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// The current RTO in milliseconds.
    pub fn rto(&self) -> u64 {
        self.current_rto
    }
}
