use std::{future::Future, time::Duration};

use tokio::task::JoinHandle;
use tracing::trace;

use crate::loader::{Generation, Ticket};

/// Runs only the last of a burst of calls, once `quiet_period` has passed
/// without another call. The action receives the call's [`Ticket`] so it can
/// check, after awaiting, that it is still the newest.
#[derive(Debug)]
pub struct Debouncer {
    quiet_period: Duration,
    generation: Generation,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self { quiet_period, generation: Generation::new(), pending: None }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn call<F, Fut>(&mut self, action: F) -> Ticket
    where
        F: FnOnce(Ticket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.supersede();
        self.schedule(ticket.clone(), action);
        ticket
    }

    /// Invalidates every earlier call and drops the pending one. Callers that
    /// publish a placeholder state do so after this and before
    /// [`Debouncer::schedule`], so no earlier result can land on top of it.
    pub fn supersede(&mut self) -> Ticket {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.generation.advance()
    }

    /// Runs `action` after the quiet period if `ticket` is still the newest.
    pub fn schedule<F, Fut>(&mut self, ticket: Ticket, action: F)
    where
        F: FnOnce(Ticket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let quiet_period = self.quiet_period;
        self.pending = Some(tokio::spawn(async move {
            if !quiet_period.is_zero() {
                tokio::time::sleep(quiet_period).await;
            }
            if !ticket.is_current() {
                trace!(ticket = ticket.value(), "debounced call superseded");
                return;
            }
            action(ticket).await;
        }));
    }

    pub fn cancel(&mut self) {
        self.generation.invalidate();
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
