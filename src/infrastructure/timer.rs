use std::future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep};

/// A one-shot, re-armable deadline for use inside `tokio::select!`.
///
/// [`fired`](Deadline::fired) never completes while the deadline is cleared,
/// and disarms itself once it completes.
#[derive(Debug, Default)]
pub struct Deadline {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Deadline {
    pub fn new() -> Self {
        Self { sleep: None }
    }

    /// Arms (or re-arms) the deadline `after` from now
    pub fn arm(&mut self, after: Duration) {
        match self.sleep.as_mut() {
            Some(existing) => existing.as_mut().reset(Instant::now() + after),
            None => self.sleep = Some(Box::pin(sleep(after))),
        }
    }

    pub fn clear(&mut self) {
        self.sleep = None;
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Completes when the armed deadline passes. Cancel safe.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => future::pending().await,
        }
    }
}
