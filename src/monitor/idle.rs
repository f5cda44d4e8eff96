use std::time::Duration;

use super::environment::{ActivityKind, Visibility};
use crate::infrastructure::Deadline;

/// What the connection manager should do after an environment change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    /// Nothing beyond the monitor's own bookkeeping
    None,
    /// Open a fresh connection; the idle deadline is already re-armed
    Resume,
    /// Close the connection and cancel any pending reconnect
    Suspend,
}

/// Decides when the connection should be torn down for inactivity and when
/// it should come back.
///
/// `suspended` means the monitor (not the user or the server) closed the
/// connection, so returning activity or visibility should reopen it.
#[derive(Debug)]
pub struct IdleMonitor {
    timeout: Option<Duration>,
    qualifying: Vec<ActivityKind>,
    deadline: Deadline,
    visible: bool,
    suspended: bool,
}

impl IdleMonitor {
    /// `timeout` of `None` disables idle closing; visibility still applies
    pub fn new(timeout: Option<Duration>, qualifying: Vec<ActivityKind>) -> Self {
        Self {
            timeout,
            qualifying,
            deadline: Deadline::new(),
            visible: true,
            suspended: false,
        }
    }

    /// Restarts the idle countdown, if idle closing is on and the host is visible
    pub fn arm(&mut self) {
        if let Some(timeout) = self.timeout
            && self.visible
        {
            self.deadline.arm(timeout);
        }
    }

    pub fn clear(&mut self) {
        self.deadline.clear();
    }

    /// Connection opened: no longer suspended, countdown restarts
    pub fn opened(&mut self) {
        self.suspended = false;
        self.arm();
    }

    /// Connect was requested while hidden
    pub fn defer(&mut self) {
        self.suspended = true;
        self.deadline.clear();
    }

    /// Owner disabled: forget everything but visibility
    pub fn reset(&mut self) {
        self.suspended = false;
        self.deadline.clear();
    }

    pub fn on_activity(&mut self, kind: ActivityKind, enabled: bool) -> IdleAction {
        if !self.visible || !enabled || !self.qualifying.contains(&kind) {
            return IdleAction::None;
        }

        self.arm();
        if self.suspended {
            self.suspended = false;
            return IdleAction::Resume;
        }
        IdleAction::None
    }

    pub fn on_visibility(&mut self, visibility: Visibility, enabled: bool) -> IdleAction {
        match visibility {
            Visibility::Hidden => {
                if !self.visible {
                    return IdleAction::None;
                }
                self.visible = false;
                self.suspended = true;
                self.deadline.clear();
                IdleAction::Suspend
            }
            Visibility::Visible => {
                if self.visible {
                    return IdleAction::None;
                }
                self.visible = true;
                if enabled && self.suspended {
                    self.suspended = false;
                    self.arm();
                    return IdleAction::Resume;
                }
                IdleAction::None
            }
        }
    }

    /// Completes when the user has been inactive for the whole timeout
    pub async fn expired(&mut self) {
        self.deadline.fired().await;
        self.suspended = true;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_armed()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }
}
