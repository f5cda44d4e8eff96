use tokio::task::JoinHandle;

/// Manages background tasks with proper lifecycle handling
pub struct TaskManager {
    handles: Vec<JoinHandle<()>>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Spawn a task and track it
    pub fn spawn<F>(&mut self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.handles.push(handle);
    }

    /// Wait for every tracked task to finish on its own
    pub async fn join_all(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::warn!("Background task ended abnormally: {}", e);
            }
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
