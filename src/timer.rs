use std::{future::Future, sync::Mutex};
use tokio::task::JoinHandle;

/// A slot for at most one background task.
///
/// Starting a new task aborts whatever was there before, so there is never
/// more than one copy of a loop running.
#[derive(Debug, Default)]
pub(crate) struct TaskSlot {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    pub(crate) fn replace<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(previous) = slot.take() {
            previous.abort();
        }

        *slot = Some(tokio::spawn(task));
    }

    /// Cancel the task, if there is one. Returns `true` if a task was
    /// actually running.
    pub(crate) fn stop(&self) -> bool {
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());

        match slot.take() {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                was_running
            },
            None => false,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        let slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map_or(false, |handle| !handle.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        let slot = self.handle.get_mut().unwrap_or_else(|e| e.into_inner());

        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
