//! Process-wide store of monitor tasks, grouped by conversation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::models::{MonitorStatus, MonitorTask};

#[derive(Default)]
struct Timers {
    poll: Option<JoinHandle<()>>,
    expiry: Option<JoinHandle<()>>,
}

struct HandleInner {
    id: String,
    conversation_id: String,
    task: Mutex<MonitorTask>,
    timers: Mutex<Timers>,
}

/// Shared reference to a live monitor.
///
/// Cloning is cheap. A handle outlives its registry entry, so a caller that
/// kept it still sees the terminal status after the task was purged.
#[derive(Clone)]
pub struct MonitorHandle {
    inner: Arc<HandleInner>,
}

impl MonitorHandle {
    pub fn new(task: MonitorTask) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: task.id.clone(),
                conversation_id: task.conversation_id.clone(),
                task: Mutex::new(task),
                timers: Mutex::new(Timers::default()),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn conversation_id(&self) -> &str {
        &self.inner.conversation_id
    }

    pub fn snapshot(&self) -> MonitorTask {
        self.inner.task.lock().clone()
    }

    pub fn status(&self) -> MonitorStatus {
        self.inner.task.lock().status
    }

    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    pub fn has_timers(&self) -> bool {
        let timers = self.inner.timers.lock();
        timers.poll.is_some() || timers.expiry.is_some()
    }

    /// Run `f` with the task state locked. Never call across an await.
    pub(crate) fn with_task<R>(&self, f: impl FnOnce(&mut MonitorTask) -> R) -> R {
        let mut task = self.inner.task.lock();
        f(&mut task)
    }

    /// Attach the poll and expiry timers.
    ///
    /// A task cancelled before its timers were attached aborts them at once.
    pub(crate) fn arm(&self, poll: JoinHandle<()>, expiry: JoinHandle<()>) {
        let mut timers = self.inner.timers.lock();
        if !self.is_running() {
            poll.abort();
            expiry.abort();
            return;
        }
        timers.poll = Some(poll);
        timers.expiry = Some(expiry);
    }

    /// Abort both timers and mark the task stopped if it was still running.
    pub(crate) fn cancel(&self) {
        let mut timers = self.inner.timers.lock();
        if let Some(h) = timers.poll.take() {
            h.abort();
        }
        if let Some(h) = timers.expiry.take() {
            h.abort();
        }

        let mut task = self.inner.task.lock();
        if task.status.is_running() {
            task.status = MonitorStatus::Stopped;
        }
    }
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("id", &self.inner.id)
            .field("conversation_id", &self.inner.conversation_id)
            .field("status", &self.status())
            .finish()
    }
}

/// conversation id -> monitors, in insertion order.
#[derive(Default)]
pub struct TaskRegistry {
    inner: RwLock<HashMap<String, Vec<MonitorHandle>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, conversation_id: &str, handle: MonitorHandle) {
        self.inner
            .write()
            .entry(conversation_id.to_string())
            .or_default()
            .push(handle);
    }

    /// Insert only while the conversation has fewer than `capacity` running tasks.
    pub fn try_insert(&self, conversation_id: &str, handle: MonitorHandle, capacity: usize) -> bool {
        let mut map = self.inner.write();
        let list = map.entry(conversation_id.to_string()).or_default();

        let running = list.iter().filter(|h| h.is_running()).count();
        if running >= capacity {
            if list.is_empty() {
                map.remove(conversation_id);
            }
            return false;
        }

        list.push(handle);
        true
    }

    pub fn running_count(&self, conversation_id: &str) -> usize {
        self.inner
            .read()
            .get(conversation_id)
            .map(|list| list.iter().filter(|h| h.is_running()).count())
            .unwrap_or(0)
    }

    pub fn find(&self, conversation_id: &str, task_id: &str) -> Option<MonitorHandle> {
        self.inner
            .read()
            .get(conversation_id)?
            .iter()
            .find(|h| h.id() == task_id)
            .cloned()
    }

    pub fn list_by_conversation(&self, conversation_id: &str) -> Vec<MonitorTask> {
        self.inner
            .read()
            .get(conversation_id)
            .map(|list| list.iter().map(MonitorHandle::snapshot).collect())
            .unwrap_or_default()
    }

    pub fn list_all(&self) -> Vec<MonitorTask> {
        self.inner
            .read()
            .values()
            .flat_map(|list| list.iter().map(MonitorHandle::snapshot))
            .collect()
    }

    /// Remove one task. Empty conversation keys are dropped.
    pub fn remove(&self, conversation_id: &str, task_id: &str) -> Option<MonitorHandle> {
        let mut map = self.inner.write();
        let list = map.get_mut(conversation_id)?;

        let pos = list.iter().position(|h| h.id() == task_id)?;
        let removed = list.remove(pos);

        if list.is_empty() {
            map.remove(conversation_id);
        }
        Some(removed)
    }

    pub fn remove_all(&self, conversation_id: &str) -> Vec<MonitorHandle> {
        self.inner.write().remove(conversation_id).unwrap_or_default()
    }

    pub fn conversation_count(&self) -> usize {
        self.inner.read().len()
    }
}
