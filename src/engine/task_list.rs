use tokio::task::{JoinError, JoinHandle};

/// One entry per invocation of the current tick
#[derive(Debug)]
pub enum TaskSlot<T> {
    Spawned(JoinHandle<T>),
    /// The invocation aborted its spawn; nothing to resolve
    Skipped,
}

/// Ordered list of task handles for a tick.
///
/// Slots are pushed in invocation order and handed back by `next_slot` in the
/// same order, so result `i` always belongs to invocation `i` whatever order the
/// tasks finish in.
#[derive(Debug)]
pub struct TaskList<T> {
    slots: Vec<Option<TaskSlot<T>>>,
    cursor: usize,
    spawned: usize,
}

impl<T: Send + 'static> TaskList<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            cursor: 0,
            spawned: 0,
        }
    }

    pub fn push_spawned(&mut self, handle: JoinHandle<T>) {
        self.slots.push(Some(TaskSlot::Spawned(handle)));
        self.spawned += 1;
    }

    pub fn push_skipped(&mut self) {
        self.slots.push(Some(TaskSlot::Skipped));
    }

    /// Number of slots pushed this tick
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when at least one invocation of the tick spawned a task
    pub fn has_tasks(&self) -> bool {
        self.spawned > 0
    }

    /// True once every pushed slot has been handed out
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.slots.len()
    }

    /// Take the next slot in spawn order; every slot is handed out once
    pub fn next_slot(&mut self) -> Option<TaskSlot<T>> {
        let slot = self.slots.get_mut(self.cursor)?.take();
        self.cursor += 1;
        slot
    }

    /// Resolve the next slot, waiting only on that slot's task
    pub async fn resolve_next(&mut self) -> Option<Result<T, JoinError>> {
        match self.next_slot()? {
            TaskSlot::Spawned(handle) => Some(handle.await),
            TaskSlot::Skipped => None,
        }
    }

    /// Drop all slots. Unresolved tasks keep running detached.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
        self.spawned = 0;
    }
}

impl<T: Send + 'static> Default for TaskList<T> {
    fn default() -> Self {
        Self::new()
    }
}
