//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Stable index of an entity within the current entity set (`0..N-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub usize);

impl EntityId {
    /// Get the raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Next process-wide worker number.
static NEXT_WORKER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_WORKER: OnceCell<WorkerId> = const { OnceCell::new() };
}

/// Identity of the OS thread that executed a piece of work.
///
/// Numbers are handed out sequentially the first time a thread asks for its
/// identity and are never reused within a process. The thread name is kept
/// alongside for display; tokio workers are all named alike unless the
/// runtime is built with a `thread_name_fn`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId {
    number: u64,
    name: Arc<str>,
}

impl WorkerId {
    /// Create a worker identity explicitly. Mostly useful in tests.
    pub fn new(number: u64, name: impl Into<Arc<str>>) -> Self {
        Self {
            number,
            name: name.into(),
        }
    }

    /// Identity of the calling thread.
    pub fn current() -> Self {
        CURRENT_WORKER.with(|cell| {
            cell.get_or_init(|| {
                let thread = std::thread::current();
                let name = thread.name().unwrap_or("unnamed");
                WorkerId::new(NEXT_WORKER.fetch_add(1, Ordering::Relaxed), name)
            })
            .clone()
        })
    }

    /// Process-unique worker number.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Thread name at the time the identity was assigned.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.number)
    }
}
