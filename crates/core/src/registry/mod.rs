use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies every token spawned by one play call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

/// Identifies a launch that has been scheduled but not fired yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaunchId(pub u64);

/// Identifies a running token timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u64);

/// Opaque handle to outstanding work owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Launch(LaunchId),
    Token(TokenId),
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Launch(id) => write!(f, "launch#{}", id.0),
            Self::Token(id) => write!(f, "token#{}", id.0),
        }
    }
}

/// Monotonic source of fresh identifiers.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn next_batch(&mut self) -> BatchId {
        BatchId(self.bump())
    }

    pub fn next_launch(&mut self) -> LaunchId {
        LaunchId(self.bump())
    }

    pub fn next_token(&mut self) -> TokenId {
        TokenId(self.bump())
    }

    fn bump(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Set of every pending launch and running timeline.
///
/// Membership is the single source of truth for "still outstanding": an entry
/// is released exactly once, either by its owner on natural completion or in
/// bulk by [`LifecycleRegistry::drain`] during teardown.
#[derive(Debug, Default)]
pub struct LifecycleRegistry {
    entries: HashSet<Handle>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the handle was already tracked.
    pub fn register(&mut self, handle: Handle) -> bool {
        self.entries.insert(handle)
    }

    /// Removes a single entry. Returns `false` when it had already been
    /// released, which callers treat as "someone else finished it".
    pub fn release(&mut self, handle: Handle) -> bool {
        self.entries.remove(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_launches(&self) -> usize {
        self.entries
            .iter()
            .filter(|handle| matches!(handle, Handle::Launch(_)))
            .count()
    }

    pub fn running_tokens(&self) -> usize {
        self.entries
            .iter()
            .filter(|handle| matches!(handle, Handle::Token(_)))
            .count()
    }

    /// Empties the registry and hands back every entry so the caller can
    /// cancel launches and kill timelines. Launches come first.
    pub fn drain(&mut self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.entries.drain().collect();
        handles.sort_by_key(|handle| match handle {
            Handle::Launch(id) => (0, id.0),
            Handle::Token(id) => (1, id.0),
        });
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_is_exactly_once() {
        let mut registry = LifecycleRegistry::new();
        let handle = Handle::Token(TokenId(3));
        assert!(registry.register(handle));
        assert!(!registry.register(handle));
        assert!(registry.release(handle));
        assert!(!registry.release(handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn drain_clears_and_orders_launches_first() {
        let mut registry = LifecycleRegistry::new();
        registry.register(Handle::Token(TokenId(1)));
        registry.register(Handle::Launch(LaunchId(7)));
        registry.register(Handle::Launch(LaunchId(2)));

        assert_eq!(registry.pending_launches(), 2);
        assert_eq!(registry.running_tokens(), 1);

        let drained = registry.drain();
        assert_eq!(
            drained,
            vec![
                Handle::Launch(LaunchId(2)),
                Handle::Launch(LaunchId(7)),
                Handle::Token(TokenId(1)),
            ]
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn allocator_never_repeats() {
        let mut ids = IdAllocator::default();
        let a = ids.next_launch();
        let b = ids.next_launch();
        let t = ids.next_token();
        assert_ne!(a, b);
        assert_ne!(b.0, t.0);
    }
}
