use std::cmp::Ordering;
use std::fmt;

use shared::types::{CannedResponse, Channel, ChatMessage, PresenceStatus};

/// Anything a store keeps, keyed by a server-assigned id.
pub trait Entity: Clone + Send + 'static {
    fn id(&self) -> &str;
}

impl Entity for Channel {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for CannedResponse {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for ChatMessage {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for PresenceStatus {
    fn id(&self) -> &str {
        &self.user_id
    }
}

/// Fetch state of a collection.
///
/// `Error` is only reachable from `Loading`; `refetch` re-enters `Loading`
/// from any phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone)]
enum PendingOp<T> {
    Upsert(T),
    InsertIfAbsent(T),
    Remove(String),
}

/// Ordered, id-keyed collection with idempotent mutation.
///
/// Events that arrive while a fetch is in flight are applied immediately and
/// also recorded; when the snapshot lands they are replayed on top of it, so
/// the outcome does not depend on whether an event raced ahead of or behind
/// the snapshot.
pub struct EntityCollection<T> {
    items: Vec<T>,
    phase: Phase,
    generation: u64,
    pending: Vec<PendingOp<T>>,
    order: Option<fn(&T, &T) -> Ordering>,
}

impl<T: fmt::Debug> fmt::Debug for EntityCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCollection")
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("items", &self.items)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<T: Entity> Default for EntityCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityCollection<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            phase: Phase::Idle,
            generation: 0,
            pending: Vec::new(),
            order: None,
        }
    }

    /// Keep items sorted by `cmp` instead of insertion order.
    pub fn with_order(mut self, cmp: fn(&T, &T) -> Ordering) -> Self {
        self.order = Some(cmp);
        self
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    // -----------------------------------------------------------------------
    // Fetch lifecycle
    // -----------------------------------------------------------------------

    /// Enter `Loading` and return the generation the caller must hand back
    /// to [`finish_fetch`](Self::finish_fetch).
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        self.phase = Phase::Loading;
        self.pending.clear();
        self.generation
    }

    /// Apply a fetch result. Returns `false` (and changes nothing) when a
    /// newer fetch or snapshot has superseded `generation`.
    pub fn finish_fetch(&mut self, generation: u64, result: Result<Vec<T>, String>) -> bool {
        if generation != self.generation || self.phase != Phase::Loading {
            return false;
        }
        let pending = std::mem::take(&mut self.pending);
        match result {
            Ok(snapshot) => {
                self.items.clear();
                for item in snapshot {
                    self.upsert_raw(item);
                }
                for op in pending {
                    match op {
                        PendingOp::Upsert(item) => {
                            self.upsert_raw(item);
                        }
                        PendingOp::InsertIfAbsent(item) => {
                            if !self.contains(item.id()) {
                                self.items.push(item);
                            }
                        }
                        PendingOp::Remove(id) => {
                            self.items.retain(|i| i.id() != id);
                        }
                    }
                }
                self.sort();
                self.phase = Phase::Ready;
            }
            // Items keep whatever events already put there.
            Err(message) => self.phase = Phase::Error(message),
        }
        true
    }

    /// Replace the whole collection with an authoritative snapshot pushed by
    /// the server. Supersedes any fetch in flight.
    pub fn replace_all(&mut self, snapshot: Vec<T>) {
        self.generation += 1;
        self.pending.clear();
        self.items.clear();
        for item in snapshot {
            self.upsert_raw(item);
        }
        self.sort();
        self.phase = Phase::Ready;
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert or replace by id. Returns `true` when the id was new.
    pub fn upsert(&mut self, item: T) -> bool {
        if self.phase == Phase::Loading {
            self.pending.push(PendingOp::Upsert(item.clone()));
        }
        let inserted = self.upsert_raw(item);
        self.sort();
        inserted
    }

    /// Insert only if the id is unknown; duplicates of a create event are
    /// ignored. Returns `true` when inserted.
    pub fn insert_if_absent(&mut self, item: T) -> bool {
        if self.phase == Phase::Loading {
            self.pending.push(PendingOp::InsertIfAbsent(item.clone()));
        }
        if self.contains(item.id()) {
            return false;
        }
        self.items.push(item);
        self.sort();
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        if self.phase == Phase::Loading {
            self.pending.push(PendingOp::Remove(id.to_string()));
        }
        let pos = self.items.iter().position(|i| i.id() == id)?;
        Some(self.items.remove(pos))
    }

    fn upsert_raw(&mut self, item: T) -> bool {
        match self.items.iter_mut().find(|i| i.id() == item.id()) {
            Some(existing) => {
                *existing = item;
                false
            }
            None => {
                self.items.push(item);
                true
            }
        }
    }

    fn sort(&mut self) {
        if let Some(cmp) = self.order {
            self.items.sort_by(cmp);
        }
    }
}
