//! Mark-and-sweep collector over an arena of generation-checked slots.
//!
//! The collector knows nothing about values: each object is an opaque
//! payload plus a size and a reference array naming its children. Callers
//! keep the reference arrays accurate (see [`Collector::set_refs`]).
//!
//! Freed slots go on a free list and are reused with a bumped generation,
//! so a handle that outlives its object is detected instead of aliasing
//! whatever took its place. A slot whose generation would wrap past
//! [`GENERATION_MASK`] is retired rather than reused.

#![allow(clippy::cast_possible_truncation)]

use std::fmt;

use crate::error::{Error, Result};

/// Number of generation bits a handle carries.
pub const GENERATION_BITS: u32 = 14;

/// Mask for the generation counter.
pub const GENERATION_MASK: u16 = (1 << GENERATION_BITS) - 1;

/// Default live-object count that triggers a collection.
pub const DEFAULT_THRESHOLD: usize = 2048;

/// Handle to an object owned by a [`Collector`].
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct HeapRef {
    /// Arena slot index.
    pub index: u32,
    /// Generation of the slot when the object was allocated.
    pub generation: u16,
}

impl HeapRef {
    /// Creates a handle from its parts. The generation is masked to
    /// [`GENERATION_BITS`].
    #[must_use]
    pub const fn new(index: u32, generation: u16) -> Self {
        Self {
            index,
            generation: generation & GENERATION_MASK,
        }
    }
}

impl fmt::Debug for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapRef({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Counters describing collector activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Number of collections run.
    pub collections: u64,
    /// Objects freed across all collections.
    pub freed: u64,
    /// Objects allocated since creation.
    pub allocated: u64,
    /// Currently live objects.
    pub live: usize,
    /// Approximate bytes held by live objects.
    pub live_bytes: usize,
    /// Current collection threshold.
    pub threshold: usize,
}

struct Node<T> {
    payload: T,
    refs: Vec<HeapRef>,
    size: usize,
    marked: bool,
}

struct Slot<T> {
    generation: u16,
    node: Option<Node<T>>,
}

/// Arena-backed mark-and-sweep collector.
pub struct Collector<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    /// Explicitly declared roots; a handle may appear more than once.
    roots: Vec<HeapRef>,
    live_count: usize,
    live_bytes: usize,
    threshold: usize,
    collections: u64,
    freed: u64,
    allocated: u64,
}

impl<T> Default for Collector<T> {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl<T> Collector<T> {
    /// Creates an empty collector that collects once `threshold` objects
    /// are live.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            roots: Vec::new(),
            live_count: 0,
            live_bytes: 0,
            threshold: threshold.max(1),
            collections: 0,
            freed: 0,
            allocated: 0,
        }
    }

    /// Allocates an object, collecting first if the threshold is reached.
    ///
    /// `roots` is only consumed when a collection runs. The new object's own
    /// `refs` are treated as roots too, since its children may exist nowhere
    /// else yet.
    pub fn allocate<R>(&mut self, payload: T, size: usize, refs: Vec<HeapRef>, roots: R) -> HeapRef
    where
        R: IntoIterator<Item = HeapRef>,
    {
        if self.live_count >= self.threshold {
            let pending: Vec<HeapRef> = refs.clone();
            self.collect(roots.into_iter().chain(pending));
        }

        let node = Node {
            payload,
            refs,
            size,
            marked: false,
        };
        self.live_count += 1;
        self.live_bytes += size;
        self.allocated += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            HeapRef::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            HeapRef::new(index, 0)
        }
    }

    /// Runs a full collection from the declared roots plus `extra_roots`.
    ///
    /// Returns the number of objects freed.
    pub fn collect<R>(&mut self, extra_roots: R) -> usize
    where
        R: IntoIterator<Item = HeapRef>,
    {
        let mut worklist: Vec<HeapRef> = self.roots.clone();
        worklist.extend(extra_roots);
        self.mark(worklist);
        let freed = self.sweep();

        self.collections += 1;
        self.freed += freed as u64;
        if self.live_count * 2 > self.threshold {
            self.threshold = self.live_count * 2;
        }

        tracing::debug!(
            freed,
            live = self.live_count,
            threshold = self.threshold,
            "garbage collection finished"
        );
        freed
    }

    fn mark(&mut self, mut worklist: Vec<HeapRef>) {
        while let Some(handle) = worklist.pop() {
            let Some(slot) = self.slots.get_mut(handle.index as usize) else {
                continue;
            };
            if slot.generation != handle.generation {
                continue;
            }
            if let Some(node) = slot.node.as_mut() {
                if !node.marked {
                    node.marked = true;
                    worklist.extend(node.refs.iter().copied());
                }
            }
        }
    }

    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(node) = slot.node.as_mut() else {
                continue;
            };
            if node.marked {
                node.marked = false;
                continue;
            }
            self.live_bytes -= node.size;
            slot.node = None;
            freed += 1;
            if slot.generation == GENERATION_MASK {
                // Exhausted; reuse would hand out generation 0 again.
                continue;
            }
            slot.generation += 1;
            self.free_list.push(index as u32);
        }
        self.live_count -= freed;
        freed
    }

    /// Returns true if `handle` names a live object.
    #[must_use]
    pub fn contains(&self, handle: HeapRef) -> bool {
        self.node(handle).is_some()
    }

    fn node(&self, handle: HeapRef) -> Option<&Node<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, handle: HeapRef) -> Option<&mut Node<T>> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Borrows an object's payload.
    pub fn get(&self, handle: HeapRef) -> Result<&T> {
        self.node(handle)
            .map(|node| &node.payload)
            .ok_or_else(|| Error::stale_reference(handle))
    }

    /// Mutably borrows an object's payload.
    ///
    /// Callers that change which objects the payload points to must follow
    /// up with [`Collector::set_refs`].
    pub fn get_mut(&mut self, handle: HeapRef) -> Result<&mut T> {
        self.node_mut(handle)
            .map(|node| &mut node.payload)
            .ok_or_else(|| Error::stale_reference(handle))
    }

    /// Returns an object's reference array.
    pub fn refs(&self, handle: HeapRef) -> Result<&[HeapRef]> {
        self.node(handle)
            .map(|node| node.refs.as_slice())
            .ok_or_else(|| Error::stale_reference(handle))
    }

    /// Replaces an object's reference array.
    pub fn set_refs(&mut self, handle: HeapRef, refs: Vec<HeapRef>) -> Result<()> {
        let node = self
            .node_mut(handle)
            .ok_or_else(|| Error::stale_reference(handle))?;
        node.refs = refs;
        Ok(())
    }

    /// Declares `handle` as a root until a matching [`Collector::remove_root`].
    pub fn add_root(&mut self, handle: HeapRef) {
        self.roots.push(handle);
    }

    /// Removes one declaration of `handle` from the root set.
    pub fn remove_root(&mut self, handle: HeapRef) {
        if let Some(pos) = self.roots.iter().position(|r| *r == handle) {
            self.roots.swap_remove(pos);
        }
    }

    /// Returns the number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if no objects are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Returns the live count at which the next allocation collects.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns a snapshot of collector counters.
    #[must_use]
    pub fn stats(&self) -> GcStats {
        GcStats {
            collections: self.collections,
            freed: self.freed,
            allocated: self.allocated,
            live: self.live_count,
            live_bytes: self.live_bytes,
            threshold: self.threshold,
        }
    }
}
