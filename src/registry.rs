//! Fixed-capacity arena of registered dimmers.
//!
//! Both real-time cores keep their per-dimmer firing state here. Slots are
//! addressed by a [`SlotId`] (index + generation) so a stale id held by a
//! dimmer that already called `end()` can never alias a newer registration.
//! Storage is a `heapless::Vec`: inserting and walking never allocate, which
//! keeps every operation usable inside a critical section.

use heapless::Vec;

/// Maximum number of dimmers one scheduler can drive.
pub const MAX_DIMMERS: usize = 8;

/// Stable handle to a registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: u8,
    generation: u16,
}

#[derive(Debug)]
struct Entry<S> {
    generation: u16,
    value: Option<S>,
}

/// Arena with stable identifiers.
#[derive(Debug)]
pub struct Registry<S, const N: usize = MAX_DIMMERS> {
    entries: Vec<Entry<S>, N>,
    len: usize,
}

impl<S, const N: usize> Registry<S, N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            len: 0,
        }
    }

    /// Store `value`, reusing a freed slot first. Gives the value back when
    /// the arena is full.
    pub fn insert(&mut self, value: S) -> Result<SlotId, S> {
        if let Some((index, entry)) = self
            .entries
            .iter_mut()
            .enumerate()
            .find(|(_, e)| e.value.is_none())
        {
            entry.generation = entry.generation.wrapping_add(1);
            entry.value = Some(value);
            self.len += 1;
            return Ok(SlotId {
                index: index as u8,
                generation: entry.generation,
            });
        }

        if self.entries.is_full() {
            return Err(value);
        }
        let index = self.entries.len();
        let _ = self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        self.len += 1;
        Ok(SlotId {
            index: index as u8,
            generation: 0,
        })
    }

    /// Free the slot and return its value. Stale ids return `None`.
    pub fn remove(&mut self, id: SlotId) -> Option<S> {
        let entry = self.entry_mut(id)?;
        let value = entry.value.take();
        if value.is_some() {
            self.len -= 1;
        }
        value
    }

    pub fn get(&self, id: SlotId) -> Option<&S> {
        self.entries
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.value.as_ref())
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut S> {
        self.entry_mut(id).and_then(|e| e.value.as_mut())
    }

    /// Occupied slots, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &S)> {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.value.as_ref().map(|v| {
                (
                    SlotId {
                        index: i as u8,
                        generation: e.generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut S> {
        self.entries.iter_mut().filter_map(|e| e.value.as_mut())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    fn entry_mut(&mut self, id: SlotId) -> Option<&mut Entry<S>> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|e| e.generation == id.generation)
    }
}

impl<S, const N: usize> Default for Registry<S, N> {
    fn default() -> Self {
        Self::new()
    }
}
