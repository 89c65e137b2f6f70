//! Generational arena owning every connector and constraint of a network.
//!
//! Entities refer to each other only through [`SlotId`]s, so the cyclic
//! connector ↔ constraint graph never becomes an ownership cycle.

/// Slot index plus the generation it was issued for. A removed slot bumps
/// its generation, so older ids stop resolving.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SlotId {
    pub index: u32,
    pub generation: u32,
}

struct Slot<N> {
    generation: u32,
    item: Option<N>,
}

/// Arena allocator with slot reuse.
pub struct Arena<N> {
    slots: Vec<Slot<N>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<N> Arena<N> {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Store an item, reusing a freed slot when one is available.
    pub fn insert(&mut self, item: N) -> SlotId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            // Generation was already bumped by `remove`
            let slot = &mut self.slots[index as usize];
            slot.item = Some(item);
            SlotId { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, item: Some(item) });
            SlotId { index, generation: 0 }
        }
    }

    /// Free a slot, returning its item. Stale ids return `None`.
    pub fn remove(&mut self, id: SlotId) -> Option<N> {
        if !self.is_valid(id) {
            return None;
        }
        let slot = &mut self.slots[id.index as usize];
        // Bump generation immediately to invalidate outstanding ids
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.live -= 1;
        slot.item.take()
    }

    /// Check if a SlotId is valid (correct generation, still occupied).
    pub fn is_valid(&self, id: SlotId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.item.is_some())
    }

    pub fn get(&self, id: SlotId) -> Option<&N> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation == id.generation {
            slot.item.as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut N> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation == id.generation {
            slot.item.as_mut()
        } else {
            None
        }
    }

    /// Live items in slot order (deterministic).
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &N)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.item.as_ref().map(|item| {
                (
                    SlotId { index: index as u32, generation: slot.generation },
                    item,
                )
            })
        })
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<N> Default for Arena<N> {
    fn default() -> Self {
        Self::new()
    }
}
