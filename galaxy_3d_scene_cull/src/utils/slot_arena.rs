/// Dense storage addressed by recycled `u32` slots.
///
/// Both spatial indexes keep their records here: BVH nodes and octree
/// entries. A slot stays valid until it is removed, whatever happens to
/// other slots, which is what lets an index hand slots out as stable
/// `IndexId`s. Removed slots are reused last-in first-out, so the backing
/// array never grows past the peak number of live records.
pub struct SlotArena<T> {
    slots: Vec<Option<T>>,
    vacant: Vec<u32>,
    len: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), vacant: Vec::new(), len: 0 }
    }

    /// Store `value` and return its slot.
    pub fn insert(&mut self, value: T) -> u32 {
        self.len += 1;
        match self.vacant.pop() {
            Some(slot) => {
                debug_assert!(self.slots[slot as usize].is_none());
                self.slots[slot as usize] = Some(value);
                slot
            }
            None => {
                self.slots.push(Some(value));
                (self.slots.len() - 1) as u32
            }
        }
    }

    /// Take the record out of `slot`. Vacant or unknown slots yield `None`.
    pub fn remove(&mut self, slot: u32) -> Option<T> {
        let value = self.slots.get_mut(slot as usize)?.take()?;
        self.vacant.push(slot);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, slot: u32) -> Option<&T> {
        self.slots.get(slot as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, slot: u32) -> Option<&mut T> {
        self.slots.get_mut(slot as usize)?.as_mut()
    }

    /// Live records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the backing array (live plus vacant slots).
    pub fn high_water_mark(&self) -> usize {
        self.slots.len()
    }

    /// Drop every record. Slot numbering restarts at 0.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.vacant.clear();
        self.len = 0;
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<u32> for SlotArena<T> {
    type Output = T;

    fn index(&self, slot: u32) -> &T {
        match self.get(slot) {
            Some(value) => value,
            None => panic!("vacant arena slot {}", slot),
        }
    }
}

impl<T> std::ops::IndexMut<u32> for SlotArena<T> {
    fn index_mut(&mut self, slot: u32) -> &mut T {
        match self.get_mut(slot) {
            Some(value) => value,
            None => panic!("vacant arena slot {}", slot),
        }
    }
}

#[cfg(test)]
#[path = "slot_arena_tests.rs"]
mod tests;
