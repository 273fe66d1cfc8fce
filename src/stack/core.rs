use crate::screen::ScreenRef;

use super::NavigationEntry;

/// Stable handle to a slot in a [`NavigationStack`]. Handles to removed
/// entries never resolve again, even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    index: u32,
    generation: u32,
}

struct Slot<D> {
    generation: u32,
    entry: Option<NavigationEntry<D>>,
}

/// Last-in-first-out stack of navigation entries.
///
/// Entries live in an arena of generational slots; `order` lists the live
/// handles from bottom to top.
pub struct NavigationStack<D> {
    slots: Vec<Slot<D>>,
    free: Vec<u32>,
    order: Vec<EntryId>,
}

impl<D> Default for NavigationStack<D> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<D> NavigationStack<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn push(&mut self, entry: NavigationEntry<D>) -> EntryId {
        let id = self.allocate(entry);
        self.order.push(id);
        id
    }

    fn get(&self, id: EntryId) -> Option<&NavigationEntry<D>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn top_id(&self) -> Option<EntryId> {
        self.order.last().copied()
    }

    pub fn top(&self) -> Option<&NavigationEntry<D>> {
        self.top_id().and_then(|id| self.get(id))
    }

    pub fn pop(&mut self) -> Option<NavigationEntry<D>> {
        let id = self.order.pop()?;
        self.release(id)
    }

    fn remove(&mut self, id: EntryId) -> Option<NavigationEntry<D>> {
        let position = self.order.iter().position(|candidate| *candidate == id)?;
        self.order.remove(position);
        self.release(id)
    }

    /// Handle of the topmost entry bound to `screen`, and whether it is the top.
    pub fn find(&self, screen: &ScreenRef<D>) -> Option<(EntryId, bool)> {
        let top = self.top_id();
        self.order
            .iter()
            .rev()
            .copied()
            .find(|id| {
                self.get(*id)
                    .map(|entry| entry.screen() == screen)
                    .unwrap_or(false)
            })
            .map(|id| (id, Some(id) == top))
    }

    /// Remove the topmost entry bound to `screen`, reporting whether it was
    /// the top of the stack.
    pub fn remove_screen(&mut self, screen: &ScreenRef<D>) -> Option<(NavigationEntry<D>, bool)> {
        let (id, was_top) = self.find(screen)?;
        self.remove(id).map(|entry| (entry, was_top))
    }

    pub fn contains(&self, screen: &ScreenRef<D>) -> bool {
        self.find(screen).is_some()
    }

    /// Entries from top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = &NavigationEntry<D>> + '_ {
        self.order.iter().rev().filter_map(|id| self.get(*id))
    }

    /// Take every entry out, bottom first.
    pub fn drain(&mut self) -> Vec<NavigationEntry<D>> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.release(id))
            .collect()
    }

    /// Slide `entries` (bottom first) underneath whatever is on the stack.
    pub fn insert_bottom(&mut self, entries: Vec<NavigationEntry<D>>) {
        let mut ids: Vec<EntryId> = entries
            .into_iter()
            .map(|entry| self.allocate(entry))
            .collect();
        ids.append(&mut self.order);
        self.order = ids;
    }

    fn allocate(&mut self, entry: NavigationEntry<D>) -> EntryId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return EntryId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        EntryId {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, id: EntryId) -> Option<NavigationEntry<D>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(entry)
    }
}
