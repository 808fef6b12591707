/// Allocates and recycles device object names.
///
/// Hands out `u32` names the way a buffer-object API does: names start at
/// `first` (so `0` can stay reserved for "no object"), and deleted names are
/// handed out again by later allocations. Reuse is what makes stale cached
/// references dangerous, so callers that cache names must clear them on delete.
///
/// # Example
///
/// ```ignore
/// let mut names = SlotAllocator::starting_at(1);
/// let a = names.alloc();  // 1
/// let b = names.alloc();  // 2
/// names.free(a);          // 1 is now available
/// let c = names.alloc();  // 1 (recycled)
/// ```
#[derive(Debug)]
pub struct SlotAllocator {
    free_list: Vec<u32>,
    first: u32,
    next_id: u32,
    len: u32,
}

impl SlotAllocator {
    /// Create an allocator whose first name is `0`
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create an allocator whose first name is `first`
    pub fn starting_at(first: u32) -> Self {
        Self {
            free_list: Vec::new(),
            first,
            next_id: first,
            len: 0,
        }
    }

    /// Allocate the next available name (most recently freed first)
    pub fn alloc(&mut self) -> u32 {
        self.len += 1;
        self.free_list.pop().unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        })
    }

    /// Return a name to the pool
    ///
    /// Returns `false` (and changes nothing) for names that were never
    /// allocated or are already free.
    pub fn free(&mut self, id: u32) -> bool {
        if !self.is_live(id) {
            return false;
        }
        self.len -= 1;
        self.free_list.push(id);
        true
    }

    /// Whether `id` is currently allocated
    pub fn is_live(&self, id: u32) -> bool {
        id >= self.first && id < self.next_id && !self.free_list.contains(&id)
    }

    /// Number of currently allocated names
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no names are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
