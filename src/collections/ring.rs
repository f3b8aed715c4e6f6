//! Circular cursor over an ordered list
//!
//! Used by the speed control to cycle through supported rates, and by any
//! other control that steps through a fixed set of choices.

/// An ordered list with a cursor that wraps in both directions.
///
/// Index arguments coming from outside (menu positions, stored values) are
/// never trusted: anything out of range is coerced to a valid position
/// instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRing<T> {
    /// Items in display order
    items: Vec<T>,

    /// Cursor position, always in `[0, len - 1]` when non-empty
    index: usize,
}

impl<T> Default for IndexedRing<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> IndexedRing<T> {
    /// Create a ring with the cursor on the first item
    pub fn new(items: Vec<T>) -> Self {
        Self { items, index: 0 }
    }

    /// Create a ring with the cursor at `index`, clamped into range
    pub fn with_index(items: Vec<T>, index: i64) -> Self {
        let mut ring = Self::new(items);
        ring.set_index(index);
        ring
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current cursor position
    pub fn index(&self) -> usize {
        self.index
    }

    /// Item under the cursor
    pub fn current(&self) -> Option<&T> {
        self.items.get(self.index)
    }

    /// Move the cursor, clamping negative values to the first item and
    /// values past the end to the last one
    pub fn set_index(&mut self, index: i64) {
        self.index = match self.last_index() {
            Some(last) if index > 0 => (index as u64).min(last as u64) as usize,
            _ => 0,
        };
    }

    /// Advance the cursor by one, wrapping to the first item
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&T> {
        self.next_from(None)
    }

    /// Step the cursor back by one, wrapping to the last item
    pub fn prev(&mut self) -> Option<&T> {
        self.prev_from(None)
    }

    /// Advance starting from `index` instead of the cursor.
    ///
    /// A missing or out-of-range `index` falls back to the cursor.
    pub fn next_from(&mut self, index: Option<i64>) -> Option<&T> {
        let last = self.last_index()?;
        let base = self.coerce(index);

        self.index = if base >= last { 0 } else { base + 1 };
        self.current()
    }

    /// Step back starting from `index` instead of the cursor.
    ///
    /// A missing or out-of-range `index` falls back to the cursor.
    pub fn prev_from(&mut self, index: Option<i64>) -> Option<&T> {
        let last = self.last_index()?;
        let base = self.coerce(index);

        self.index = if base < 1 { last } else { base - 1 };
        self.current()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Whether the cursor sits on the last item
    pub fn is_end(&self) -> bool {
        self.last_index() == Some(self.index)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Position of the first item matching `predicate`
    pub fn position<P: FnMut(&T) -> bool>(&self, predicate: P) -> Option<usize> {
        self.items.iter().position(predicate)
    }

    /// Replace the items, keeping the cursor in range
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        let index = self.index as i64;
        self.set_index(index);
    }

    fn last_index(&self) -> Option<usize> {
        self.items.len().checked_sub(1)
    }

    fn coerce(&self, index: Option<i64>) -> usize {
        match index {
            Some(i) if i >= 0 && (i as u64) < self.items.len() as u64 => i as usize,
            _ => self.index,
        }
    }
}
