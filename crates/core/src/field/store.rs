//! Fixed-capacity double-ended slice store
//!
//! The strand is a window of cross-section slices: new slices enter at the
//! front (index 0) as the strand is cast, the oldest leave at the back. The
//! store is a ring over `capacity` preallocated slices with a front cursor and
//! a live count, so every operation is O(1) or O(slice size) regardless of how
//! many slices are stored.

use std::mem;
use std::ops::Range;

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::config::Geometry;
use crate::error::StoreError;

/// One quadrant of a cross-section: `rows` along the width, `cols` along the length.
pub type Slice = DMatrix<f32>;

/// Windowed store of strand slices.
///
/// Index `z` is front-relative: 0 is the most recently cast slice,
/// `size() - 1` the oldest. Slots are never moved once written; eviction and
/// removal only shift the cursors.
#[derive(Debug, Clone)]
pub struct FieldStore {
    /// Backing ring, always `capacity` slices of the session shape
    slots: Vec<Slice>,
    /// Physical index of logical z = 0
    front: usize,
    /// Live slice count
    len: usize,
    rows: usize,
    cols: usize,
    /// Back-eviction suppressed
    tail: bool,
    /// Slices that have left at the back (evicted or removed)
    start: u64,
    /// Logical position of the front
    end: u64,
}

impl FieldStore {
    /// Create an empty store sized for `geometry`.
    pub fn new(geometry: &Geometry) -> Self {
        Self::with_shape(geometry.capacity(), geometry.rows(), geometry.cols())
    }

    /// Create an empty store of `capacity` slices shaped `rows x cols`.
    ///
    /// A zero capacity is raised to one slice.
    pub fn with_shape(capacity: usize, rows: usize, cols: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| Slice::zeros(rows, cols)).collect(),
            front: 0,
            len: 0,
            rows,
            cols,
            tail: false,
            start: 0,
            end: 0,
        }
    }

    /// Number of stored slices
    pub fn size(&self) -> usize {
        self.len
    }

    /// True when no slice is stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the store holds `capacity` slices
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Maximum number of slices
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slice shape as `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// True while back-eviction is suppressed
    pub fn is_tail(&self) -> bool {
        self.tail
    }

    /// Enable or disable tail mode.
    pub fn set_tail(&mut self, tail: bool) {
        self.tail = tail;
    }

    /// Logical position of the oldest stored slice
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Logical position one past the newest stored slice
    pub fn end(&self) -> u64 {
        self.end
    }

    // =========================================================================
    // INSERTION / REMOVAL
    // =========================================================================

    /// Insert `slice` at the front, evicting the back slice when full.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShapeMismatch`] if `slice` is not `rows x cols`
    /// - [`StoreError::Full`] at capacity in tail mode
    /// - [`StoreError::Inconsistent`] if the cursors are corrupt
    pub fn add_first(&mut self, slice: Slice) -> Result<(), StoreError> {
        if slice.shape() != (self.rows, self.cols) {
            return Err(StoreError::ShapeMismatch {
                rows: self.rows,
                cols: self.cols,
                got_rows: slice.nrows(),
                got_cols: slice.ncols(),
            });
        }
        let slot = self.claim_front()?;
        self.slots[slot] = slice;
        Ok(())
    }

    /// Insert a slice filled with `value` at the front, reusing the recycled slot.
    ///
    /// # Errors
    ///
    /// Same as [`add_first`](Self::add_first) minus the shape check.
    pub fn add_first_uniform(&mut self, value: f32) -> Result<(), StoreError> {
        let slot = self.claim_front()?;
        self.slots[slot].fill(value);
        Ok(())
    }

    /// Remove and return the front (newest) slice.
    ///
    /// # Errors
    ///
    /// [`StoreError::Empty`] if nothing is stored.
    pub fn remove_first(&mut self) -> Result<Slice, StoreError> {
        self.check_consistent()?;
        if self.len == 0 {
            return Err(StoreError::Empty);
        }
        let slot = self.front;
        self.front = (self.front + 1) % self.capacity();
        self.len -= 1;
        self.end -= 1;
        Ok(self.take_slot(slot))
    }

    /// Remove and return the back (oldest) slice.
    ///
    /// # Errors
    ///
    /// [`StoreError::Empty`] if nothing is stored.
    pub fn remove_last(&mut self) -> Result<Slice, StoreError> {
        self.check_consistent()?;
        if self.len == 0 {
            return Err(StoreError::Empty);
        }
        let slot = self.physical(self.len - 1);
        self.len -= 1;
        self.start += 1;
        Ok(self.take_slot(slot))
    }

    /// Make room at the front and return the physical slot to write.
    fn claim_front(&mut self) -> Result<usize, StoreError> {
        self.check_consistent()?;
        if self.is_full() {
            if self.tail {
                return Err(StoreError::Full {
                    capacity: self.capacity(),
                });
            }
            // Evict the back slice; its slot is the one the front moves into.
            self.len -= 1;
            self.start += 1;
        }
        self.front = (self.front + self.capacity() - 1) % self.capacity();
        self.len += 1;
        self.end += 1;
        Ok(self.front)
    }

    fn take_slot(&mut self, slot: usize) -> Slice {
        mem::replace(&mut self.slots[slot], Slice::zeros(self.rows, self.cols))
    }

    fn check_consistent(&self) -> Result<(), StoreError> {
        let capacity = self.slots.len();
        if capacity == 0 || self.front >= capacity || self.len > capacity {
            return Err(StoreError::Inconsistent {
                front: self.front,
                len: self.len,
                capacity,
            });
        }
        Ok(())
    }

    #[inline]
    fn physical(&self, z: usize) -> usize {
        (self.front + z) % self.slots.len()
    }

    // =========================================================================
    // RANDOM ACCESS
    // =========================================================================

    /// Borrow slice `z`.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfRange`] if `z >= size()`.
    pub fn slice(&self, z: usize) -> Result<&Slice, StoreError> {
        self.check_z(z)?;
        Ok(&self.slots[self.physical(z)])
    }

    /// Mutably borrow slice `z`.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfRange`] if `z >= size()`.
    pub fn slice_mut(&mut self, z: usize) -> Result<&mut Slice, StoreError> {
        self.check_z(z)?;
        let slot = self.physical(z);
        Ok(&mut self.slots[slot])
    }

    /// Read one sample.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfRange`] or [`StoreError::CellOutOfRange`].
    pub fn get(&self, z: usize, row: usize, col: usize) -> Result<f32, StoreError> {
        self.check_cell(row, col)?;
        Ok(self.slice(z)?[(row, col)])
    }

    /// Write one sample.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfRange`] or [`StoreError::CellOutOfRange`].
    pub fn set(&mut self, z: usize, row: usize, col: usize, value: f32) -> Result<(), StoreError> {
        self.check_cell(row, col)?;
        self.slice_mut(z)?[(row, col)] = value;
        Ok(())
    }

    fn check_z(&self, z: usize) -> Result<(), StoreError> {
        if z >= self.len {
            return Err(StoreError::OutOfRange { z, size: self.len });
        }
        Ok(())
    }

    fn check_cell(&self, row: usize, col: usize) -> Result<(), StoreError> {
        if row >= self.rows || col >= self.cols {
            return Err(StoreError::CellOutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    // =========================================================================
    // TRAVERSAL
    // =========================================================================

    /// Iterate live slices front to back.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Slice> + '_ {
        (0..self.len).map(move |z| &self.slots[self.physical(z)])
    }

    /// Call `visitor(z, slice)` for every z in `range`, ascending.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfRange`] if `range.end > size()`.
    pub fn traverse<F>(&self, range: Range<usize>, mut visitor: F) -> Result<(), StoreError>
    where
        F: FnMut(usize, &Slice),
    {
        self.check_range(&range)?;
        for z in range {
            visitor(z, &self.slots[self.physical(z)]);
        }
        Ok(())
    }

    /// Call `visitor(z, slice)` with mutable access for every z in `range`.
    ///
    /// # Errors
    ///
    /// [`StoreError::OutOfRange`] if `range.end > size()`.
    pub fn traverse_mut<F>(&mut self, range: Range<usize>, mut visitor: F) -> Result<(), StoreError>
    where
        F: FnMut(usize, &mut Slice),
    {
        self.check_range(&range)?;
        for z in range {
            let slot = self.physical(z);
            visitor(z, &mut self.slots[slot]);
        }
        Ok(())
    }

    /// Apply `f(z, slice)` to every live slice in parallel.
    pub fn par_for_each_mut<F>(&mut self, f: F)
    where
        F: Fn(usize, &mut Slice) + Sync,
    {
        // Live slots are at most two contiguous runs: front..capacity, then 0..wrap.
        let first_run = self.len.min(self.capacity() - self.front);
        let wrapped_run = self.len - first_run;
        let (wrapped, from_front) = self.slots.split_at_mut(self.front);

        from_front[..first_run]
            .par_iter_mut()
            .enumerate()
            .for_each(|(z, slice)| f(z, slice));
        wrapped[..wrapped_run]
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, slice)| f(first_run + i, slice));
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), StoreError> {
        if range.end > self.len {
            return Err(StoreError::OutOfRange {
                z: range.end,
                size: self.len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(value: f32) -> Slice {
        Slice::from_element(2, 3, value)
    }

    #[test]
    fn test_add_first_orders_newest_at_front() {
        let mut store = FieldStore::with_shape(4, 2, 3);
        for v in [1.0, 2.0, 3.0] {
            store.add_first(filled(v)).unwrap();
        }

        assert_eq!(store.size(), 3);
        assert_eq!(store.get(0, 0, 0).unwrap(), 3.0);
        assert_eq!(store.get(2, 0, 0).unwrap(), 1.0);
        assert_eq!(store.end() - store.start(), 3);
    }

    #[test]
    fn test_eviction_at_capacity() {
        let mut store = FieldStore::with_shape(3, 2, 3);
        for v in 0..5 {
            store.add_first_uniform(v as f32).unwrap();
        }

        assert!(store.is_full());
        assert_eq!(store.size(), 3);
        // Oldest survivors are 2, 3, 4
        assert_eq!(store.get(2, 1, 2).unwrap(), 2.0);
        assert_eq!(store.get(0, 1, 2).unwrap(), 4.0);
        assert_eq!(store.start(), 2);
        assert_eq!(store.end(), 5);
    }

    #[test]
    fn test_tail_mode_suppresses_eviction() {
        let mut store = FieldStore::with_shape(2, 2, 3);
        store.add_first_uniform(1.0).unwrap();
        store.add_first_uniform(2.0).unwrap();
        store.set_tail(true);

        let err = store.add_first_uniform(3.0).unwrap_err();
        assert_eq!(err, StoreError::Full { capacity: 2 });
        assert_eq!(store.get(1, 0, 0).unwrap(), 1.0);

        // Explicit drain still works
        let last = store.remove_last().unwrap();
        assert_eq!(last[(0, 0)], 1.0);
        store.add_first_uniform(3.0).unwrap();
        assert_eq!(store.get(0, 0, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_remove_on_empty_store() {
        let mut store = FieldStore::with_shape(2, 2, 3);
        assert_eq!(store.remove_first().unwrap_err(), StoreError::Empty);
        assert_eq!(store.remove_last().unwrap_err(), StoreError::Empty);
    }

    #[test]
    fn test_remove_first_and_last_return_ends() {
        let mut store = FieldStore::with_shape(4, 2, 3);
        for v in [1.0, 2.0, 3.0] {
            store.add_first(filled(v)).unwrap();
        }

        assert_eq!(store.remove_first().unwrap()[(0, 0)], 3.0);
        assert_eq!(store.remove_last().unwrap()[(0, 0)], 1.0);
        assert_eq!(store.size(), 1);
        assert_eq!(store.get(0, 0, 0).unwrap(), 2.0);
        assert_eq!(store.start(), 1);
        assert_eq!(store.end(), 2);
    }

    #[test]
    fn test_get_set_bounds() {
        let mut store = FieldStore::with_shape(2, 2, 3);
        store.add_first_uniform(0.0).unwrap();

        store.set(0, 1, 2, 1490.0).unwrap();
        assert_eq!(store.get(0, 1, 2).unwrap(), 1490.0);
        assert_eq!(
            store.get(1, 0, 0).unwrap_err(),
            StoreError::OutOfRange { z: 1, size: 1 }
        );
        assert!(matches!(
            store.set(0, 2, 0, 1.0).unwrap_err(),
            StoreError::CellOutOfRange { row: 2, .. }
        ));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut store = FieldStore::with_shape(2, 2, 3);
        let err = store.add_first(Slice::zeros(3, 3)).unwrap_err();
        assert!(matches!(err, StoreError::ShapeMismatch { got_rows: 3, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_inconsistent_cursor_detected() {
        let mut store = FieldStore::with_shape(2, 2, 3);
        store.front = 7;
        assert!(matches!(
            store.add_first_uniform(1.0).unwrap_err(),
            StoreError::Inconsistent { front: 7, .. }
        ));
    }

    #[test]
    fn test_traverse_visits_ascending_z() {
        let mut store = FieldStore::with_shape(3, 2, 3);
        for v in 0..5 {
            store.add_first_uniform(v as f32).unwrap();
        }

        let mut seen = Vec::new();
        store
            .traverse(0..store.size(), |z, slice| seen.push((z, slice[(0, 0)])))
            .unwrap();
        assert_eq!(seen, vec![(0, 4.0), (1, 3.0), (2, 2.0)]);

        assert!(store.traverse(0..4, |_, _| {}).is_err());
    }

    #[test]
    fn test_traverse_mut_updates_in_place() {
        let mut store = FieldStore::with_shape(3, 2, 3);
        for _ in 0..3 {
            store.add_first_uniform(1550.0).unwrap();
        }
        store
            .traverse_mut(1..3, |_, slice| slice.add_scalar_mut(1.0))
            .unwrap();

        assert_eq!(store.get(0, 0, 0).unwrap(), 1550.0);
        assert_eq!(store.get(1, 1, 1).unwrap(), 1551.0);
        assert_eq!(store.get(2, 0, 2).unwrap(), 1551.0);
    }

    #[test]
    fn test_par_for_each_mut_across_wrap() {
        let mut store = FieldStore::with_shape(4, 2, 3);
        // Six inserts into four slots leaves the live range wrapped
        for _ in 0..6 {
            store.add_first_uniform(0.0).unwrap();
        }
        store.par_for_each_mut(|z, slice| slice.fill(z as f32));

        for z in 0..store.size() {
            assert_eq!(store.get(z, 1, 2).unwrap(), z as f32);
        }
    }
}
