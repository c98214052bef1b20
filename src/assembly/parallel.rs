use std::marker::PhantomData;

/// Grants multiple threads write access to disjoint entries of a slice.
///
/// The batched assembler claims every output slot through an atomic counter before writing it,
/// so each slot is written by exactly one thread. The writer does not verify exclusivity; it is
/// the responsibility of the caller.
pub(crate) struct DisjointSliceWriter<'a, T> {
    ptr: *mut T,
    len: usize,
    marker: PhantomData<&'a mut [T]>,
}

unsafe impl<'a, T: Send> Sync for DisjointSliceWriter<'a, T> {}
unsafe impl<'a, T: Send> Send for DisjointSliceWriter<'a, T> {}

impl<'a, T> DisjointSliceWriter<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            marker: PhantomData,
        }
    }

    /// Overwrites the entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    ///
    /// # Safety
    ///
    /// No other thread may read or write the entry at `index` while this call is in progress.
    pub unsafe fn write(&self, index: usize, value: T) {
        assert!(index < self.len, "Index out of bounds for disjoint slice writer");
        *self.ptr.add(index) = value;
    }
}
