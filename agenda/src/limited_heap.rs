use crate::weighted::{Weighted, WeightedItem};
use min_max_heap::MinMaxHeap;

/// A heap that holds at most `capacity` elements. When it is full, pushing
/// evicts the element with the lowest priority.
///
/// This is the beam of a beam search: both ends of the heap are needed, the
/// best element for `pop` and the worst one for eviction.
#[derive(Clone)]
pub struct LimitedHeap<I: Weighted>
where
    I::Weight: Ord,
{
    heap: MinMaxHeap<WeightedItem<I, I::Weight>>,
    capacity: usize,
}

impl<I: Weighted> LimitedHeap<I>
where
    I::Weight: Ord,
{
    pub fn with_capacity(capacity: usize) -> Self {
        LimitedHeap {
            heap: MinMaxHeap::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the evicted element, if any.
    pub fn push(&mut self, element: I) -> Option<I> {
        let priority = element.get_weight();
        if self.capacity > self.heap.len() {
            self.heap.push(WeightedItem(element, priority));
            None
        } else if self.capacity == 0 {
            Some(element)
        } else {
            Some(self.heap.push_pop_min(WeightedItem(element, priority)).0)
        }
    }

    pub fn pop(&mut self) -> Option<I> {
        self.heap.pop_max().map(|wi| wi.0)
    }

    pub fn peek(&self) -> Option<&I> {
        self.heap.peek_max().map(|wi| &wi.0)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
