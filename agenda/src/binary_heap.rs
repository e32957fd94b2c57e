use crate::weighted::{Weighted, WeightedItem};
use std::collections;
use std::iter::FromIterator;

/// An unbounded max-heap that orders elements by the priority reported by
/// their `Weighted` implementation.
///
/// The priority is read once on insertion and stored next to the element.
pub struct BinaryHeap<I: Weighted>(collections::BinaryHeap<WeightedItem<I, I::Weight>>)
where
    I::Weight: Ord;

impl<I: Weighted> BinaryHeap<I>
where
    I::Weight: Ord,
{
    pub fn new() -> Self {
        BinaryHeap(collections::BinaryHeap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BinaryHeap(collections::BinaryHeap::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn push(&mut self, element: I) {
        let priority = element.get_weight();
        self.0.push(WeightedItem(element, priority));
    }

    pub fn pop(&mut self) -> Option<I> {
        self.0.pop().map(|wi| wi.0)
    }

    pub fn peek(&self) -> Option<&I> {
        self.0.peek().map(|wi| &wi.0)
    }
}

impl<I: Weighted> Default for BinaryHeap<I>
where
    I::Weight: Ord,
{
    fn default() -> Self {
        BinaryHeap::new()
    }
}

impl<I: Weighted> FromIterator<I> for BinaryHeap<I>
where
    I::Weight: Ord,
{
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        BinaryHeap(
            iter.into_iter()
                .map(|item| {
                    let priority = item.get_weight();
                    WeightedItem(item, priority)
                })
                .collect(),
        )
    }
}
