//! Data structures that hold the frontier of a best-first search, with a
//! unified interface in the `Agenda` trait.
//!
//! * Elements are ordered max-first. Like `std::collections::BinaryHeap`, an
//!   agenda returns the element with the greatest priority on `pop`.
//! * Elements and priorities are separated. Elements report their priority
//!   through `Weighted` and do not need to implement `Ord` themselves.

pub mod binary_heap;
pub mod limited_heap;
pub mod weighted;

pub use crate::binary_heap::BinaryHeap;
pub use crate::limited_heap::LimitedHeap;
pub use crate::weighted::{Weighted, WeightedItem};

/// Generic interface to a priority queue of search items.
pub trait Agenda {
    type Item;

    /// Inserts an element. A bounded agenda returns the element it had to
    /// give up, which may be the inserted one.
    fn push(&mut self, element: Self::Item) -> Option<Self::Item>;
    fn pop(&mut self) -> Option<Self::Item>;
    fn peek(&self) -> Option<&Self::Item>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The priority of the element that `pop` would return.
    fn peek_weight(&self) -> Option<<Self::Item as Weighted>::Weight>
    where
        Self::Item: Weighted,
    {
        self.peek().map(Weighted::get_weight)
    }

    fn extend<I: IntoIterator<Item = Self::Item>>(&mut self, elements: I)
    where
        Self: Sized,
    {
        for element in elements {
            self.push(element);
        }
    }
}

impl<I: Weighted> Agenda for BinaryHeap<I>
where
    I::Weight: Ord,
{
    type Item = I;

    fn push(&mut self, element: I) -> Option<I> {
        BinaryHeap::push(self, element);
        None
    }

    fn pop(&mut self) -> Option<I> {
        BinaryHeap::pop(self)
    }

    fn peek(&self) -> Option<&I> {
        BinaryHeap::peek(self)
    }

    fn len(&self) -> usize {
        BinaryHeap::len(self)
    }
}

impl<I: Weighted> Agenda for LimitedHeap<I>
where
    I::Weight: Ord,
{
    type Item = I;

    fn push(&mut self, element: I) -> Option<I> {
        LimitedHeap::push(self, element)
    }

    fn pop(&mut self) -> Option<I> {
        LimitedHeap::pop(self)
    }

    fn peek(&self) -> Option<&I> {
        LimitedHeap::peek(self)
    }

    fn len(&self) -> usize {
        LimitedHeap::len(self)
    }
}
