use std::cmp::Ordering;

/// Assigns a priority to an agenda element.
pub trait Weighted {
    type Weight;

    fn get_weight(&self) -> Self::Weight;
}

/// Pairs an element with its priority. `PartialEq`, `PartialOrd`, `Eq` and
/// `Ord` only look at the priority `W`.
#[derive(Clone, Debug)]
pub struct WeightedItem<I, W>(pub I, pub W);

impl<I, W: PartialEq> PartialEq for WeightedItem<I, W> {
    fn eq(&self, other: &Self) -> bool {
        self.1.eq(&other.1)
    }
}

impl<I, W: Eq> Eq for WeightedItem<I, W> {}

impl<I, W: PartialOrd> PartialOrd for WeightedItem<I, W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.1.partial_cmp(&other.1)
    }
}

impl<I, W: Ord> Ord for WeightedItem<I, W> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.1.cmp(&other.1)
    }
}

impl<I, W: Clone> Weighted for WeightedItem<I, W> {
    type Weight = W;

    fn get_weight(&self) -> W {
        self.1.clone()
    }
}
