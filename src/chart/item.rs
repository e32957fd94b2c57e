use crate::cfg::{NtHandle, RuleHandle};
use crate::hypergraph::WordId;
use crate::trie::NodeId;
use agenda::Weighted;

/// Dense id of an interned scorer state.
pub type StateId = usize;

/// A partially recognized rule: the trie node reached, the scorer state it
/// started in and the state it has reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub dot: NodeId,
    pub q: StateId,
    pub r: StateId,
}

/// A completely recognized nonterminal spanning scorer states `q` to `r`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassiveKey {
    pub nt: NtHandle,
    pub q: StateId,
    pub r: StateId,
}

/// Ordered by `forward`, then by `inner`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemPrio<W> {
    pub forward: W,
    pub inner: W,
}

/// How an active item was reached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActiveBack<W> {
    Predicted,
    Scanned {
        prev: ItemKey,
        word: WordId,
        score: W,
    },
    Completed {
        prev: ItemKey,
        child: PassiveKey,
    },
}

/// A unit of work on the agenda.
#[derive(Clone, Debug)]
pub(crate) enum Task<W> {
    Arrive {
        key: ItemKey,
        prio: ItemPrio<W>,
        back: ActiveBack<W>,
    },
    /// Continue with the outgoing edges of a finished item, from `cursor` on.
    Resume {
        key: ItemKey,
        cursor: usize,
        prio: ItemPrio<W>,
    },
    Passive {
        key: PassiveKey,
        prio: ItemPrio<W>,
        back: (ItemKey, RuleHandle),
    },
    Goal {
        r: StateId,
        prio: ItemPrio<W>,
        finish: W,
    },
}

impl<W: Copy> Task<W> {
    pub(crate) fn prio(&self) -> ItemPrio<W> {
        match *self {
            Task::Arrive { prio, .. }
            | Task::Resume { prio, .. }
            | Task::Passive { prio, .. }
            | Task::Goal { prio, .. } => prio,
        }
    }

    /// Breaks ties between equal priorities: goals first, resumed
    /// expansions last.
    fn rank(&self) -> u8 {
        match self {
            Task::Goal { .. } => 3,
            Task::Passive { .. } => 2,
            Task::Arrive { .. } => 1,
            Task::Resume { .. } => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskPrio<W>(pub ItemPrio<W>, u8);

impl<W: Copy> Weighted for Task<W> {
    type Weight = TaskPrio<W>;

    fn get_weight(&self) -> TaskPrio<W> {
        TaskPrio(self.prio(), self.rank())
    }
}
