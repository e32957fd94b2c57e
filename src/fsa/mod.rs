//! Finite-state scoring functions over target words, such as n-gram models.
//!
//! The search only sees the `FsaScorer` interface: a start state, and a scan
//! step that scores one word and returns the next state. A scorer with no
//! state bytes is stateless and can be applied edge by edge.

mod sample;

pub use self::sample::{
    BigramModel, LongerThanPrev, ShorterThanPrev, WordPenalty, SENTENCE_START,
};

use crate::hypergraph::WordId;
use crate::util::Weight;
use std::fmt::Debug;
use std::hash::Hash;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScorerKind {
    Stateless,
    Stateful,
}

pub trait FsaScorer<W: Weight> {
    type State: Clone + Eq + Hash + Debug;

    /// Size of the state; 0 means the scorer is stateless.
    fn state_bytes(&self) -> usize;

    fn start(&self) -> Self::State;

    /// Score of `word` after `state`, and the state after it.
    fn scan(&self, state: &Self::State, word: WordId) -> (W, Self::State);

    /// Score for ending the sentence in `state`.
    fn finish(&self, _state: &Self::State) -> W {
        W::one()
    }

    fn kind(&self) -> ScorerKind {
        if self.state_bytes() == 0 {
            ScorerKind::Stateless
        } else {
            ScorerKind::Stateful
        }
    }

    fn scan_phrase(&self, state: &Self::State, words: &[WordId]) -> (W, Self::State) {
        let mut weight = W::one();
        let mut state = state.clone();
        for &word in words {
            let (w, next) = self.scan(&state, word);
            weight = weight * w;
            state = next;
        }
        (weight, state)
    }
}

impl<'a, W: Weight, S: FsaScorer<W>> FsaScorer<W> for &'a S {
    type State = S::State;

    fn state_bytes(&self) -> usize {
        (**self).state_bytes()
    }

    fn start(&self) -> S::State {
        (**self).start()
    }

    fn scan(&self, state: &S::State, word: WordId) -> (W, S::State) {
        (**self).scan(state, word)
    }

    fn finish(&self, state: &S::State) -> W {
        (**self).finish(state)
    }
}
