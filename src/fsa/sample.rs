use super::FsaScorer;
use crate::hypergraph::{Vocabulary, WordId};
use crate::util::Weight;
use fnv::FnvHashMap;
use std::mem;

/// A constant weight per target word.
#[derive(Clone, Copy, Debug)]
pub struct WordPenalty<W> {
    pub per_word: W,
}

impl<W: Weight> FsaScorer<W> for WordPenalty<W> {
    type State = ();

    fn state_bytes(&self) -> usize {
        0
    }

    fn start(&self) {}

    fn scan(&self, _: &(), _: WordId) -> (W, ()) {
        (self.per_word, ())
    }
}

/// Byte lengths of the words in `vocab`.
fn word_lengths(vocab: &Vocabulary) -> FnvHashMap<WordId, usize> {
    (1..=vocab.len() as WordId)
        .filter_map(|id| vocab.word(id).map(|w| (id, w.len())))
        .collect()
}

/// Penalizes every word longer than its predecessor. The first word of a
/// sentence is always penalized.
#[derive(Clone, Debug)]
pub struct LongerThanPrev<W> {
    penalty: W,
    lengths: FnvHashMap<WordId, usize>,
}

impl<W: Weight> LongerThanPrev<W> {
    /// Word lengths in bytes are read from `vocab`; unknown words have
    /// length 0.
    pub fn new(vocab: &Vocabulary, penalty: W) -> Self {
        LongerThanPrev {
            penalty,
            lengths: word_lengths(vocab),
        }
    }
}

impl<W: Weight> FsaScorer<W> for LongerThanPrev<W> {
    /// Length of the previous word.
    type State = Option<usize>;

    fn state_bytes(&self) -> usize {
        mem::size_of::<Option<usize>>()
    }

    fn start(&self) -> Option<usize> {
        None
    }

    fn scan(&self, state: &Option<usize>, word: WordId) -> (W, Option<usize>) {
        let len = self.lengths.get(&word).cloned().unwrap_or(0);
        let longer = match *state {
            Some(prev) => len > prev,
            None => true,
        };
        (if longer { self.penalty } else { W::one() }, Some(len))
    }
}

/// Penalizes every word shorter than its predecessor. The first word of a
/// sentence is never penalized.
#[derive(Clone, Debug)]
pub struct ShorterThanPrev<W> {
    penalty: W,
    lengths: FnvHashMap<WordId, usize>,
}

impl<W: Weight> ShorterThanPrev<W> {
    pub fn new(vocab: &Vocabulary, penalty: W) -> Self {
        ShorterThanPrev {
            penalty,
            lengths: word_lengths(vocab),
        }
    }
}

impl<W: Weight> FsaScorer<W> for ShorterThanPrev<W> {
    type State = Option<usize>;

    fn state_bytes(&self) -> usize {
        mem::size_of::<Option<usize>>()
    }

    fn start(&self) -> Option<usize> {
        None
    }

    fn scan(&self, state: &Option<usize>, word: WordId) -> (W, Option<usize>) {
        let len = self.lengths.get(&word).cloned().unwrap_or(0);
        let shorter = state.map_or(false, |prev| len < prev);
        (if shorter { self.penalty } else { W::one() }, Some(len))
    }
}

/// The state before the first word of a sentence.
pub const SENTENCE_START: WordId = 0;

/// A bigram model given as an explicit table. Unlisted bigrams get the
/// backoff weight.
#[derive(Clone, Debug)]
pub struct BigramModel<W> {
    bigrams: FnvHashMap<(WordId, WordId), W>,
    backoff: W,
    end: Option<WordId>,
}

impl<W: Weight> BigramModel<W> {
    pub fn new(backoff: W) -> Self {
        BigramModel {
            bigrams: FnvHashMap::default(),
            backoff,
            end: None,
        }
    }

    /// Sets the weight of `next` after `prev`; `SENTENCE_START` as `prev`
    /// scores the first word.
    pub fn insert(&mut self, prev: WordId, next: WordId, p: W) {
        self.bigrams.insert((prev, next), p);
    }

    pub fn with(mut self, prev: WordId, next: WordId, p: W) -> Self {
        self.insert(prev, next, p);
        self
    }

    /// Scores the end of the sentence as the bigram `(last, end)`.
    pub fn with_end(mut self, end: WordId) -> Self {
        self.end = Some(end);
        self
    }

    pub fn prob(&self, prev: WordId, next: WordId) -> W {
        self.bigrams.get(&(prev, next)).cloned().unwrap_or(self.backoff)
    }
}

impl<W: Weight> FsaScorer<W> for BigramModel<W> {
    /// The previous word.
    type State = WordId;

    fn state_bytes(&self) -> usize {
        mem::size_of::<WordId>()
    }

    fn start(&self) -> WordId {
        SENTENCE_START
    }

    fn scan(&self, state: &WordId, word: WordId) -> (W, WordId) {
        (self.prob(*state, word), word)
    }

    fn finish(&self, state: &WordId) -> W {
        match self.end {
            Some(end) => self.prob(*state, end),
            None => W::one(),
        }
    }
}
