use super::WordId;
use integeriser::{HashIntegeriser, Integeriser};

/// Interns surface words as terminal ids `1, 2, ...`.
#[derive(Clone)]
pub struct Vocabulary {
    words: HashIntegeriser<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary {
            words: HashIntegeriser::new(),
        }
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        Vocabulary::default()
    }

    pub fn convert(&mut self, word: &str) -> WordId {
        self.words.integerise(word.to_string()) as WordId + 1
    }

    /// Id of a known word.
    pub fn lookup(&self, word: &str) -> Option<WordId> {
        self.words
            .find_key(&word.to_string())
            .map(|i| i as WordId + 1)
    }

    pub fn word(&self, id: WordId) -> Option<&str> {
        if id <= 0 {
            return None;
        }
        self.words.find_value(id as usize - 1).map(String::as_str)
    }

    /// Interns every whitespace separated token of `sentence`.
    pub fn convert_sentence(&mut self, sentence: &str) -> Vec<WordId> {
        sentence.split_whitespace().map(|w| self.convert(w)).collect()
    }

    pub fn len(&self) -> usize {
        self.words.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
