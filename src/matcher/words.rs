//! Vocabulary word detector.
//!
//! Finds which vocabulary words occur, case-insensitively, anywhere in an
//! input string. Cascade evaluation uses the resulting [`WordSet`] to skip
//! every rule whose required words are absent, so this has to stay far
//! cheaper than running the rules' regexes.
//!
//! Small vocabularies are scanned with `str::contains`; from
//! [`AHOCORASICK_THRESHOLD`] words on, a single overlapping Aho-Corasick pass
//! reports all of them at once.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use std::collections::{HashMap, HashSet};

use crate::error::{ClassifierError, Result};
use crate::store::WordId;

/// Vocabulary size from which the automaton replaces plain substring scans.
pub const AHOCORASICK_THRESHOLD: usize = 20;

/// Ids of the vocabulary words present in one input.
pub type WordSet = HashSet<WordId>;

#[derive(Debug, Clone)]
enum DetectorStrategy {
    /// Plain substring scan for small vocabularies (< 20 words)
    Simple { words: Vec<(WordId, String)> },
    /// Overlapping automaton for large vocabularies (>= 20 words)
    AhoCorasick {
        automaton: AhoCorasick,
        ids: Vec<WordId>,
    },
}

/// Presence test of a fixed vocabulary inside input strings.
#[derive(Debug, Clone)]
pub struct WordDetector {
    strategy: DetectorStrategy,
    word_count: usize,
}

impl WordDetector {
    /// Build a detector over `vocabulary` (word id to text). Text is lowercased here.
    pub fn new(vocabulary: &HashMap<WordId, String>) -> Result<Self> {
        let mut words: Vec<(WordId, String)> = vocabulary
            .iter()
            .map(|(id, text)| (*id, text.to_lowercase()))
            .collect();
        words.sort_by_key(|(id, _)| *id);
        let word_count = words.len();

        let strategy = if word_count >= AHOCORASICK_THRESHOLD {
            let automaton = AhoCorasickBuilder::new()
                .match_kind(MatchKind::Standard)
                .build(words.iter().map(|(_, text)| text.as_str()))
                .map_err(|e| {
                    ClassifierError::Config(format!("Failed to build word automaton: {e}"))
                })?;
            DetectorStrategy::AhoCorasick {
                automaton,
                ids: words.into_iter().map(|(id, _)| id).collect(),
            }
        } else {
            DetectorStrategy::Simple { words }
        };

        Ok(Self {
            strategy,
            word_count,
        })
    }

    /// A detector that never reports any word.
    pub fn empty() -> Self {
        Self {
            strategy: DetectorStrategy::Simple { words: Vec::new() },
            word_count: 0,
        }
    }

    /// Ids of every vocabulary word occurring in `input`.
    pub fn find_words(&self, input: &str) -> WordSet {
        if self.word_count == 0 {
            return WordSet::new();
        }
        let haystack = input.to_lowercase();

        match &self.strategy {
            DetectorStrategy::Simple { words } => words
                .iter()
                .filter(|(_, text)| haystack.contains(text.as_str()))
                .map(|(id, _)| *id)
                .collect(),
            DetectorStrategy::AhoCorasick { automaton, ids } => automaton
                .find_overlapping_iter(&haystack)
                .map(|m| ids[m.pattern().as_usize()])
                .collect(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Returns the strategy being used (AhoCorasick vs Simple)
    pub fn strategy_name(&self) -> String {
        match self.strategy {
            DetectorStrategy::Simple { .. } => format!("Simple ({} words)", self.word_count),
            DetectorStrategy::AhoCorasick { .. } => {
                format!("AhoCorasick ({} words)", self.word_count)
            }
        }
    }
}
