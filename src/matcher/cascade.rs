//! Ordered, word-gated rule cascade.
//!
//! A [`RuleTable`] holds the compiled rules of one [`Category`] in ascending
//! `sequence` order together with the detector for the words those rules
//! require. Evaluation walks the rules in order and returns the first one
//! that is eligible (every required word present) and whose regex matches.
//! Later rules are never looked at once a match is found.

use regex::{Captures, Regex};
use std::collections::HashMap;
use tracing::trace;

use super::pattern::{compile_pattern, first_group};
use super::words::{WordDetector, WordSet};
use crate::error::{ClassifierError, Result};
use crate::store::{Category, RuleRow, WordId};

/// A stored rule with its pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: i64,
    pub word_id: Option<WordId>,
    pub word2_id: Option<WordId>,
    pub regex: Regex,
    pub sequence: i64,
}

impl CompiledRule {
    pub fn compile(category: Category, row: &RuleRow) -> Result<Self> {
        let regex =
            compile_pattern(&row.regstring).map_err(|e| ClassifierError::InvalidPattern {
                category,
                rule_id: row.id,
                pattern: row.regstring.clone(),
                message: e.to_string(),
            })?;
        let (word_id, word2_id) = row.required_words();

        Ok(Self {
            id: row.id,
            word_id,
            word2_id,
            regex,
            sequence: row.sequence,
        })
    }

    /// Whether every required word of this rule is in `words`.
    #[inline]
    pub fn is_eligible(&self, words: &WordSet) -> bool {
        self.word_id.map_or(true, |id| words.contains(&id))
            && self.word2_id.map_or(true, |id| words.contains(&id))
    }
}

/// The winning rule of a cascade and its captures on the input.
#[derive(Debug)]
pub struct RuleMatch<'r, 'h> {
    pub rule: &'r CompiledRule,
    pub captures: Captures<'h>,
}

impl<'h> RuleMatch<'_, 'h> {
    /// First capture group, `""` when the pattern has none.
    pub fn version(&self) -> &'h str {
        first_group(&self.captures)
    }
}

/// Compiled rules of one category plus their word detector.
#[derive(Debug, Clone)]
pub struct RuleTable {
    category: Category,
    rules: Vec<CompiledRule>,
    detector: WordDetector,
}

impl RuleTable {
    /// Compile `rows` (already in ascending `sequence` order) against `vocabulary`.
    ///
    /// Any pattern that fails to compile fails the whole table.
    pub fn build(
        category: Category,
        rows: &[RuleRow],
        vocabulary: &HashMap<WordId, String>,
    ) -> Result<Self> {
        let rules = rows
            .iter()
            .map(|row| CompiledRule::compile(category, row))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            category,
            rules,
            detector: WordDetector::new(vocabulary)?,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.detector.word_count()
    }

    /// Word set of `input` for this table's vocabulary.
    pub fn find_words(&self, input: &str) -> WordSet {
        self.detector.find_words(input)
    }

    /// Rules eligible for `words`, in cascade order.
    pub fn eligible_rules<'a>(
        &'a self,
        words: &'a WordSet,
    ) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.rules.iter().filter(move |rule| rule.is_eligible(words))
    }

    /// First eligible rule matching `input`.
    pub fn find_first<'h>(&self, input: &'h str) -> Option<RuleMatch<'_, 'h>> {
        let words = self.find_words(input);
        self.find_first_with_words(input, &words)
    }

    /// Same as [`find_first`](Self::find_first) with a precomputed word set.
    pub fn find_first_with_words<'h>(
        &self,
        input: &'h str,
        words: &WordSet,
    ) -> Option<RuleMatch<'_, 'h>> {
        let found = self
            .rules
            .iter()
            .filter(|rule| rule.is_eligible(words))
            .find_map(|rule| {
                rule.regex
                    .captures(input)
                    .map(|captures| RuleMatch { rule, captures })
            });
        if let Some(m) = &found {
            trace!(
                category = %self.category,
                rule_id = m.rule.id,
                sequence = m.rule.sequence,
                "Rule matched"
            );
        }
        found
    }
}
