//! Pattern matching building blocks.
//!
//! - [`words`]: vocabulary word detector used to gate rules
//! - [`pattern`]: stored pattern text to compiled regex
//! - [`cascade`]: ordered first-match rule tables
//! - [`cache`]: LRU memo for patterns compiled at request time

pub mod cache;
pub mod cascade;
pub mod pattern;
pub mod words;

pub use cache::{CacheStats, PatternCache, DEFAULT_PATTERN_CACHE_CAPACITY};
pub use cascade::{CompiledRule, RuleMatch, RuleTable};
pub use pattern::{compile_pattern, unperlize};
pub use words::{WordDetector, WordSet, AHOCORASICK_THRESHOLD};
