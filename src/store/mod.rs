//! Data-store adapter consumed by the classification pipeline.
//!
//! The pipeline never talks to a database directly. It needs exactly four
//! things from its backing source:
//!
//! - the ordered rule table of a [`Category`] ([`DataStore::load_rule_table`])
//! - the vocabulary words referenced by that table ([`DataStore::load_vocabulary`])
//! - single-row metadata lookups ([`DataStore::fetch_first_row`], limit-one semantics)
//! - short ordered candidate lists evaluated client-side ([`DataStore::fetch_rows`])
//!
//! Rows are flat column maps. Every column the pipeline reads is named after
//! the [`UaResult`](crate::UaResult) field it fills, so adapters alias their
//! native columns once and the pipeline copies values across verbatim.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::error::Result;

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::{
    BrandRegex, ClientHintClient, ClientHintOs, DeviceName, MemoryStore, ALL_OS_CODES,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Identifier of a vocabulary word.
pub type WordId = i64;

/// Rule category. Each category owns one rule table and one vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Client,
    Os,
    Device,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Client, Category::Os, Category::Device];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Client => "client",
            Category::Os => "os",
            Category::Device => "device",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored rule as returned by [`DataStore::load_rule_table`].
///
/// Word ids of `0` are treated the same as an absent word: the slot imposes
/// no requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRow {
    pub id: i64,
    #[serde(default)]
    pub word_id: Option<WordId>,
    #[serde(default)]
    pub word2_id: Option<WordId>,
    pub regstring: String,
    #[serde(default)]
    pub sequence: i64,
}

impl RuleRow {
    pub fn new(id: i64, regstring: impl Into<String>, sequence: i64) -> Self {
        Self {
            id,
            word_id: None,
            word2_id: None,
            regstring: regstring.into(),
            sequence,
        }
    }

    pub fn with_words(mut self, word_id: Option<WordId>, word2_id: Option<WordId>) -> Self {
        self.word_id = word_id;
        self.word2_id = word2_id;
        self
    }

    /// Word requirements with the `0` placeholder filtered out.
    pub fn required_words(&self) -> (Option<WordId>, Option<WordId>) {
        (
            self.word_id.filter(|id| *id != 0),
            self.word2_id.filter(|id| *id != 0),
        )
    }
}

/// Collect the word ids referenced by either slot of any rule.
pub fn referenced_words(rules: &[RuleRow]) -> HashSet<WordId> {
    rules
        .iter()
        .flat_map(|rule| {
            let (first, second) = rule.required_words();
            first.into_iter().chain(second)
        })
        .collect()
}

/// A scalar cell as it appears in YAML/JSON fixtures.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

/// A single fetched row: column name to text value.
///
/// Absent and NULL columns both read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: BTreeMap<String, String>,
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<Scalar>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(column, value)| value.map(|v| (column, String::from(v))))
            .collect())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.columns.serialize(serializer)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> &str {
        self.columns.get(column).map(String::as_str).unwrap_or("")
    }

    /// Integer value of a column; absent or unparsable values read as `0`.
    pub fn get_i64(&self, column: &str) -> i64 {
        self.get(column).trim().parse().unwrap_or(0)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }
}

/// Single-row metadata lookups. Adapters answer each with at most one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Known crawler keyed by the literal user agent string.
    Crawler { ua: &'a str },
    /// Client family/vendor metadata linked to a client rule.
    Client { rule_id: i64 },
    /// Operating system implied by a client.
    ClientOs { client_id: i64 },
    /// Operating system metadata linked to an OS rule.
    Os { rule_id: i64 },
    /// Device class linked to a device-class rule.
    DeviceClass { rule_id: i64 },
    /// Device class implied by a client class.
    ClientClassDevice { class_id: i64 },
    /// Brand/market name resolved through a brand regex and its captured code.
    DeviceName { regex_id: i64, code: &'a str },
    /// Brand regex row used by the client hints model lookup.
    ClientHintBrandRegex {
        os_family_code: &'a str,
        os_code: &'a str,
    },
    /// Brand/market name resolved through a client hints model string.
    ClientHintDeviceName { regex_id: i64, model: &'a str },
    /// Device class by its own id.
    DeviceClassById { id: i64 },
    /// Device class implied by the client hints mobility flag.
    DeviceClassByMobile { mobile: bool },
}

impl Lookup<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Lookup::Crawler { .. } => "crawler",
            Lookup::Client { .. } => "client",
            Lookup::ClientOs { .. } => "client_os",
            Lookup::Os { .. } => "os",
            Lookup::DeviceClass { .. } => "device_class",
            Lookup::ClientClassDevice { .. } => "client_class_device",
            Lookup::DeviceName { .. } => "device_name",
            Lookup::ClientHintBrandRegex { .. } => "client_hint_brand_regex",
            Lookup::ClientHintDeviceName { .. } => "client_hint_device_name",
            Lookup::DeviceClassById { .. } => "device_class_by_id",
            Lookup::DeviceClassByMobile { .. } => "device_class_by_mobile",
        }
    }
}

/// Ordered candidate lists whose patterns are evaluated by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing<'a> {
    /// Brand regexes applicable to an OS family, in sequence order.
    DeviceBrandRegexes {
        os_family_code: &'a str,
        os_code: &'a str,
    },
    /// Client hints client patterns gated by mobility.
    ClientHintClients { mobile: bool },
    /// Client hints platform patterns gated by platform version.
    ClientHintOses { platform_version: &'a str },
}

impl Listing<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Listing::DeviceBrandRegexes { .. } => "device_brand_regexes",
            Listing::ClientHintClients { .. } => "client_hint_clients",
            Listing::ClientHintOses { .. } => "client_hint_oses",
        }
    }
}

/// Backing source of rules, vocabularies, and metadata.
///
/// Implementations must be safe to share across threads: a single store
/// serves the one-time dataset construction and every classification call.
pub trait DataStore: Send + Sync {
    /// Rules of one category ordered by ascending `sequence`.
    fn load_rule_table(&self, category: Category) -> Result<Vec<RuleRow>>;

    /// Lowercased text for the referenced words of one category.
    /// Words not listed in `referenced` are not returned.
    fn load_vocabulary(
        &self,
        category: Category,
        referenced: &HashSet<WordId>,
    ) -> Result<HashMap<WordId, String>>;

    /// First row answering `lookup`, if any.
    fn fetch_first_row(&self, lookup: &Lookup<'_>) -> Result<Option<Row>>;

    /// All rows of `listing`, in evaluation order.
    fn fetch_rows(&self, listing: &Listing<'_>) -> Result<Vec<Row>>;
}
