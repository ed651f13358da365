//! Shared dataset: the rule tables of one backing store, built once.
//!
//! Every [`Classifier`](crate::Classifier) created against the same
//! [`Dataset`] shares its rule tables. The tables are built lazily by the
//! first caller that needs them; concurrent first callers block until that
//! single construction finishes and then read the tables without locking.
//!
//! A failed construction leaves the dataset unbuilt and the error goes to
//! the caller that triggered it. The next access tries again.

use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::Result;
use crate::matcher::RuleTable;
use crate::store::{referenced_words, Category, DataStore};

/// The three rule tables of a dataset.
#[derive(Debug, Clone)]
pub struct RuleTables {
    pub client: RuleTable,
    pub os: RuleTable,
    pub device: RuleTable,
}

impl RuleTables {
    /// Load and compile every category from `store`.
    pub fn load(store: &dyn DataStore) -> Result<Self> {
        Ok(Self {
            client: load_table(store, Category::Client)?,
            os: load_table(store, Category::Os)?,
            device: load_table(store, Category::Device)?,
        })
    }

    pub fn get(&self, category: Category) -> &RuleTable {
        match category {
            Category::Client => &self.client,
            Category::Os => &self.os,
            Category::Device => &self.device,
        }
    }
}

fn load_table(store: &dyn DataStore, category: Category) -> Result<RuleTable> {
    let rows = store.load_rule_table(category)?;
    let referenced = referenced_words(&rows);
    let vocabulary = store.load_vocabulary(category, &referenced)?;
    debug!(
        category = %category,
        rules = rows.len(),
        words = vocabulary.len(),
        "Loaded rule table"
    );
    RuleTable::build(category, &rows, &vocabulary)
}

/// A backing store plus its lazily built, immutable rule tables.
pub struct Dataset {
    store: Arc<dyn DataStore>,
    tables: OnceCell<RuleTables>,
}

impl Dataset {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            tables: OnceCell::new(),
        }
    }

    /// Wrap a concrete store.
    pub fn from_store<S: DataStore + 'static>(store: S) -> Self {
        Self::new(Arc::new(store))
    }

    pub fn store(&self) -> &dyn DataStore {
        self.store.as_ref()
    }

    /// Rule tables, building them on first use.
    pub fn tables(&self) -> Result<&RuleTables> {
        self.tables.get_or_try_init(|| {
            let start = Instant::now();
            let tables = RuleTables::load(self.store.as_ref())?;
            info!(
                client_rules = tables.client.len(),
                os_rules = tables.os.len(),
                device_rules = tables.device.len(),
                client_words = tables.client.vocabulary_size(),
                os_words = tables.os.vocabulary_size(),
                device_words = tables.device.vocabulary_size(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Built shared rule tables"
            );
            Ok(tables)
        })
    }

    /// Build the rule tables now instead of on the first classification.
    pub fn prepare(&self) -> Result<()> {
        self.tables().map(|_| ())
    }

    pub fn is_prepared(&self) -> bool {
        self.tables.get().is_some()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("prepared", &self.is_prepared())
            .finish_non_exhaustive()
    }
}
