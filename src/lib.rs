//! # UA Classifier
//!
//! A Rust library for classifying user agent strings and client hints into
//! a structured record of client, operating system, device and crawler
//! identity, driven by ordered regex rule tables.
//!
//! Rules are gated by vocabulary words: a cheap substring pass decides
//! which rules can possibly apply before any regex runs, and the first
//! eligible rule in `sequence` order that matches wins.
//!
//! ## Quick Start
//!
//! ### Basic Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use ua_classifier::{Category, Classifier, Dataset, MemoryStore, Row, RuleRow};
//!
//! let mut store = MemoryStore::new();
//! store
//!     .add_rule(
//!         Category::Client,
//!         RuleRow::new(1, "/firefox\\/([0-9.]+)/si", 1).with_words(Some(1), None),
//!     )
//!     .add_word(Category::Client, 1, "firefox")
//!     .add_client(
//!         1,
//!         Row::new()
//!             .with("ua", "Firefox")
//!             .with("ua_family", "Firefox")
//!             .with("ua_class", "Browser")
//!             .with("ua_class_code", "browser"),
//!     );
//!
//! // One dataset per backing store, shared by every classifier
//! let dataset = Arc::new(Dataset::from_store(store));
//! let classifier = Classifier::new(dataset);
//!
//! let result = classifier
//!     .classify_ua("Mozilla/5.0 (Windows NT 10.0; rv:40.0) Gecko/20100101 Firefox/40.0")?;
//! assert_eq!(result.ua, "Firefox 40.0");
//! assert_eq!(result.ua_version_major, "40");
//! # Ok::<(), ua_classifier::ClassifierError>(())
//! ```
//!
//! ### Client Hints and Raw Headers
//!
//! ```rust,ignore
//! use ua_classifier::UaRequest;
//!
//! let request = UaRequest::from_header_block(
//!     "User-Agent: Mozilla/5.0 (Linux; Android 13; Pixel 7)\r\n\
//!      Sec-CH-UA-Mobile: ?1\r\n\
//!      Sec-CH-UA-Platform: \"Android\"\r\n\
//!      Sec-CH-UA-Model: \"Pixel 7\"\r\n",
//! );
//! let result = classifier.classify(&request)?;
//! println!("{} on {}", result.device_marketname, result.os);
//! ```
//!
//! ### Loading a Dataset
//!
//! ```rust,ignore
//! use ua_classifier::{Classifier, ClassifierConfig, Dataset, MemoryStore};
//!
//! let store = MemoryStore::from_file("dataset.yaml")?;
//! let config = ClassifierConfig::from_file("classifier.yaml")?;
//! let classifier = Classifier::with_config(Arc::new(Dataset::from_store(store)), config)?;
//! classifier.prepare()?;
//! ```

pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod request;
pub mod result;
pub mod store;

// Primary interface
pub use engine::{Classifier, ClassifierBuilder, ResultCacheStats};

// Configuration
pub use config::ClassifierConfig;

// Core types and errors
pub use dataset::{Dataset, RuleTables};
pub use error::{ClassifierError, Result};
pub use request::{UaRequest, UaRequestBuilder};
pub use result::UaResult;

// Data stores
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
pub use store::{Category, DataStore, Listing, Lookup, MemoryStore, Row, RuleRow, WordId};

// Matcher building blocks (for advanced use cases)
pub use matcher::{CompiledRule, PatternCache, RuleTable, WordDetector, WordSet};
