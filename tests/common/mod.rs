//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use ua_classifier::{Classifier, ClassifierConfig, Dataset, MemoryStore};

pub const DATASET_YAML: &str = include_str!("../data/dataset.yaml");

pub const FIREFOX_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; WOW64; rv:40.0) Gecko/20100101 Firefox/40.0";

pub const SAMSUNG_UA: &str = "Mozilla/5.0 (Linux; Android 10; SM-G960F Build/QP1A.190711.020) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.130 Mobile Safari/537.36";

pub const GOOGLEBOT_UA: &str = "Googlebot/2.1 (+http://www.google.com/bot.html)";

/// Crawler whose user agent would also hit OS and device rules.
pub const DECOY_CRAWLER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Mobile; Tablet) compatible; ExampleBot/1.0";

pub const FULL_VERSION_LIST: &str = "\"Not_A Brand\";v=\"8.0.0.0\", \
     \"Chromium\";v=\"120.0.6099.130\", \"Google Chrome\";v=\"120.0.6099.130\"";

pub fn store() -> MemoryStore {
    MemoryStore::from_yaml_str(DATASET_YAML).expect("fixture dataset should parse")
}

pub fn dataset() -> Arc<Dataset> {
    Arc::new(Dataset::from_store(store()))
}

pub fn classifier() -> Classifier {
    Classifier::new(dataset())
}

pub fn uncached_classifier() -> Classifier {
    Classifier::with_config(dataset(), ClassifierConfig::uncached()).unwrap()
}
