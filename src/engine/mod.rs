//! Classification pipeline.
//!
//! [`Classifier`] turns a [`UaRequest`] into a [`UaResult`]. One request runs
//! through these stages, in this order:
//!
//! 1. **Crawler**: exact lookup of the user agent string in the crawler
//!    table. A hit fixes the class to `Crawler` and ends the request.
//! 2. **Client**: client rule cascade. On a match the client metadata is
//!    fetched and the version taken from the first capture group. No match
//!    marks the request `Unrecognized` and skips stages 3-5.
//! 3. **OS**: OS rule cascade, else the OS implied by the matched client.
//! 4. **Device class**: device rule cascade, else the class implied by the
//!    client class.
//! 5. **Device brand**: brand regexes of the resolved OS family, first hit wins.
//! 6. **Client hints**: overlay from the structured hint fields, see
//!    [`client_hints`].
//!
//! Stages 3-6 can each be switched off. Results are cached per request
//! when the result cache is enabled.
//!
//! # Errors
//!
//! A store error or an unparsable ad-hoc pattern aborts the request: the
//! caller gets the error and nothing is cached.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use ua_classifier::{Category, Classifier, Dataset, MemoryStore, Row, RuleRow, UaRequest};
//!
//! let mut store = MemoryStore::new();
//! store
//!     .add_rule(Category::Client, RuleRow::new(1, "/curl\\/([0-9.]+)/si", 1))
//!     .add_client(1, Row::new().with("ua", "curl").with("ua_family", "curl"));
//!
//! let dataset = Arc::new(Dataset::from_store(store));
//! let classifier = Classifier::new(dataset);
//!
//! let result = classifier.classify(&UaRequest::from_ua("curl/8.4.0"))?;
//! assert_eq!(result.ua, "curl 8.4.0");
//! assert_eq!(result.ua_version_major, "8");
//! # Ok::<(), ua_classifier::ClassifierError>(())
//! ```

pub mod cache;
pub mod client_hints;

use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::config::ClassifierConfig;
use crate::dataset::{Dataset, RuleTables};
use crate::error::Result;
use crate::matcher::pattern::first_group;
use crate::matcher::{CacheStats, PatternCache};
use crate::request::UaRequest;
use crate::result::UaResult;
use crate::store::{DataStore, Listing, Lookup, Row};

pub use cache::{ResultCache, ResultCacheStats};

/// Text before the first `.`, or the whole version when it has none.
pub(crate) fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or_default()
}

/// Family name followed by the version, without a trailing space for empty versions.
pub(crate) fn display_name(name: &str, version: &str) -> String {
    if version.is_empty() {
        name.to_string()
    } else {
        format!("{name} {version}")
    }
}

/// Outcome of the crawler and client stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientOutcome {
    Crawler,
    Unrecognized,
    Recognized {
        client_id: Option<i64>,
        class_id: Option<i64>,
    },
}

/// Classification engine bound to a shared [`Dataset`].
///
/// A classifier is `Send + Sync`; share one behind an `Arc` to classify from
/// many threads. Its result cache and pattern memo are private to the
/// instance.
#[derive(Debug)]
pub struct Classifier {
    dataset: Arc<Dataset>,
    config: ClassifierConfig,
    cache: ResultCache,
    patterns: PatternCache,
}

impl Classifier {
    /// Classifier with the default configuration.
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self::from_parts(dataset, ClassifierConfig::default())
    }

    /// Classifier with an explicit configuration, validated first.
    pub fn with_config(dataset: Arc<Dataset>, config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(dataset, config))
    }

    fn from_parts(dataset: Arc<Dataset>, config: ClassifierConfig) -> Self {
        Self {
            cache: ResultCache::new(config.cache_capacity),
            patterns: PatternCache::with_capacity(config.pattern_cache_capacity),
            dataset,
            config,
        }
    }

    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::default()
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Build the shared rule tables now rather than on the first request.
    pub fn prepare(&self) -> Result<()> {
        self.dataset.prepare()
    }

    /// Classify a bare user agent string.
    pub fn classify_ua(&self, ua_string: &str) -> Result<UaResult> {
        self.classify(&UaRequest::from_ua(ua_string))
    }

    /// Classify one request, consulting the result cache first.
    pub fn classify(&self, request: &UaRequest) -> Result<UaResult> {
        if let Some(hit) = self.cache.get(request)? {
            return Ok(hit);
        }
        let result = self.classify_uncached(request)?;
        self.cache.put(request.clone(), result.clone())?;
        Ok(result)
    }

    /// Classify many requests in parallel. Results keep the input order; the
    /// first error aborts the batch.
    pub fn classify_batch(&self, requests: &[UaRequest]) -> Result<Vec<UaResult>> {
        if requests.len() < self.config.min_batch_size_for_parallelism {
            return requests.iter().map(|r| self.classify(r)).collect();
        }
        requests.par_iter().map(|r| self.classify(r)).collect()
    }

    fn classify_uncached(&self, request: &UaRequest) -> Result<UaResult> {
        let tables = self.dataset.tables()?;
        let store = self.dataset.store();

        let mut result = UaResult::default();
        let ua = request.ua_string().unwrap_or_default();
        result.ua_string = ua.to_string();

        let mut crawler = false;
        if !ua.is_empty() {
            match self.detect_client(ua, tables, store, &mut result)? {
                ClientOutcome::Crawler => crawler = true,
                ClientOutcome::Unrecognized => {}
                ClientOutcome::Recognized {
                    client_id,
                    class_id,
                } => {
                    if self.config.os_enabled {
                        self.detect_os(ua, tables, store, client_id, &mut result)?;
                    }
                    if self.config.device_enabled {
                        self.detect_device(ua, tables, store, class_id, &mut result)?;
                    }
                    if self.config.device_brand_enabled && !result.os_family_code.is_empty() {
                        self.detect_device_brand(ua, store, &mut result)?;
                    }
                }
            }
        }

        if !crawler && self.config.client_hints_enabled {
            self.apply_client_hints(request, store, &mut result)?;
        }

        Ok(result)
    }

    fn detect_client(
        &self,
        ua: &str,
        tables: &RuleTables,
        store: &dyn DataStore,
        result: &mut UaResult,
    ) -> Result<ClientOutcome> {
        if let Some(row) = store.fetch_first_row(&Lookup::Crawler { ua })? {
            result.fill_client(&row);
            result.ua_class = "Crawler".to_string();
            result.ua_class_code = "crawler".to_string();
            debug!(crawler = %result.ua_family, "Known crawler");
            return Ok(ClientOutcome::Crawler);
        }

        let Some(m) = tables.client.find_first(ua) else {
            result.ua_class = "Unrecognized".to_string();
            result.ua_class_code = "unrecognized".to_string();
            debug!("Unrecognized client");
            return Ok(ClientOutcome::Unrecognized);
        };

        let Some(row) = store.fetch_first_row(&Lookup::Client { rule_id: m.rule.id })? else {
            debug!(rule_id = m.rule.id, "Client rule has no metadata");
            return Ok(ClientOutcome::Recognized {
                client_id: None,
                class_id: None,
            });
        };

        result.fill_client(&row);
        let version = m.version();
        result.ua_version = version.to_string();
        result.ua_version_major = major_version(version).to_string();
        result.ua = display_name(&result.ua, version);

        Ok(ClientOutcome::Recognized {
            client_id: Some(row.get_i64("client_id")).filter(|id| *id != 0),
            class_id: row.contains("class_id").then(|| row.get_i64("class_id")),
        })
    }

    fn detect_os(
        &self,
        ua: &str,
        tables: &RuleTables,
        store: &dyn DataStore,
        client_id: Option<i64>,
        result: &mut UaResult,
    ) -> Result<()> {
        let row = match tables.os.find_first(ua) {
            Some(m) => store.fetch_first_row(&Lookup::Os { rule_id: m.rule.id })?,
            None => match client_id {
                Some(client_id) => {
                    debug!(client_id, "OS from client");
                    store.fetch_first_row(&Lookup::ClientOs { client_id })?
                }
                None => None,
            },
        };
        if let Some(row) = row {
            result.fill_os(&row);
        }
        Ok(())
    }

    fn detect_device(
        &self,
        ua: &str,
        tables: &RuleTables,
        store: &dyn DataStore,
        class_id: Option<i64>,
        result: &mut UaResult,
    ) -> Result<()> {
        let row = match tables.device.find_first(ua) {
            Some(m) => store.fetch_first_row(&Lookup::DeviceClass { rule_id: m.rule.id })?,
            None => match class_id {
                Some(class_id) => {
                    debug!(class_id, "Device class from client class");
                    store.fetch_first_row(&Lookup::ClientClassDevice { class_id })?
                }
                None => None,
            },
        };
        if let Some(row) = row {
            result.fill_device_class(&row);
        }
        Ok(())
    }

    fn detect_device_brand(
        &self,
        ua: &str,
        store: &dyn DataStore,
        result: &mut UaResult,
    ) -> Result<()> {
        let candidates = store.fetch_rows(&Listing::DeviceBrandRegexes {
            os_family_code: &result.os_family_code,
            os_code: &result.os_code,
        })?;

        for candidate in &candidates {
            let Some(name) = self.match_brand(ua, store, candidate)? else {
                continue;
            };
            result.fill_device_brand(&name);
            result.device_brand_info_url = format!(
                "{}{}",
                self.config.brand_info_url_prefix, result.device_brand_code
            );
            break;
        }
        Ok(())
    }

    /// Brand row for one brand regex candidate, if its pattern matches and
    /// the captured code names a known device.
    fn match_brand(&self, ua: &str, store: &dyn DataStore, candidate: &Row) -> Result<Option<Row>> {
        let regstring = candidate.get("regstring");
        if regstring.is_empty() {
            return Ok(None);
        }
        let regex = self.patterns.get_regex(regstring)?;
        let Some(captures) = regex.captures(ua) else {
            return Ok(None);
        };
        store.fetch_first_row(&Lookup::DeviceName {
            regex_id: candidate.get_i64("id"),
            code: first_group(&captures),
        })
    }

    pub fn is_os_enabled(&self) -> bool {
        self.config.os_enabled
    }

    pub fn is_device_enabled(&self) -> bool {
        self.config.device_enabled
    }

    pub fn is_device_brand_enabled(&self) -> bool {
        self.config.device_brand_enabled
    }

    pub fn is_client_hints_enabled(&self) -> bool {
        self.config.client_hints_enabled
    }

    // Toggling a stage changes what a request produces, so cached results
    // from the previous setting are dropped.

    pub fn set_os_enabled(&mut self, enable: bool) -> Result<()> {
        self.config.os_enabled = enable;
        self.cache.clear()
    }

    pub fn set_device_enabled(&mut self, enable: bool) -> Result<()> {
        self.config.device_enabled = enable;
        self.cache.clear()
    }

    pub fn set_device_brand_enabled(&mut self, enable: bool) -> Result<()> {
        self.config.device_brand_enabled = enable;
        self.cache.clear()
    }

    pub fn set_client_hints_enabled(&mut self, enable: bool) -> Result<()> {
        self.config.client_hints_enabled = enable;
        self.cache.clear()
    }

    pub fn cache_stats(&self) -> Result<ResultCacheStats> {
        self.cache.stats()
    }

    pub fn pattern_cache_stats(&self) -> Result<CacheStats> {
        self.patterns.stats()
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear()
    }
}

/// Builder for [`Classifier`].
#[derive(Debug, Clone, Default)]
pub struct ClassifierBuilder {
    config: ClassifierConfig,
}

impl ClassifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn with_pattern_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.pattern_cache_capacity = capacity;
        self
    }

    pub fn with_os(mut self, enable: bool) -> Self {
        self.config.os_enabled = enable;
        self
    }

    pub fn with_device(mut self, enable: bool) -> Self {
        self.config.device_enabled = enable;
        self
    }

    pub fn with_device_brand(mut self, enable: bool) -> Self {
        self.config.device_brand_enabled = enable;
        self
    }

    pub fn with_client_hints(mut self, enable: bool) -> Self {
        self.config.client_hints_enabled = enable;
        self
    }

    pub fn build(self, dataset: Arc<Dataset>) -> Result<Classifier> {
        Classifier::with_config(dataset, self.config)
    }
}
