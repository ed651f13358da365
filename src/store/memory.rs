//! In-memory data store.
//!
//! Holds every table the pipeline reads as plain serde structures, so a
//! dataset can be embedded as YAML or JSON or assembled programmatically.
//! Lists are kept sorted by `sequence` so that the ordering contract of
//! [`DataStore`] holds regardless of how the store was populated.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::{Category, DataStore, Listing, Lookup, Row, RuleRow, WordId};
use crate::error::Result;

/// Marker used by brand regex rows that apply to every OS of a family.
pub const ALL_OS_CODES: &str = "-all-";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PerCategory<T> {
    client: T,
    os: T,
    device: T,
}

impl<T> PerCategory<T> {
    fn get(&self, category: Category) -> &T {
        match category {
            Category::Client => &self.client,
            Category::Os => &self.os,
            Category::Device => &self.device,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::Client => &mut self.client,
            Category::Os => &mut self.os,
            Category::Device => &mut self.device,
        }
    }
}

/// Brand regex applicable to an OS family (and optionally one OS code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRegex {
    pub id: i64,
    pub os_family_code: String,
    #[serde(default = "all_os_codes")]
    pub os_code: String,
    pub regstring: String,
    #[serde(default)]
    pub sequence: i64,
}

fn all_os_codes() -> String {
    ALL_OS_CODES.to_string()
}

impl BrandRegex {
    fn applies_to(&self, os_family_code: &str, os_code: &str) -> bool {
        self.os_family_code == os_family_code
            && (self.os_code == ALL_OS_CODES || self.os_code == os_code)
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id.to_string())
            .with("regstring", self.regstring.clone())
    }
}

/// Brand/market name keyed by a brand regex id and a code (captured code or model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceName {
    pub regex_id: i64,
    pub code: String,
    pub row: Row,
}

/// Client hints client pattern. `mobile: None` applies to both mobility states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHintClient {
    #[serde(default)]
    pub mobile: Option<bool>,
    #[serde(default)]
    pub sequence: i64,
    pub row: Row,
}

/// Client hints platform pattern. `platform_version: None` applies to every version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHintOs {
    #[serde(default)]
    pub platform_version: Option<String>,
    #[serde(default)]
    pub sequence: i64,
    pub row: Row,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct MobilityDeviceClasses {
    mobile: Option<Row>,
    desktop: Option<Row>,
}

/// A complete dataset held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStore {
    rules: PerCategory<Vec<RuleRow>>,
    words: PerCategory<HashMap<WordId, String>>,
    crawlers: HashMap<String, Row>,
    clients: HashMap<i64, Row>,
    client_os: HashMap<i64, Row>,
    os: HashMap<i64, Row>,
    device_classes: HashMap<i64, Row>,
    client_class_devices: HashMap<i64, Row>,
    device_brand_regexes: Vec<BrandRegex>,
    device_names: Vec<DeviceName>,
    client_hint_clients: Vec<ClientHintClient>,
    client_hint_oses: Vec<ClientHintOs>,
    client_hint_brand_regexes: Vec<BrandRegex>,
    client_hint_device_names: Vec<DeviceName>,
    device_classes_by_id: HashMap<i64, Row>,
    mobility_device_classes: MobilityDeviceClasses,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let store: MemoryStore = serde_yaml::from_str(yaml)?;
        Ok(store.normalized())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let store: MemoryStore = serde_json::from_str(json)?;
        Ok(store.normalized())
    }

    /// Load a dataset file. `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    fn normalized(mut self) -> Self {
        for category in Category::ALL {
            self.rules
                .get_mut(category)
                .sort_by_key(|rule| rule.sequence);
            for text in self.words.get_mut(category).values_mut() {
                *text = text.to_lowercase();
            }
        }
        self.device_brand_regexes.sort_by_key(|r| r.sequence);
        self.client_hint_brand_regexes.sort_by_key(|r| r.sequence);
        self.client_hint_clients.sort_by_key(|c| c.sequence);
        self.client_hint_oses.sort_by_key(|o| o.sequence);
        self
    }

    pub fn add_rule(&mut self, category: Category, rule: RuleRow) -> &mut Self {
        let rules = self.rules.get_mut(category);
        let at = rules.partition_point(|r| r.sequence <= rule.sequence);
        rules.insert(at, rule);
        self
    }

    pub fn add_word(&mut self, category: Category, id: WordId, text: &str) -> &mut Self {
        self.words.get_mut(category).insert(id, text.to_lowercase());
        self
    }

    pub fn add_crawler(&mut self, ua: impl Into<String>, row: Row) -> &mut Self {
        self.crawlers.insert(ua.into(), row);
        self
    }

    pub fn add_client(&mut self, rule_id: i64, row: Row) -> &mut Self {
        self.clients.insert(rule_id, row);
        self
    }

    pub fn add_client_os(&mut self, client_id: i64, row: Row) -> &mut Self {
        self.client_os.insert(client_id, row);
        self
    }

    pub fn add_os(&mut self, rule_id: i64, row: Row) -> &mut Self {
        self.os.insert(rule_id, row);
        self
    }

    pub fn add_device_class(&mut self, rule_id: i64, row: Row) -> &mut Self {
        self.device_classes.insert(rule_id, row);
        self
    }

    pub fn add_client_class_device(&mut self, class_id: i64, row: Row) -> &mut Self {
        self.client_class_devices.insert(class_id, row);
        self
    }

    pub fn add_device_brand_regex(&mut self, regex: BrandRegex) -> &mut Self {
        let at = self
            .device_brand_regexes
            .partition_point(|r| r.sequence <= regex.sequence);
        self.device_brand_regexes.insert(at, regex);
        self
    }

    pub fn add_device_name(&mut self, name: DeviceName) -> &mut Self {
        self.device_names.push(name);
        self
    }

    pub fn add_client_hint_client(&mut self, client: ClientHintClient) -> &mut Self {
        let at = self
            .client_hint_clients
            .partition_point(|c| c.sequence <= client.sequence);
        self.client_hint_clients.insert(at, client);
        self
    }

    pub fn add_client_hint_os(&mut self, os: ClientHintOs) -> &mut Self {
        let at = self
            .client_hint_oses
            .partition_point(|o| o.sequence <= os.sequence);
        self.client_hint_oses.insert(at, os);
        self
    }

    pub fn add_client_hint_brand_regex(&mut self, regex: BrandRegex) -> &mut Self {
        let at = self
            .client_hint_brand_regexes
            .partition_point(|r| r.sequence <= regex.sequence);
        self.client_hint_brand_regexes.insert(at, regex);
        self
    }

    pub fn add_client_hint_device_name(&mut self, name: DeviceName) -> &mut Self {
        self.client_hint_device_names.push(name);
        self
    }

    pub fn add_device_class_by_id(&mut self, id: i64, row: Row) -> &mut Self {
        self.device_classes_by_id.insert(id, row);
        self
    }

    pub fn set_mobility_device_class(&mut self, mobile: bool, row: Row) -> &mut Self {
        if mobile {
            self.mobility_device_classes.mobile = Some(row);
        } else {
            self.mobility_device_classes.desktop = Some(row);
        }
        self
    }
}

fn find_name<'a>(names: &'a [DeviceName], regex_id: i64, code: &str) -> Option<&'a Row> {
    names
        .iter()
        .find(|n| n.regex_id == regex_id && n.code == code)
        .map(|n| &n.row)
}

impl DataStore for MemoryStore {
    fn load_rule_table(&self, category: Category) -> Result<Vec<RuleRow>> {
        Ok(self.rules.get(category).clone())
    }

    fn load_vocabulary(
        &self,
        category: Category,
        referenced: &HashSet<WordId>,
    ) -> Result<HashMap<WordId, String>> {
        Ok(self
            .words
            .get(category)
            .iter()
            .filter(|(id, _)| referenced.contains(*id))
            .map(|(id, text)| (*id, text.to_lowercase()))
            .collect())
    }

    fn fetch_first_row(&self, lookup: &Lookup<'_>) -> Result<Option<Row>> {
        let row = match *lookup {
            Lookup::Crawler { ua } => self.crawlers.get(ua),
            Lookup::Client { rule_id } => self.clients.get(&rule_id),
            Lookup::ClientOs { client_id } => self.client_os.get(&client_id),
            Lookup::Os { rule_id } => self.os.get(&rule_id),
            Lookup::DeviceClass { rule_id } => self.device_classes.get(&rule_id),
            Lookup::ClientClassDevice { class_id } => self.client_class_devices.get(&class_id),
            Lookup::DeviceName { regex_id, code } => find_name(&self.device_names, regex_id, code),
            Lookup::ClientHintBrandRegex {
                os_family_code,
                os_code,
            } => {
                return Ok(self
                    .client_hint_brand_regexes
                    .iter()
                    .find(|r| r.applies_to(os_family_code, os_code))
                    .map(BrandRegex::to_row))
            }
            Lookup::ClientHintDeviceName { regex_id, model } => {
                find_name(&self.client_hint_device_names, regex_id, model)
            }
            Lookup::DeviceClassById { id } => self.device_classes_by_id.get(&id),
            Lookup::DeviceClassByMobile { mobile } => {
                if mobile {
                    self.mobility_device_classes.mobile.as_ref()
                } else {
                    self.mobility_device_classes.desktop.as_ref()
                }
            }
        };
        Ok(row.cloned())
    }

    fn fetch_rows(&self, listing: &Listing<'_>) -> Result<Vec<Row>> {
        let rows = match *listing {
            Listing::DeviceBrandRegexes {
                os_family_code,
                os_code,
            } => self
                .device_brand_regexes
                .iter()
                .filter(|r| r.applies_to(os_family_code, os_code))
                .map(BrandRegex::to_row)
                .collect(),
            Listing::ClientHintClients { mobile } => self
                .client_hint_clients
                .iter()
                .filter(|c| c.mobile.map_or(true, |m| m == mobile))
                .map(|c| c.row.clone())
                .collect(),
            Listing::ClientHintOses { platform_version } => self
                .client_hint_oses
                .iter()
                .filter(|o| {
                    o.platform_version
                        .as_deref()
                        .map_or(true, |v| v == platform_version)
                })
                .map(|o| o.row.clone())
                .collect(),
        };
        Ok(rows)
    }
}
