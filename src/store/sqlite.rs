//! SQLite-backed data store for udger-style rule databases.
//!
//! A single connection sits behind a `Mutex`, either read-only over the file
//! or an in-memory copy of it; every query is a cached prepared statement. Native columns are aliased to the shared
//! [`Row`] column names so the pipeline stays schema-agnostic.

use rusqlite::backup::Backup;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

use super::{Category, DataStore, Listing, Lookup, Row, RuleRow, WordId};
use crate::error::{ClassifierError, Result};

const CRAWLER: &str = "SELECT
        'Crawler' AS ua_class, 'crawler' AS ua_class_code,
        name AS ua, ver AS ua_version, ver_major AS ua_version_major,
        last_seen AS crawler_last_seen, respect_robotstxt AS crawler_respect_robotstxt,
        crawler_classification AS crawler_category,
        crawler_classification_code AS crawler_category_code,
        family AS ua_family, family_code AS ua_family_code,
        family_homepage AS ua_family_homepage, family_icon AS ua_family_icon,
        vendor AS ua_family_vendor, vendor_code AS ua_family_vendor_code,
        vendor_homepage AS ua_family_vendor_homepage,
        'https://udger.com/resources/ua-list/bot-detail?bot=' || REPLACE(family, ' ', '%20')
            || '#id' || udger_crawler_list.id AS ua_family_info_url
    FROM udger_crawler_list
    LEFT JOIN udger_crawler_class ON udger_crawler_class.id = udger_crawler_list.class_id
    WHERE ua_string = ?1
    LIMIT 1";

const CLIENT: &str = "SELECT
        client_id, class_id,
        client_classification AS ua_class, client_classification_code AS ua_class_code,
        name AS ua, engine AS ua_engine,
        uptodate_current_version AS ua_uptodate_current_version,
        name AS ua_family, name_code AS ua_family_code, homepage AS ua_family_homepage,
        icon AS ua_family_icon, icon_big AS ua_family_icon_big,
        vendor AS ua_family_vendor, vendor_code AS ua_family_vendor_code,
        vendor_homepage AS ua_family_vendor_homepage,
        'https://udger.com/resources/ua-list/browser-detail?browser=' || REPLACE(name, ' ', '%20')
            AS ua_family_info_url
    FROM udger_client_regex ur
    JOIN udger_client_list ON udger_client_list.id = ur.client_id
    JOIN udger_client_class ON udger_client_class.id = udger_client_list.class_id
    WHERE ur.rowid = ?1
    LIMIT 1";

const OS_COLUMNS: &str = "
        family AS os_family, family_code AS os_family_code,
        name AS os, name_code AS os_code, homepage AS os_homepage,
        icon AS os_icon, icon_big AS os_icon_big,
        vendor AS os_family_vendor, vendor_code AS os_family_vendor_code,
        vendor_homepage AS os_family_vendor_homepage,
        'https://udger.com/resources/ua-list/os-detail?os=' || REPLACE(name, ' ', '%20')
            AS os_info_url";

const DEVICE_CLASS_COLUMNS: &str = "
        name AS device_class, name_code AS device_class_code,
        icon AS device_class_icon, icon_big AS device_class_icon_big,
        'https://udger.com/resources/ua-list/device-detail?device=' || REPLACE(name, ' ', '%20')
            AS device_class_info_url";

const DEVICE_NAME: &str = "SELECT
        marketname AS device_marketname, brand AS device_brand, brand_code AS device_brand_code,
        brand_url AS device_brand_homepage, icon AS device_brand_icon,
        icon_big AS device_brand_icon_big,
        'https://udger.com/resources/ua-list/devices-brand-detail?brand=' || brand_code
            AS device_brand_info_url,
        deviceclass_id
    FROM udger_devicename_list
    JOIN udger_devicename_brand ON udger_devicename_brand.id = udger_devicename_list.brand_id
    WHERE regex_id = ?1 AND code = ?2
    LIMIT 1";

const BRAND_REGEXES: &str = "SELECT id, regstring
    FROM udger_devicename_regex
    WHERE (os_family_code = ?1 AND os_code = '-all-')
       OR (os_family_code = ?1 AND os_code = ?2)
    ORDER BY sequence";

const CLIENT_HINT_CLIENTS: &str = "SELECT
        regstring,
        client_id, class_id,
        client_classification AS ua_class, client_classification_code AS ua_class_code,
        engine AS ua_engine, uptodate_current_version AS ua_uptodate_current_version,
        name AS ua_family, name_code AS ua_family_code, homepage AS ua_family_homepage,
        icon AS ua_family_icon, icon_big AS ua_family_icon_big,
        vendor AS ua_family_vendor, vendor_code AS ua_family_vendor_code,
        vendor_homepage AS ua_family_vendor_homepage,
        'https://udger.com/resources/ua-list/browser-detail?browser=' || REPLACE(name, ' ', '%20')
            AS ua_family_info_url
    FROM udger_client_ch_regex ur
    JOIN udger_client_list ON udger_client_list.id = ur.client_id
    JOIN udger_client_class ON udger_client_class.id = udger_client_list.class_id
    WHERE ur.mobile IS NULL OR ur.mobile = ?1
    ORDER BY ur.sequence";

/// Rule table and vocabulary table names of a category.
fn category_tables(category: Category) -> (&'static str, &'static str) {
    match category {
        Category::Client => ("udger_client_regex", "udger_client_regex_words"),
        Category::Os => ("udger_os_regex", "udger_os_regex_words"),
        Category::Device => ("udger_deviceclass_regex", "udger_deviceclass_regex_words"),
    }
}

fn lookup_query(lookup: &Lookup<'_>) -> (String, Vec<Value>) {
    let text = |s: &str| Value::Text(s.to_string());
    match *lookup {
        Lookup::Crawler { ua } => (CRAWLER.to_string(), vec![text(ua)]),
        Lookup::Client { rule_id } => (CLIENT.to_string(), vec![Value::Integer(rule_id)]),
        Lookup::ClientOs { client_id } => (
            format!(
                "SELECT {OS_COLUMNS}
                 FROM udger_client_os_relation
                 JOIN udger_os_list ON udger_os_list.id = udger_client_os_relation.os_id
                 WHERE client_id = ?1
                 LIMIT 1"
            ),
            vec![Value::Integer(client_id)],
        ),
        Lookup::Os { rule_id } => (
            format!(
                "SELECT {OS_COLUMNS}
                 FROM udger_os_regex ur
                 JOIN udger_os_list ON udger_os_list.id = ur.os_id
                 WHERE ur.rowid = ?1
                 LIMIT 1"
            ),
            vec![Value::Integer(rule_id)],
        ),
        Lookup::DeviceClass { rule_id } => (
            format!(
                "SELECT {DEVICE_CLASS_COLUMNS}
                 FROM udger_deviceclass_regex ur
                 JOIN udger_deviceclass_list ON udger_deviceclass_list.id = ur.deviceclass_id
                 WHERE ur.rowid = ?1
                 LIMIT 1"
            ),
            vec![Value::Integer(rule_id)],
        ),
        Lookup::ClientClassDevice { class_id } => (
            format!(
                "SELECT {DEVICE_CLASS_COLUMNS}
                 FROM udger_deviceclass_list
                 JOIN udger_client_class
                   ON udger_client_class.deviceclass_id = udger_deviceclass_list.id
                 WHERE udger_client_class.id = ?1
                 LIMIT 1"
            ),
            vec![Value::Integer(class_id)],
        ),
        Lookup::DeviceName { regex_id, code } => (
            DEVICE_NAME.to_string(),
            vec![Value::Integer(regex_id), text(code)],
        ),
        Lookup::ClientHintBrandRegex {
            os_family_code,
            os_code,
        } => (
            format!("{BRAND_REGEXES} LIMIT 1"),
            vec![text(os_family_code), text(os_code)],
        ),
        Lookup::ClientHintDeviceName { regex_id, model } => (
            DEVICE_NAME.to_string(),
            vec![Value::Integer(regex_id), text(model)],
        ),
        Lookup::DeviceClassById { id } => (
            format!(
                "SELECT {DEVICE_CLASS_COLUMNS}
                 FROM udger_deviceclass_list
                 WHERE id = ?1
                 LIMIT 1"
            ),
            vec![Value::Integer(id)],
        ),
        Lookup::DeviceClassByMobile { mobile } => (
            format!(
                "SELECT {DEVICE_CLASS_COLUMNS}
                 FROM udger_deviceclass_ch
                 JOIN udger_deviceclass_list
                   ON udger_deviceclass_list.id = udger_deviceclass_ch.deviceclass_id
                 WHERE mobile = ?1
                 LIMIT 1"
            ),
            vec![Value::Integer(i64::from(mobile))],
        ),
    }
}

fn listing_query(listing: &Listing<'_>) -> (String, Vec<Value>) {
    match *listing {
        Listing::DeviceBrandRegexes {
            os_family_code,
            os_code,
        } => (
            BRAND_REGEXES.to_string(),
            vec![
                Value::Text(os_family_code.to_string()),
                Value::Text(os_code.to_string()),
            ],
        ),
        Listing::ClientHintClients { mobile } => (
            CLIENT_HINT_CLIENTS.to_string(),
            vec![Value::Integer(i64::from(mobile))],
        ),
        Listing::ClientHintOses { platform_version } => (
            format!(
                "SELECT regstring, {OS_COLUMNS}
                 FROM udger_os_ch_regex ur
                 JOIN udger_os_list ON udger_os_list.id = ur.os_id
                 WHERE ur.version IS NULL OR ur.version = ?1
                 ORDER BY ur.sequence"
            ),
            vec![Value::Text(platform_version.to_string())],
        ),
    }
}

/// Convert one result row into a [`Row`]. NULL and BLOB cells are left out.
fn to_row(names: &[String], row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let mut out = Row::new();
    for (idx, name) in names.iter().enumerate() {
        let value = match row.get_ref(idx)? {
            ValueRef::Null | ValueRef::Blob(_) => continue,
            ValueRef::Integer(i) => i.to_string(),
            ValueRef::Real(f) => f.to_string(),
            ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        };
        out.insert(name.as_str(), value);
    }
    Ok(out)
}

/// Pages copied per backup step when loading a database into memory.
const BACKUP_PAGES_PER_STEP: i32 = 256;

/// SQLite data store over a udger-style database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn))
    }

    /// Copy a database file into an in-memory database and serve every
    /// lookup from the copy. The file is not touched after this returns.
    pub fn open_in_memory(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let mut conn = Connection::open_in_memory()?;
        {
            let backup = Backup::new(&source, &mut conn)?;
            backup.run_to_completion(BACKUP_PAGES_PER_STEP, Duration::ZERO, None)?;
        }
        info!(path = %path.display(), "Loaded database into memory");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection, e.g. an in-memory database.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Whether the connection still answers queries.
    pub fn is_valid(&self) -> bool {
        self.conn().is_ok_and(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok()
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ClassifierError::LockPoisoned("sqlite connection"))
    }

    fn query(&self, sql: &str, params: Vec<Value>, limit: Option<usize>) -> Result<Vec<Row>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt.query(params_from_iter(params))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(to_row(&names, row)?);
            if limit.is_some_and(|n| out.len() >= n) {
                break;
            }
        }
        Ok(out)
    }
}

impl DataStore for SqliteStore {
    fn load_rule_table(&self, category: Category) -> Result<Vec<RuleRow>> {
        let (table, _) = category_tables(category);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT rowid, regstring, word_id, word2_id, sequence FROM {table} ORDER BY sequence"
        ))?;
        let rules = stmt
            .query_map([], |row| {
                Ok(RuleRow {
                    id: row.get(0)?,
                    regstring: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    word_id: row.get(2)?,
                    word2_id: row.get(3)?,
                    sequence: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    fn load_vocabulary(
        &self,
        category: Category,
        referenced: &HashSet<WordId>,
    ) -> Result<HashMap<WordId, String>> {
        let (_, words) = category_tables(category);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT id, word FROM {words}"))?;
        let mut rows = stmt.query([])?;

        let mut vocabulary = HashMap::new();
        while let Some(row) = rows.next()? {
            let id: WordId = row.get(0)?;
            if referenced.contains(&id) {
                let word: Option<String> = row.get(1)?;
                vocabulary.insert(id, word.unwrap_or_default().to_lowercase());
            }
        }
        Ok(vocabulary)
    }

    fn fetch_first_row(&self, lookup: &Lookup<'_>) -> Result<Option<Row>> {
        let (sql, params) = lookup_query(lookup);
        Ok(self.query(&sql, params, Some(1))?.into_iter().next())
    }

    fn fetch_rows(&self, listing: &Listing<'_>) -> Result<Vec<Row>> {
        let (sql, params) = listing_query(listing);
        self.query(&sql, params, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "
        CREATE TABLE udger_client_regex (client_id INTEGER, regstring TEXT, word_id INTEGER,
            word2_id INTEGER, sequence INTEGER);
        CREATE TABLE udger_client_regex_words (id INTEGER, word TEXT);
        CREATE TABLE udger_os_regex (os_id INTEGER, regstring TEXT, word_id INTEGER,
            word2_id INTEGER, sequence INTEGER);
        CREATE TABLE udger_os_regex_words (id INTEGER, word TEXT);
        CREATE TABLE udger_client_list (id INTEGER, class_id INTEGER, name TEXT, name_code TEXT,
            homepage TEXT, icon TEXT, icon_big TEXT, engine TEXT, vendor TEXT, vendor_code TEXT,
            vendor_homepage TEXT, uptodate_current_version TEXT);
        CREATE TABLE udger_client_class (id INTEGER, client_classification TEXT,
            client_classification_code TEXT, deviceclass_id INTEGER);
        CREATE TABLE udger_crawler_list (id INTEGER, ua_string TEXT, name TEXT, ver TEXT,
            ver_major TEXT, last_seen TEXT, respect_robotstxt TEXT, family TEXT, family_code TEXT,
            family_homepage TEXT, family_icon TEXT, vendor TEXT, vendor_code TEXT,
            vendor_homepage TEXT, class_id INTEGER);
        CREATE TABLE udger_crawler_class (id INTEGER, crawler_classification TEXT,
            crawler_classification_code TEXT);
        CREATE TABLE udger_devicename_regex (id INTEGER, os_family_code TEXT, os_code TEXT,
            regstring TEXT, sequence INTEGER);
        CREATE TABLE udger_devicename_list (regex_id INTEGER, brand_id INTEGER, code TEXT,
            marketname TEXT, deviceclass_id INTEGER);
        CREATE TABLE udger_devicename_brand (id INTEGER, brand TEXT, brand_code TEXT,
            brand_url TEXT, icon TEXT, icon_big TEXT);

        INSERT INTO udger_client_regex VALUES (1, '/firefox\\/([0-9.]+)/si', 10, NULL, 2);
        INSERT INTO udger_client_regex VALUES (1, '/mozilla/si', 0, NULL, 1);
        INSERT INTO udger_client_regex_words VALUES (10, 'Firefox'), (11, 'unused');
        INSERT INTO udger_client_list VALUES (1, 1, 'Firefox', 'firefox', 'https://firefox.com',
            'firefox.png', 'firefox_big.png', 'Gecko', 'Mozilla Foundation', 'mozilla_foundation',
            'https://mozilla.org', '130');
        INSERT INTO udger_client_class VALUES (1, 'Browser', 'browser', 1);
        INSERT INTO udger_crawler_list VALUES (5, 'Googlebot/2.1', 'Googlebot/2.1', '2.1', '2',
            '2024-01-01', 'yes', 'Googlebot', 'googlebot', 'https://google.com', 'bot.png',
            'Google Inc.', 'google_inc', 'https://google.com', 1);
        INSERT INTO udger_crawler_class VALUES (1, 'Search engine bot', 'search_engine_bot');
        INSERT INTO udger_devicename_regex VALUES (7, 'android', '-all-', '/; ([^;]+) build/si', 2);
        INSERT INTO udger_devicename_regex VALUES (8, 'android', 'android_10', '/sm-/si', 1);
        INSERT INTO udger_devicename_regex VALUES (9, 'ios', '-all-', '/iphone/si', 1);
        INSERT INTO udger_devicename_list VALUES (7, 3, 'sm-g960f', 'Galaxy S9', 3);
        INSERT INTO udger_devicename_brand VALUES (3, 'Samsung', 'samsung', 'https://samsung.com',
            'samsung.png', NULL);
    ";

    fn store() -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        SqliteStore::from_connection(conn)
    }

    #[test]
    fn test_rule_table_ordered_by_sequence() {
        let rules = store().load_rule_table(Category::Client).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].regstring, "/mozilla/si");
        assert_eq!(rules[1].id, 1);
        assert_eq!(rules[1].word_id, Some(10));
        assert!(store().load_rule_table(Category::Os).unwrap().is_empty());
    }

    #[test]
    fn test_vocabulary_pruned_and_lowercased() {
        let words = store()
            .load_vocabulary(Category::Client, &HashSet::from([10]))
            .unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[&10], "firefox");
    }

    #[test]
    fn test_client_lookup_aliases_columns() {
        let row = store()
            .fetch_first_row(&Lookup::Client { rule_id: 1 })
            .unwrap()
            .unwrap();
        assert_eq!(row.get("ua_family"), "Firefox");
        assert_eq!(row.get("ua_class_code"), "browser");
        assert_eq!(row.get("ua_engine"), "Gecko");
        assert_eq!(row.get_i64("class_id"), 1);
        assert_eq!(
            row.get("ua_family_info_url"),
            "https://udger.com/resources/ua-list/browser-detail?browser=Firefox"
        );
    }

    #[test]
    fn test_crawler_lookup() {
        let store = store();
        let row = store
            .fetch_first_row(&Lookup::Crawler { ua: "Googlebot/2.1" })
            .unwrap()
            .unwrap();
        assert_eq!(row.get("ua_class"), "Crawler");
        assert_eq!(row.get("crawler_category_code"), "search_engine_bot");
        assert_eq!(row.get("ua_family_icon"), "bot.png");
        assert!(!row.contains("ua_family_icon_big"));

        assert!(store
            .fetch_first_row(&Lookup::Crawler { ua: "Mozilla/5.0" })
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_brand_listing_and_device_name() {
        let store = store();
        let rows = store
            .fetch_rows(&Listing::DeviceBrandRegexes {
                os_family_code: "android",
                os_code: "android_10",
            })
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.get_i64("id")).collect();
        assert_eq!(ids, vec![8, 7]);

        let name = store
            .fetch_first_row(&Lookup::DeviceName {
                regex_id: 7,
                code: "sm-g960f",
            })
            .unwrap()
            .unwrap();
        assert_eq!(name.get("device_marketname"), "Galaxy S9");
        assert_eq!(name.get("device_brand_code"), "samsung");
        assert!(!name.contains("device_brand_icon_big"));
    }

    #[test]
    fn test_open_in_memory_copies_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(file.path()).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
        }
        let store = SqliteStore::open_in_memory(file.path()).unwrap();
        file.close().unwrap();

        assert!(store.is_valid());
        let row = store
            .fetch_first_row(&Lookup::Client { rule_id: 1 })
            .unwrap()
            .unwrap();
        assert_eq!(row.get("ua_family"), "Firefox");
        assert_eq!(row.get("ua_family_icon_big"), "firefox_big.png");
        assert_eq!(store.load_rule_table(Category::Client).unwrap().len(), 2);
    }

    #[test]
    fn test_open_in_memory_missing_file() {
        let err = SqliteStore::open_in_memory("/nonexistent/udger.db").unwrap_err();
        assert!(matches!(err, ClassifierError::Storage(_)), "got {err:?}");
    }

    #[test]
    fn test_read_only_file_store() {
        let file = tempfile::NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(file.path()).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
        }
        let store = SqliteStore::open(file.path()).unwrap();
        assert!(store.is_valid());

        let conn = store.conn().unwrap();
        assert!(conn
            .execute("DELETE FROM udger_client_regex", [])
            .is_err());
    }

    #[test]
    fn test_missing_table_is_storage_error() {
        let err = store()
            .fetch_first_row(&Lookup::DeviceClassById { id: 1 })
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Storage(_)));
    }
}
