//! Classification result record.

use serde::{Deserialize, Serialize};

use crate::store::Row;

/// Flat classification record. Every field is a string and defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct UaResult {
    pub ua_string: String,

    // Client
    pub ua: String,
    pub ua_class: String,
    pub ua_class_code: String,
    pub ua_engine: String,
    pub ua_version: String,
    pub ua_version_major: String,
    pub ua_uptodate_current_version: String,
    pub ua_family: String,
    pub ua_family_code: String,
    pub ua_family_homepage: String,
    pub ua_family_icon: String,
    pub ua_family_icon_big: String,
    pub ua_family_info_url: String,
    pub ua_family_vendor: String,
    pub ua_family_vendor_code: String,
    pub ua_family_vendor_homepage: String,

    // Crawler
    pub crawler_category: String,
    pub crawler_category_code: String,
    pub crawler_last_seen: String,
    pub crawler_respect_robotstxt: String,

    // Operating system
    pub os: String,
    pub os_code: String,
    pub os_homepage: String,
    pub os_icon: String,
    pub os_icon_big: String,
    pub os_info_url: String,
    pub os_family: String,
    pub os_family_code: String,
    pub os_family_vendor: String,
    pub os_family_vendor_code: String,
    pub os_family_vendor_homepage: String,

    // Device class
    pub device_class: String,
    pub device_class_code: String,
    pub device_class_icon: String,
    pub device_class_icon_big: String,
    pub device_class_info_url: String,

    // Device brand
    pub device_marketname: String,
    pub device_brand: String,
    pub device_brand_code: String,
    pub device_brand_homepage: String,
    pub device_brand_icon: String,
    pub device_brand_icon_big: String,
    pub device_brand_info_url: String,

    // Client hints, echoed after normalization
    pub sec_ch_ua: String,
    pub sec_ch_ua_full_version: String,
    pub sec_ch_ua_full_version_list: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_model: String,
    pub sec_ch_ua_platform: String,
    pub sec_ch_ua_platform_version: String,
}

macro_rules! copy_columns {
    ($self:ident, $row:ident, [$($field:ident),+ $(,)?]) => {
        $( $self.$field = $row.get(stringify!($field)).to_string(); )+
    };
}

impl UaResult {
    /// Client and crawler columns of a client or crawler row.
    pub(crate) fn fill_client(&mut self, row: &Row) {
        copy_columns!(
            self,
            row,
            [
                ua,
                ua_class,
                ua_class_code,
                ua_engine,
                ua_version,
                ua_version_major,
                ua_uptodate_current_version,
                ua_family,
                ua_family_code,
                ua_family_homepage,
                ua_family_icon,
                ua_family_icon_big,
                ua_family_info_url,
                ua_family_vendor,
                ua_family_vendor_code,
                ua_family_vendor_homepage,
                crawler_category,
                crawler_category_code,
                crawler_last_seen,
                crawler_respect_robotstxt,
            ]
        );
    }

    pub(crate) fn fill_os(&mut self, row: &Row) {
        copy_columns!(
            self,
            row,
            [
                os,
                os_code,
                os_homepage,
                os_icon,
                os_icon_big,
                os_info_url,
                os_family,
                os_family_code,
                os_family_vendor,
                os_family_vendor_code,
                os_family_vendor_homepage,
            ]
        );
    }

    pub(crate) fn fill_device_class(&mut self, row: &Row) {
        copy_columns!(
            self,
            row,
            [
                device_class,
                device_class_code,
                device_class_icon,
                device_class_icon_big,
                device_class_info_url,
            ]
        );
    }

    /// Brand columns except the info URL, whose derivation depends on the path.
    pub(crate) fn fill_device_brand(&mut self, row: &Row) {
        copy_columns!(
            self,
            row,
            [
                device_marketname,
                device_brand,
                device_brand_code,
                device_brand_homepage,
                device_brand_icon,
                device_brand_icon_big,
            ]
        );
    }

    pub fn is_crawler(&self) -> bool {
        self.ua_class_code == "crawler"
    }

    pub fn is_unrecognized(&self) -> bool {
        self.ua_class_code == "unrecognized"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_empty() {
        let result = UaResult::default();
        let json = serde_json::to_value(&result).unwrap();
        let fields = json.as_object().unwrap();
        assert!(fields.len() > 50);
        assert!(fields.values().all(|v| v == ""));
    }

    #[test]
    fn test_fill_os_copies_columns() {
        let row = Row::new()
            .with("os", "Windows 10")
            .with("os_family_code", "windows")
            .with("ua_family", "ignored");
        let mut result = UaResult::default();
        result.fill_os(&row);

        assert_eq!(result.os, "Windows 10");
        assert_eq!(result.os_family_code, "windows");
        assert_eq!(result.os_icon, "");
        assert_eq!(result.ua_family, "");
    }

    #[test]
    fn test_fill_client_overwrites_with_empty() {
        let mut result = UaResult {
            ua_engine: "stale".to_string(),
            ..Default::default()
        };
        result.fill_client(&Row::new().with("ua_family", "Firefox"));
        assert_eq!(result.ua_family, "Firefox");
        assert_eq!(result.ua_engine, "");
    }

    #[test]
    fn test_class_predicates() {
        let crawler = UaResult {
            ua_class_code: "crawler".to_string(),
            ..Default::default()
        };
        assert!(crawler.is_crawler());
        assert!(!crawler.is_unrecognized());
    }
}
