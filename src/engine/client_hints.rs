//! Client-hints overlay.
//!
//! Runs after the user agent stages (never for crawlers) and fills the
//! result from the structured `Sec-CH-UA*` fields. Four independent
//! sub-matches, a miss in one does not stop the others:
//!
//! - **client**: mobility-gated patterns over the full version list, or
//!   over the compact `Sec-CH-UA` value when no list was sent
//! - **OS**: platform-version-gated patterns over the platform name
//! - **device**: brand regex of the resolved OS, then model to brand name,
//!   then the brand row's device class
//! - **mobility fallback**: device class from the mobile flag alone when a
//!   client class is known but no device class was found

use tracing::debug;

use super::{display_name, major_version, Classifier};
use crate::error::Result;
use crate::matcher::pattern::first_group;
use crate::request::UaRequest;
use crate::result::UaResult;
use crate::store::{DataStore, Listing, Lookup};

/// Hint values after quote trimming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NormalizedHints {
    pub full_version: Option<String>,
    pub full_version_list: Option<String>,
    pub model: Option<String>,
    pub platform: Option<String>,
    pub platform_version: Option<String>,
    pub mobile: bool,
}

impl NormalizedHints {
    pub fn from_request(request: &UaRequest, quote: char) -> Self {
        let trim = |value: Option<&str>| value.map(|v| v.trim_matches(quote).to_string());
        Self {
            full_version: trim(request.sec_ch_ua_full_version()),
            full_version_list: trim(request.sec_ch_ua_full_version_list()),
            model: trim(request.sec_ch_ua_model()),
            platform: trim(request.sec_ch_ua_platform()),
            platform_version: trim(request.sec_ch_ua_platform_version()),
            mobile: request.sec_ch_ua_mobile() != Some("?0"),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Classifier {
    pub(super) fn apply_client_hints(
        &self,
        request: &UaRequest,
        store: &dyn DataStore,
        result: &mut UaResult,
    ) -> Result<()> {
        let hints = NormalizedHints::from_request(request, self.config.hint_quote);

        result.sec_ch_ua = request.sec_ch_ua().unwrap_or_default().to_string();
        result.sec_ch_ua_full_version = hints.full_version.clone().unwrap_or_default();
        result.sec_ch_ua_full_version_list = hints.full_version_list.clone().unwrap_or_default();
        result.sec_ch_ua_model = hints.model.clone().unwrap_or_default();
        result.sec_ch_ua_platform = hints.platform.clone().unwrap_or_default();
        result.sec_ch_ua_platform_version = hints.platform_version.clone().unwrap_or_default();
        result.sec_ch_ua_mobile = if hints.mobile { "1" } else { "0" }.to_string();

        self.hint_client(request, &hints, store, result)?;
        self.hint_os(&hints, store, result)?;
        self.hint_device(&hints, store, result)?;
        self.hint_mobility_device_class(&hints, store, result)
    }

    fn hint_client(
        &self,
        request: &UaRequest,
        hints: &NormalizedHints,
        store: &dyn DataStore,
        result: &mut UaResult,
    ) -> Result<()> {
        let version_list = non_empty(&hints.full_version_list);
        let Some(search) = version_list.or(request.sec_ch_ua().filter(|v| !v.is_empty())) else {
            return Ok(());
        };

        let rows = store.fetch_rows(&Listing::ClientHintClients {
            mobile: hints.mobile,
        })?;
        for row in &rows {
            let regstring = row.get("regstring");
            if regstring.is_empty() {
                continue;
            }
            let regex = self.patterns.get_regex(regstring)?;
            let Some(captures) = regex.captures(search) else {
                continue;
            };

            let captured = first_group(&captures);
            let (version, major) = if version_list.is_some() {
                (captured, major_version(captured))
            } else {
                (non_empty(&hints.full_version).unwrap_or(captured), captured)
            };

            result.fill_client(row);
            result.ua = display_name(&result.ua_family, version);
            result.ua_version = version.to_string();
            result.ua_version_major = major.to_string();
            debug!(family = %result.ua_family, "Client from client hints");
            break;
        }
        Ok(())
    }

    fn hint_os(
        &self,
        hints: &NormalizedHints,
        store: &dyn DataStore,
        result: &mut UaResult,
    ) -> Result<()> {
        let Some(platform) = hints.platform.as_deref() else {
            return Ok(());
        };

        let rows = store.fetch_rows(&Listing::ClientHintOses {
            platform_version: hints.platform_version.as_deref().unwrap_or_default(),
        })?;
        for row in &rows {
            let regstring = row.get("regstring");
            if regstring.is_empty() {
                continue;
            }
            if self.patterns.get_regex(regstring)?.is_match(platform) {
                result.fill_os(row);
                debug!(os = %result.os, "OS from client hints");
                break;
            }
        }
        Ok(())
    }

    fn hint_device(
        &self,
        hints: &NormalizedHints,
        store: &dyn DataStore,
        result: &mut UaResult,
    ) -> Result<()> {
        let Some(model) = non_empty(&hints.model) else {
            return Ok(());
        };
        if result.os_family_code.is_empty() {
            return Ok(());
        }

        let Some(brand_regex) = store.fetch_first_row(&Lookup::ClientHintBrandRegex {
            os_family_code: &result.os_family_code,
            os_code: &result.os_code,
        })?
        else {
            return Ok(());
        };
        let Some(name) = store.fetch_first_row(&Lookup::ClientHintDeviceName {
            regex_id: brand_regex.get_i64("id"),
            model,
        })?
        else {
            return Ok(());
        };

        result.fill_device_brand(&name);
        result.device_brand_info_url = match name.get("device_brand_info_url") {
            "" => format!(
                "{}{}",
                self.config.brand_info_url_prefix, result.device_brand_code
            ),
            stored => stored.to_string(),
        };

        if let Some(class) = store.fetch_first_row(&Lookup::DeviceClassById {
            id: name.get_i64("deviceclass_id"),
        })? {
            result.fill_device_class(&class);
        }
        Ok(())
    }

    fn hint_mobility_device_class(
        &self,
        hints: &NormalizedHints,
        store: &dyn DataStore,
        result: &mut UaResult,
    ) -> Result<()> {
        if !result.device_class.is_empty() || result.ua_class_code.is_empty() {
            return Ok(());
        }
        if let Some(class) = store.fetch_first_row(&Lookup::DeviceClassByMobile {
            mobile: hints.mobile,
        })? {
            result.fill_device_class(&class);
            debug!(mobile = hints.mobile, "Device class from mobility");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::dataset::Dataset;
    use crate::store::{BrandRegex, ClientHintClient, ClientHintOs, DeviceName, MemoryStore, Row};
    use std::sync::Arc;

    fn classifier() -> Classifier {
        let mut store = MemoryStore::new();
        store
            .add_client_hint_client(ClientHintClient {
                mobile: None,
                sequence: 1,
                row: Row::new()
                    .with("regstring", "/\"Google Chrome\";v=\"([0-9.]+)\"/si")
                    .with("ua_family", "Chrome")
                    .with("ua_class", "Browser")
                    .with("ua_class_code", "browser"),
            })
            .add_client_hint_os(ClientHintOs {
                platform_version: Some("10.0.0".into()),
                sequence: 1,
                row: Row::new()
                    .with("regstring", "/^windows$/si")
                    .with("os", "Windows 11")
                    .with("os_family_code", "windows"),
            })
            .add_client_hint_os(ClientHintOs {
                platform_version: None,
                sequence: 2,
                row: Row::new()
                    .with("regstring", "/^android$/si")
                    .with("os", "Android")
                    .with("os_family_code", "android")
                    .with("os_code", "android_13"),
            })
            .add_client_hint_brand_regex(BrandRegex {
                id: 9,
                os_family_code: "android".into(),
                os_code: "-all-".into(),
                regstring: String::new(),
                sequence: 1,
            })
            .add_client_hint_device_name(DeviceName {
                regex_id: 9,
                code: "Pixel 7".into(),
                row: Row::new()
                    .with("device_brand", "Google")
                    .with("device_brand_code", "google")
                    .with("device_brand_info_url", "https://example.com/google")
                    .with("deviceclass_id", "2"),
            })
            .add_device_class_by_id(2, Row::new().with("device_class", "Smartphone"))
            .set_mobility_device_class(false, Row::new().with("device_class", "Desktop"))
            .set_mobility_device_class(true, Row::new().with("device_class", "Smartphone"));

        Classifier::with_config(
            Arc::new(Dataset::from_store(store)),
            ClassifierConfig::uncached(),
        )
        .unwrap()
    }

    #[test]
    fn test_normalization() {
        let request = UaRequest::builder()
            .sec_ch_ua_platform("\"Windows\"")
            .sec_ch_ua_model("\"\"")
            .sec_ch_ua_mobile("?0")
            .build();
        let hints = NormalizedHints::from_request(&request, '"');

        assert_eq!(hints.platform.as_deref(), Some("Windows"));
        assert_eq!(hints.model.as_deref(), Some(""));
        assert_eq!(hints.full_version, None);
        assert!(!hints.mobile);

        let hints = NormalizedHints::from_request(&UaRequest::default(), '"');
        assert!(hints.mobile);
    }

    #[test]
    fn test_version_from_compact_hint_and_full_version() {
        let request = UaRequest::builder()
            .sec_ch_ua("\"Google Chrome\";v=\"120\", \"Not?A_Brand\";v=\"8\"")
            .sec_ch_ua_full_version("\"120.0.6099.129\"")
            .sec_ch_ua_mobile("?0")
            .build();
        let result = classifier().classify(&request).unwrap();

        assert_eq!(result.ua_version, "120.0.6099.129");
        assert_eq!(result.ua_version_major, "120");
        assert_eq!(result.ua, "Chrome 120.0.6099.129");
        assert_eq!(result.sec_ch_ua_full_version, "120.0.6099.129");
        assert_eq!(result.device_class, "Desktop");
    }

    #[test]
    fn test_os_gated_by_platform_version() {
        let windows = UaRequest::builder()
            .sec_ch_ua_platform("\"Windows\"")
            .sec_ch_ua_platform_version("\"10.0.0\"")
            .build();
        assert_eq!(classifier().classify(&windows).unwrap().os, "Windows 11");

        let old_windows = UaRequest::builder()
            .sec_ch_ua_platform("\"Windows\"")
            .sec_ch_ua_platform_version("\"0.3.0\"")
            .build();
        assert_eq!(classifier().classify(&old_windows).unwrap().os, "");
    }

    #[test]
    fn test_device_from_model() {
        let request = UaRequest::builder()
            .sec_ch_ua_platform("\"Android\"")
            .sec_ch_ua_model("\"Pixel 7\"")
            .sec_ch_ua_mobile("?1")
            .build();
        let result = classifier().classify(&request).unwrap();

        assert_eq!(result.os, "Android");
        assert_eq!(result.device_brand, "Google");
        assert_eq!(result.device_brand_info_url, "https://example.com/google");
        assert_eq!(result.device_class, "Smartphone");
        assert_eq!(result.sec_ch_ua_model, "Pixel 7");
        assert_eq!(result.sec_ch_ua_mobile, "1");
    }

    #[test]
    fn test_no_mobility_fallback_without_client_class() {
        let request = UaRequest::builder().sec_ch_ua_mobile("?0").build();
        let result = classifier().classify(&request).unwrap();
        assert_eq!(result.device_class, "");
        assert_eq!(result.sec_ch_ua_mobile, "0");
    }
}
