//! Classification request: a user agent string plus optional client hints.
//!
//! Requests are immutable values. Equality and hashing cover every field,
//! which makes a request usable directly as a result-cache key.

use serde::{Deserialize, Serialize};

/// Header carrying the user agent string.
pub const USER_AGENT: &str = "user-agent";
pub const SEC_CH_UA: &str = "sec-ch-ua";
pub const SEC_CH_UA_FULL_VERSION_LIST: &str = "sec-ch-ua-full-version-list";
pub const SEC_CH_UA_MOBILE: &str = "sec-ch-ua-mobile";
pub const SEC_CH_UA_FULL_VERSION: &str = "sec-ch-ua-full-version";
pub const SEC_CH_UA_PLATFORM: &str = "sec-ch-ua-platform";
pub const SEC_CH_UA_PLATFORM_VERSION: &str = "sec-ch-ua-platform-version";
pub const SEC_CH_UA_MODEL: &str = "sec-ch-ua-model";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct UaRequest {
    ua_string: Option<String>,
    sec_ch_ua: Option<String>,
    sec_ch_ua_full_version_list: Option<String>,
    sec_ch_ua_mobile: Option<String>,
    sec_ch_ua_full_version: Option<String>,
    sec_ch_ua_platform: Option<String>,
    sec_ch_ua_platform_version: Option<String>,
    sec_ch_ua_model: Option<String>,
}

impl UaRequest {
    pub fn builder() -> UaRequestBuilder {
        UaRequestBuilder::default()
    }

    /// Request carrying only a user agent string.
    pub fn from_ua(ua_string: impl Into<String>) -> Self {
        Self::builder().ua_string(ua_string).build()
    }

    /// Extract the recognized headers from a raw `Name: value` header block.
    ///
    /// Lines are split on any line break. Names are matched
    /// case-insensitively; values are trimmed. Unrecognized headers and lines
    /// without a `:` are ignored.
    pub fn from_header_block(block: &str) -> Self {
        Self::from_headers(
            block
                .lines()
                .filter_map(|line| line.split_once(':')),
        )
    }

    /// Extract the recognized headers from name/value pairs such as a `HashMap`.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut builder = Self::builder();
        for (name, value) in headers {
            builder = builder.header(name.as_ref(), value.as_ref());
        }
        builder.build()
    }

    pub fn ua_string(&self) -> Option<&str> {
        self.ua_string.as_deref()
    }

    pub fn sec_ch_ua(&self) -> Option<&str> {
        self.sec_ch_ua.as_deref()
    }

    pub fn sec_ch_ua_full_version_list(&self) -> Option<&str> {
        self.sec_ch_ua_full_version_list.as_deref()
    }

    pub fn sec_ch_ua_mobile(&self) -> Option<&str> {
        self.sec_ch_ua_mobile.as_deref()
    }

    pub fn sec_ch_ua_full_version(&self) -> Option<&str> {
        self.sec_ch_ua_full_version.as_deref()
    }

    pub fn sec_ch_ua_platform(&self) -> Option<&str> {
        self.sec_ch_ua_platform.as_deref()
    }

    pub fn sec_ch_ua_platform_version(&self) -> Option<&str> {
        self.sec_ch_ua_platform_version.as_deref()
    }

    pub fn sec_ch_ua_model(&self) -> Option<&str> {
        self.sec_ch_ua_model.as_deref()
    }
}

/// Builder for [`UaRequest`]. Only the recognized fields can be set.
#[derive(Debug, Clone, Default)]
pub struct UaRequestBuilder {
    request: UaRequest,
}

impl UaRequestBuilder {
    pub fn ua_string(mut self, value: impl Into<String>) -> Self {
        self.request.ua_string = Some(value.into());
        self
    }

    pub fn sec_ch_ua(mut self, value: impl Into<String>) -> Self {
        self.request.sec_ch_ua = Some(value.into());
        self
    }

    pub fn sec_ch_ua_full_version_list(mut self, value: impl Into<String>) -> Self {
        self.request.sec_ch_ua_full_version_list = Some(value.into());
        self
    }

    pub fn sec_ch_ua_mobile(mut self, value: impl Into<String>) -> Self {
        self.request.sec_ch_ua_mobile = Some(value.into());
        self
    }

    pub fn sec_ch_ua_full_version(mut self, value: impl Into<String>) -> Self {
        self.request.sec_ch_ua_full_version = Some(value.into());
        self
    }

    pub fn sec_ch_ua_platform(mut self, value: impl Into<String>) -> Self {
        self.request.sec_ch_ua_platform = Some(value.into());
        self
    }

    pub fn sec_ch_ua_platform_version(mut self, value: impl Into<String>) -> Self {
        self.request.sec_ch_ua_platform_version = Some(value.into());
        self
    }

    pub fn sec_ch_ua_model(mut self, value: impl Into<String>) -> Self {
        self.request.sec_ch_ua_model = Some(value.into());
        self
    }

    /// Set the field named by a header, if it is one of the recognized ones.
    pub fn header(self, name: &str, value: &str) -> Self {
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            USER_AGENT => self.ua_string(value),
            SEC_CH_UA => self.sec_ch_ua(value),
            SEC_CH_UA_FULL_VERSION_LIST => self.sec_ch_ua_full_version_list(value),
            SEC_CH_UA_MOBILE => self.sec_ch_ua_mobile(value),
            SEC_CH_UA_FULL_VERSION => self.sec_ch_ua_full_version(value),
            SEC_CH_UA_PLATFORM => self.sec_ch_ua_platform(value),
            SEC_CH_UA_PLATFORM_VERSION => self.sec_ch_ua_platform_version(value),
            SEC_CH_UA_MODEL => self.sec_ch_ua_model(value),
            _ => self,
        }
    }

    pub fn build(self) -> UaRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_builder_sets_fields() {
        let request = UaRequest::builder()
            .ua_string("Mozilla/5.0")
            .sec_ch_ua_mobile("?0")
            .sec_ch_ua_platform("\"Windows\"")
            .build();

        assert_eq!(request.ua_string(), Some("Mozilla/5.0"));
        assert_eq!(request.sec_ch_ua_mobile(), Some("?0"));
        assert_eq!(request.sec_ch_ua_platform(), Some("\"Windows\""));
        assert_eq!(request.sec_ch_ua_model(), None);
    }

    #[test]
    fn test_header_block_parsing() {
        let block = "Host: example.com\r\n\
                     User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64)\r\n\
                     SEC-CH-UA-MOBILE: ?0\r\n\
                     sec-ch-ua-platform: \"Windows\"\r\n\
                     garbage line\r\n";
        let request = UaRequest::from_header_block(block);

        assert_eq!(
            request.ua_string(),
            Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
        );
        assert_eq!(request.sec_ch_ua_mobile(), Some("?0"));
        assert_eq!(request.sec_ch_ua_platform(), Some("\"Windows\""));
        assert_eq!(request.sec_ch_ua(), None);
    }

    #[test]
    fn test_header_value_keeps_colons() {
        let request = UaRequest::from_header_block("sec-ch-ua: \"Chromium\";v=\"120\", \"A:B\";v=\"1\"");
        assert_eq!(
            request.sec_ch_ua(),
            Some("\"Chromium\";v=\"120\", \"A:B\";v=\"1\"")
        );
    }

    #[test]
    fn test_header_block_and_map_are_equal() {
        let block = "user-agent: Mozilla/5.0\nSec-CH-UA-Model: \"SM-G960F\"\nsec-ch-ua-platform-version: \"10.0.0\"";
        let map = HashMap::from([
            ("User-Agent".to_string(), "Mozilla/5.0".to_string()),
            ("sec-ch-ua-model".to_string(), "\"SM-G960F\"".to_string()),
            ("SEC-CH-UA-PLATFORM-VERSION".to_string(), "\"10.0.0\"".to_string()),
            ("accept".to_string(), "*/*".to_string()),
        ]);

        assert_eq!(UaRequest::from_header_block(block), UaRequest::from_headers(&map));
    }

    #[test]
    fn test_equal_requests_hash_equal() {
        use std::collections::HashSet;

        let a = UaRequest::from_ua("curl/8.0");
        let b = UaRequest::builder().ua_string("curl/8.0").build();
        let c = UaRequest::builder()
            .ua_string("curl/8.0")
            .sec_ch_ua_mobile("?1")
            .build();

        let set: HashSet<UaRequest> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
