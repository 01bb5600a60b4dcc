//! Request options
//!
//! The fetch option set an [`ApiClient`](crate::ApiClient) applies to every
//! request, with the defaults browsers-facing Cotomy code expects.

/// `credentials` request option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// `redirect` request option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Redirect {
    #[default]
    Follow,
    Error,
    Manual,
}

/// `cache` request option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cache {
    Default,
    NoStore,
    Reload,
    #[default]
    NoCache,
    ForceCache,
    OnlyIfCached,
}

/// `referrerPolicy` request option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferrerPolicy {
    #[default]
    NoReferrer,
    NoReferrerWhenDowngrade,
    Origin,
    OriginWhenCrossOrigin,
    SameOrigin,
    StrictOrigin,
    StrictOriginWhenCrossOrigin,
    UnsafeUrl,
}

/// `mode` request option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Cors,
    NoCors,
    SameOrigin,
    Navigate,
}

impl Credentials {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Omit => "omit",
            Self::SameOrigin => "same-origin",
            Self::Include => "include",
        }
    }
}

impl Redirect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Error => "error",
            Self::Manual => "manual",
        }
    }
}

impl Cache {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::NoStore => "no-store",
            Self::Reload => "reload",
            Self::NoCache => "no-cache",
            Self::ForceCache => "force-cache",
            Self::OnlyIfCached => "only-if-cached",
        }
    }
}

impl ReferrerPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoReferrer => "no-referrer",
            Self::NoReferrerWhenDowngrade => "no-referrer-when-downgrade",
            Self::Origin => "origin",
            Self::OriginWhenCrossOrigin => "origin-when-cross-origin",
            Self::SameOrigin => "same-origin",
            Self::StrictOrigin => "strict-origin",
            Self::StrictOriginWhenCrossOrigin => "strict-origin-when-cross-origin",
            Self::UnsafeUrl => "unsafe-url",
        }
    }
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cors => "cors",
            Self::NoCors => "no-cors",
            Self::SameOrigin => "same-origin",
            Self::Navigate => "navigate",
        }
    }
}

/// API client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiOptions {
    /// Prefix for paths that do not start with a letter
    pub base_url: String,
    /// Default headers, in insertion order
    pub headers: Vec<(String, String)>,
    pub credentials: Credentials,
    pub redirect: Redirect,
    pub cache: Cache,
    pub referrer_policy: ReferrerPolicy,
    pub mode: Mode,
    pub keepalive: bool,
    /// Subresource integrity metadata
    pub integrity: String,
    /// Log each request and failure at debug level
    pub debug: bool,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            headers: Vec::new(),
            credentials: Credentials::default(),
            redirect: Redirect::default(),
            cache: Cache::default(),
            referrer_policy: ReferrerPolicy::default(),
            mode: Mode::default(),
            keepalive: true,
            integrity: String::new(),
            debug: false,
        }
    }
}

impl ApiOptions {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ApiOptions::default();
        assert_eq!(options.credentials.as_str(), "same-origin");
        assert_eq!(options.redirect.as_str(), "follow");
        assert_eq!(options.cache.as_str(), "no-cache");
        assert_eq!(options.referrer_policy.as_str(), "no-referrer");
        assert_eq!(options.mode.as_str(), "cors");
        assert!(options.keepalive);
        assert!(options.integrity.is_empty());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let options = ApiOptions {
            headers: vec![("Content-Type".into(), "application/json".into())],
            ..Default::default()
        };
        assert_eq!(options.header("content-type"), Some("application/json"));
        assert_eq!(options.header("accept"), None);
    }
}
