//! Window configuration

use chrono::{FixedOffset, Local, Offset, Utc};
use cotomy_net::ApiOptions;

/// Per-window settings
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Offset used for local date-time conversions
    pub utc_offset: FixedOffset,
    /// BCP 47 tag used by number renderers
    pub locale: String,
    /// ISO 4217 code used by the currency renderer
    pub currency: String,
    /// Options for API clients created by forms
    pub api: ApiOptions,
}

impl Default for WindowConfig {
    fn default() -> Self {
        let locale = locale_from_env().unwrap_or_else(|| "en-US".to_string());
        let currency = currency_for_locale(&locale).to_string();
        Self {
            utc_offset: Local::now().offset().fix(),
            locale,
            currency,
            api: ApiOptions::default(),
        }
    }
}

impl WindowConfig {
    /// UTC, `en-US`, `USD`; independent of the host environment
    pub fn utc() -> Self {
        Self {
            utc_offset: Utc.fix(),
            locale: "en-US".to_string(),
            currency: "USD".to_string(),
            api: ApiOptions::default(),
        }
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_ascii_uppercase();
        self
    }

    pub fn with_api(mut self, api: ApiOptions) -> Self {
        self.api = api;
        self
    }
}

/// `LANG=ja_JP.UTF-8` becomes `ja-JP`
fn locale_from_env() -> Option<String> {
    let lang = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .ok()?;
    let tag = lang.split('.').next()?.replace('_', "-");
    if tag.is_empty() || tag == "C" || tag == "POSIX" {
        return None;
    }
    Some(tag)
}

fn currency_for_locale(locale: &str) -> &'static str {
    let region = locale.rsplit('-').next().unwrap_or_default().to_ascii_uppercase();
    match region.as_str() {
        "JP" => "JPY",
        "GB" => "GBP",
        "CN" => "CNY",
        "KR" => "KRW",
        "IN" => "INR",
        "CA" => "CAD",
        "AU" => "AUD",
        "CH" => "CHF",
        "DE" | "FR" | "IT" | "ES" | "NL" | "BE" | "AT" | "IE" | "FI" | "PT" | "GR" => "EUR",
        _ => "USD",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_for_locale() {
        assert_eq!(currency_for_locale("ja-JP"), "JPY");
        assert_eq!(currency_for_locale("de-DE"), "EUR");
        assert_eq!(currency_for_locale("en-US"), "USD");
        assert_eq!(currency_for_locale("en"), "USD");
    }

    #[test]
    fn test_utc_config() {
        let config = WindowConfig::utc().with_currency("eur");
        assert_eq!(config.utc_offset.local_minus_utc(), 0);
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.locale, "en-US");
    }
}
