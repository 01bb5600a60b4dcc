//! View renderer
//!
//! Writes response fields into `[data-cotomy-bind]` elements below a root
//! element. `data-cotomy-bindtype` selects a formatter: `mail`, `tel`, `url`
//! build links, `number` and `currency` group digits for the window locale,
//! `utc` converts a server timestamp to the window offset and formats it with
//! `data-cotomy-format` (default `YYYY/MM/DD HH:mm`). Any other element gets
//! the plain text of the value.

use std::collections::HashMap;
use std::rc::Rc;

use cotomy_net::ApiResponse;
use serde_json::{Map, Value};

use crate::bind_name::{BindNameGenerator, BracketBindNameGenerator};
use crate::element::quoted;
use crate::{CotomyElement, CotomyError, CotomyResult, DebugFeature, datetime};

/// Custom formatter for one bind type
pub type Renderer = Rc<dyn Fn(&CotomyElement, &Value) -> CotomyResult<()>>;

const DEFAULT_UTC_FORMAT: &str = "YYYY/MM/DD HH:mm";

/// Text of a JSON value; `null` is empty and strings are unquoted
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Loose truthiness of a JSON value
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Response-to-view binder
pub struct ViewRenderer {
    element: CotomyElement,
    generator: Rc<dyn BindNameGenerator>,
    renderers: HashMap<String, Renderer>,
    locale: String,
    currency: String,
}

impl ViewRenderer {
    /// Renderer over `element` with bracketed names and the window's locale
    pub fn new(element: CotomyElement) -> Self {
        Self::with_generator(element, Rc::new(BracketBindNameGenerator))
    }

    pub fn with_generator(element: CotomyElement, generator: Rc<dyn BindNameGenerator>) -> Self {
        let config = element.window().config();
        let locale = config.locale.clone();
        let currency = config.currency.clone();
        Self {
            element,
            generator,
            renderers: HashMap::new(),
            locale,
            currency,
        }
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_ascii_uppercase();
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Register `renderer` for `bind_type`, replacing a built-in one
    pub fn renderer(
        &mut self,
        bind_type: &str,
        renderer: impl Fn(&CotomyElement, &Value) -> CotomyResult<()> + 'static,
    ) -> &mut Self {
        self.renderers.insert(bind_type.to_ascii_lowercase(), Rc::new(renderer));
        self
    }

    /// Bind the object body of `response`
    pub fn apply(&self, response: &ApiResponse) -> CotomyResult<()> {
        if !response.available() {
            return Err(CotomyError::ResponseUnavailable);
        }
        let object = response.object(Value::Object(Map::new()))?;
        self.apply_value(&object)
    }

    /// Bind the fields of `value`, flattening nested objects
    pub fn apply_value(&self, value: &Value) -> CotomyResult<()> {
        self.bind(value, None)
    }

    fn bind(&self, value: &Value, parent: Option<&str>) -> CotomyResult<()> {
        let Value::Object(map) = value else {
            return Ok(());
        };
        for (key, value) in map {
            let name = self.generator.create(key, parent);
            if value.is_object() {
                self.bind(value, Some(&name))?;
                continue;
            }
            let selector = format!("[data-cotomy-bind={} i]", quoted(&name));
            for element in self.element.find(&selector)? {
                if self.element.window().debugging(DebugFeature::Bind) {
                    tracing::debug!("Binding data to element [data-cotomy-bind=\"{}\"]: {}", name, value);
                }
                self.render(&element, value)?;
            }
        }
        Ok(())
    }

    fn render(&self, element: &CotomyElement, value: &Value) -> CotomyResult<()> {
        let bind_type = element
            .attribute("data-cotomy-bindtype")
            .map(|t| t.to_ascii_lowercase())
            .unwrap_or_default();
        if let Some(renderer) = self.renderers.get(&bind_type) {
            return renderer(element, value);
        }
        match bind_type.as_str() {
            "mail" => link(element, value, "mailto:", false),
            "tel" => link(element, value, "tel:", false),
            "url" => link(element, value, "", true),
            "number" => {
                element.clear();
                if is_truthy(value) {
                    element.set_text(&format_number(value, &self.locale, None));
                }
                Ok(())
            }
            "currency" => {
                element.clear();
                if is_truthy(value) {
                    element.set_text(&format_currency(value, &self.locale, &self.currency));
                }
                Ok(())
            }
            "utc" => {
                element.clear();
                let parsed = value.as_str().and_then(datetime::parse_utc);
                if let Some(parsed) = parsed {
                    let local = parsed.with_timezone(&element.window().config().utc_offset);
                    let format = element
                        .attribute("data-cotomy-format")
                        .unwrap_or_else(|| DEFAULT_UTC_FORMAT.to_string());
                    element.set_text(&datetime::format_tokens(&local, &format));
                }
                Ok(())
            }
            _ => {
                element.set_text(&value_text(value));
                Ok(())
            }
        }
    }
}

fn link(element: &CotomyElement, value: &Value, scheme: &str, new_tab: bool) -> CotomyResult<()> {
    element.clear();
    if !is_truthy(value) {
        return Ok(());
    }
    let text = value_text(value);
    let anchor = element.window().create("<a></a>")?;
    anchor.set_attribute("href", &format!("{scheme}{text}")).set_text(&text);
    if new_tab {
        anchor.set_attribute("target", "_blank");
    }
    element.append(&anchor)?;
    Ok(())
}

/// (group separator, decimal separator) for a BCP 47 tag
fn separators(locale: &str) -> (&'static str, &'static str) {
    let language = locale.split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase();
    match language.as_str() {
        "de" | "es" | "it" | "nl" | "pt" | "id" | "tr" | "da" => (".", ","),
        "fr" | "ru" | "pl" | "cs" | "sv" | "fi" | "nb" | "uk" => ("\u{a0}", ","),
        _ => (",", "."),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Grouped decimal; `fraction` fixes the fraction digits, otherwise up to three are kept
fn format_number(value: &Value, locale: &str, fraction: Option<usize>) -> String {
    let Some(number) = as_number(value).filter(|n| n.is_finite()) else {
        return value_text(value);
    };
    let (group, decimal) = separators(locale);
    let digits = fraction.unwrap_or(3);
    let fixed = format!("{:.*}", digits, number.abs());
    let (integer, mut frac) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (fixed.clone(), String::new()),
    };
    if fraction.is_none() {
        while frac.ends_with('0') {
            frac.pop();
        }
    }

    let mut grouped = String::new();
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push_str(group);
        }
        grouped.push(c);
    }
    let sign = if number < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}{decimal}{frac}")
    }
}

fn currency_symbol(currency: &str) -> (&str, usize) {
    match currency {
        "USD" => ("$", 2),
        "EUR" => ("€", 2),
        "GBP" => ("£", 2),
        "JPY" => ("¥", 0),
        "CNY" => ("CN¥", 2),
        "KRW" => ("₩", 0),
        "INR" => ("₹", 2),
        "CAD" => ("CA$", 2),
        "AUD" => ("A$", 2),
        other => (other, 2),
    }
}

fn format_currency(value: &Value, locale: &str, currency: &str) -> String {
    let (symbol, digits) = currency_symbol(currency);
    let amount = format_number(value, locale, Some(digits));
    let (sign, amount) = match amount.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", amount),
    };
    if separators(locale).1 == "," {
        format!("{sign}{amount}\u{a0}{symbol}")
    } else if symbol.chars().all(|c| c.is_ascii_uppercase()) {
        format!("{sign}{symbol}\u{a0}{amount}")
    } else {
        format!("{sign}{symbol}{amount}")
    }
}
