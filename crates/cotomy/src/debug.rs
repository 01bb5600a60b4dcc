//! Debug settings
//!
//! Per-feature switches for verbose diagnostics. A feature is enabled when
//! its own flag is set or the global flag is on. `COTOMY_DEBUG` seeds the
//! flags: `all`, or a comma list of feature names.

use std::collections::HashMap;

/// Diagnostic area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugFeature {
    Api,
    Fill,
    Bind,
    FormData,
    Html,
    Page,
    FormLoad,
}

impl DebugFeature {
    pub const ALL: [DebugFeature; 7] = [
        DebugFeature::Api,
        DebugFeature::Fill,
        DebugFeature::Bind,
        DebugFeature::FormData,
        DebugFeature::Html,
        DebugFeature::Page,
        DebugFeature::FormLoad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DebugFeature::Api => "api",
            DebugFeature::Fill => "fill",
            DebugFeature::Bind => "bind",
            DebugFeature::FormData => "formdata",
            DebugFeature::Html => "html",
            DebugFeature::Page => "page",
            DebugFeature::FormLoad => "formload",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
    }
}

/// Debug flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugSettings {
    global: Option<bool>,
    features: HashMap<DebugFeature, bool>,
}

impl DebugSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `COTOMY_DEBUG`
    pub fn from_env() -> Self {
        match std::env::var("COTOMY_DEBUG") {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::default(),
        }
    }

    /// Parse `all` or a comma list of feature names; unknown names are ignored
    pub fn parse(value: &str) -> Self {
        let mut settings = Self::default();
        for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name.eq_ignore_ascii_case("all") || name.eq_ignore_ascii_case("true") {
                settings.enable_all();
            } else if let Some(feature) = DebugFeature::parse(name) {
                settings.enable(feature);
            } else {
                tracing::warn!("Unknown debug feature: {}", name);
            }
        }
        settings
    }

    /// Whether `feature` (or, with `None`, the global flag) is on
    pub fn is_enabled(&self, feature: Option<DebugFeature>) -> bool {
        let global = self.global == Some(true);
        match feature {
            Some(f) => global || self.features.get(&f) == Some(&true),
            None => global,
        }
    }

    pub fn enable(&mut self, feature: DebugFeature) {
        self.features.insert(feature, true);
    }

    pub fn disable(&mut self, feature: DebugFeature) {
        self.features.insert(feature, false);
    }

    pub fn enable_all(&mut self) {
        self.global = Some(true);
    }

    pub fn disable_all(&mut self) {
        self.global = Some(false);
    }

    /// Forget one feature flag, or the global flag with `None`
    pub fn clear(&mut self, feature: Option<DebugFeature>) {
        match feature {
            Some(f) => {
                self.features.remove(&f);
            }
            None => self.global = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_and_global() {
        let mut settings = DebugSettings::new();
        assert!(!settings.is_enabled(Some(DebugFeature::Fill)));

        settings.enable(DebugFeature::Fill);
        assert!(settings.is_enabled(Some(DebugFeature::Fill)));
        assert!(!settings.is_enabled(Some(DebugFeature::Api)));
        assert!(!settings.is_enabled(None));

        settings.enable_all();
        assert!(settings.is_enabled(Some(DebugFeature::Api)));
        settings.disable(DebugFeature::Api);
        assert!(settings.is_enabled(Some(DebugFeature::Api)));

        settings.clear(None);
        assert!(!settings.is_enabled(Some(DebugFeature::Api)));
    }

    #[test]
    fn test_parse() {
        let settings = DebugSettings::parse("api, formload,bogus");
        assert!(settings.is_enabled(Some(DebugFeature::Api)));
        assert!(settings.is_enabled(Some(DebugFeature::FormLoad)));
        assert!(!settings.is_enabled(Some(DebugFeature::Bind)));

        assert!(DebugSettings::parse("all").is_enabled(Some(DebugFeature::Html)));
    }
}
