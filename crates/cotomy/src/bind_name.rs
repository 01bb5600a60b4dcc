//! Nested property naming for fill and bind

/// Builds the field name of a nested property
pub trait BindNameGenerator {
    fn create(&self, name: &str, parent: Option<&str>) -> String;
}

/// `parent[name]`
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketBindNameGenerator;

impl BindNameGenerator for BracketBindNameGenerator {
    fn create(&self, name: &str, parent: Option<&str>) -> String {
        match parent {
            Some(p) if !p.is_empty() => format!("{p}[{name}]"),
            _ => name.to_string(),
        }
    }
}

/// `parent.name`
#[derive(Debug, Clone, Copy, Default)]
pub struct DotBindNameGenerator;

impl BindNameGenerator for DotBindNameGenerator {
    fn create(&self, name: &str, parent: Option<&str>) -> String {
        match parent {
            Some(p) if !p.is_empty() => format!("{p}.{name}"),
            _ => name.to_string(),
        }
    }
}
