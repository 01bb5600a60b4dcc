//! Form data
//!
//! Ordered name/value entries collected from a form, as `new FormData(form)`
//! does, or built by hand.

use crate::{DomTree, NodeId};

/// Uploaded file entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    pub filename: String,
    pub content: Vec<u8>,
    pub mime_type: String,
}

/// Form data value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormDataValue {
    Text(String),
    File(FormFile),
}

impl FormDataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::File(_) => None,
        }
    }
}

/// Form data set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormDataValue)>,
}

impl FormData {
    /// Create empty form data
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the successful controls of `form`
    pub fn from_form(tree: &DomTree, form: NodeId) -> Self {
        let mut data = Self::new();
        for control in tree.descendants(form) {
            let Some(elem) = tree.element(control) else {
                continue;
            };
            let Some(name) = elem.get_attr("name").filter(|n| !n.is_empty()) else {
                continue;
            };
            if elem.has_attr("disabled") {
                continue;
            }
            match elem.tag.as_str() {
                "input" => {
                    let kind = elem.get_attr("type").unwrap_or("text").to_ascii_lowercase();
                    match kind.as_str() {
                        "submit" | "button" | "reset" | "image" | "file" => {}
                        "checkbox" | "radio" => {
                            if tree.checked(control) {
                                data.append(name, tree.value(control));
                            }
                        }
                        _ => data.append(name, tree.value(control)),
                    }
                }
                "textarea" => data.append(name, tree.value(control)),
                "select" if elem.has_attr("multiple") => {
                    for option in tree.descendants(control) {
                        if tree.tag_name(option) == Some("option") && tree.has_attr(option, "selected") {
                            data.append(name, tree.value(option));
                        }
                    }
                }
                "select" => data.append(name, tree.value(control)),
                _ => {}
            }
        }
        data
    }

    /// Append a text value
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), FormDataValue::Text(value.into())));
    }

    /// Append a file
    pub fn append_file(
        &mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content: Vec<u8>,
        mime_type: impl Into<String>,
    ) {
        self.entries.push((
            name.into(),
            FormDataValue::File(FormFile {
                filename: filename.into(),
                content,
                mime_type: mime_type.into(),
            }),
        ));
    }

    /// Replace all entries named `name` with a single text value
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = FormDataValue::Text(value.into());
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(n, _)| {
                    let keep = index <= first || n != name;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// First text value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .find_map(|(_, v)| v.as_text())
    }

    /// All text values by name
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .filter_map(|(_, v)| v.as_text())
            .collect()
    }

    /// Check if key exists
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Delete all entries with name
    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// Iterate over entries
    pub fn entries(&self) -> impl Iterator<Item = (&str, &FormDataValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Text entries only
    pub fn text_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(n, v)| v.as_text().map(|t| (n.as_str(), t)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fragment;

    #[test]
    fn test_set_replaces_all() {
        let mut data = FormData::new();
        data.append("a", "1");
        data.append("b", "2");
        data.append("a", "3");
        data.set("a", "x");
        assert_eq!(data.get_all("a"), vec!["x"]);
        assert_eq!(data.len(), 2);
        data.set("c", "y");
        assert_eq!(data.get("c"), Some("y"));
    }

    #[test]
    fn test_from_form_successful_controls() {
        let mut tree = DomTree::new();
        let form = parse_fragment(
            &mut tree,
            r#"<form>
                <input name="title" value="Hello">
                <input name="off" value="x" disabled>
                <input type="checkbox" name="agree" value="yes" checked>
                <input type="checkbox" name="spam" value="yes">
                <input type="radio" name="size" value="s">
                <input type="radio" name="size" value="m" checked>
                <input type="submit" name="go" value="Go">
                <textarea name="body">text</textarea>
                <select name="kind"><option value="a">A</option><option value="b" selected>B</option></select>
                <input value="anonymous">
            </form>"#,
        )
        .unwrap();
        let data = FormData::from_form(&tree, form);
        let entries: Vec<(&str, &str)> = data.text_entries().collect();
        assert_eq!(
            entries,
            vec![
                ("title", "Hello"),
                ("agree", "yes"),
                ("size", "m"),
                ("body", "text"),
                ("kind", "b"),
            ]
        );
    }

    #[test]
    fn test_file_entries_not_text() {
        let mut data = FormData::new();
        data.append_file("upload", "a.txt", b"abc".to_vec(), "text/plain");
        assert!(data.has("upload"));
        assert_eq!(data.get("upload"), None);
        assert_eq!(data.text_entries().count(), 0);
    }
}
