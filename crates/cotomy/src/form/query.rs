//! Query form

use std::any::Any;
use std::ops::Deref;

use cotomy_net::LocalFuture;
use url::form_urlencoded;

use super::{Form, bind_submit};
use crate::{CotomyElement, CotomyResult, ElementWrap};

/// GET form that navigates to its action with the inputs merged into the query
#[derive(Debug, Clone)]
pub struct QueryForm {
    element: CotomyElement,
}

impl ElementWrap for QueryForm {
    fn wrap(element: CotomyElement) -> Self {
        Self { element }
    }
}

impl Deref for QueryForm {
    type Target = CotomyElement;

    fn deref(&self) -> &CotomyElement {
        &self.element
    }
}

impl QueryForm {
    /// Target URL: the action merged with the current input values
    pub fn target_url(&self) -> CotomyResult<String> {
        let action = self.action_url();
        let (path, query) = match action.split_once('?') {
            Some((p, q)) => (p.to_string(), q.to_string()),
            None => (action.clone(), String::new()),
        };

        let mut params: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect();

        for input in self.element.find("[name]")? {
            let Some(name) = input.attribute("name").filter(|n| !n.is_empty()) else {
                continue;
            };
            let value = input.value();
            params.retain(|(k, _)| *k != name);
            if !value.is_empty() {
                params.push((name, value));
            }
        }

        let query: String = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&params)
            .finish();
        Ok(format!("{path}?{query}"))
    }
}

impl Form for QueryForm {
    fn element(&self) -> &CotomyElement {
        &self.element
    }

    fn method(&self) -> String {
        "get".to_string()
    }

    /// The `action` attribute, or the current path and query
    fn action_url(&self) -> String {
        if let Some(action) = self.element.attribute("action") {
            return action;
        }
        let location = self.element.window().location();
        match url::Url::parse(&location) {
            Ok(url) => match url.query() {
                Some(q) => format!("{}?{}", url.path(), q),
                None => url.path().to_string(),
            },
            Err(_) => location,
        }
    }

    fn submit(&self) -> LocalFuture<'_, CotomyResult<()>> {
        Box::pin(async move {
            let url = self.target_url()?;
            self.element.window().navigate(&url);
            Ok(())
        })
    }

    fn initialize(&self) -> CotomyResult<()> {
        bind_submit(self);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CotomyWindow, WindowConfig};
    use cotomy_net::mock::MockTransport;
    use std::rc::Rc;

    #[test]
    fn test_merge_query() {
        let window = CotomyWindow::with_config(
            "https://example.com/users?page=2",
            Rc::new(MockTransport::new()),
            WindowConfig::utc(),
        );
        let form: QueryForm = window
            .create_as(
                r#"<form action="/users?page=2&sort=name">
                    <input name="q" value="a b">
                    <input name="sort" value="">
                </form>"#,
            )
            .unwrap();
        assert_eq!(form.target_url().unwrap(), "/users?page=2&q=a+b");
    }

    #[test]
    fn test_submit_navigates() {
        let window = CotomyWindow::with_config(
            "https://example.com/search?x=1",
            Rc::new(MockTransport::new()),
            WindowConfig::utc(),
        );
        let form: QueryForm = window.create_as(r#"<form><input name="q" value="rust"></form>"#).unwrap();
        window.append(&form).unwrap();
        form.initialize().unwrap();
        form.initialize().unwrap();
        assert_eq!(form.handler_count("submit"), 1);

        form.trigger("submit");
        window.run_pending();
        assert_eq!(window.location(), "https://example.com/search?x=1&q=rust");
    }
}
