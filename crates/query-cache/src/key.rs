use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a cached query: the logical endpoint plus its parameters.
///
/// Parameters are kept sorted, so the order they are added in does not
/// produce distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    endpoint: Cow<'static, str>,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(endpoint: impl Into<Cow<'static, str>>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Adds the parameter only when a value is present.
    pub fn param_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint)?;
        for (index, (name, value)) in self.params.iter().enumerate() {
            let separator = if index == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", separator, name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_order_does_not_matter() {
        let a = QueryKey::new("logs").param("limit", 10).param("level", "ERROR");
        let b = QueryKey::new("logs").param("level", "ERROR").param("limit", 10);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "logs?level=ERROR&limit=10");
    }

    #[test]
    fn absent_optional_params_are_skipped() {
        let key = QueryKey::new("logs").param_opt("kind", None::<&str>);
        assert_eq!(key, QueryKey::new("logs"));
        assert_eq!(key.to_string(), "logs");
    }
}
