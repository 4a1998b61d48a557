//! PostgREST query-string builder.

use std::fmt::Display;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<(String, String)>,
}

/// Quotes a value for use inside an `in.(...)` list.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    pub fn in_list(mut self, column: &str, values: &[String]) -> Self {
        let list = values
            .iter()
            .map(|v| quote(v))
            .collect::<Vec<_>>()
            .join(",");
        self.params.push((column.to_string(), format!("in.({})", list)));
        self
    }

    /// Successive calls add tie-breakers to the same `order` parameter.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let term = format!("{}.{}", column, if ascending { "asc" } else { "desc" });
        match self.params.iter_mut().find(|(k, _)| k == "order") {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(&term);
            }
            None => self.params.push(("order".to_string(), term)),
        }
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".to_string(), n.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}
