use serde_json::Value;

/// Single predicate applied to a table scan.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    /// Case-insensitive substring match
    ILike { column: String, needle: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// Table-scoped query in the shape the hosted REST backend understands.
///
/// ```ignore
/// let q = Query::table("ratings")
///     .select(&["id", "score"])
///     .eq("user_id", user_id)
///     .eq("release_id", release_id);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    columns: Option<Vec<String>>,
    filters: Vec<Filter>,
    order: Vec<OrderBy>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Query {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn in_list<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filters.push(Filter::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Rows whose `column` contains `needle`, ignoring case.
    pub fn ilike(mut self, column: &str, needle: &str) -> Self {
        self.filters.push(Filter::ILike {
            column: column.to_string(),
            needle: needle.to_string(),
        });
        self
    }

    pub fn order(mut self, column: &str, direction: SortDirection) -> Self {
        self.order.push(OrderBy {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<usize> {
        self.offset
    }

    /// Filter predicates only, as REST query parameters. Used by update and delete.
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| match f {
                Filter::Eq { column, value } => match value {
                    Value::Null => (column.clone(), "is.null".to_string()),
                    other => (column.clone(), format!("eq.{}", scalar(other))),
                },
                Filter::In { column, values } => {
                    let items: Vec<String> = values.iter().map(quoted).collect();
                    (column.clone(), format!("in.({})", items.join(",")))
                }
                Filter::ILike { column, needle } => (column.clone(), format!("ilike.*{}*", needle)),
            })
            .collect()
    }

    /// Full parameter list for a read: select, filters, order, limit and offset.
    pub fn read_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let select = match &self.columns {
            Some(cols) if !cols.is_empty() => cols.join(","),
            _ => "*".to_string(),
        };
        params.push(("select".to_string(), select));
        params.extend(self.filter_params());

        if !self.order.is_empty() {
            let parts: Vec<String> = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, o.direction.as_str()))
                .collect();
            params.push(("order".to_string(), parts.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        params
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Values inside in.(...) are double-quoted so commas and parens survive.
fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_select_filters_and_order() {
        let q = Query::table("tracks")
            .eq("release_id", "r1")
            .order("disc_number", SortDirection::Asc)
            .order("track_number", SortDirection::Asc)
            .limit(5)
            .offset(10);

        assert_eq!(
            q.read_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("release_id".to_string(), "eq.r1".to_string()),
                ("order".to_string(), "disc_number.asc,track_number.asc".to_string()),
                ("limit".to_string(), "5".to_string()),
                ("offset".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn renders_membership_and_null_filters() {
        let q = Query::table("artists")
            .select(&["id", "name"])
            .in_list("id", vec!["a", "b,c"])
            .eq("parent_id", Value::Null)
            .eq("is_public", true);

        let params = q.read_params();
        assert_eq!(params[0], ("select".to_string(), "id,name".to_string()));
        assert_eq!(params[1], ("id".to_string(), "in.(\"a\",\"b,c\")".to_string()));
        assert_eq!(params[2], ("parent_id".to_string(), "is.null".to_string()));
        assert_eq!(params[3], ("is_public".to_string(), "eq.true".to_string()));
    }

    #[test]
    fn renders_substring_filter_with_wildcards() {
        let q = Query::table("releases").ilike("title", "blue lines").limit(10);
        assert_eq!(
            q.read_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("title".to_string(), "ilike.*blue lines*".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn filter_params_skip_read_options() {
        let q = Query::table("ratings")
            .eq("id", json!("x"))
            .order("updated_at", SortDirection::Desc)
            .limit(1);
        assert_eq!(q.filter_params(), vec![("id".to_string(), "eq.x".to_string())]);
    }
}
