use serde_json::{json, Map, Value};

/// Typed filter over JSONB documents.
///
/// Equality and set-membership clauses are folded into a single containment
/// document rendered as `doc @> $n`, which matches scalar fields exactly and
/// array fields by membership. Range clauses compare the extracted text of a
/// field (`doc->>'field'`), which is the intended semantics for the
/// creation-date range: an inclusive string comparison, not date parsing.
///
/// Field names are compile-time constants supplied by the caller; request
/// input only ever appears as bound parameters.
#[derive(Debug, Clone, Default)]
pub struct DocFilter {
    contains: Map<String, Value>,
    ranges: Vec<RangeClause>,
}

#[derive(Debug, Clone)]
struct RangeClause {
    field: &'static str,
    op: RangeOp,
    value: String,
}

#[derive(Debug, Clone, Copy)]
enum RangeOp {
    Gte,
    Lte,
}

impl RangeOp {
    fn to_sql(self) -> &'static str {
        match self {
            RangeOp::Gte => ">=",
            RangeOp::Lte => "<=",
        }
    }
}

/// A parameter to bind alongside the rendered SQL, in order.
#[derive(Debug, Clone)]
pub enum FilterParam {
    Json(Value),
    Text(String),
}

impl DocFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact match on a top-level field.
    pub fn eq(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.contains.insert(field.to_string(), value.into());
        self
    }

    /// Set membership on a string array nested one level down, e.g.
    /// `member("taxonomy", "tags", "rust")` matches documents whose
    /// `taxonomy.tags` contains `"rust"`.
    pub fn member(mut self, outer: &'static str, inner: &'static str, value: &str) -> Self {
        let nested = self
            .contains
            .entry(outer.to_string())
            .or_insert_with(|| json!({}));
        if let Value::Object(obj) = nested {
            obj.insert(inner.to_string(), json!([value]));
        }
        self
    }

    /// Inclusive range over the text form of a field (lexicographic).
    pub fn between_text(mut self, field: &'static str, lo: &str, hi: &str) -> Self {
        self.ranges.push(RangeClause {
            field,
            op: RangeOp::Gte,
            value: lo.to_string(),
        });
        self.ranges.push(RangeClause {
            field,
            op: RangeOp::Lte,
            value: hi.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.contains.is_empty() && self.ranges.is_empty()
    }

    /// Render to SQL clauses joined with AND, numbering bind parameters from
    /// `first_param`. Returns an empty string when the filter has no clauses.
    pub fn to_sql(&self, first_param: usize) -> (String, Vec<FilterParam>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        let mut index = first_param;

        if !self.contains.is_empty() {
            clauses.push(format!("doc @> ${}", index));
            params.push(FilterParam::Json(Value::Object(self.contains.clone())));
            index += 1;
        }

        for range in &self.ranges {
            clauses.push(format!("doc->>'{}' {} ${}", range.field, range.op.to_sql(), index));
            params.push(FilterParam::Text(range.value.clone()));
            index += 1;
        }

        (clauses.join(" AND "), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_folds_into_one_containment_param() {
        let filter = DocFilter::new()
            .eq("journalID", "j1")
            .eq("userID", "u1")
            .eq("version", 3);
        let (sql, params) = filter.to_sql(1);
        assert_eq!(sql, "doc @> $1");
        assert_eq!(params.len(), 1);
        match &params[0] {
            FilterParam::Json(v) => {
                assert_eq!(v["journalID"], "j1");
                assert_eq!(v["userID"], "u1");
                assert_eq!(v["version"], 3);
            }
            other => panic!("expected json param, got {:?}", other),
        }
    }

    #[test]
    fn member_builds_nested_array_containment() {
        let filter = DocFilter::new()
            .eq("status", "public")
            .member("taxonomy", "tags", "rust")
            .member("taxonomy", "topics", "backend");
        let (sql, params) = filter.to_sql(1);
        assert_eq!(sql, "doc @> $1");
        match &params[0] {
            FilterParam::Json(v) => {
                assert_eq!(v["taxonomy"]["tags"], json!(["rust"]));
                assert_eq!(v["taxonomy"]["topics"], json!(["backend"]));
                assert_eq!(v["status"], "public");
            }
            other => panic!("expected json param, got {:?}", other),
        }
    }

    #[test]
    fn range_renders_text_comparisons_after_containment() {
        let filter = DocFilter::new()
            .eq("status", "public")
            .between_text("createdAt", "2024-01-01", "2024-12-31");
        let (sql, params) = filter.to_sql(1);
        assert_eq!(
            sql,
            "doc @> $1 AND doc->>'createdAt' >= $2 AND doc->>'createdAt' <= $3"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn empty_filter_renders_nothing() {
        let filter = DocFilter::new();
        assert!(filter.is_empty());
        let (sql, params) = filter.to_sql(1);
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn parameter_numbering_respects_offset() {
        let filter = DocFilter::new()
            .eq("userID", "u1")
            .between_text("createdAt", "a", "b");
        let (sql, _) = filter.to_sql(2);
        assert_eq!(
            sql,
            "doc @> $2 AND doc->>'createdAt' >= $3 AND doc->>'createdAt' <= $4"
        );
    }
}
