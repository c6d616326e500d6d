//! Pagination resolver: `{limit, page}` expressions -> `{limit, offset}`.

use crate::config::{PaginationSpec, QuerySpec, ValueSpec};
use crate::error::ExpressionError;
use crate::expression::{Environment, Evaluator};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

pub struct PaginationResolver<'a> {
    evaluator: &'a dyn Evaluator,
    env: &'a Environment,
}

impl<'a> PaginationResolver<'a> {
    pub fn new(evaluator: &'a dyn Evaluator, env: &'a Environment) -> Self {
        PaginationResolver { evaluator, env }
    }

    /// Page defaults to 1 and is clamped to >= 1. A missing or non-numeric
    /// limit means no limit (0). `offset = (page - 1) * limit`.
    pub fn resolve(&self, declared: Option<&PaginationSpec>) -> Result<Page, ExpressionError> {
        let Some(declared) = declared else {
            return Ok(Page::default());
        };
        let limit = match &declared.limit {
            Some(spec) => self.integer(spec, "pagination.limit")?.unwrap_or(0).max(0),
            None => 0,
        };
        let page = match &declared.page {
            Some(spec) => self.integer(spec, "pagination.page")?.unwrap_or(1).max(1),
            None => 1,
        };
        Ok(Page {
            limit,
            offset: (page - 1).saturating_mul(limit),
        })
    }

    /// Resolve the declared pagination, then let positive static values win.
    ///
    /// The offset is computed from the resolved limit before the static limit
    /// replaces it. Static `limit: 5` with `{limit: 10, page: 2}` sends limit 5,
    /// offset 10: the page boundaries follow the declared page size and the
    /// static limit only caps how many rows each page returns.
    pub fn resolve_for(&self, query: &QuerySpec) -> Result<Page, ExpressionError> {
        let mut page = self.resolve(query.pagination.as_ref())?;
        if query.limit > 0 {
            page.limit = query.limit;
        }
        if query.offset > 0 {
            page.offset = query.offset;
        }
        Ok(page)
    }

    fn integer(&self, spec: &ValueSpec, path: &str) -> Result<Option<i64>, ExpressionError> {
        Ok(as_integer(&spec.evaluate(self.evaluator, self.env, path)?))
    }
}

/// Integers, integral floats and numeric strings; anything else is `None`.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)
                })
        }
        _ => None,
    }
}
