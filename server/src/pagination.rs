use fantasy_db::common::search_key;
use sea_query::{Expr, IntoColumnRef, SimpleExpr};
use serde::Deserialize;

pub const DEFAULT_RECORDS_NUMBER: u64 = 10;
pub const MAX_RECORDS_NUMBER: u64 = 100;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default, alias = "recordsPerPage")]
    pub records_number: u64,
    #[serde(default)]
    pub filter: Option<String>,
}

impl Pagination {
    pub fn new(page: u64, records_number: u64, filter: Option<&str>) -> Self {
        Self {
            page,
            records_number,
            filter: filter.map(str::to_owned),
        }
    }

    pub fn limit(&self) -> u64 {
        match self.records_number {
            0 => DEFAULT_RECORDS_NUMBER,
            n => n.min(MAX_RECORDS_NUMBER),
        }
    }

    /// Pages are 1-based; page 0 is treated as the first one. SQLite binds
    /// the offset as a signed integer, hence the cap.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit())
            .min(i64::MAX as u64)
    }

    /// Folded `%filter%` pattern, `None` for a blank filter.
    pub fn like_pattern(&self) -> Option<String> {
        let f = search_key(self.filter.as_deref()?);
        if f.is_empty() {
            return None;
        }
        Some(format!("%{f}%"))
    }

    /// Substring match against a `search_name` column, which holds the
    /// name folded by `search_key`.
    pub fn name_filter<C: IntoColumnRef>(&self, search_column: C) -> Option<SimpleExpr> {
        self.like_pattern().map(|p| Expr::col(search_column).like(p))
    }
}
