//! Data models

mod audit;
mod institution;
mod notification;
mod request;
mod user;

pub use audit::*;
pub use institution::*;
pub use notification::*;
pub use request::*;
pub use user::*;

use serde::{Deserialize, Serialize};

use crate::utils::AppError;

/// A filtered result set together with the number of matching records.
///
/// `count` is the number of records matching the filter before `limit` and
/// `offset` are applied, so consumers can paginate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResult<T> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> ListResult<T> {
    /// Build a page from the full list of matches
    pub fn paginate(items: Vec<T>, offset: Option<usize>, limit: Option<usize>) -> Self {
        let count = items.len();
        let data = items
            .into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Self { data, count }
    }
}

/// Parse an optional enum-valued query or body parameter
pub fn parse_optional<T>(field: &str, value: Option<&str>) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr<Err = String>,
{
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|e: String| AppError::validation(format!("{}: {}", field, e))),
    }
}
