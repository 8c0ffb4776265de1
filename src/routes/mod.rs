pub mod activities;
pub mod health;
pub mod import;
pub mod power_curve;
pub mod profile;
pub mod remote;
pub mod upload;

use crate::error::AppError;
use crate::types::activity::DateRange;
use crate::types::serde_fmt::parse_dtime;

/// Builds a date range from `YYYY-MM-DD` or full-timestamp query values.
pub(crate) fn parse_range(from: Option<&str>, to: Option<&str>) -> Result<DateRange, AppError> {
    let bound = |value: Option<&str>, name: &str| -> Result<_, AppError> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => parse_dtime(raw)
                .map(Some)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid {}: {}", name, raw))),
        }
    };
    Ok(DateRange::new(bound(from, "from")?, bound(to, "to")?))
}
