//! Parsing of the comma-separated device selection

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No devices selected")]
    Empty,

    #[error("Invalid device index '{0}': expected a number")]
    NotANumber(String),
}

/// Parse `"0, 2,3"` into indices, in the order given.
///
/// Range checks are left to the capture session, which knows the current
/// device list.
pub fn parse_device_selection(input: &str) -> Result<Vec<i64>, SelectionError> {
    let indices = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|_| SelectionError::NotANumber(s.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    if indices.is_empty() {
        return Err(SelectionError::Empty);
    }
    Ok(indices)
}
