use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Unlimited,
    Limited(u32),
}

impl Capacity {
    pub fn from_raw(value: i64) -> Self {
        if value <= 0 {
            Self::Unlimited
        } else {
            Self::Limited(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }

    /// Value placed back into the edit input.
    pub fn input_value(&self) -> String {
        match self {
            Self::Unlimited => String::new(),
            Self::Limited(value) => value.to_string(),
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("Unlimited"),
            Self::Limited(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapacityError {
    #[error("Capacity must be a whole number.")]
    NotANumber,
    #[error("Capacity cannot be negative.")]
    Negative,
    #[error("Capacity cannot be lower than the {reserved} spots already reserved.")]
    BelowReserved { reserved: u32 },
}

/// Empty and zero both mean unlimited.
pub fn parse_capacity_input(raw: &str, reserved: u32) -> Result<Capacity, CapacityError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Capacity::Unlimited);
    }
    let value = raw.parse::<i64>().map_err(|_| CapacityError::NotANumber)?;
    if value < 0 {
        return Err(CapacityError::Negative);
    }
    let capacity = Capacity::from_raw(value);
    match capacity {
        Capacity::Limited(limit) if limit < reserved => Err(CapacityError::BelowReserved { reserved }),
        _ => Ok(capacity),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CapacityResponse {
    #[serde(default)]
    pub updated: bool,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapacityUpdate {
    Applied(Capacity),
    Rejected(String),
}

pub const CAPACITY_UPDATE_FAILED: &str = "Could not update capacity. Please try again.";

/// Interprets the server's reply to an inline capacity edit. A body that is
/// not JSON means the server took the plain form path, so the submitted value
/// stands.
pub fn interpret_capacity_response(body: &str, submitted: Capacity) -> CapacityUpdate {
    let Ok(response) = serde_json::from_str::<CapacityResponse>(body) else {
        return CapacityUpdate::Applied(submitted);
    };
    if !response.updated {
        return CapacityUpdate::Rejected(
            response
                .error
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| CAPACITY_UPDATE_FAILED.to_string()),
        );
    }
    CapacityUpdate::Applied(response.capacity.map(Capacity::from_raw).unwrap_or(submitted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_parsing() {
        assert_eq!(parse_capacity_input("", 4), Ok(Capacity::Unlimited));
        assert_eq!(parse_capacity_input("0", 4), Ok(Capacity::Unlimited));
        assert_eq!(parse_capacity_input(" 5 ", 4), Ok(Capacity::Limited(5)));
        assert_eq!(parse_capacity_input("2.5", 0), Err(CapacityError::NotANumber));
        assert_eq!(parse_capacity_input("-1", 0), Err(CapacityError::Negative));
        assert_eq!(
            parse_capacity_input("3", 4),
            Err(CapacityError::BelowReserved { reserved: 4 })
        );
    }

    #[test]
    fn response_interpretation() {
        assert_eq!(
            interpret_capacity_response(r#"{"updated": true, "capacity": 8}"#, Capacity::Limited(6)),
            CapacityUpdate::Applied(Capacity::Limited(8))
        );
        assert_eq!(
            interpret_capacity_response("<html>ok</html>", Capacity::Limited(6)),
            CapacityUpdate::Applied(Capacity::Limited(6))
        );
        assert_eq!(
            interpret_capacity_response(r#"{"updated": false}"#, Capacity::Limited(6)),
            CapacityUpdate::Rejected(CAPACITY_UPDATE_FAILED.to_string())
        );
        assert_eq!(
            interpret_capacity_response(r#"{"updated": true, "capacity": 0}"#, Capacity::Limited(6)),
            CapacityUpdate::Applied(Capacity::Unlimited)
        );
    }
}
