//! Unified error handling for the climb-detector library.
//!
//! Every fallible operation in the crate returns [`ClimbError`]. Detection
//! preconditions are checked up front, before the scanner runs, so a failed
//! call never produces a partial climb list.

use std::fmt;

/// Unified error type for climb-detector operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ClimbError {
    /// Track has fewer samples than the operation needs
    InsufficientPoints {
        point_count: usize,
        minimum_required: usize,
    },
    /// Distance and elevation sequences are not index-aligned
    LengthMismatch {
        distance_len: usize,
        elevation_len: usize,
    },
    /// Detection thresholds are unusable (NaN, infinite)
    InvalidConfig { message: String },
    /// GPX document could not be read
    GpxParse { message: String },
    /// Encoded polyline could not be decoded
    Polyline { message: String },
    /// Segment cache (SQLite) failure
    PersistenceError { message: String },
    /// HTTP/API error
    HttpError {
        message: String,
        status_code: Option<u16>,
    },
    /// Environment configuration error
    ConfigError { message: String },
    /// Profile rendering failure
    RenderError { message: String },
    /// JSON/MessagePack (de)serialization failure
    Serialization { message: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for ClimbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClimbError::InsufficientPoints {
                point_count,
                minimum_required,
            } => {
                write!(
                    f,
                    "Track has {} points, minimum {} required",
                    point_count, minimum_required
                )
            }
            ClimbError::LengthMismatch {
                distance_len,
                elevation_len,
            } => {
                write!(
                    f,
                    "Distance sequence has {} samples but elevation sequence has {}",
                    distance_len, elevation_len
                )
            }
            ClimbError::InvalidConfig { message } => {
                write!(f, "Invalid detection config: {}", message)
            }
            ClimbError::GpxParse { message } => write!(f, "GPX parse error: {}", message),
            ClimbError::Polyline { message } => write!(f, "Polyline decode error: {}", message),
            ClimbError::PersistenceError { message } => {
                write!(f, "Persistence error: {}", message)
            }
            ClimbError::HttpError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            ClimbError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            ClimbError::RenderError { message } => write!(f, "Render error: {}", message),
            ClimbError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
            ClimbError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ClimbError {}

/// Result type alias for climb-detector operations.
pub type Result<T> = std::result::Result<T, ClimbError>;

impl From<serde_json::Error> for ClimbError {
    fn from(err: serde_json::Error) -> Self {
        ClimbError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for ClimbError {
    fn from(err: rusqlite::Error) -> Self {
        ClimbError::PersistenceError {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "persistence")]
impl From<rmp_serde::encode::Error> for ClimbError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        ClimbError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "persistence")]
impl From<rmp_serde::decode::Error> for ClimbError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        ClimbError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for ClimbError {
    fn from(err: reqwest::Error) -> Self {
        ClimbError::HttpError {
            status_code: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Extension trait for converting Option to ClimbError.
pub trait OptionExt<T> {
    /// Convert Option to Result with insufficient points error.
    fn ok_or_insufficient_points(self, point_count: usize, minimum: usize) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(self, point_count: usize, minimum: usize) -> Result<T> {
        self.ok_or(ClimbError::InsufficientPoints {
            point_count,
            minimum_required: minimum,
        })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| ClimbError::Internal {
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClimbError::InsufficientPoints {
            point_count: 1,
            minimum_required: 2,
        };
        assert!(err.to_string().contains("1 points"));
        assert!(err.to_string().contains("minimum 2"));

        let err = ClimbError::HttpError {
            message: "Too Many Requests".to_string(),
            status_code: Some(429),
        };
        assert_eq!(err.to_string(), "HTTP error (429): Too Many Requests");
    }

    #[test]
    fn test_length_mismatch_display() {
        let err = ClimbError::LengthMismatch {
            distance_len: 4,
            elevation_len: 5,
        };
        assert!(err.to_string().contains("4 samples"));
        assert!(err.to_string().contains("has 5"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_insufficient_points(0, 2);
        assert!(matches!(
            result,
            Err(ClimbError::InsufficientPoints { .. })
        ));

        let some = Some(3).ok_or_internal("unused");
        assert_eq!(some, Ok(3));
    }

    #[test]
    fn test_json_error_conversion() {
        let err: ClimbError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, ClimbError::Serialization { .. }));
    }
}
