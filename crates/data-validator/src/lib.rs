//! Reading Validation
//!
//! Turns raw kiln telemetry payloads into validated sensor readings.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{parse_timestamp, RawReading, Validator};
