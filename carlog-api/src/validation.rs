//! Validation functions
//!
//! Local parameter checks run before a request is sent. The backend
//! validates again; these checks catch obvious mistakes without a round trip.

use chrono::NaiveDate;

use crate::{
    Result,
    config::{
        VALIDATION_MAX_FIELDS, VALIDATION_NAME_MAX_LEN, VALIDATION_NOTES_MAX_LEN,
        VALIDATION_VIN_MAX_LEN,
    },
    prelude::*,
};

fn ensure_valid(ok: bool, message: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(CarlogError::validation(message()))
    }
}

/// Validation limits for sanity checking request parameters.
/// All limits can be adjusted at client creation time
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    /// max length of a make, model, service type, or custom field name, in bytes
    pub name_max_len: u32,

    /// max length of a VIN
    pub vin_max_len: u32,

    /// max size of log notes in bytes
    pub notes_max_len: u32,

    /// max number of custom fields on a service type, or values on a log
    pub max_fields: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        ValidationLimits {
            // default: 255 bytes
            name_max_len: VALIDATION_NAME_MAX_LEN,
            // 17 characters, the ISO 3779 VIN length
            vin_max_len: VALIDATION_VIN_MAX_LEN,
            // default: 64 KiB
            notes_max_len: VALIDATION_NOTES_MAX_LEN,
            // default: 100
            max_fields: VALIDATION_MAX_FIELDS,
        }
    }
}

impl ValidationLimits {
    /// Checks a required name: not blank, and not too long
    #[doc(hidden)]
    pub fn validate_name(&self, name: &str, description: &str) -> Result<()> {
        ensure_valid(!name.trim().is_empty(), || {
            format!("{description} cannot be empty")
        })?;
        ensure_valid(name.len() <= self.name_max_len as usize, || {
            format!(
                "{description} too long: {} bytes (max: {})",
                name.len(),
                self.name_max_len
            )
        })
    }

    #[doc(hidden)]
    pub fn validate_vin(&self, vin: &str) -> Result<()> {
        let len = vin.chars().count();
        ensure_valid(len <= self.vin_max_len as usize, || {
            format!("VIN too long: {len} characters (max: {})", self.vin_max_len)
        })
    }

    #[doc(hidden)]
    pub fn validate_notes(&self, notes: &str) -> Result<()> {
        ensure_valid(notes.len() <= self.notes_max_len as usize, || {
            format!(
                "notes too long: {} bytes (max: {})",
                notes.len(),
                self.notes_max_len
            )
        })
    }

    /// Intervals, when set, must be positive. A missing interval is always valid.
    #[doc(hidden)]
    pub fn validate_interval(&self, value: Option<i64>, description: &str) -> Result<()> {
        match value {
            Some(v) => ensure_valid(v > 0, || {
                format!("{description} must be a positive number, got {v}")
            }),
            None => Ok(()),
        }
    }

    /// Mileage and cost readings cannot be negative.
    #[doc(hidden)]
    pub fn validate_non_negative(&self, value: f64, description: &str) -> Result<()> {
        ensure_valid(value >= 0.0 && value.is_finite(), || {
            format!("{description} cannot be negative, got {value}")
        })
    }

    #[doc(hidden)]
    pub fn validate_date_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<()> {
        if let (Some(start), Some(end)) = (start, end) {
            ensure_valid(start <= end, || {
                format!("start date {start} is after end date {end}")
            })?;
        }
        Ok(())
    }

    #[doc(hidden)]
    pub fn validate_num_fields(&self, count: usize, description: &str) -> Result<()> {
        ensure_valid(count <= self.max_fields as usize, || {
            format!(
                "{description} too many custom fields: {count} (max: {})",
                self.max_fields
            )
        })
    }
}
