//! Presence checks run before a profile is sent upstream.
//!
//! Everything beyond presence (formats, uniqueness) is the employee API's job.

use std::fmt;

use crate::profile::model::{ProfileEmployee, ProfileField};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: ProfileField,
    pub message: String,
}

impl ValidationError {
    pub fn empty_field(field: ProfileField) -> Self {
        Self {
            field,
            message: format!("{} ne peut pas être vide", field.label()),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn validate_required(
    employee: &ProfileEmployee,
    field: ProfileField,
    errors: &mut ValidationErrors,
) {
    if employee.field(field).is_none() {
        errors.add(ValidationError::empty_field(field));
    }
}

pub fn validate_profile(employee: &ProfileEmployee) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    validate_required(employee, ProfileField::Name, &mut errors);
    errors.into_result()
}
