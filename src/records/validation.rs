use super::RecordError;
use crate::auth::is_valid_email;
use crate::models::{DoctorInput, Gender, PatientInput};

pub(crate) const MAX_EXPERIENCE_YEARS: i64 = 80;
pub(crate) const MAX_AGE: i64 = 150;

fn invalid(field: &'static str, message: impl Into<String>) -> RecordError {
    RecordError::Validation {
        field,
        message: message.into(),
    }
}

fn require_name(name: &str) -> Result<(), RecordError> {
    if name.trim().is_empty() {
        return Err(invalid("name", "Name is required"));
    }
    Ok(())
}

pub(crate) fn validate_doctor(input: &DoctorInput) -> Result<(), RecordError> {
    require_name(&input.name)?;
    if input.experience < 0 {
        return Err(invalid("experience", "Experience cannot be negative"));
    }
    if input.experience > MAX_EXPERIENCE_YEARS {
        return Err(invalid(
            "experience",
            format!("Experience cannot exceed {MAX_EXPERIENCE_YEARS} years"),
        ));
    }
    let email = input.email.trim();
    if !email.is_empty() && !is_valid_email(email) {
        return Err(invalid("email", "Email address is invalid"));
    }
    Ok(())
}

/// Returns the parsed gender so callers never re-parse the raw string.
pub(crate) fn validate_patient(input: &PatientInput) -> Result<Gender, RecordError> {
    require_name(&input.name)?;
    if input.age <= 0 {
        return Err(invalid("age", "Age must be positive"));
    }
    if input.age > MAX_AGE {
        return Err(invalid("age", format!("Age cannot exceed {MAX_AGE}")));
    }
    input.gender.trim().parse::<Gender>().map_err(|_| {
        let allowed: Vec<_> = Gender::ALL.iter().map(|g| g.as_str()).collect();
        invalid("gender", format!("Gender must be one of {}", allowed.join(", ")))
    })
}
