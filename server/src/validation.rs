use validator::{ValidateEmail, ValidateLength, ValidateRange};

use crate::error::{Error, FieldViolation};

const MAX_EMAIL_LENGTH: u64 = 100;

/// A single declarative check over a DTO field.
#[derive(Debug, Clone, Copy)]
pub enum Rule<'a> {
    Required(&'a str),
    MaxLength(&'a str, usize),
    Length(&'a str, usize, usize),
    Email(&'a str),
    SameAs(&'a str, &'a str),
    Positive(i64),
    NonNegative(Option<i32>),
    Different(i64, i64),
}

impl Rule<'_> {
    pub fn check(&self) -> Result<(), String> {
        match *self {
            Rule::Required(v) => {
                if v.trim().is_empty() {
                    return Err("The field is required".to_owned());
                }
            }
            Rule::MaxLength(v, max) => {
                if !v.validate_length(None, Some(max as u64), None) {
                    return Err(format!("The field cannot have more than {max} characters"));
                }
            }
            Rule::Length(v, min, max) => {
                if !v.validate_length(Some(min as u64), Some(max as u64), None) {
                    return Err(format!(
                        "The field must have between {min} and {max} characters"
                    ));
                }
            }
            Rule::Email(v) => validate_email(v)?,
            Rule::SameAs(v, other) => {
                if v != other {
                    return Err("The values do not match".to_owned());
                }
            }
            Rule::Positive(v) => {
                if !v.validate_range(Some(1), None, None, None) {
                    return Err("The field must be selected".to_owned());
                }
            }
            Rule::NonNegative(v) => {
                if !v.map_or(true, |v| v.validate_range(Some(0), None, None, None)) {
                    return Err("The value cannot be negative".to_owned());
                }
            }
            Rule::Different(a, b) => {
                if a == b {
                    return Err("The values must be different".to_owned());
                }
            }
        }
        Ok(())
    }
}

/// DTOs expose their rule table; `validate` runs it before any write.
pub trait Validate {
    fn rules(&self) -> Vec<(&'static str, Rule<'_>)>;

    fn validate(&self) -> Result<(), Error> {
        check_rules(&self.rules())
    }
}

pub fn check_rules(rules: &[(&'static str, Rule)]) -> Result<(), Error> {
    let violations: Vec<FieldViolation> = rules
        .iter()
        .filter_map(|(field, rule)| {
            rule.check().err().map(|message| FieldViolation {
                field: (*field).to_owned(),
                message,
            })
        })
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::ValidationFailed(violations))
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if !email.validate_length(None, Some(MAX_EMAIL_LENGTH), None) {
        return Err(format!(
            "Email cannot have more than {MAX_EMAIL_LENGTH} characters"
        ));
    }
    if !email.validate_email() {
        return Err("Invalid email address".to_owned());
    }
    Ok(())
}
