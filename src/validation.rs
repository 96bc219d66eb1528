//! Sign-up input validation.
//!
//! A pure, ordered rule set over the four sign-up fields. Rules are checked
//! in a fixed order and the first violation is reported:
//!
//! 1. every field must be non-blank
//! 2. the email must look like `local@domain.tld`
//! 3. the password and its confirmation must be identical
//!
//! The validator evaluates exactly the strings it is given. Trimming belongs
//! to [`SignUpForm::new`], which strips surrounding whitespace the way the
//! sign-up form does before submitting.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,6}$")
        .expect("email pattern is a valid regex")
});

/// The first rule a sign-up attempt violated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpError {
    MissingFields,
    InvalidEmail,
    PasswordMismatch,
}

impl SignUpError {
    /// User-facing message for this error
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingFields => "All fields are required",
            Self::InvalidEmail => "Invalid email address",
            Self::PasswordMismatch => "Passwords do not match",
        }
    }

    /// Stable identifier used in the audit log
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::InvalidEmail => "invalid_email",
            Self::PasswordMismatch => "password_mismatch",
        }
    }
}

impl std::fmt::Display for SignUpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for SignUpError {}

/// Blank means empty or whitespace-only
fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Check whether an email address has the `local@domain.tld` shape
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Validate raw sign-up inputs.
///
/// Returns `None` when the inputs may be submitted, otherwise the first
/// violated rule. Never panics and performs no I/O.
pub fn validate_inputs(
    email: &str,
    display_name: &str,
    password: &str,
    confirm_password: &str,
) -> Option<SignUpError> {
    if is_blank(email) || is_blank(display_name) || is_blank(password) || is_blank(confirm_password)
    {
        return Some(SignUpError::MissingFields);
    }

    if !is_valid_email(email) {
        return Some(SignUpError::InvalidEmail);
    }

    if password != confirm_password {
        return Some(SignUpError::PasswordMismatch);
    }

    None
}

/// The four values collected by the sign-up form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    /// Build a form from raw field text, trimming each field
    pub fn new(email: &str, display_name: &str, password: &str, confirm_password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            display_name: display_name.trim().to_string(),
            password: password.trim().to_string(),
            confirm_password: confirm_password.trim().to_string(),
        }
    }

    /// Build a form keeping field text exactly as entered
    pub fn raw(email: &str, display_name: &str, password: &str, confirm_password: &str) -> Self {
        Self {
            email: email.to_string(),
            display_name: display_name.to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        }
    }

    /// Build a form, trimming only when `trim` is set
    pub fn with_policy(
        trim: bool,
        email: &str,
        display_name: &str,
        password: &str,
        confirm_password: &str,
    ) -> Self {
        if trim {
            Self::new(email, display_name, password, confirm_password)
        } else {
            Self::raw(email, display_name, password, confirm_password)
        }
    }

    pub fn validate(&self) -> Option<SignUpError> {
        validate_inputs(
            &self.email,
            &self.display_name,
            &self.password,
            &self.confirm_password,
        )
    }
}
