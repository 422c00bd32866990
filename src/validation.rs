use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;

use crate::models::{BookInput, Credentials, IssueRequest, ProfileUpdate, RegisterRequest, ReviewRequest};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("valid mobile regex"));

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_FULL_NAME_LEN: usize = 2;
pub const MIN_ADDRESS_LEN: usize = 10;
pub const EARLIEST_PUBLISHED_YEAR: i32 = 1000;

/// ValidationErrors
///
/// Field name to message, serialized as a flat JSON object. Fields are reported
/// all at once so a form can mark every invalid input in one round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub BTreeMap<&'static str, String>);

impl ValidationErrors {
    fn check(&mut self, field: &'static str, outcome: Result<(), String>) {
        if let Err(message) = outcome {
            self.0.insert(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn required(value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err("Please enter a valid email address".to_string())
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if !(lower && upper && digit) {
        return Err("Password must contain uppercase, lowercase, and number".to_string());
    }
    Ok(())
}

pub fn validate_credentials(form: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check("email", validate_email(&form.email));
    errors.check("password", validate_password(&form.password));
    errors.into_result()
}

pub fn validate_registration(form: &RegisterRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if form.full_name.trim().chars().count() < MIN_FULL_NAME_LEN {
        errors.check(
            "fullName",
            Err(format!("Full name must be at least {MIN_FULL_NAME_LEN} characters")),
        );
    }
    errors.check("email", validate_email(&form.email));
    if !MOBILE_RE.is_match(&form.mobile_no) {
        errors.check("mobileNo", Err("Mobile number must be 10 digits".to_string()));
    }
    if form.address.trim().chars().count() < MIN_ADDRESS_LEN {
        errors.check(
            "address",
            Err(format!("Address must be at least {MIN_ADDRESS_LEN} characters")),
        );
    }
    errors.check("gender", required(&form.gender, "Please select a gender"));
    errors.check("password", validate_password(&form.password));
    if form.confirm_password != form.password {
        errors.check("confirmPassword", Err("Passwords do not match".to_string()));
    }

    errors.into_result()
}

/// Only the fields present in the update are checked, with the signup rules.
pub fn validate_profile_update(form: &ProfileUpdate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(name) = &form.full_name {
        if name.trim().chars().count() < MIN_FULL_NAME_LEN {
            errors.check(
                "fullName",
                Err(format!("Full name must be at least {MIN_FULL_NAME_LEN} characters")),
            );
        }
    }
    if let Some(mobile) = &form.mobile_no {
        if !MOBILE_RE.is_match(mobile) {
            errors.check("mobileNo", Err("Mobile number must be 10 digits".to_string()));
        }
    }
    if let Some(address) = &form.address {
        if address.trim().chars().count() < MIN_ADDRESS_LEN {
            errors.check(
                "address",
                Err(format!("Address must be at least {MIN_ADDRESS_LEN} characters")),
            );
        }
    }
    if let Some(gender) = &form.gender {
        errors.check("gender", required(gender, "Please select a gender"));
    }
    errors.into_result()
}

pub fn validate_book(form: &BookInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check("title", required(&form.title, "Title is required"));
    errors.check("author", required(&form.author, "Author is required"));
    errors.check("category", required(&form.category, "Category is required"));
    errors.check("description", required(&form.description, "Description is required"));

    let current_year = Utc::now().year();
    if !(EARLIEST_PUBLISHED_YEAR..=current_year).contains(&form.published_year) {
        errors.check(
            "publishedYear",
            Err("Please enter a valid published year".to_string()),
        );
    }
    errors.into_result()
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| "Use the YYYY-MM-DD format".to_string())
}

pub fn validate_issue(form: &IssueRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check("userId", required(&form.user_id, "Please select a user"));
    errors.check("bookId", required(&form.book_id, "Please select a book"));

    let issue = required(&form.issue_date, "Issue date is required")
        .and_then(|_| parse_date(&form.issue_date));
    let due = required(&form.due_date, "Due date is required").and_then(|_| parse_date(&form.due_date));

    let out_of_order = matches!((&issue, &due), (Ok(issued), Ok(due)) if due < issued);
    errors.check("issueDate", issue.map(|_| ()));
    if out_of_order {
        errors.check("dueDate", Err("Due date cannot be before the issue date".to_string()));
    } else {
        errors.check("dueDate", due.map(|_| ()));
    }
    errors.into_result()
}

pub fn validate_review(form: &ReviewRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if !(1..=5).contains(&form.rating) {
        errors.check("rating", Err("Rating must be between 1 and 5".to_string()));
    }
    errors.check("review", required(&form.review, "Review text is required"));
    errors.into_result()
}
