use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;

use crate::models::{AdForm, BookingForm, ContactForm, TripType, VisaForm};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub const MIN_CONTACT_MESSAGE_CHARS: usize = 10;
pub const MAX_AD_PRIORITY: i32 = 10;

/// Column widths of the `VARCHAR(255)` and `VARCHAR(64)` fields.
pub const MAX_TEXT_CHARS: usize = 255;
pub const MAX_CODE_CHARS: usize = 64;

/// Field name to user-facing message, in field-name order.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Default)]
struct Checker {
    errors: FieldErrors,
}

impl Checker {
    fn require(&mut self, field: &'static str, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.fail(field, message);
        }
    }

    fn email(&mut self, field: &'static str, value: &str) {
        if !is_valid_email(value) {
            self.fail(field, "Valid email is required.");
        }
    }

    fn max_len(&mut self, field: &'static str, value: &str, max: usize) {
        if value.trim().chars().count() > max {
            self.fail(field, &format!("Must be at most {max} characters."));
        }
    }

    fn max_len_opt(&mut self, field: &'static str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.max_len(field, value, max);
        }
    }

    fn check(&mut self, field: &'static str, ok: bool, message: &str) {
        if !ok {
            self.fail(field, message);
        }
    }

    // First failure for a field wins.
    fn fail(&mut self, field: &'static str, message: &str) {
        self.errors.entry(field).or_insert_with(|| message.to_owned());
    }

    fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

pub fn validate_booking(form: &BookingForm) -> Result<(), FieldErrors> {
    let mut c = Checker::default();
    c.require("customer_name", &form.customer_name, "Full name is required.");
    c.require("customer_phone", &form.customer_phone, "Phone number is required.");
    c.email("customer_email", &form.customer_email);
    c.require("passport_number", &form.passport_number, "Passport number is required.");
    c.require("departure_city", &form.departure_city, "Departure city is required.");
    c.require("destination", &form.destination, "Destination is required.");
    c.max_len("customer_name", &form.customer_name, MAX_TEXT_CHARS);
    c.max_len("customer_email", &form.customer_email, MAX_TEXT_CHARS);
    c.max_len("customer_phone", &form.customer_phone, MAX_CODE_CHARS);
    c.max_len("passport_number", &form.passport_number, MAX_CODE_CHARS);
    c.max_len("departure_city", &form.departure_city, MAX_TEXT_CHARS);
    c.max_len("destination", &form.destination, MAX_TEXT_CHARS);
    c.max_len_opt("preferred_airline", form.preferred_airline.as_deref(), MAX_TEXT_CHARS);
    c.check(
        "passengers",
        form.passengers.map_or(true, |p| p >= 1),
        "At least one passenger is required.",
    );

    match (form.departure_date, form.return_date) {
        (None, _) => c.fail("departure_date", "Departure date is required."),
        (Some(_), None) if form.trip_type == TripType::RoundTrip => {
            c.fail("return_date", "Return date is required.")
        }
        (Some(depart), Some(ret)) if form.trip_type == TripType::RoundTrip => c.check(
            "return_date",
            ret >= depart,
            "Return date cannot be before the departure date.",
        ),
        _ => {}
    }

    c.finish()
}

pub fn validate_visa(form: &VisaForm) -> Result<(), FieldErrors> {
    let current_year = Utc::now().year();
    let mut c = Checker::default();
    c.require("visa_type", &form.visa_type, "Visa type is required.");
    c.require("duration", &form.duration, "Duration is required.");
    c.email("applicant_email", &form.applicant_email);
    c.require("applicant_name", &form.applicant_name, "Full name is required.");
    c.check(
        "age",
        form.age.is_some_and(|a| (1..=120).contains(&a)),
        "Valid age is required.",
    );
    c.check(
        "birth_year",
        form.birth_year.is_some_and(|y| (1900..=current_year).contains(&y)),
        "Valid birth year is required.",
    );
    c.require("passport_number", &form.passport_number, "Passport number is required.");
    c.require(
        "bank_statement_url",
        form.bank_statement_url.as_deref().unwrap_or_default(),
        "Bank statement is required.",
    );
    c.require(
        "passport_file_url",
        form.passport_file_url.as_deref().unwrap_or_default(),
        "Passport copy is required.",
    );
    c.max_len("applicant_name", &form.applicant_name, MAX_TEXT_CHARS);
    c.max_len("applicant_email", &form.applicant_email, MAX_TEXT_CHARS);
    c.max_len("visa_type", &form.visa_type, MAX_CODE_CHARS);
    c.max_len("duration", &form.duration, MAX_CODE_CHARS);
    c.max_len("passport_number", &form.passport_number, MAX_CODE_CHARS);
    c.finish()
}

pub fn validate_contact(form: &ContactForm) -> Result<(), FieldErrors> {
    let mut c = Checker::default();
    c.require("name", &form.name, "Full name is required.");
    c.email("email", &form.email);
    c.require("subject", &form.subject, "Subject is required.");
    c.check(
        "message",
        form.message.trim().chars().count() >= MIN_CONTACT_MESSAGE_CHARS,
        "Please provide at least 10 characters.",
    );
    c.max_len("name", &form.name, MAX_TEXT_CHARS);
    c.max_len("email", &form.email, MAX_TEXT_CHARS);
    c.max_len_opt("phone", form.phone.as_deref(), MAX_CODE_CHARS);
    c.max_len("subject", &form.subject, MAX_TEXT_CHARS);
    c.finish()
}

pub fn validate_ad(form: &AdForm) -> Result<(), FieldErrors> {
    let mut c = Checker::default();
    c.require("title", &form.title, "Title is required");
    c.require("description", &form.description, "Description is required");
    c.require("cta_text", &form.cta_text, "Call-to-action text is required");
    c.require("cta_url", &form.cta_url, "Call-to-action URL is required");
    c.max_len("title", &form.title, MAX_TEXT_CHARS);
    c.max_len("cta_text", &form.cta_text, MAX_TEXT_CHARS);
    c.check(
        "target_pages",
        form.target_pages.iter().any(|p| !p.trim().is_empty()),
        "At least one target page is required",
    );
    c.check(
        "priority",
        (1..=MAX_AD_PRIORITY).contains(&form.priority),
        "Priority must be between 1-10",
    );
    c.check(
        "max_impressions",
        form.max_impressions.map_or(true, |m| m > 0),
        "Max impressions must be a positive number",
    );
    if let (Some(start), Some(end)) = (form.start_date, form.end_date) {
        c.check("end_date", end >= start, "End date must be after the start date");
    }
    c.finish()
}
