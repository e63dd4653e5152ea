//! Registration form validation, normalization and submission.
//!
//! Mirrors what the backend accepts: IITB students only, identified by
//! LDAP e-mail or roll number, one registration per identifier.

use std::str::FromStr;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, RegistrationStatus};
use crate::error::{CoreError, FieldError, ValidationError};

const REQUIRED_FIELDS: usize = 6;

/// Which event(s) the student signs up for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Track {
    #[default]
    #[serde(rename = "ScaleUp Blitz")]
    Blitz,
    #[serde(rename = "ScaleUp Ignite")]
    Ignite,
    #[serde(rename = "Both")]
    Both,
}

impl Track {
    pub fn label(&self) -> &'static str {
        match self {
            Track::Blitz => "ScaleUp Blitz",
            Track::Ignite => "ScaleUp Ignite",
            Track::Both => "Both",
        }
    }

    /// Short form used in `?track=` links.
    pub fn short(&self) -> &'static str {
        match self {
            Track::Blitz => "blitz",
            Track::Ignite => "ignite",
            Track::Both => "both",
        }
    }
}

impl FromStr for Track {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blitz" | "scaleup blitz" => Ok(Track::Blitz),
            "ignite" | "scaleup ignite" => Ok(Track::Ignite),
            "both" => Ok(Track::Both),
            other => Err(ValidationError::InvalidValue {
                field: "interested_events".into(),
                message: format!("unknown track '{other}' (expected blitz, ignite or both)"),
            }),
        }
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw form input as typed by the student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub ldap_id: String,
    pub roll_number: String,
    pub branch: String,
    pub year: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub interested_events: Track,
}

/// Normalized body of `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub name: String,
    pub ldap_id: String,
    pub roll_number: String,
    pub branch: String,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub interested_events: Track,
}

/// Backend acknowledgement of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    pub registration_number: String,
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z\s]+$").expect("static pattern"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("static pattern"))
}

fn iitb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)@iitb\.ac\.in$").expect("static pattern"))
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[6-9][0-9]{9}$").expect("static pattern"))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_iitb_email(s: &str) -> bool {
    email_re().is_match(s) && iitb_re().is_match(s)
}

impl RegistrationForm {
    fn clean_name(&self) -> String {
        collapse_whitespace(&self.name)
    }

    fn clean_ldap(&self) -> String {
        self.ldap_id.trim().to_lowercase()
    }

    fn clean_roll(&self) -> String {
        self.roll_number.trim().to_uppercase()
    }

    fn clean_phone(&self) -> Option<String> {
        self.phone_number
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }

    fn name_error(&self) -> Option<&'static str> {
        let name = self.clean_name();
        let len = name.chars().count();
        if len < 2 {
            Some("Enter your full name")
        } else if len > 100 {
            Some("Name must be at most 100 characters")
        } else if !name_re().is_match(&name) {
            Some("Only letters and spaces")
        } else {
            None
        }
    }

    fn ldap_error(&self) -> Option<&'static str> {
        let ldap = self.clean_ldap();
        if !email_re().is_match(&ldap) {
            Some("Enter a valid email")
        } else if !iitb_re().is_match(&ldap) {
            Some("Use your IITB email")
        } else {
            None
        }
    }

    /// Collect every failing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &'static str, message: &str| {
            errors.push(FieldError {
                field,
                message: message.to_string(),
            })
        };

        if let Some(msg) = self.name_error() {
            push("name", msg);
        }
        if let Some(msg) = self.ldap_error() {
            push("ldap_id", msg);
        }
        if self.roll_number.trim().is_empty() {
            push("roll_number", "Roll number is required");
        }
        if self.branch.trim().is_empty() {
            push("branch", "Select your branch");
        }
        if self.year.trim().is_empty() {
            push("year", "Select your year");
        }
        if let Some(phone) = self.clean_phone() {
            if !phone_re().is_match(&phone) {
                push("phone_number", "Enter 10-digit Indian mobile");
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Fields(errors))
        }
    }

    /// Trimmed, case-folded payload. Does not validate.
    pub fn normalize(&self) -> RegistrationPayload {
        RegistrationPayload {
            name: self.clean_name(),
            ldap_id: self.clean_ldap(),
            roll_number: self.clean_roll(),
            branch: self.branch.trim().to_string(),
            year: self.year.trim().to_string(),
            phone_number: self.clean_phone(),
            interested_events: self.interested_events,
        }
    }

    /// Percentage of the six required fields that currently pass.
    pub fn completion_pct(&self) -> f64 {
        let filled = [
            self.name_error().is_none(),
            is_iitb_email(&self.clean_ldap()),
            !self.roll_number.trim().is_empty(),
            !self.branch.trim().is_empty(),
            !self.year.trim().is_empty(),
            true, // a track is always selected
        ]
        .into_iter()
        .filter(|ok| *ok)
        .count();
        filled as f64 / REQUIRED_FIELDS as f64 * 100.0
    }

    /// Identifier to check for an existing registration.
    ///
    /// The LDAP id wins once it is an IITB address; otherwise the roll
    /// number, if any.
    pub fn duplicate_check_identifier(&self) -> Option<String> {
        let ldap = self.clean_ldap();
        if is_iitb_email(&ldap) {
            return Some(ldap);
        }
        let roll = self.clean_roll();
        (!roll.is_empty()).then_some(roll)
    }
}

/// Ask the backend whether this form's identifier is taken.
///
/// Backend errors count as "not registered", matching the site: the
/// registration POST is the final authority.
pub async fn is_duplicate(client: &ApiClient, form: &RegistrationForm) -> bool {
    let Some(identifier) = form.duplicate_check_identifier() else {
        return false;
    };
    match client.check_registration(&identifier).await {
        Ok(RegistrationStatus::Registered) => true,
        Ok(RegistrationStatus::NotRegistered) => false,
        Err(err) => {
            tracing::warn!(error = %err, "duplicate check failed, assuming not registered");
            false
        }
    }
}

/// Validate, normalize, check for duplicates and register.
pub async fn submit(
    client: &ApiClient,
    form: &RegistrationForm,
) -> Result<RegistrationReceipt, CoreError> {
    form.validate()?;
    if is_duplicate(client, form).await {
        return Err(CoreError::AlreadyRegistered {
            identifier: form.duplicate_check_identifier().unwrap_or_default(),
        });
    }
    let payload = form.normalize();
    let receipt = client.register(&payload).await?;
    tracing::info!(
        registration_number = %receipt.registration_number,
        track = %payload.interested_events,
        "registration accepted"
    );
    Ok(receipt)
}
