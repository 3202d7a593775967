// Notification commands
//
// SMS and email over the gateway collaborators. Both normalize loosely
// typed recipient fields before validating them.

use crate::commands::registry::Command;
use crate::commands::types::{Envelope, InputSchema};
use crate::commands::validate::{as_object, non_empty_strings};
use crate::services::ServiceContext;
use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{error, info};

const MAX_SMS_LENGTH: usize = 1000;

// E.164-like: digits only, first digit 1-9, total length 8-15
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[1-9][0-9]{7,14}$").unwrap()
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()
});

/// Send an SMS to a single phone number.
pub struct SendSms;

#[async_trait]
impl Command for SendSms {
    fn name(&self) -> &str {
        "send_sms"
    }

    fn description(&self) -> &str {
        "Send an SMS to the given phone number"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::simple(vec![
            ("phone_number", "Recipient number, e.g. 48123123123"),
            ("message", "Message text, at most 1000 characters"),
        ])
    }

    async fn run(&self, params: Value, ctx: &ServiceContext) -> Result<Envelope> {
        let Some(map) = as_object(&params) else {
            return Ok(Envelope::error(
                "Invalid params: expected object with phone_number and message",
            ));
        };

        // The number may arrive as a string or an integer
        let phone_number = match map.get("phone_number") {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Ok(Envelope::error("phone_number is required")),
        };

        if !PHONE_RE.is_match(&phone_number) {
            return Ok(Envelope::error(
                "phone_number must be a valid international number, e.g. +48123123123",
            ));
        }

        let message = match map.get("message") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.as_str(),
            _ => {
                return Ok(Envelope::error(
                    "message is required and must be a non-empty string",
                ))
            }
        };
        if message.chars().count() > MAX_SMS_LENGTH {
            return Ok(Envelope::error(
                "message is too long (max 1000 characters)",
            ));
        }

        match ctx.sms.send_sms(&phone_number, message).await {
            Ok(ack) => {
                info!(phone_number = %phone_number, "SMS notification sent successfully");
                Ok(Envelope::Data(ack.unwrap_or_else(|| json!("SMS sent"))))
            }
            Err(e) => {
                error!(error = ?e, "Exception during sending SMS");
                Ok(Envelope::error(e.to_string()))
            }
        }
    }
}

/// Send an email to one or more recipients.
pub struct SendEmail;

impl SendEmail {
    /// Normalize the `email` field to a trimmed recipient list.
    fn normalize_recipients(value: &Value) -> Result<Vec<String>, Envelope> {
        match value {
            Value::String(s) => Ok(vec![s.trim().to_string()]),
            Value::Array(items) => Ok(items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .collect()),
            _ => Err(Envelope::error(
                "email must be a string or a list of strings",
            )),
        }
    }
}

#[async_trait]
impl Command for SendEmail {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an email to one or more recipients"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::simple(vec![
            ("email", "Recipient address or list of addresses"),
            ("subject", "Email subject"),
            ("message", "Email body"),
        ])
    }

    async fn run(&self, params: Value, ctx: &ServiceContext) -> Result<Envelope> {
        let Some(map) = as_object(&params) else {
            return Ok(Envelope::error(
                "Invalid params: expected object with email, subject and message",
            ));
        };

        let Some(email_value) = map.get("email") else {
            return Ok(Envelope::error("email is required"));
        };
        let recipients = match Self::normalize_recipients(email_value) {
            Ok(recipients) => recipients,
            Err(envelope) => return Ok(envelope),
        };

        if recipients.is_empty() {
            return Ok(Envelope::error("email must not be empty"));
        }
        for recipient in &recipients {
            if !EMAIL_RE.is_match(recipient) {
                return Ok(Envelope::error(format!(
                    "Invalid email address: {recipient}"
                )));
            }
        }

        if !non_empty_strings(&[map.get("subject")]) {
            return Ok(Envelope::error(
                "subject is required and must be a non-empty string",
            ));
        }
        if !non_empty_strings(&[map.get("message")]) {
            return Ok(Envelope::error(
                "message is required and must be a non-empty string",
            ));
        }

        let subject = map.get("subject").and_then(Value::as_str).unwrap_or_default();
        let message = map.get("message").and_then(Value::as_str).unwrap_or_default();

        match ctx.mail.send_email(&recipients, subject, message).await {
            Ok(ack) => {
                info!(recipients = ?recipients, "E-mail notification sent successfully");
                Ok(Envelope::Data(ack.unwrap_or_else(|| json!("Email sent"))))
            }
            Err(e) => {
                error!(error = ?e, "Exception during sending e-mail");
                Ok(Envelope::error(e.to_string()))
            }
        }
    }
}
