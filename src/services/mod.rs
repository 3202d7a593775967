// External collaborators
//
// This module provides the trait seams for everything the command layer
// calls but does not implement: the calendar backend, the SMS/email
// gateways, and the per-company client directories. Handlers receive all of
// them through a single explicitly owned ServiceContext, so tests can swap
// in fakes without touching process-wide state.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub mod directory;
pub mod google_calendar;
pub mod mailer;
pub mod smsapi;

pub use directory::{ConnectionPool, OptivendiDirectory, SundeaDirectory};
pub use google_calendar::GoogleCalendar;
pub use mailer::HttpMailer;
pub use smsapi::SmsApiGateway;

use crate::config::{CalendarRoutes, EventDefaults, ValidationPolicy};

/// Calendar backend: list, fetch and create events on a provider calendar.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn list_events(&self, calendar_id: &str, start: &str, end: &str) -> Result<Value>;

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Value>;

    async fn create_event(&self, calendar_id: &str, event: Value) -> Result<Value>;
}

/// SMS gateway. Returns the provider ack payload, if any.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<Option<Value>>;
}

/// Email gateway. Returns the provider ack payload, if any.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send_email(
        &self,
        recipients: &[String],
        subject: &str,
        message: &str,
    ) -> Result<Option<Value>>;
}

/// Lookup criteria for a client directory. The shape is discriminated by
/// company: Sundea keys on first and last name, Optivendi on a single name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCriteria {
    FullName {
        first_name: String,
        last_name: String,
    },
    CompanyName {
        name: String,
    },
}

/// Relational client directory for one company.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn lookup_client(&self, criteria: &ClientCriteria) -> Result<Vec<Value>>;

    async fn lookup_installations(&self, client_id: &str) -> Result<Vec<Value>>;
}

#[derive(Debug, Error)]
#[error("Unsupported company: {0}")]
pub struct UnknownCompany(pub String);

/// Closed set of companies a lookup command can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Company {
    Sundea,
    Optivendi,
}

impl FromStr for Company {
    type Err = UnknownCompany;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sundea" => Ok(Company::Sundea),
            "optivendi" => Ok(Company::Optivendi),
            _ => Err(UnknownCompany(s.trim().to_string())),
        }
    }
}

impl std::fmt::Display for Company {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Company::Sundea => write!(f, "sundea"),
            Company::Optivendi => write!(f, "optivendi"),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown calendar: {0}")]
pub struct UnknownCalendar(pub String);

/// Closed set of calendar selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarKind {
    Service,
    Formalities,
    ProductMeeting,
}

impl FromStr for CalendarKind {
    type Err = UnknownCalendar;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "service_calendar" => Ok(CalendarKind::Service),
            "formalities_calendar" => Ok(CalendarKind::Formalities),
            "product_meeting_calendar" => Ok(CalendarKind::ProductMeeting),
            _ => Err(UnknownCalendar(s.trim().to_string())),
        }
    }
}

/// Everything a handler needs for one invocation, owned and passed in
/// explicitly rather than reached through globals.
pub struct ServiceContext {
    pub calendar: Arc<dyn CalendarApi>,
    pub sms: Arc<dyn SmsGateway>,
    pub mail: Arc<dyn EmailGateway>,
    pub sundea: Arc<dyn ClientDirectory>,
    pub optivendi: Arc<dyn ClientDirectory>,
    pub routes: CalendarRoutes,
    pub policy: ValidationPolicy,
    pub defaults: EventDefaults,
}

impl ServiceContext {
    /// Resolve a calendar selector to the configured provider id.
    pub fn calendar_id(&self, kind: CalendarKind) -> &str {
        match kind {
            CalendarKind::Service => &self.routes.service,
            CalendarKind::Formalities => &self.routes.formalities,
            CalendarKind::ProductMeeting => &self.routes.product_meeting,
        }
    }

    /// Select the client directory for a company.
    pub fn directory(&self, company: Company) -> &dyn ClientDirectory {
        match company {
            Company::Sundea => self.sundea.as_ref(),
            Company::Optivendi => self.optivendi.as_ref(),
        }
    }
}
