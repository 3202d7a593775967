// Client and installation lookup commands
//
// Both commands route by a company selector. The selector decides which
// directory backend answers and which criteria fields are mandatory.

use crate::commands::registry::Command;
use crate::commands::types::{Envelope, InputSchema};
use crate::commands::validate::{as_object, non_empty_strings};
use crate::services::{ClientCriteria, Company, ServiceContext};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::str::FromStr;
use tracing::{error, info};

fn parse_company(map: &serde_json::Map<String, Value>) -> Result<Company, Envelope> {
    let company = map.get("company");
    if !non_empty_strings(&[company]) {
        return Err(Envelope::error(
            "company is required and must be a non-empty string",
        ));
    }
    let raw = company.and_then(Value::as_str).unwrap_or_default();
    Company::from_str(raw).map_err(|e| Envelope::error(e.to_string()))
}

/// Get detailed client information from the company's directory.
pub struct GetClientDetails;

#[async_trait]
impl Command for GetClientDetails {
    fn name(&self) -> &str {
        "get_client_details"
    }

    fn description(&self) -> &str {
        "Look up client details in the directory of the selected company"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::simple(vec![
            ("company", "Company selector: sundea or optivendi"),
            ("first_name", "Client first name (sundea)"),
            ("last_name", "Client last name (sundea)"),
            ("name", "Client name (optivendi)"),
        ])
    }

    async fn run(&self, params: Value, ctx: &ServiceContext) -> Result<Envelope> {
        let Some(map) = as_object(&params) else {
            return Ok(Envelope::error(
                "Invalid params: expected object with company and client criteria",
            ));
        };

        let company = match parse_company(map) {
            Ok(company) => company,
            Err(envelope) => return Ok(envelope),
        };

        // The selector decides which fields are mandatory
        let criteria = match company {
            Company::Sundea => {
                let first_name = map.get("first_name");
                let last_name = map.get("last_name");
                if !non_empty_strings(&[first_name, last_name]) {
                    return Ok(Envelope::error(
                        "first_name and last_name must be non-empty",
                    ));
                }
                ClientCriteria::FullName {
                    first_name: first_name
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                    last_name: last_name
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                }
            }
            Company::Optivendi => {
                let name = map.get("name");
                if !non_empty_strings(&[name]) {
                    return Ok(Envelope::error("name must be a non-empty string"));
                }
                ClientCriteria::CompanyName {
                    name: name
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                }
            }
        };

        match ctx.directory(company).lookup_client(&criteria).await {
            Ok(rows) => {
                info!(company = %company, "Client details fetched successfully");
                Ok(Envelope::Data(Value::Array(rows)))
            }
            Err(e) => {
                error!(error = ?e, "Exception during fetching client data from database");
                Ok(Envelope::error(e.to_string()))
            }
        }
    }
}

/// Get a client's installation details. Only the Sundea directory records
/// installations; any other selector is rejected before a lookup happens.
pub struct GetClientInstallationDetails;

#[async_trait]
impl Command for GetClientInstallationDetails {
    fn name(&self) -> &str {
        "get_client_installation_details"
    }

    fn description(&self) -> &str {
        "Look up a client's installations (sundea only)"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::simple(vec![
            ("company", "Company selector, must be sundea"),
            ("client_id", "Client identifier"),
        ])
    }

    async fn run(&self, params: Value, ctx: &ServiceContext) -> Result<Envelope> {
        let Some(map) = as_object(&params) else {
            return Ok(Envelope::error(
                "Invalid params: expected object with company and client_id",
            ));
        };

        let company = match parse_company(map) {
            Ok(company) => company,
            Err(envelope) => return Ok(envelope),
        };
        if company != Company::Sundea {
            return Ok(Envelope::error(format!(
                "Installations are not available for company: {company}"
            )));
        }

        let client_id = map.get("client_id");
        if !non_empty_strings(&[client_id]) {
            return Ok(Envelope::error(
                "client_id should be a valid non-empty string",
            ));
        }
        let client_id = client_id
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim();

        match ctx.directory(company).lookup_installations(client_id).await {
            Ok(rows) => {
                info!("Successfully fetched installation details by client id");
                Ok(Envelope::Data(Value::Array(rows)))
            }
            Err(e) => {
                error!(error = ?e, "Exception during fetching installation data from database");
                Ok(Envelope::error(e.to_string()))
            }
        }
    }
}
