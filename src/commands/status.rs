//! Device status snapshot
//!
//! One batched `multi_data` read of the fields the router serves without a
//! session.

use serde::Serialize;

use crate::client::RouterClient;
use crate::error::Result;
use crate::protocol::{Command, ParsedResponse};

pub const STATUS_FIELDS: [&str; 4] = ["system_status", "web_signal", "network_type", "ppp_status"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub system_status: Option<String>,
    pub web_signal: Option<String>,
    pub network_type: Option<String>,
    pub ppp_status: Option<String>,
}

impl DeviceStatus {
    /// Batched replies have been seen repeating `network_type`; the first
    /// occurrence matches what the web UI shows.
    pub fn from_response(response: &ParsedResponse) -> Self {
        Self {
            system_status: response.first_text("system_status"),
            web_signal: response.first_text("web_signal"),
            network_type: response.first_text("network_type"),
            ppp_status: response.first_text("ppp_status"),
        }
    }
}

pub async fn device_status(client: &RouterClient) -> Result<DeviceStatus> {
    let response = client.execute(&Command::get_multi(STATUS_FIELDS)).await?;
    Ok(DeviceStatus::from_response(&response))
}
