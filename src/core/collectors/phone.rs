// src/core/collectors/phone.rs

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{CollectOptions, Collector, CollectorError, configured, fetch_json};
use crate::core::models::{Fragment, FragmentKind, PhoneFragment};

const VERIPHONE_URL: &str = "https://api.veriphone.io/v2/verify";

/// Veriphone number validation.
pub struct PhoneCollector {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VeriphoneResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub phone_valid: bool,
    pub international_number: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub carrier: Option<String>,
    pub phone_type: Option<String>,
    pub message: Option<String>,
}

impl PhoneCollector {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl Collector for PhoneCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::Phone
    }

    async fn collect(
        &self,
        target: &str,
        _options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        let Some(key) = configured(&self.api_key) else {
            return Ok(None);
        };
        info!(target, "Starting phone scan.");

        let request = self
            .client
            .get(VERIPHONE_URL)
            .query(&[("key", key), ("phone", target)]);
        let response: VeriphoneResponse = fetch_json("Veriphone", request).await?;
        if response.status != "success" {
            return Err(CollectorError::Decode(format!(
                "Veriphone response: {}",
                response.message.as_deref().unwrap_or("unknown error")
            )));
        }

        let fragment = to_fragment(target, response);
        info!(valid = fragment.valid, "Phone scan finished.");
        Ok(Some(Fragment::Phone(fragment)))
    }
}

pub fn to_fragment(phone: &str, response: VeriphoneResponse) -> PhoneFragment {
    let mut observations = Vec::new();
    if response.phone_valid {
        observations.push(format!(
            "Valid {} number in {}",
            response.phone_type.as_deref().unwrap_or("unknown"),
            response.country.as_deref().unwrap_or("unknown country")
        ));
        if let Some(carrier) = response.carrier.as_deref().filter(|c| !c.is_empty()) {
            observations.push(format!("Carrier: {}", carrier));
        }
    } else {
        observations.push("Phone number reported as invalid".into());
    }

    PhoneFragment {
        phone: phone.to_string(),
        valid: response.phone_valid,
        international_number: response.international_number,
        country: response.country,
        country_code: response.country_code,
        carrier: response.carrier.filter(|c| !c.is_empty()),
        line_type: response.phone_type,
        observations,
    }
}
