//! Country list lookup for the operator country picker.

use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

/// One selectable country. Flag image URLs in the reply are ignored.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Country {
    pub id: i64,
    pub name: String,
}

/// Where a country list came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountrySource {
    Remote,
    Fallback,
}

/// Fetch the country list, falling back to a built-in list on any failure.
pub async fn fetch_countries(http: &Client, base_url: &str) -> (Vec<Country>, CountrySource) {
    match try_fetch(http, base_url).await {
        Ok(list) => {
            tracing::info!("country list loaded: {} entries", list.len());
            (list, CountrySource::Remote)
        }
        Err(e) => {
            tracing::warn!("country list unavailable, using fallback: {e}");
            (fallback_countries(), CountrySource::Fallback)
        }
    }
}

async fn try_fetch(http: &Client, base_url: &str) -> Result<Vec<Country>> {
    let url = format!("{}/country/list", base_url.trim_end_matches('/'));
    let body = json!({"jsonrpc": "2.0", "method": "call", "params": {}});
    let v = http
        .post(url)
        .json(&body)
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await?;

    // The route answers either as JSON-RPC or with a bare array.
    let list = match v {
        Value::Object(mut obj) => obj
            .remove("result")
            .filter(|r| r.is_array())
            .ok_or_else(|| anyhow!("unexpected data format"))?,
        arr @ Value::Array(_) => arr,
        _ => return Err(anyhow!("unexpected data format")),
    };
    Ok(serde_json::from_value(list)?)
}

/// Countries offered when the server cannot be reached.
pub fn fallback_countries() -> Vec<Country> {
    [
        "United States",
        "Canada",
        "United Kingdom",
        "Australia",
        "Germany",
        "France",
        "Japan",
        "Singapore",
        "Malaysia",
        "Indonesia",
    ]
    .iter()
    .zip(1..)
    .map(|(name, id)| Country {
        id,
        name: (*name).to_string(),
    })
    .collect()
}
