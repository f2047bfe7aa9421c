//! Odoo web session login.

use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::Serialize;

use super::rpc;

#[derive(Debug, Serialize)]
struct AuthParams<'a> {
    db: &'a str,
    login: &'a str,
    password: &'a str,
}

/// Log in and let the client's cookie jar keep the session; returns the uid.
pub async fn authenticate(
    http: &Client,
    base_url: &str,
    database: &str,
    login: &str,
    password: &str,
) -> Result<i64> {
    let url = format!("{}/web/session/authenticate", base_url.trim_end_matches('/'));
    let result = rpc::call(
        http,
        &url,
        AuthParams {
            db: database,
            login,
            password,
        },
    )
    .await?;

    // A rejected login comes back as a result with uid=false.
    result["uid"]
        .as_i64()
        .ok_or_else(|| anyhow!("login rejected for {login}"))
}
