//! Odoo HTTP client implementing the workflow backend.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    ACCESS_CODE_MODEL, AccessCodeBackend, AccessCodeVals, ImportReply, IssuedCode,
    TemplatePayload, countries, rpc, session, transfer,
};
use crate::config::Config;

/// Cookie-keeping client bound to one Odoo server.
#[derive(Clone)]
pub struct OdooClient {
    http: Client,
    base_url: String,
    report_action: String,
}

/// Row returned by `read` with the `name`/`expiry_date` fields.
#[derive(Debug, Deserialize)]
struct CodeRow {
    name: String,
    // Odoo sends `false` for an empty datetime.
    #[serde(default)]
    expiry_date: Value,
}

impl OdooClient {
    /// Build a client for the configured server.
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: cfg.odoo.base_url.trim_end_matches('/').to_string(),
            report_action: cfg.output.report_action.clone(),
        })
    }

    /// Open a web session when a login is configured.
    pub async fn login(&self, cfg: &Config) -> Result<Option<i64>> {
        if cfg.odoo.login.is_empty() {
            tracing::warn!("no login configured; relying on an existing session");
            return Ok(None);
        }
        let uid = session::authenticate(
            &self.http,
            &self.base_url,
            &cfg.odoo.database,
            &cfg.odoo.login,
            &cfg.odoo.password,
        )
        .await?;
        Ok(Some(uid))
    }

    /// Download a rendered document with the session cookies.
    pub async fn fetch_document(&self, url: &str) -> Result<Vec<u8>> {
        transfer::fetch_document(&self.http, url).await
    }

    /// Country list for the picker (never fails, see `countries`).
    pub async fn fetch_countries(&self) -> (Vec<countries::Country>, countries::CountrySource) {
        countries::fetch_countries(&self.http, &self.base_url).await
    }
}

#[async_trait]
impl AccessCodeBackend for OdooClient {
    async fn create_code(&self, vals: &AccessCodeVals) -> Result<i64> {
        let v = rpc::call_kw(
            &self.http,
            &self.base_url,
            ACCESS_CODE_MODEL,
            "create",
            json!([vals]),
            json!({}),
        )
        .await?;
        // Newer servers answer a single-dict create with a one-element list.
        let id = match &v {
            Value::Array(items) => items.first().and_then(Value::as_i64),
            other => other.as_i64(),
        };
        id.ok_or_else(|| anyhow!("create returned no id: {v}"))
    }

    async fn read_code(&self, id: i64) -> Result<IssuedCode> {
        let v = rpc::call_kw(
            &self.http,
            &self.base_url,
            ACCESS_CODE_MODEL,
            "read",
            json!([[id]]),
            json!({"fields": ["name", "expiry_date"]}),
        )
        .await?;
        let rows: Vec<CodeRow> = serde_json::from_value(v).map_err(rpc::RpcError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("record {id} not found"))?;
        Ok(IssuedCode {
            name: row.name,
            expiry_date: row.expiry_date.as_str().map(str::to_string),
        })
    }

    async fn create_codes(&self, vals: &[AccessCodeVals]) -> Result<Vec<i64>> {
        let v = rpc::call_kw(
            &self.http,
            &self.base_url,
            ACCESS_CODE_MODEL,
            "create",
            json!([vals]),
            json!({}),
        )
        .await?;
        let ids: Vec<i64> = match v {
            Value::Number(n) => n.as_i64().into_iter().collect(),
            other => serde_json::from_value::<Vec<i64>>(other).map_err(rpc::RpcError::from)?,
        };
        Ok(ids)
    }

    async fn import_sheet(&self, file_name: &str, bytes: Vec<u8>) -> Result<ImportReply> {
        transfer::import_sheet(&self.http, &self.base_url, file_name, bytes).await
    }

    async fn export_template(&self, payload: &TemplatePayload) -> Result<Vec<u8>> {
        transfer::export_template(&self.http, &self.base_url, payload).await
    }

    fn report_url(&self, ids: &[i64]) -> String {
        transfer::report_url(&self.base_url, &self.report_action, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::ValidityUnit;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> OdooClient {
        let mut cfg = Config::default();
        cfg.odoo.base_url = server.url();
        OdooClient::new(&cfg).unwrap()
    }

    fn vals(name: Option<&str>) -> AccessCodeVals {
        AccessCodeVals {
            name: name.map(str::to_string),
            booking_code: "BK-7".into(),
            booking_from: "Klook".into(),
            booking_price: 150.0,
            bottle_size: "100ml".into(),
            validity_value: 7,
            validity_unit: ValidityUnit::Days,
        }
    }

    #[tokio::test]
    async fn test_create_code_sends_single_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/web/dataset/call_kw")
            .match_body(Matcher::PartialJson(json!({
                "params": {
                    "model": "pos.access.code",
                    "method": "create",
                    "args": [{
                        "booking_code": "BK-7",
                        "booking_price": 150.0,
                        "bottle_size": "100ml",
                        "validity_value": 7,
                        "validity_unit": "days"
                    }],
                    "kwargs": {}
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":15}"#)
            .create_async()
            .await;

        let id = client_for(&server).create_code(&vals(None)).await.unwrap();
        assert_eq!(id, 15);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_code_handles_false_expiry() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/web/dataset/call_kw")
            .match_body(Matcher::PartialJson(json!({
                "params": {"method": "read", "args": [[15]], "kwargs": {"fields": ["name", "expiry_date"]}}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":[{"id":15,"name":"ABC-DEF-123-100","expiry_date":false}]}"#)
            .create_async()
            .await;

        let issued = client_for(&server).read_code(15).await.unwrap();
        assert_eq!(issued.name, "ABC-DEF-123-100");
        assert_eq!(issued.expiry_date, None);
    }

    #[tokio::test]
    async fn test_read_code_empty_result_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/web/dataset/call_kw")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":[]}"#)
            .create_async()
            .await;

        assert!(client_for(&server).read_code(99).await.is_err());
    }

    #[tokio::test]
    async fn test_create_codes_is_one_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/web/dataset/call_kw")
            .match_body(Matcher::PartialJson(json!({
                "params": {"method": "create"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":[21,22,23]}"#)
            .expect(1)
            .create_async()
            .await;

        let batch = vec![vals(Some("A")), vals(Some("B")), vals(Some("C"))];
        let ids = client_for(&server).create_codes(&batch).await.unwrap();
        assert_eq!(ids, vec![21, 22, 23]);
        mock.assert_async().await;
    }

    #[test]
    fn test_report_url_uses_configured_action() {
        let mut cfg = Config::default();
        cfg.odoo.base_url = "http://pos.local/".into();
        cfg.output.report_action = "my_module.cards".into();
        let client = OdooClient::new(&cfg).unwrap();
        assert_eq!(
            client.report_url(&[1, 2]),
            "http://pos.local/report/pdf/my_module.cards/1,2"
        );
    }
}
