//! Spreadsheet import/export endpoints and report documents.

use anyhow::{Result, anyhow};
use reqwest::Client;

use super::{ImportReply, TemplatePayload};

const IMPORT_PATH: &str = "/gm_pos_access_code/import_xlsx";
const EXPORT_PATH: &str = "/gm_pos_access_code/export_xlsx";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Upload a spreadsheet for server-side parsing.
///
/// The controller reports structured failures in the JSON body, so the HTTP
/// status is not checked here; a body that is not JSON is an error.
pub async fn import_sheet(
    http: &Client,
    base_url: &str,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<ImportReply> {
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(XLSX_MIME)?,
    );

    let url = format!("{}{}", base_url.trim_end_matches('/'), IMPORT_PATH);
    let reply = http
        .post(url)
        .multipart(form)
        .send()
        .await?
        .json::<ImportReply>()
        .await?;
    Ok(reply)
}

/// Render the booking template with the given values; returns xlsx bytes.
pub async fn export_template(
    http: &Client,
    base_url: &str,
    payload: &TemplatePayload,
) -> Result<Vec<u8>> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), EXPORT_PATH);
    let resp = http.post(url).json(payload).send().await?;
    let resp = ensure_success(resp).await?;
    Ok(resp.bytes().await?.to_vec())
}

/// Report URL addressing all record ids at once.
pub fn report_url(base_url: &str, report_action: &str, ids: &[i64]) -> String {
    let ids = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{}/report/pdf/{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(report_action),
        ids
    )
}

/// Fetch a rendered document.
pub async fn fetch_document(http: &Client, url: &str) -> Result<Vec<u8>> {
    let resp = http.get(url).send().await?;
    let resp = ensure_success(resp).await?;
    Ok(resp.bytes().await?.to_vec())
}

/// Convert non-2xx responses into a structured error.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_else(|_| "".into());
    Err(anyhow!("HTTP status {status} error: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::ValidityUnit;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_report_url_joins_ids() {
        let url = report_url(
            "http://pos.local:8069/",
            "gm_pos_access_code.action_access_code_report",
            &[3, 4, 9],
        );
        assert_eq!(
            url,
            "http://pos.local:8069/report/pdf/gm_pos_access_code.action_access_code_report/3,4,9"
        );
    }

    #[tokio::test]
    async fn test_import_sheet_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", IMPORT_PATH)
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data; boundary=.*".into()),
            )
            .match_body(Matcher::Regex(r#"name="file"; filename="bookings.xlsx""#.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "codes": ["A1", "B2"], "total": 2}"#)
            .create_async()
            .await;

        let http = Client::new();
        let reply = import_sheet(&http, &server.url(), "bookings.xlsx", b"PK..".to_vec())
            .await
            .unwrap();
        assert!(reply.success);
        assert_eq!(reply.codes, vec!["A1", "B2"]);
        assert_eq!(reply.total, Some(2));
        assert!(reply.rows.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_import_sheet_structured_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", IMPORT_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Missing column(s): bottle size"}"#)
            .create_async()
            .await;

        let http = Client::new();
        let reply = import_sheet(&http, &server.url(), "bookings.xlsx", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("Missing column(s): bottle size"));
    }

    #[tokio::test]
    async fn test_import_sheet_html_body_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", IMPORT_PATH)
            .with_status(500)
            .with_body("<html>Internal Server Error</html>")
            .create_async()
            .await;

        let http = Client::new();
        assert!(
            import_sheet(&http, &server.url(), "bookings.xlsx", vec![])
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_export_template_posts_form_values() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", EXPORT_PATH)
            .match_body(Matcher::Json(json!({
                "booking_code": "BK-1",
                "booking_from": "Klook",
                "booking_price": "150000",
                "bottle_size": "100ml",
                "validity_value": 7,
                "validity_unit": "days",
                "access_code": ""
            })))
            .with_status(200)
            .with_header("content-type", XLSX_MIME)
            .with_body(b"PKxlsx")
            .create_async()
            .await;

        let payload = TemplatePayload {
            booking_code: "BK-1".into(),
            booking_from: "Klook".into(),
            booking_price: "150000".into(),
            bottle_size: "100ml".into(),
            validity_value: 7,
            validity_unit: ValidityUnit::Days,
            access_code: String::new(),
        };
        let http = Client::new();
        let bytes = export_template(&http, &server.url(), &payload).await.unwrap();
        assert_eq!(bytes, b"PKxlsx");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_document_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/report/pdf/r/1")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let http = Client::new();
        let url = format!("{}/report/pdf/r/1", server.url());
        let err = fetch_document(&http, &url).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
