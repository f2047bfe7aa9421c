//! Odoo backend access for the access code workflow.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::form::{BookingOverrides, ValidityUnit};

/// Concrete HTTP client.
pub mod client;
/// Country list lookup.
pub mod countries;
/// JSON-RPC envelope.
pub mod rpc;
/// Web session login.
pub mod session;
/// Spreadsheet and report endpoints.
pub mod transfer;

pub use client::OdooClient;

/// Model holding issued access codes.
pub const ACCESS_CODE_MODEL: &str = "pos.access.code";

/// Field values for one `pos.access.code` record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessCodeVals {
    /// Code to store; the server mints one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub booking_code: String,
    pub booking_from: String,
    pub booking_price: f64,
    pub bottle_size: String,
    pub validity_value: u32,
    pub validity_unit: ValidityUnit,
}

/// Code and expiry read back after a create.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedCode {
    pub name: String,
    /// Server datetime string, absent when the record has none.
    pub expiry_date: Option<String>,
}

/// Reply of the spreadsheet import endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImportReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub codes: Vec<String>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub error: Option<String>,
    /// Per-row booking values, index-aligned with `codes` when present.
    #[serde(default)]
    pub rows: Vec<BookingOverrides>,
}

/// Body of the template export request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplatePayload {
    pub booking_code: String,
    pub booking_from: String,
    pub booking_price: String,
    pub bottle_size: String,
    pub validity_value: u32,
    pub validity_unit: ValidityUnit,
    pub access_code: String,
}

/// Remote operations the workflow depends on.
#[async_trait]
pub trait AccessCodeBackend: Send + Sync {
    /// Create one record and return its id.
    async fn create_code(&self, vals: &AccessCodeVals) -> Result<i64>;
    /// Read the code and expiry of a record.
    async fn read_code(&self, id: i64) -> Result<IssuedCode>;
    /// Create all records in a single call; ids come back in input order.
    async fn create_codes(&self, vals: &[AccessCodeVals]) -> Result<Vec<i64>>;
    /// Send a spreadsheet to the parsing endpoint.
    async fn import_sheet(&self, file_name: &str, bytes: Vec<u8>) -> Result<ImportReply>;
    /// Render the booking template spreadsheet.
    async fn export_template(&self, payload: &TemplatePayload) -> Result<Vec<u8>>;
    /// URL of the report rendering the given records.
    fn report_url(&self, ids: &[i64]) -> String;
}
