//! Access code provisioning: form edits, single and bulk generation, and the
//! download/print pipeline.
//!
//! Every entry point first checks the activation flag given at construction.
//! Failures end the current operation with a [`Notice`]; they never leave a
//! partially replaced code sequence behind.

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use std::path::PathBuf;

use crate::{
    codegen,
    config::Config,
    form::{CodeRecord, DEFAULT_BOTTLE_SIZE, FormField, FormState, SelectedFile},
    notice::Notice,
    odoo::{AccessCodeBackend, AccessCodeVals, ImportReply, IssuedCode, TemplatePayload},
    output::{self, OutputSurface},
};

/// File name of the exported booking template.
pub const TEMPLATE_FILE_NAME: &str = "booking_example.xlsx";

/// Switches read from the config when the workflow is built.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOptions {
    /// Custom POS mode; everything is a no-op when false.
    pub active: bool,
    /// Attach a locally generated code to single-generate requests.
    pub propose_codes: bool,
    /// Prefix of downloaded report names.
    pub file_prefix: String,
}

impl WorkflowOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            active: cfg.workflow.custom_mode,
            propose_codes: cfg.workflow.propose_codes,
            file_prefix: cfg.output.file_prefix.clone(),
        }
    }
}

/// The provisioning workflow and the form state it owns.
pub struct Workflow<B, S> {
    opts: WorkflowOptions,
    form: FormState,
    backend: B,
    surface: S,
    notices: Vec<Notice>,
}

impl<B: AccessCodeBackend, S: OutputSurface> Workflow<B, S> {
    pub fn new(opts: WorkflowOptions, backend: B, surface: S) -> Self {
        Self {
            opts,
            form: FormState::default(),
            backend,
            surface,
            notices: Vec::new(),
        }
    }

    /// Carry over the form of a previous workflow instance.
    pub fn with_form(mut self, form: FormState) -> Self {
        self.form = form;
        self
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn is_active(&self) -> bool {
        self.opts.active
    }

    /// Drain notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Apply operator input to one form field.
    pub fn edit(&mut self, field: FormField, value: &str) {
        if !self.opts.active {
            return;
        }
        self.form.apply(field, value);
    }

    /// Pick the spreadsheet for the next bulk import.
    pub fn select_file(&mut self, path: PathBuf) {
        if !self.opts.active {
            return;
        }
        if !path.is_file() {
            self.notify(Notice::warning(format!("File not found: {}", path.display())));
            return;
        }
        let file = SelectedFile::from_path(path);
        tracing::info!("file selected: {}", file.path.display());
        self.notify(Notice::success(format!("File selected: {}", file.name)));
        self.form.select_file(file);
    }

    pub fn clear_file(&mut self) {
        if !self.opts.active {
            return;
        }
        if self.form.selected_file.is_some() {
            self.form.clear_file();
            self.notify(Notice::info("File selection cleared"));
        }
    }

    /// Mint one code remotely and fill the preview with copies of it.
    pub async fn generate_single(&mut self) {
        if !self.opts.active {
            return;
        }
        if self.form.bottle_size.is_empty() {
            self.notify(Notice::warning("Please select bottle size"));
            return;
        }

        match self.mint_code().await {
            Ok(issued) => {
                let copies = self.form.number_of_copies.max(1) as usize;
                let records = (1..=copies)
                    .map(|i| CodeRecord::new(i, issued.name.clone()))
                    .collect();
                self.form.expiry_date = issued.expiry_date.as_deref().map(format_expiry);
                self.form.replace_codes(records);
                tracing::info!("generated {} x {}", copies, issued.name);
                self.notify(Notice::success("Access code generated successfully!"));
            }
            Err(e) => {
                tracing::error!("generate failed: {e:#}");
                self.notify(Notice::danger("Error generating access code"));
            }
        }
    }

    /// Create then read back one record; the read is the authoritative code.
    async fn mint_code(&self) -> Result<IssuedCode> {
        let vals = AccessCodeVals {
            name: self.opts.propose_codes.then(codegen::generate_code),
            booking_code: self.form.booking_code.clone(),
            booking_from: self.form.booking_from.clone(),
            booking_price: self.form.price_value(),
            bottle_size: self.form.bottle_size.clone(),
            validity_value: self.form.active_days,
            validity_unit: self.form.active_period,
        };
        let id = self.backend.create_code(&vals).await?;
        self.backend.read_code(id).await
    }

    /// Replace the preview with the codes parsed from the selected file.
    pub async fn bulk_import(&mut self) {
        if !self.opts.active {
            return;
        }
        let Some(file) = self.form.selected_file.clone() else {
            self.notify(Notice::warning("Please select an Excel file first"));
            return;
        };

        match self.upload(&file).await {
            Ok(reply) if reply.success => self.apply_import(reply),
            Ok(reply) => {
                let msg = reply
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "Import failed".into());
                tracing::warn!("import rejected: {msg}");
                self.notify(Notice::danger(msg));
            }
            Err(e) => {
                tracing::error!("import failed: {e:#}");
                self.notify(Notice::danger("Import failed"));
            }
        }
    }

    async fn upload(&self, file: &SelectedFile) -> Result<ImportReply> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .with_context(|| format!("failed to read {}", file.path.display()))?;
        self.backend.import_sheet(&file.name, bytes).await
    }

    fn apply_import(&mut self, reply: ImportReply) {
        let ImportReply {
            codes, total, rows, ..
        } = reply;
        let records: Vec<CodeRecord> = codes
            .into_iter()
            .enumerate()
            .map(|(i, code)| {
                let mut record = CodeRecord::new(i + 1, code);
                record.overrides = rows.get(i).cloned();
                record
            })
            .collect();
        if let Some(total) = total
            && total != records.len()
        {
            tracing::warn!("import reported total={total} for {} codes", records.len());
        }
        self.form.expiry_date = None;
        self.form.replace_codes(records);
        let n = self.form.total_pages();
        tracing::info!("imported {n} codes");
        self.notify(Notice::success(format!("Imported {n} codes")));
    }

    /// Post the form to the template endpoint and save the spreadsheet.
    pub async fn export_template(&mut self) {
        if !self.opts.active {
            return;
        }
        match self.fetch_template().await {
            Ok(path) => self.notify(Notice::success(format!(
                "Template saved to {}",
                path.display()
            ))),
            Err(e) => {
                tracing::error!("template export failed: {e:#}");
                self.notify(Notice::danger("Failed to download template"));
            }
        }
    }

    async fn fetch_template(&self) -> Result<PathBuf> {
        let bytes = self.backend.export_template(&self.template_payload()).await?;
        self.surface.save_download(TEMPLATE_FILE_NAME, &bytes).await
    }

    fn template_payload(&self) -> TemplatePayload {
        let form = &self.form;
        let bottle_size = if form.bottle_size.is_empty() {
            DEFAULT_BOTTLE_SIZE.to_string()
        } else {
            form.bottle_size.clone()
        };
        TemplatePayload {
            booking_code: form.booking_code.clone(),
            booking_from: form.booking_from.clone(),
            booking_price: form.booking_price.clone(),
            bottle_size,
            validity_value: form.active_days,
            validity_unit: form.active_period,
            access_code: form.generated_code().unwrap_or_default().to_string(),
        }
    }

    /// Persist the previewed codes and download the rendered report.
    pub async fn download_pdf(&mut self) {
        if !self.opts.active {
            return;
        }
        if self.form.access_codes().is_empty() {
            self.notify(Notice::warning("No codes to download"));
            return;
        }

        match self.persist_for_report().await {
            Ok(url) => {
                let file_name =
                    output::report_file_name(&self.opts.file_prefix, Utc::now().date_naive());
                tracing::info!("download dispatched: {file_name}");
                self.surface.dispatch_download(url, file_name);
                self.notify(Notice::success("PDF generated successfully!"));
            }
            Err(e) => {
                tracing::error!("report persist failed: {e:#}");
                self.notify(Notice::danger("Error generating PDF"));
            }
        }
    }

    /// Persist the previewed codes and print the rendered report.
    pub async fn print_pdf(&mut self) {
        if !self.opts.active {
            return;
        }
        if self.form.access_codes().is_empty() {
            self.notify(Notice::warning("Please generate access code first"));
            return;
        }

        match self.persist_for_report().await {
            Ok(url) => {
                tracing::info!("print frame dispatched");
                self.surface.attach_print_frame(url);
                self.notify(Notice::success("Print dialog opened!"));
            }
            Err(e) => {
                tracing::error!("report persist failed: {e:#}");
                self.notify(Notice::danger("Error opening print preview"));
            }
        }
    }

    /// Bulk-create one record per previewed code in a single call.
    async fn persist_for_report(&self) -> Result<String> {
        let vals: Vec<AccessCodeVals> = self
            .form
            .access_codes()
            .iter()
            .map(|record| {
                let b = self.form.resolve(record);
                AccessCodeVals {
                    name: Some(record.code.clone()),
                    booking_code: b.booking_code,
                    booking_from: b.booking_from,
                    booking_price: b.booking_price,
                    bottle_size: b.bottle_size,
                    validity_value: b.validity_value,
                    validity_unit: b.validity_unit,
                }
            })
            .collect();
        let ids = self.backend.create_codes(&vals).await?;
        if ids.is_empty() {
            bail!("bulk create returned no ids");
        }
        Ok(self.backend.report_url(&ids))
    }
}

/// Show a server UTC datetime in local time; unknown formats pass through.
pub fn format_expiry(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => Utc
            .from_utc_datetime(&naive)
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}
