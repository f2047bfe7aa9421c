//! Background worker owning the workflow and every remote call.

use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};

use crate::{
    config::Config,
    form::{FormField, FormState},
    notice::Notice,
    odoo::{OdooClient, countries::{Country, CountrySource}},
    output::DocumentSurface,
    workflow::{Workflow, WorkflowOptions},
};

type LiveWorkflow = Workflow<OdooClient, DocumentSurface>;

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Persist and apply updated settings.
    SaveSettings(Config),
    /// Operator input for one form field.
    Edit { field: FormField, value: String },
    /// Pick the spreadsheet for a bulk import.
    SelectFile(PathBuf),
    ClearFile,
    GenerateSingle,
    BulkImport,
    ExportTemplate,
    DownloadPdf,
    PrintPdf,
    /// Load the country list for the picker.
    LoadCountries,
}

impl WorkerCmd {
    /// Commands that count as an operator action (one at a time in the UI).
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            WorkerCmd::GenerateSingle
                | WorkerCmd::BulkImport
                | WorkerCmd::ExportTemplate
                | WorkerCmd::DownloadPdf
                | WorkerCmd::PrintPdf
        )
    }
}

/// Events emitted by the worker for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// Snapshot of the form after a command touched it.
    FormUpdated(FormState),
    /// Operator-facing notice.
    Notice(Notice),
    /// An action command has finished.
    ActionFinished,
    CountriesLoaded {
        countries: Vec<Country>,
        fallback: bool,
    },
    /// Informational log message.
    Log(String),
    /// User-visible error message.
    Error(String),
}

/// Build a workflow for `cfg`, logging into the server when a login is set.
async fn connect(
    cfg: &Config,
    focus: &broadcast::Sender<()>,
    tx: &mpsc::Sender<WorkerEvent>,
) -> anyhow::Result<(OdooClient, LiveWorkflow)> {
    let client = OdooClient::new(cfg)?;
    // Login failures are not terminal; calls will fail and say so.
    match client.login(cfg).await {
        Ok(Some(uid)) => {
            tracing::info!("odoo session ready (uid {uid})");
            let _ = tx
                .send(WorkerEvent::Log(format!("logged in as uid {uid}")))
                .await;
        }
        Ok(None) => tracing::info!("no login configured, using anonymous session"),
        Err(e) => {
            tracing::error!("odoo login failed: {e:#}");
            let _ = tx
                .send(WorkerEvent::Error(format!("login failed: {e}")))
                .await;
        }
    }
    let surface = DocumentSurface::new(client.clone(), &cfg.output, focus.clone());
    let workflow = Workflow::new(WorkflowOptions::from_config(cfg), client.clone(), surface);
    Ok((client, workflow))
}

/// Main worker loop: connect, then handle commands sequentially.
pub async fn run(
    mut rx: mpsc::Receiver<WorkerCmd>,
    tx: mpsc::Sender<WorkerEvent>,
    cfg: Config,
    focus: broadcast::Sender<()>,
) {
    tracing::info!("worker started");

    // The HTTP client is built once per config; a failure here is terminal.
    let (mut client, mut workflow) = match connect(&cfg, &focus, &tx).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("client init failed: {e:#}");
            let _ = tx
                .send(WorkerEvent::Error(format!("client init failed: {e}")))
                .await;
            return;
        }
    };
    if !workflow.is_active() {
        let _ = tx
            .send(WorkerEvent::Log("custom POS mode is off; actions are disabled".into()))
            .await;
    }
    let _ = tx.send(WorkerEvent::FormUpdated(workflow.form().clone())).await;

    // One command at a time keeps the form consistent.
    while let Some(cmd) = rx.recv().await {
        let is_action = cmd.is_action();
        tracing::debug!("worker command: {cmd:?}");
        match cmd {
            WorkerCmd::SaveSettings(new_cfg) => {
                tracing::info!("settings updated");
                match connect(&new_cfg, &focus, &tx).await {
                    Ok((c, w)) => {
                        // The draft survives a reconnect.
                        let form = workflow.form().clone();
                        workflow = w.with_form(form);
                        client = c;
                        let _ = tx.send(WorkerEvent::Log("settings updated".into())).await;
                    }
                    Err(e) => {
                        tracing::error!("client rebuild failed: {e:#}");
                        let _ = tx
                            .send(WorkerEvent::Error(format!("settings not applied: {e}")))
                            .await;
                    }
                }
            }
            WorkerCmd::Edit { field, value } => workflow.edit(field, &value),
            WorkerCmd::SelectFile(path) => workflow.select_file(path),
            WorkerCmd::ClearFile => workflow.clear_file(),
            WorkerCmd::GenerateSingle => workflow.generate_single().await,
            WorkerCmd::BulkImport => workflow.bulk_import().await,
            WorkerCmd::ExportTemplate => workflow.export_template().await,
            WorkerCmd::DownloadPdf => workflow.download_pdf().await,
            WorkerCmd::PrintPdf => workflow.print_pdf().await,
            WorkerCmd::LoadCountries => {
                let (countries, source) = client.fetch_countries().await;
                let _ = tx
                    .send(WorkerEvent::CountriesLoaded {
                        countries,
                        fallback: source == CountrySource::Fallback,
                    })
                    .await;
                continue;
            }
        }

        for notice in workflow.take_notices() {
            let _ = tx.send(WorkerEvent::Notice(notice)).await;
        }
        let _ = tx.send(WorkerEvent::FormUpdated(workflow.form().clone())).await;
        if is_action {
            let _ = tx.send(WorkerEvent::ActionFinished).await;
        }
    }
    tracing::info!("worker stopped");
}
