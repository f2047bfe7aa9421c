//! Download and print surfaces for rendered reports.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::broadcast;

use crate::{
    config::OutputCfg,
    odoo::OdooClient,
    print::{self, CommandSpooler, PrintFrame, Spooler},
};

/// Where report URLs and generated files end up.
#[async_trait]
pub trait OutputSurface: Send + Sync {
    /// Start downloading `url` as `file_name`; returns without waiting.
    fn dispatch_download(&self, url: String, file_name: String);
    /// Load `url` into a print frame and print it in the background.
    fn attach_print_frame(&self, url: String);
    /// Store bytes already received; returns the written path.
    async fn save_download(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Name of a downloaded report: `<prefix>-YYYY-MM-DD.pdf`.
pub fn report_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}.pdf", prefix, date.format("%Y-%m-%d"))
}

/// Surface backed by the Odoo session, the local disk and a print command.
#[derive(Clone)]
pub struct DocumentSurface {
    client: OdooClient,
    download_dir: PathBuf,
    open_in_browser: bool,
    spooler: Arc<dyn Spooler>,
    focus: broadcast::Sender<()>,
}

impl DocumentSurface {
    /// `focus` fires whenever the terminal regains focus.
    pub fn new(client: OdooClient, cfg: &OutputCfg, focus: broadcast::Sender<()>) -> Self {
        Self {
            client,
            download_dir: PathBuf::from(&cfg.download_dir),
            open_in_browser: cfg.open_in_browser,
            spooler: Arc::new(CommandSpooler::new(
                cfg.print_command.clone(),
                cfg.print_args.clone(),
            )),
            focus,
        }
    }
}

#[async_trait]
impl OutputSurface for DocumentSurface {
    fn dispatch_download(&self, url: String, file_name: String) {
        let client = self.client.clone();
        let dir = self.download_dir.clone();
        let open_in_browser = self.open_in_browser;
        // Detached: the workflow has already reported success.
        tokio::spawn(async move {
            let path = match fetch_to_disk(&client, &dir, &url, &file_name).await {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("report download failed for {file_name}: {e:#}");
                    return;
                }
            };
            tracing::info!("report saved to {}", path.display());
            if open_in_browser {
                open_saved(&path).await;
            }
        });
    }

    fn attach_print_frame(&self, url: String) {
        let client = self.client.clone();
        let spooler = self.spooler.clone();
        let focus = self.focus.clone();
        tokio::spawn(async move {
            let bytes = match client.fetch_document(&url).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!("print frame failed to load: {e}");
                    return;
                }
            };
            let frame = match PrintFrame::attach(&std::env::temp_dir(), &bytes).await {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!("print frame could not be written: {e}");
                    return;
                }
            };
            tracing::info!("print frame loaded: {}", frame.path().display());
            // Listen for focus only once the frame is loaded.
            let signal = print::run_print_session(frame, spooler, focus.subscribe()).await;
            tracing::info!("print frame removed ({signal:?})");
        });
    }

    async fn save_download(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        write_download(&self.download_dir, file_name, bytes).await
    }
}

/// Fetch `url` with the session cookies and write it into `dir`.
async fn fetch_to_disk(
    client: &OdooClient,
    dir: &Path,
    url: &str,
    file_name: &str,
) -> Result<PathBuf> {
    let bytes = client.fetch_document(url).await?;
    write_download(dir, file_name, &bytes).await
}

/// Show a saved report in the system viewer.
async fn open_saved(path: &Path) {
    // The browser has no session cookie, so it only ever gets the local copy.
    let target = match tokio::fs::canonicalize(path).await {
        Ok(abs) => format!("file://{}", abs.display()),
        Err(_) => path.display().to_string(),
    };
    if let Err(e) = webbrowser::open(&target) {
        tracing::warn!("failed to open {target}: {e}");
    }
}

/// Write a file into the download directory, creating it if needed.
async fn write_download(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_report_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(report_file_name("scentopia", date), "scentopia-2026-03-09.pdf");
    }

    #[tokio::test]
    async fn test_write_download_creates_dir() {
        let dir = std::env::temp_dir().join(format!("downloads-{}", uuid::Uuid::new_v4()));
        let path = write_download(&dir, "booking_example.xlsx", b"PK")
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"PK");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_fetch_to_disk_uses_session_cookie() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/web/session/authenticate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("set-cookie", "session_id=abc; Path=/")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"uid":7}}"#)
            .create_async()
            .await;
        let report = server
            .mock("GET", "/report/pdf/cards/3")
            .match_header("cookie", "session_id=abc")
            .with_status(200)
            .with_body("%PDF-1.4")
            .create_async()
            .await;

        let mut cfg = Config::default();
        cfg.odoo.base_url = server.url();
        cfg.odoo.database = "pos".into();
        cfg.odoo.login = "cashier".into();
        cfg.odoo.password = "secret".into();
        let client = OdooClient::new(&cfg).unwrap();
        client.login(&cfg).await.unwrap();

        let dir = std::env::temp_dir().join(format!("downloads-{}", uuid::Uuid::new_v4()));
        let url = format!("{}/report/pdf/cards/3", server.url());
        let path = fetch_to_disk(&client, &dir, &url, "scentopia-2026-10-19.pdf")
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");
        report.assert_async().await;
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
