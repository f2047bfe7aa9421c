//! Print frames: a temporary document handed to the system spooler and
//! removed again exactly once.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::broadcast;

/// Sends a document to a printer.
#[async_trait]
pub trait Spooler: Send + Sync {
    /// Resolves once the print request has been handed off.
    async fn print(&self, document: &Path) -> Result<()>;
}

/// Spooler running an external command such as `lp <file>`.
#[derive(Debug, Clone)]
pub struct CommandSpooler {
    program: String,
    args: Vec<String>,
}

impl CommandSpooler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Spooler for CommandSpooler {
    async fn print(&self, document: &Path) -> Result<()> {
        // Keep the child off the terminal; the TUI owns it.
        let out = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(document)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;
        if !out.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(())
    }
}

/// A loaded document waiting to be printed.
#[derive(Debug)]
pub struct PrintFrame {
    path: PathBuf,
}

impl PrintFrame {
    /// Write the rendered document to a fresh file under `dir`.
    pub async fn attach(dir: &Path, document: &[u8]) -> Result<Self> {
        let path = dir.join(format!("access-codes-{}.pdf", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, document).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Teardown shared by both completion listeners of a frame.
///
/// The first [`FrameCleanup::fire`] removes the frame; later calls do nothing.
/// Dropping an unfired cleanup fires it.
#[derive(Debug)]
pub struct FrameCleanup {
    fired: AtomicBool,
    frame: PrintFrame,
}

impl FrameCleanup {
    pub fn new(frame: PrintFrame) -> Self {
        Self {
            fired: AtomicBool::new(false),
            frame,
        }
    }

    pub fn path(&self) -> &Path {
        self.frame.path()
    }

    /// Remove the frame; returns `false` when it was already removed.
    pub fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Blocking remove: this also runs from `Drop`, which cannot await.
        match std::fs::remove_file(self.frame.path()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to remove print frame {}: {e}", self.path().display()),
        }
        true
    }
}

impl Drop for FrameCleanup {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Which listener ended a print session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupSignal {
    /// The spooler finished with the document.
    AfterPrint,
    /// The terminal regained focus.
    FocusReturned,
}

/// Print a loaded frame and tear it down once the session ends.
///
/// The first of spooler completion and focus return decides the signal. The
/// print future is never dropped early: on focus return the session still
/// waits for the spooler to release the document before removing the frame.
pub async fn run_print_session(
    frame: PrintFrame,
    spooler: Arc<dyn Spooler>,
    mut focus: broadcast::Receiver<()>,
) -> CleanupSignal {
    let cleanup = FrameCleanup::new(frame);
    let print = spooler.print(cleanup.path());
    tokio::pin!(print);

    let (signal, res) = tokio::select! {
        res = &mut print => (CleanupSignal::AfterPrint, res),
        _ = wait_for_focus(&mut focus) => {
            tracing::debug!("focus returned while {} is still spooling", cleanup.path().display());
            (CleanupSignal::FocusReturned, print.await)
        }
    };
    drop(focus);
    if let Err(e) = res {
        tracing::warn!("print command failed: {e}");
    }

    cleanup.fire();
    tracing::debug!("print frame {} released on {signal:?}", cleanup.path().display());
    signal
}

/// Resolve on the next focus event; never resolves once the sender is gone.
async fn wait_for_focus(focus: &mut broadcast::Receiver<()>) {
    match focus.recv().await {
        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
        Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::atomic::AtomicUsize, time::Duration};

    /// Spooler that counts calls and reads the document after `delay`.
    struct FakeSpooler {
        calls: AtomicUsize,
        delay: Duration,
        read_document: AtomicBool,
    }

    #[async_trait]
    impl Spooler for FakeSpooler {
        async fn print(&self, document: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let bytes = tokio::fs::read(document).await?;
            self.read_document.store(bytes == b"%PDF-1.4", Ordering::SeqCst);
            Ok(())
        }
    }

    fn spooler(delay_ms: u64) -> Arc<FakeSpooler> {
        Arc::new(FakeSpooler {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(delay_ms),
            read_document: AtomicBool::new(false),
        })
    }

    #[tokio::test]
    async fn test_cleanup_fires_once() {
        let frame = PrintFrame::attach(&std::env::temp_dir(), b"%PDF-1.4").await.unwrap();
        let path = frame.path().to_path_buf();
        let cleanup = FrameCleanup::new(frame);

        assert!(cleanup.fire());
        assert!(!cleanup.fire());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_dropping_cleanup_removes_frame() {
        let frame = PrintFrame::attach(&std::env::temp_dir(), b"%PDF-1.4").await.unwrap();
        let path = frame.path().to_path_buf();
        drop(FrameCleanup::new(frame));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_session_after_print() {
        let frame = PrintFrame::attach(&std::env::temp_dir(), b"%PDF-1.4").await.unwrap();
        let path = frame.path().to_path_buf();
        let (_focus_tx, focus_rx) = broadcast::channel(4);
        let sp = spooler(0);

        let signal = run_print_session(frame, sp.clone(), focus_rx).await;
        assert_eq!(signal, CleanupSignal::AfterPrint);
        assert_eq!(sp.calls.load(Ordering::SeqCst), 1);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_session_focus_returned() {
        let frame = PrintFrame::attach(&std::env::temp_dir(), b"%PDF-1.4").await.unwrap();
        let path = frame.path().to_path_buf();
        let (focus_tx, focus_rx) = broadcast::channel(4);
        focus_tx.send(()).unwrap();
        let sp = spooler(0);

        let signal = run_print_session(frame, sp.clone(), focus_rx).await;
        assert_eq!(signal, CleanupSignal::FocusReturned);
        assert!(sp.read_document.load(Ordering::SeqCst));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_focus_before_slow_spooler_keeps_frame_until_read() {
        // Focus is already queued, the spooler only opens the file later.
        let frame = PrintFrame::attach(&std::env::temp_dir(), b"%PDF-1.4").await.unwrap();
        let path = frame.path().to_path_buf();
        let (focus_tx, focus_rx) = broadcast::channel(4);
        focus_tx.send(()).unwrap();
        let sp = spooler(200);

        let signal = run_print_session(frame, sp.clone(), focus_rx).await;
        assert_eq!(signal, CleanupSignal::FocusReturned);
        assert_eq!(sp.calls.load(Ordering::SeqCst), 1);
        assert!(sp.read_document.load(Ordering::SeqCst));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_spooler_receives_document_after_focus() {
        let dir = std::env::temp_dir();
        let copy = dir.join(format!("spooled-{}.pdf", uuid::Uuid::new_v4()));
        let frame = PrintFrame::attach(&dir, b"%PDF-1.4").await.unwrap();
        let path = frame.path().to_path_buf();
        let script = format!("sleep 0.3; cp \"$1\" '{}'", copy.display());
        let sp = Arc::new(CommandSpooler::new(
            "sh",
            vec!["-c".into(), script, "sh".into()],
        ));
        let (focus_tx, focus_rx) = broadcast::channel(4);
        focus_tx.send(()).unwrap();

        let signal = run_print_session(frame, sp, focus_rx).await;
        assert_eq!(signal, CleanupSignal::FocusReturned);
        assert_eq!(std::fs::read(&copy).unwrap(), b"%PDF-1.4");
        assert!(!path.exists());
        std::fs::remove_file(&copy).unwrap();
    }

    #[tokio::test]
    async fn test_session_both_signals_ready() {
        // Spooler done and focus pending at the same time: still one teardown.
        let frame = PrintFrame::attach(&std::env::temp_dir(), b"%PDF-1.4").await.unwrap();
        let path = frame.path().to_path_buf();
        let (focus_tx, focus_rx) = broadcast::channel(4);
        focus_tx.send(()).unwrap();
        focus_tx.send(()).unwrap();
        let sp = spooler(0);

        let signal = run_print_session(frame, sp.clone(), focus_rx).await;
        assert!(matches!(
            signal,
            CleanupSignal::AfterPrint | CleanupSignal::FocusReturned
        ));
        assert_eq!(sp.calls.load(Ordering::SeqCst), 1);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_closed_focus_channel_waits_for_spooler() {
        let frame = PrintFrame::attach(&std::env::temp_dir(), b"%PDF-1.4").await.unwrap();
        let (focus_tx, focus_rx) = broadcast::channel::<()>(4);
        drop(focus_tx);

        let signal = run_print_session(frame, spooler(0), focus_rx).await;
        assert_eq!(signal, CleanupSignal::AfterPrint);
    }
}
