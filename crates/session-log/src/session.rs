//! Recording session lifecycle and the writer thread

use crate::{LogRow, SessionError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Closed-session report
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: Uuid,
    pub path: PathBuf,
    /// Rows written to the file, excluding the header
    pub rows: u64,
}

/// An active recording session
///
/// Owns the producer side of the row queue. The file handle lives inside
/// the writer thread and nowhere else. `finish` consumes the session, so a
/// closed session cannot accept writes by construction.
pub struct Session {
    id: Uuid,
    path: PathBuf,
    tx: Option<mpsc::Sender<LogRow>>,
    writer: Option<JoinHandle<Result<u64, SessionError>>>,
    accepted: u64,
}

impl Session {
    /// Open a new session file under `dir` and start its writer
    pub fn create(dir: &Path, queue_capacity: usize) -> Result<Self, SessionError> {
        fs::create_dir_all(dir).map_err(|e| SessionError::Create(e.to_string()))?;

        let id = Uuid::new_v4();
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("gaze_{stamp}_{}.csv", &id.to_string()[..8]));

        let file = File::create(&path).map_err(|e| SessionError::Create(e.to_string()))?;

        let (tx, rx) = mpsc::channel::<LogRow>(queue_capacity.max(1));
        let writer_path = path.clone();
        let writer = std::thread::Builder::new()
            .name("session-writer".into())
            .spawn(move || run_writer(file, rx, writer_path))
            .map_err(|e| SessionError::Create(e.to_string()))?;

        info!("Recording session {} started at {}", id, path.display());

        Ok(Self {
            id,
            path,
            tx: Some(tx),
            writer: Some(writer),
            accepted: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows accepted onto the queue so far
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Enqueue one row, blocking briefly if the queue is full
    ///
    /// Fails with `WriterClosed` once the writer has terminated (for
    /// example after an I/O error); the caller ends the session then.
    pub fn append(&mut self, row: LogRow) -> Result<(), SessionError> {
        let tx = self.tx.as_ref().ok_or(SessionError::WriterClosed)?;
        tx.blocking_send(row)
            .map_err(|_| SessionError::WriterClosed)?;
        self.accepted += 1;
        Ok(())
    }

    /// Drain the queue, flush, and close the file
    ///
    /// Consumes the session; the returned summary reports exactly the rows
    /// that reached the file.
    pub fn finish(mut self) -> Result<SessionSummary, SessionError> {
        // Dropping the sender lets the writer drain to completion.
        drop(self.tx.take());

        let writer = self.writer.take().ok_or(SessionError::WriterClosed)?;
        let rows = writer
            .join()
            .map_err(|_| SessionError::Io("writer thread panicked".into()))??;

        info!(
            "Recording session {} closed: {} rows at {}",
            self.id,
            rows,
            self.path.display()
        );

        Ok(SessionSummary {
            id: self.id,
            path: self.path.clone(),
            rows,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            // Unfinished session: the writer still drains what was
            // accepted, but the caller never saw the summary.
            warn!("Session {} dropped without finish()", self.id);
        }
    }
}

/// Writer loop: exclusive owner of the file handle
fn run_writer(
    file: File,
    mut rx: mpsc::Receiver<LogRow>,
    path: PathBuf,
) -> Result<u64, SessionError> {
    let mut out = BufWriter::new(file);

    if let Err(e) = writeln!(out, "{}", LogRow::HEADER) {
        error!("Failed to write log header at {}: {}", path.display(), e);
        return Err(SessionError::Io(e.to_string()));
    }

    let mut rows = 0u64;
    while let Some(row) = rx.blocking_recv() {
        if let Err(e) = writeln!(out, "{}", row.to_csv()) {
            error!("Log write failed at {}: {}", path.display(), e);
            // Returning drops the receiver; pending appends fail fast.
            return Err(SessionError::Io(e.to_string()));
        }
        rows += 1;
    }

    out.flush().map_err(|e| SessionError::Io(e.to_string()))?;
    Ok(rows)
}
