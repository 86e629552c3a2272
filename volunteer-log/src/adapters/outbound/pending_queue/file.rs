use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use tokio::{
    io::AsyncWriteExt,
    sync::{Mutex, MutexGuard},
};

use crate::domain::{models::SheetRow, ports::outbound::PendingQueue, PersistenceError};

const QUEUE_FILE: &str = "pending.json";
const JOURNAL_FILE: &str = "pending.inflight.json";
const LOCK_FILE: &str = "pending.lock";
const SYNC_LOCK_FILE: &str = "pending.sync.lock";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Pending queue stored as a JSON array of rows in a single file.
///
/// Every operation holds an in-process mutex plus an OS lock on
/// `pending.lock`, so appends from concurrent submissions, in this process or
/// another one, can't overwrite each other. Files are replaced with
/// write-then-rename.
///
/// Drained rows sit in a journal file until they are settled. Between
/// `drain` and `settle` the queue also holds `pending.sync.lock`, which keeps
/// other processes from syncing the same rows. A journal left behind by a
/// crash is put back in front of the queue on [`open`].
///
/// [`open`]: FilePendingQueue::open
#[derive(Debug)]
pub struct FilePendingQueue {
    queue_path: PathBuf,
    journal_path: PathBuf,
    lock_path: PathBuf,
    sync_lock_path: PathBuf,
    local: Mutex<()>,
    sync_lock: Mutex<Option<File>>,
}

/// Held for the duration of one queue operation. Dropping it releases both locks.
struct QueueGuard<'a> {
    _file: File,
    _local: MutexGuard<'a, ()>,
}

impl FilePendingQueue {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            PersistenceError::write_failed(format!("create {}: {}", dir.display(), e))
        })?;

        let queue = Self {
            queue_path: dir.join(QUEUE_FILE),
            journal_path: dir.join(JOURNAL_FILE),
            lock_path: dir.join(LOCK_FILE),
            sync_lock_path: dir.join(SYNC_LOCK_FILE),
            local: Mutex::new(()),
            sync_lock: Mutex::new(None),
        };
        queue.recover_in_flight().await?;
        Ok(queue)
    }

    pub fn path(&self) -> &Path {
        &self.queue_path
    }

    async fn lock(&self) -> Result<QueueGuard<'_>, PersistenceError> {
        let local = self.local.lock().await;
        let file = lock_exclusive(self.lock_path.clone()).await?;
        Ok(QueueGuard {
            _file: file,
            _local: local,
        })
    }

    async fn recover_in_flight(&self) -> Result<(), PersistenceError> {
        if !tokio::fs::try_exists(&self.journal_path)
            .await
            .unwrap_or(false)
        {
            return Ok(());
        }

        // A journal with a live owner belongs to a sync still in progress.
        let Some(_sync) = try_lock_exclusive(&self.sync_lock_path)? else {
            tracing::debug!("Another sync owns the in-flight journal, leaving it alone");
            return Ok(());
        };
        let _guard = self.lock().await?;

        let in_flight = read_or_reset(&self.journal_path).await?;
        if !in_flight.is_empty() {
            tracing::warn!(
                "Recovering {} rows left in flight by an interrupted sync",
                in_flight.len()
            );
        }
        self.settle_locked(in_flight).await
    }

    async fn settle_locked(&self, mut undelivered: Vec<SheetRow>) -> Result<(), PersistenceError> {
        let mut queued = read_or_reset(&self.queue_path).await?;
        undelivered.append(&mut queued);
        write_rows(&self.queue_path, &undelivered).await?;
        remove_if_exists(&self.journal_path).await
    }
}

#[async_trait]
impl PendingQueue for FilePendingQueue {
    async fn append(&self, row: SheetRow) -> Result<(), PersistenceError> {
        let _guard = self.lock().await?;

        let mut rows = read_or_reset(&self.queue_path).await?;
        rows.push(row);
        write_rows(&self.queue_path, &rows).await?;

        tracing::debug!("{} rows pending in {}", rows.len(), self.queue_path.display());
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<SheetRow>, PersistenceError> {
        let _guard = self.lock().await?;

        let mut rows = read_or_reset(&self.journal_path).await?;
        rows.extend(read_or_reset(&self.queue_path).await?);
        Ok(rows)
    }

    async fn drain(&self) -> Result<Vec<SheetRow>, PersistenceError> {
        // Taken before the queue lock; waits for a sync in another process to settle.
        let mut sync = self.sync_lock.lock().await;
        if sync.is_none() {
            *sync = Some(lock_exclusive(self.sync_lock_path.clone()).await?);
        }
        let _guard = self.lock().await?;

        let mut rows = read_or_reset(&self.journal_path).await?;
        rows.extend(read_or_reset(&self.queue_path).await?);

        write_rows(&self.journal_path, &rows).await?;
        remove_if_exists(&self.queue_path).await?;
        Ok(rows)
    }

    async fn settle(&self, undelivered: Vec<SheetRow>) -> Result<(), PersistenceError> {
        let result = {
            let _guard = self.lock().await?;
            self.settle_locked(undelivered).await
        };
        self.sync_lock.lock().await.take();
        result
    }
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

/// Block (off the runtime) until this process owns `path` exclusively.
async fn lock_exclusive(path: PathBuf) -> Result<File, PersistenceError> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || {
        let file = open_lock_file(&path)?;
        file.lock_exclusive()?;
        Ok::<_, std::io::Error>(file)
    })
    .await
    .map_err(|e| PersistenceError::write_failed(format!("lock {}: {}", display, e)))?
    .map_err(|e| PersistenceError::write_failed(format!("lock {}: {}", display, e)))
}

/// `None` when someone else holds the lock.
fn try_lock_exclusive(path: &Path) -> Result<Option<File>, PersistenceError> {
    let file = open_lock_file(path)
        .map_err(|e| PersistenceError::write_failed(format!("lock {}: {}", path.display(), e)))?;
    match file.try_lock_exclusive() {
        Ok(true) => Ok(Some(file)),
        Ok(false) | Err(_) => Ok(None),
    }
}

/// Missing or blank files read as an empty queue.
async fn read_rows(path: &Path) -> Result<Vec<SheetRow>, PersistenceError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(PersistenceError::StorageCorruption(format!(
                "read {}: {}",
                path.display(),
                e
            )))
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        PersistenceError::StorageCorruption(format!("parse {}: {}", path.display(), e))
    })
}

/// Like [`read_rows`], but an unreadable file is moved aside and the queue
/// starts over empty, so new entries can still be saved.
async fn read_or_reset(path: &Path) -> Result<Vec<SheetRow>, PersistenceError> {
    match read_rows(path).await {
        Err(PersistenceError::StorageCorruption(reason)) => {
            let backup = quarantine_path(path);
            tracing::warn!(
                "Pending queue is unreadable ({}), moving it to {} and starting empty",
                reason,
                backup.display()
            );
            tokio::fs::rename(path, &backup).await.map_err(|e| {
                PersistenceError::write_failed(format!(
                    "move unreadable {} aside: {}",
                    path.display(),
                    e
                ))
            })?;
            Ok(Vec::new())
        }
        other => other,
    }
}

/// `<name>.corrupt-<unix ts>`, with a `-<n>` suffix if that backup already exists.
fn quarantine_path(path: &Path) -> PathBuf {
    let name = file_name(path);
    let stamp = time::OffsetDateTime::now_utc().unix_timestamp();
    let mut candidate = path.with_file_name(format!("{}.corrupt-{}", name, stamp));
    let mut n = 1;
    while candidate.exists() {
        candidate = path.with_file_name(format!("{}.corrupt-{}-{}", name, stamp, n));
        n += 1;
    }
    candidate
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| QUEUE_FILE.to_string())
}

/// Unique per process and per write, so concurrent writers never share a temp file.
fn temp_path(path: &Path) -> PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(
        "{}.{}-{}.tmp",
        file_name(path),
        std::process::id(),
        n
    ))
}

async fn write_rows(path: &Path, rows: &[SheetRow]) -> Result<(), PersistenceError> {
    let json = serde_json::to_vec(rows)
        .map_err(|e| PersistenceError::write_failed(format!("serialize rows: {}", e)))?;
    let tmp = temp_path(path);

    let write = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    };

    write
        .await
        .map_err(|e| PersistenceError::write_failed(format!("write {}: {}", path.display(), e)))
}

async fn remove_if_exists(path: &Path) -> Result<(), PersistenceError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PersistenceError::write_failed(format!(
            "remove {}: {}",
            path.display(),
            e
        ))),
    }
}
