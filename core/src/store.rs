//! SQLite notification journal.
//!
//! RULE: Only store.rs talks to the database.
//! The journal is append-only. Nothing in the crate ever loads it back
//! into a running simulation; it exists for post-run inspection.
//! Only the journal-writer thread touches the connection once a
//! JournalSink owns the store.

use rusqlite::{params, types::Type, Connection};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    mpsc,
};
use std::thread::{self, JoinHandle};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use crate::{
    error::{SimError, SimResult},
    event::{EventRecord, SimEvent},
    notify::NotificationSink,
    types::{Epoch, RunId},
};

/// Fresh random run id.
pub fn new_run_id() -> RunId {
    Uuid::new_v4().to_string()
}

pub struct JournalStore {
    conn: Connection,
}

impl JournalStore {
    /// Open (or create) the journal database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_journal.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, version, started_at) VALUES (?1, ?2, ?3)",
            params![run_id, version, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    // ── Event journal ──────────────────────────────────────────

    pub fn append(&self, record: &EventRecord) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_journal (run_id, seq, epoch, event_type, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.run_id,
                record.seq as i64,
                record.epoch.map(|e| e as i64),
                record.event_type,
                record.payload,
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Every journaled event of `epoch`, in append order.
    pub fn events_for_epoch(&self, run_id: &str, epoch: Epoch) -> SimResult<Vec<EventRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, seq, epoch, event_type, payload, recorded_at
             FROM event_journal WHERE run_id = ?1 AND epoch = ?2
             ORDER BY seq ASC"
        )?;
        let records = stmt.query_map(params![run_id, epoch as i64], |row| {
            let recorded_at: String = row.get(6)?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?
                .with_timezone(&Utc);
            Ok(EventRecord {
                id:          Some(row.get(0)?),
                run_id:      row.get(1)?,
                seq:         row.get::<_, i64>(2)? as u64,
                epoch:       row.get::<_, Option<i64>>(3)?.map(|e| e as u64),
                event_type:  row.get(4)?,
                payload:     row.get(5)?,
                recorded_at,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self, run_id: &str) -> SimResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM event_journal WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn count_of_type(&self, run_id: &str, event_type: &str) -> SimResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM event_journal WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

type StoreJob = Box<dyn FnOnce(&JournalStore) + Send>;

enum JournalCommand {
    Append(EventRecord),
    Run(StoreJob),
    Shutdown,
}

/// Journals every event it is notified of.
///
/// `notify` only encodes the event and hands it to the journal-writer
/// thread, which owns the store and does every insert. Write failures are
/// logged and dropped; a broken journal never stalls a worker.
pub struct JournalSink {
    tx:     mpsc::Sender<JournalCommand>,
    handle: Option<JoinHandle<()>>,
    run_id: RunId,
    seq:    AtomicU64,
}

impl JournalSink {
    /// Registers `run_id` in `store` (which must already be migrated) and
    /// moves the store onto its writer thread.
    pub fn new(store: JournalStore, run_id: RunId) -> SimResult<Self> {
        store.insert_run(&run_id, env!("CARGO_PKG_VERSION"))?;
        let (tx, rx) = mpsc::channel::<JournalCommand>();
        let handle = thread::Builder::new()
            .name("journal-writer".into())
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    match command {
                        JournalCommand::Append(record) => {
                            if let Err(err) = store.append(&record) {
                                log::warn!("journal: append of seq {} failed: {err}", record.seq);
                            }
                        }
                        JournalCommand::Run(job) => job(&store),
                        JournalCommand::Shutdown => break,
                    }
                }
                log::debug!("journal writer stopped");
            })
            .map_err(|source| SimError::WorkerSpawn { name: "journal-writer", source })?;

        Ok(Self {
            tx,
            handle: Some(handle),
            run_id,
            seq: AtomicU64::new(0),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run `f` against the store on the writer thread and wait for its
    /// answer. Every event notified before the call is already written.
    pub fn query<T, F>(&self, f: F) -> SimResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&JournalStore) -> SimResult<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        let job: StoreJob = Box::new(move |store| {
            let _ = reply_tx.send(f(store));
        });
        self.tx
            .send(JournalCommand::Run(job))
            .map_err(|_| SimError::JournalClosed)?;
        reply_rx.recv().map_err(|_| SimError::JournalClosed)?
    }

    /// Rows journaled so far for this run.
    pub fn count(&self) -> SimResult<i64> {
        let run_id = self.run_id.clone();
        self.query(move |store| store.count(&run_id))
    }

    pub fn count_of_type(&self, event_type: &str) -> SimResult<i64> {
        let run_id = self.run_id.clone();
        let event_type = event_type.to_string();
        self.query(move |store| store.count_of_type(&run_id, &event_type))
    }

    pub fn events_for_epoch(&self, epoch: Epoch) -> SimResult<Vec<EventRecord>> {
        let run_id = self.run_id.clone();
        self.query(move |store| store.events_for_epoch(&run_id, epoch))
    }
}

impl NotificationSink for JournalSink {
    fn notify(&self, event: SimEvent) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let record = match EventRecord::new(&self.run_id, seq, &event) {
            Ok(record) => record,
            Err(err) => {
                log::warn!("journal: cannot encode {event:?}: {err}");
                return;
            }
        };
        if self.tx.send(JournalCommand::Append(record)).is_err() {
            log::warn!("journal writer is gone; event seq {seq} dropped");
        }
    }
}

impl Drop for JournalSink {
    fn drop(&mut self) {
        let _ = self.tx.send(JournalCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("journal writer thread panicked");
            }
        }
    }
}
