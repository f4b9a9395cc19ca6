//! Test harness for isolated reconciliation runs.
//!
//! `TestHarness` provides a complete environment for driving the engine
//! end to end: a temporary jobs tree and render-output tree, an
//! in-memory database with the full schema, and recording fakes for the
//! preview transport and the chat gateway.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::params;
use tempfile::TempDir;

use renwatch::db::Database;
use renwatch::engine::{Reconciler, RunOptions, RunSummary};
use renwatch::notify::{ChatGateway, NotifyError};
use renwatch::publish::{PreviewTransport, TransferError};
use renwatch::scanner::JobFolderScanner;
use renwatch::DuplicatePolicy;

/// Status-group id seeded for ordinary single-job images.
pub const GROUP_ALTA: i64 = 2;
/// Status-group id seeded for composite images.
pub const GROUP_P00: i64 = 3;

/// Preview transport fake recording every upload it was asked for.
#[derive(Default)]
pub struct RecordingTransport {
    pub uploads: RefCell<Vec<String>>,
    pub fail: Cell<bool>,
}

impl PreviewTransport for RecordingTransport {
    fn upload(&self, local: &Path, remote: &str) -> Result<(), TransferError> {
        if self.fail.get() {
            return Err(TransferError::ReadLocal {
                path: local.to_path_buf(),
                source: std::io::Error::other("simulated transfer failure"),
            });
        }
        self.uploads.borrow_mut().push(remote.to_string());
        Ok(())
    }
}

/// Chat gateway fake with a fixed display-name directory.
#[derive(Default)]
pub struct RecordingChat {
    pub users: HashMap<String, String>,
    pub broadcasts: RefCell<Vec<String>>,
    pub dms: RefCell<Vec<(String, String)>>,
}

impl RecordingChat {
    pub fn with_user(mut self, display_name: &str, id: &str) -> Self {
        self.users.insert(display_name.to_string(), id.to_string());
        self
    }
}

impl ChatGateway for RecordingChat {
    fn broadcast(&self, message: &str) -> Result<(), NotifyError> {
        self.broadcasts.borrow_mut().push(message.to_string());
        Ok(())
    }

    fn resolve_user(&self, display_name: &str) -> Result<Option<String>, NotifyError> {
        Ok(self.users.get(display_name).cloned())
    }

    fn direct_message(&self, user_id: &str, message: &str) -> Result<(), NotifyError> {
        self.dms
            .borrow_mut()
            .push((user_id.to_string(), message.to_string()));
        Ok(())
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    /// Root the scanner walks.
    pub jobs_root: PathBuf,
    /// Root the manifests' output paths point into.
    pub outputs_root: PathBuf,
    pub db: Database,
    pub transport: RecordingTransport,
    pub chat: RecordingChat,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let jobs_root = temp_dir.path().join("jobs");
        let outputs_root = temp_dir.path().join("renders");
        std::fs::create_dir_all(&jobs_root).unwrap();
        std::fs::create_dir_all(&outputs_root).unwrap();

        let db = Database::open_in_memory().expect("Failed to open test database");
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO status_imagem (idstatus_imagem, nome) VALUES (?1, 'Alta')",
                params![GROUP_ALTA],
            )?;
            conn.execute(
                "INSERT INTO status_imagem (idstatus_imagem, nome) VALUES (?1, 'P00')",
                params![GROUP_P00],
            )?;
            Ok(())
        })
        .unwrap();

        Self {
            temp_dir,
            jobs_root,
            outputs_root,
            db,
            transport: RecordingTransport::default(),
            chat: RecordingChat::default(),
        }
    }

    pub fn with_chat_user(mut self, display_name: &str, id: &str) -> Self {
        self.chat = std::mem::take(&mut self.chat).with_user(display_name, id);
        self
    }

    /// Runs one full reconciliation over the jobs root.
    pub fn run(&self) -> RunSummary {
        self.run_with(false)
    }

    /// Like [`run`](Self::run), but rolls the transaction back.
    pub fn run_dry(&self) -> RunSummary {
        self.run_with(true)
    }

    fn run_with(&self, dry_run: bool) -> RunSummary {
        let scanner = JobFolderScanner::new(&self.jobs_root, "ANIMA");
        let options = RunOptions {
            composite_group: "P00".to_string(),
            base_path: "/www/sistema/uploads/renders/".to_string(),
            preview_prefix: "previas/".to_string(),
            duplicate_policy: DuplicatePolicy::FanOut,
            dry_run,
        };
        Reconciler::new(&self.db, &self.transport, &self.chat, options)
            .run(&scanner)
            .expect("Reconciliation run failed")
    }

    // --- seeding -------------------------------------------------------

    pub fn seed_image(&self, name: &str, status_id: i64) -> i64 {
        self.db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO imagens_cliente_obra
                     (imagem_nome, obra_id, status_id, substatus_id)
                     VALUES (?1, 10, ?2, 1)",
                    params![name, status_id],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .unwrap()
    }

    pub fn seed_role(&self, imagem_id: i64, funcao_id: i64, colaborador_id: i64) {
        self.db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO funcao_imagem (imagem_id, funcao_id, colaborador_id, status)
                     VALUES (?1, ?2, ?3, 'Em andamento')",
                    params![imagem_id, funcao_id, colaborador_id],
                )?;
                Ok(())
            })
            .unwrap()
    }

    pub fn seed_slack_name(&self, colaborador_id: i64, name: &str) {
        self.db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO usuario (idcolaborador, nome_slack) VALUES (?1, ?2)",
                    params![colaborador_id, name],
                )?;
                Ok(())
            })
            .unwrap()
    }

    /// Seeds a prior render attempt as an earlier run would have left it.
    pub fn seed_attempt(
        &self,
        imagem_id: i64,
        status_id: i64,
        status: &str,
        previa_jpg: Option<&str>,
    ) {
        self.db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO render_alta (imagem_id, status_id, status, previa_jpg)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![imagem_id, status_id, status, previa_jpg],
                )?;
                Ok(())
            })
            .unwrap()
    }

    // --- assertions ----------------------------------------------------

    /// The persisted (status, preview) pair for an attempt, if any.
    pub fn attempt(&self, imagem_id: i64, status_id: i64) -> Option<(String, Option<String>)> {
        self.db
            .with_conn(|conn| {
                let result = conn.query_row(
                    "SELECT status, previa_jpg FROM render_alta
                     WHERE imagem_id = ?1 AND status_id = ?2",
                    params![imagem_id, status_id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                );
                match result {
                    Ok(pair) => Ok(Some(pair)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .unwrap()
    }

    pub fn attempt_status(&self, imagem_id: i64, status_id: i64) -> Option<String> {
        self.attempt(imagem_id, status_id).map(|(status, _)| status)
    }

    pub fn notification_count(&self) -> i64 {
        self.count("SELECT COUNT(*) FROM notificacoes")
    }

    pub fn pos_producao_count(&self) -> i64 {
        self.count("SELECT COUNT(*) FROM pos_producao")
    }

    pub fn substatus(&self, imagem_id: i64) -> i64 {
        self.db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT substatus_id FROM imagens_cliente_obra
                     WHERE idimagens_cliente_obra = ?1",
                    params![imagem_id],
                    |r| r.get(0),
                )?)
            })
            .unwrap()
    }

    pub fn render_role_status(&self, imagem_id: i64) -> String {
        self.db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT status FROM funcao_imagem
                     WHERE imagem_id = ?1 AND funcao_id = 4",
                    params![imagem_id],
                    |r| r.get(0),
                )?)
            })
            .unwrap()
    }

    fn count(&self, sql: &str) -> i64 {
        self.db
            .with_conn(|conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
            .unwrap()
    }
}
