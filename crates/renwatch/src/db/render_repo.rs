//! Render attempt repository: CRUD for the `render_alta` table and the
//! published-preview audit rows in `previa_render`.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// The slice of a persisted render attempt the reconciler reads back.
#[derive(Debug, Clone)]
pub struct RenderAttemptRow {
    pub id: i64,
    pub status: String,
    pub previa_jpg: Option<String>,
}

impl RenderAttemptRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("idrender_alta")?,
            status: row.get("status")?,
            previa_jpg: row.get("previa_jpg")?,
        })
    }
}

/// A full render attempt as written by one reconciliation pass.
#[derive(Debug, Clone)]
pub struct NewRenderAttempt {
    pub imagem_id: i64,
    pub responsavel_id: Option<i64>,
    pub status_id: i64,
    pub status: String,
    pub data: String,
    pub computer: Option<String>,
    pub submitted: Option<String>,
    pub last_updated: Option<String>,
    pub has_error: bool,
    pub errors: Option<String>,
    pub job_folder: Option<String>,
    pub previa_jpg: Option<String>,
    pub numero_bg: Option<String>,
}

/// Fetches the most recent persisted attempt for an (image, status group)
/// pair, if any.
pub fn latest_for(
    db: &Database,
    imagem_id: i64,
    status_id: i64,
) -> Result<Option<RenderAttemptRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT idrender_alta, status, previa_jpg FROM render_alta
             WHERE imagem_id = ?1 AND status_id = ?2
             ORDER BY idrender_alta DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![imagem_id, status_id], RenderAttemptRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Inserts or refreshes the attempt row keyed by (imagem_id, status_id).
///
/// On conflict every volatile column is refreshed except `previa_jpg`,
/// which keeps its stored value when the incoming one is null so a
/// previously published preview is never erased by a later pass that
/// found no local file.
pub fn upsert(db: &Database, row: &NewRenderAttempt) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO render_alta
             (imagem_id, responsavel_id, status_id, status, data, computer, submitted,
              last_updated, has_error, errors, job_folder, previa_jpg, numero_bg)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(imagem_id, status_id) DO UPDATE SET
               responsavel_id = ?2,
               status = ?4,
               data = ?5,
               computer = ?6,
               submitted = ?7,
               last_updated = ?8,
               has_error = ?9,
               errors = ?10,
               job_folder = ?11,
               previa_jpg = COALESCE(?12, previa_jpg),
               numero_bg = ?13",
            params![
                row.imagem_id,
                row.responsavel_id,
                row.status_id,
                row.status,
                row.data,
                row.computer,
                row.submitted,
                row.last_updated,
                row.has_error,
                row.errors,
                row.job_folder,
                row.previa_jpg,
                row.numero_bg,
            ],
        )?;
        Ok(())
    })
}

/// Updates only the preview column of an existing attempt.
pub fn update_preview(db: &Database, render_id: i64, arquivo: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE render_alta SET previa_jpg = ?2 WHERE idrender_alta = ?1",
            params![render_id, arquivo],
        )?;
        Ok(())
    })
}

/// Updates only the status label of the attempt for an (image, status
/// group) pair. Used by the composite aggregation pass.
pub fn update_status(
    db: &Database,
    imagem_id: i64,
    status_id: i64,
    status: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE render_alta SET status = ?3 WHERE imagem_id = ?1 AND status_id = ?2",
            params![imagem_id, status_id, status],
        )?;
        Ok(())
    })
}

/// Records a published preview file for an attempt, once.
pub fn record_preview(db: &Database, render_id: i64, arquivo: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT OR IGNORE INTO previa_render (render_id, arquivo) VALUES (?1, ?2)",
            params![render_id, arquivo],
        )?;
        Ok(())
    })
}
