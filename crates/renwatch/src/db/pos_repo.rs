//! Post-production linkage repository: CRUD for the `pos_producao`
//! table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A post-production link row keyed by (imagem_id, status_id).
#[derive(Debug, Clone)]
pub struct PosProducaoLink {
    pub render_id: Option<i64>,
    pub imagem_id: i64,
    pub obra_id: Option<i64>,
    pub colaborador_id: Option<i64>,
    pub caminho_pasta: Option<String>,
    pub numero_bg: Option<String>,
    pub status_id: i64,
    pub responsavel_id: Option<i64>,
}

impl PosProducaoLink {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            render_id: row.get("render_id")?,
            imagem_id: row.get("imagem_id")?,
            obra_id: row.get("obra_id")?,
            colaborador_id: row.get("colaborador_id")?,
            caminho_pasta: row.get("caminho_pasta")?,
            numero_bg: row.get("numero_bg")?,
            status_id: row.get("status_id")?,
            responsavel_id: row.get("responsavel_id")?,
        })
    }
}

/// Inserts or refreshes the link row. `render_id` is kept from the
/// first insert; the remaining columns follow the latest pass.
pub fn upsert(db: &Database, link: &PosProducaoLink) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO pos_producao
             (render_id, imagem_id, obra_id, colaborador_id, caminho_pasta,
              numero_bg, status_id, responsavel_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(imagem_id, status_id) DO UPDATE SET
               obra_id = ?3,
               colaborador_id = ?4,
               caminho_pasta = ?5,
               numero_bg = ?6,
               responsavel_id = ?8",
            params![
                link.render_id,
                link.imagem_id,
                link.obra_id,
                link.colaborador_id,
                link.caminho_pasta,
                link.numero_bg,
                link.status_id,
                link.responsavel_id,
            ],
        )?;
        Ok(())
    })
}

/// Finds the link row for an (image, status group) pair.
pub fn find(
    db: &Database,
    imagem_id: i64,
    status_id: i64,
) -> Result<Option<PosProducaoLink>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT render_id, imagem_id, obra_id, colaborador_id, caminho_pasta,
                    numero_bg, status_id, responsavel_id
             FROM pos_producao WHERE imagem_id = ?1 AND status_id = ?2",
        )?;
        let mut rows = stmt.query_map(params![imagem_id, status_id], PosProducaoLink::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}
