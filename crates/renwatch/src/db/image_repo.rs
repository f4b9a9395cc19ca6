//! Image registry repository: lookups against `imagens_cliente_obra`,
//! `status_imagem` and the per-image role assignments.

use rusqlite::params;

use super::{Database, DatabaseError};

/// Role id of the render responsible on `funcao_imagem`.
pub const RENDER_ROLE_ID: i64 = 4;
/// Role id of the post-production responsible on `funcao_imagem`.
pub const POST_ROLE_ID: i64 = 5;
/// Substatus applied to an image once its render reaches approval.
pub const SUBSTATUS_RENDERED: i64 = 5;

/// Finds an image id by exact stored name.
pub fn find_id_by_exact_name(db: &Database, name: &str) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let result = conn.query_row(
            "SELECT idimagens_cliente_obra FROM imagens_cliente_obra
             WHERE imagem_nome = ?1
             ORDER BY idimagens_cliente_obra LIMIT 1",
            params![name],
            |r| r.get(0),
        );
        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    })
}

/// Finds an image whose whitespace-stripped stored name starts with the
/// given prefix. The earliest id wins when several match.
pub fn find_id_by_prefix(db: &Database, prefix: &str) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let result = conn.query_row(
            "SELECT idimagens_cliente_obra FROM imagens_cliente_obra
             WHERE REPLACE(imagem_nome, ' ', '') LIKE ?1
             ORDER BY idimagens_cliente_obra LIMIT 1",
            params![format!("{}%", prefix)],
            |r| r.get(0),
        );
        match result {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    })
}

/// Returns the stored display name of an image.
pub fn image_name(db: &Database, image_id: i64) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let result = conn.query_row(
            "SELECT imagem_nome FROM imagens_cliente_obra WHERE idimagens_cliente_obra = ?1",
            params![image_id],
            |r| r.get(0),
        );
        match result {
            Ok(name) => Ok(Some(name)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    })
}

/// Returns the work (obra) id an image belongs to.
pub fn obra_id(db: &Database, image_id: i64) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let result = conn.query_row(
            "SELECT obra_id FROM imagens_cliente_obra WHERE idimagens_cliente_obra = ?1",
            params![image_id],
            |r| r.get::<_, Option<i64>>(0),
        );
        match result {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    })
}

/// Returns the status-group id currently assigned to an image.
pub fn status_group_id(db: &Database, image_id: i64) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let result = conn.query_row(
            "SELECT status_id FROM imagens_cliente_obra WHERE idimagens_cliente_obra = ?1",
            params![image_id],
            |r| r.get::<_, Option<i64>>(0),
        );
        match result {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    })
}

/// Returns the display label of a status group.
pub fn status_group_label(db: &Database, status_id: i64) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let result = conn.query_row(
            "SELECT nome FROM status_imagem WHERE idstatus_imagem = ?1",
            params![status_id],
            |r| r.get(0),
        );
        match result {
            Ok(name) => Ok(Some(name)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    })
}

/// First responsible party registered for a role on an image, if any.
pub fn responsible_for_role(
    db: &Database,
    image_id: i64,
    role_id: i64,
) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let result = conn.query_row(
            "SELECT colaborador_id FROM funcao_imagem
             WHERE imagem_id = ?1 AND funcao_id = ?2
             ORDER BY idfuncao_imagem LIMIT 1",
            params![image_id, role_id],
            |r| r.get::<_, Option<i64>>(0),
        );
        match result {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    })
}

/// Marks the render role assignment finished with a completion timestamp.
pub fn finalize_render_role(
    db: &Database,
    image_id: i64,
    prazo: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE funcao_imagem SET status = 'Finalizado', prazo = ?2
             WHERE imagem_id = ?1 AND funcao_id = ?3",
            params![image_id, prazo, RENDER_ROLE_ID],
        )?;
        Ok(())
    })
}

/// Flips the substatus marker on an image record.
pub fn set_substatus(
    db: &Database,
    image_id: i64,
    substatus_id: i64,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE imagens_cliente_obra SET substatus_id = ?2
             WHERE idimagens_cliente_obra = ?1",
            params![image_id, substatus_id],
        )?;
        Ok(())
    })
}
