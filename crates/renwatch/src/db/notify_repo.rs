//! Notification audit repository: the `notificacoes` trail and the
//! chat display names registered per collaborator.

use rusqlite::params;

use super::{Database, DatabaseError};

/// Appends a notification audit row.
pub fn insert(db: &Database, colaborador_id: i64, mensagem: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO notificacoes (colaborador_id, mensagem) VALUES (?1, ?2)",
            params![colaborador_id, mensagem],
        )?;
        Ok(())
    })
}

/// All chat display names registered for a collaborator, in insertion
/// order. A collaborator may legitimately have several.
pub fn slack_names(db: &Database, colaborador_id: i64) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT nome_slack FROM usuario WHERE idcolaborador = ?1 ORDER BY idusuario",
        )?;
        let names: Vec<String> = stmt
            .query_map(params![colaborador_id], |row| {
                row.get::<_, Option<String>>(0)
            })?
            .filter_map(|r| r.transpose())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    })
}
