use tracing::warn;

use super::DatabaseManager;
use crate::models::{RechazoUpdate, UpdateOutcome};

impl DatabaseManager {
    /// Actualiza RECHAZOS_SEGUIMIENTO fila por fila.
    ///
    /// Una fila que falla no corta el lote: se contabiliza en `failed` y se
    /// sigue con la siguiente. Los IDs alcanzados (propios + propagados por
    /// EAN compartido) quedan en `updated_ids`, sin repetidos.
    pub async fn update_rechazos(&self, rows: &[RechazoUpdate]) -> UpdateOutcome {
        let mut outcome = UpdateOutcome {
            total: rows.len(),
            ..Default::default()
        };

        for (idx, row) in rows.iter().enumerate() {
            match self.apply_update(row).await {
                Ok(touched) => {
                    for id in touched {
                        if !outcome.updated_ids.contains(&id) {
                            outcome.updated_ids.push(id);
                            outcome.updated += 1;
                        }
                    }
                }
                Err(e) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!(
                        "Registro {} (ID: {}): {}",
                        idx + 1,
                        row.rechazoid,
                        e
                    ));
                }
            }
        }

        outcome
    }

    /// Aplica el UPDATE de una fila y devuelve los RECHAZOID alcanzados
    async fn apply_update(&self, row: &RechazoUpdate) -> sqlx::Result<Vec<i64>> {
        let table = self.table("RECHAZOS_SEGUIMIENTO");

        // SET dinámico: los campos opcionales solo se pisan si vienen en el CSV
        let mut sql = format!(
            "UPDATE {} SET UPDATE_AT = ?, FECHA_SOLUCION_RECHAZO = ?",
            table
        );
        if row.caso.is_some() {
            sql.push_str(", CASO = ?");
        }
        if row.responsable_de_caso.is_some() {
            sql.push_str(", RESPONSABLE_DE_CASO = ?");
        }
        if row.valor_homologacion.is_some() {
            sql.push_str(", VALOR_HOMOLOGACION = ?");
        }
        sql.push_str(" WHERE RECHAZOID = ?");

        let mut query = sqlx::query(&sql)
            .bind(&row.update_at)
            .bind(&row.fecha_solucion_rechazo);
        if let Some(caso) = &row.caso {
            query = query.bind(caso);
        }
        if let Some(responsable) = &row.responsable_de_caso {
            query = query.bind(responsable);
        }
        if let Some(valor) = &row.valor_homologacion {
            query = query.bind(valor);
        }

        let result = query.bind(row.rechazoid).execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            warn!(rechazoid = row.rechazoid, "RECHAZOID sin registro en seguimiento");
        }

        let mut touched = vec![row.rechazoid];
        touched.extend(self.propagate_shared_ean(row).await?);
        Ok(touched)
    }

    /// Lógica de compartir EAN: si el rechazo actualizado es de campo PROPSTID,
    /// el valor de homologación se propaga a los demás rechazos del mismo
    /// país + código de barras cuyos grupos comparten EAN.
    async fn propagate_shared_ean(&self, row: &RechazoUpdate) -> sqlx::Result<Vec<i64>> {
        let Some(valor) = &row.valor_homologacion else {
            return Ok(Vec::new());
        };

        let table = self.table("RECHAZOS_SEGUIMIENTO");
        let info: Option<(Option<String>, Option<i64>, Option<String>)> = sqlx::query_as(&format!(
            "SELECT CAMPO_RECHAZADO, PAISID, CODIGO_BARRAS FROM {} WHERE RECHAZOID = ?",
            table
        ))
        .bind(row.rechazoid)
        .fetch_optional(self.pool())
        .await?;

        let Some((Some(campo), Some(paisid), Some(codigo_barras))) = info else {
            return Ok(Vec::new());
        };
        if campo != "PROPSTID" {
            return Ok(Vec::new());
        }

        let clientes = self.table("CF_CLIENTES_SO");
        let shared_where = format!(
            "RECHAZOID != ? AND PAISID = ? AND CODIGO_BARRAS = ? \
             AND CAMPO_RECHAZADO = 'PROPSTID' \
             AND GRPID IN (SELECT GRPID FROM {} WHERE COMPARTE_EAN = 1)",
            clientes
        );

        sqlx::query(&format!(
            "UPDATE {} SET VALOR_HOMOLOGACION = ?, UPDATE_AT = ?, FECHA_SOLUCION_RECHAZO = ? WHERE {}",
            table, shared_where
        ))
        .bind(valor)
        .bind(&row.update_at)
        .bind(&row.fecha_solucion_rechazo)
        .bind(row.rechazoid)
        .bind(paisid)
        .bind(&codigo_barras)
        .execute(self.pool())
        .await?;

        let ids: Vec<i64> = sqlx::query_scalar(&format!(
            "SELECT RECHAZOID FROM {} WHERE {}",
            table, shared_where
        ))
        .bind(row.rechazoid)
        .bind(paisid)
        .bind(&codigo_barras)
        .fetch_all(self.pool())
        .await?;

        Ok(ids)
    }
}
