use std::collections::{BTreeSet, HashMap};

use chrono::Local;
use tracing::warn;

use super::DatabaseManager;
use crate::models::{HomologacionKey, InsertOutcome};

/// Descripción usada cuando el producto no aparece en la estructura
const DESCRIPCION_PRODUCTO_FALLBACK: &str = "Producto homologado";
/// Vigencia abierta de una homologación nueva
const FECHA_VALIDO_HASTA: &str = "2999-12-31 00:00:00";

pub(crate) const RESPONSABLE_GOBIERNO: &str = "Gobierno de Datos";
pub(crate) const MOTIVO_PRODUCTO: &str = "Producto no encontrado en tabla de homologación";
pub(crate) const MOTIVO_SUCURSAL: &str = "Sucursal no encontrada en tabla de homologación";
pub(crate) const CASO_SUCURSAL: &str = "Homologacion Sucursal";

/// SEMANAS viene como YYYYWW (ej. 202410 => año 2024, semana 10)
pub(crate) fn split_semana(semanas: i64) -> (i64, i64) {
    (semanas / 100, semanas % 100)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

/// Rechazo candidato a homologación de producto
struct ProductoCandidato {
    rechazoid: i64,
    paisid: i64,
    cod_prod: String,
    grpid: i64,
    propstid: String,
    propstcodbarras: Option<String>,
    semanas: Option<i64>,
}

/// Rechazo candidato a homologación de sucursal
struct SucursalCandidato {
    rechazoid: i64,
    paisid: i64,
    num_sucursal: String,
    sucid: String,
    semanas: Option<i64>,
}

impl DatabaseManager {
    /// Inserta homologaciones de producto a partir de los rechazos actualizados.
    ///
    /// Solo califican los rechazos de Gobierno de Datos / Sellout con campo
    /// rechazado PROPSTID y motivo de producto no homologado. Duplicados por
    /// (PAISID, COD_PROD, GRPID) se reportan sin insertar.
    pub async fn insert_homologaciones_productos(&self, ids: &[i64]) -> InsertOutcome {
        let mut outcome = InsertOutcome::default();
        if ids.is_empty() {
            return outcome;
        }

        if let Err(e) = self.insert_productos_inner(ids, &mut outcome).await {
            outcome.errors.push(format!("Error general: {}", e));
        }
        outcome
    }

    async fn insert_productos_inner(
        &self,
        ids: &[i64],
        outcome: &mut InsertOutcome,
    ) -> sqlx::Result<()> {
        let rechazos = self.table("RECHAZOS_SEGUIMIENTO");
        let sql = format!(
            "SELECT r.RECHAZOID, r.PAISID, r.VALOR_RECHAZADO, r.GRPID, \
                    r.VALOR_HOMOLOGACION, r.CODIGO_BARRAS, r.SEMANAS \
             FROM {} r \
             WHERE r.RECHAZOID IN ({}) \
               AND r.RESPONSABLE_DE_CASO = ? \
               AND r.MODULO = 'Sellout' \
               AND r.CAMPO_RECHAZADO = 'PROPSTID' \
               AND r.MOTIVO_RECHAZO = ?",
            rechazos,
            placeholders(ids.len())
        );

        let mut query = sqlx::query_as::<
            _,
            (
                i64,
                Option<i64>,
                Option<String>,
                Option<i64>,
                Option<String>,
                Option<String>,
                Option<i64>,
            ),
        >(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query
            .bind(RESPONSABLE_GOBIERNO)
            .bind(MOTIVO_PRODUCTO)
            .fetch_all(self.pool())
            .await?;

        let candidatos: Vec<ProductoCandidato> = rows
            .into_iter()
            .map(
                |(rechazoid, paisid, valor_rechazado, grpid, propstid, codbarras, semanas)| {
                    ProductoCandidato {
                        rechazoid,
                        paisid: paisid.unwrap_or_default(),
                        cod_prod: valor_rechazado.unwrap_or_default(),
                        grpid: grpid.unwrap_or_default(),
                        propstid: propstid.unwrap_or_default(),
                        propstcodbarras: codbarras,
                        semanas,
                    }
                },
            )
            .collect();

        outcome.total = candidatos.len();
        if candidatos.is_empty() {
            return Ok(());
        }

        let descripciones = self.descripciones_productos(&candidatos).await;

        for candidato in &candidatos {
            let key = HomologacionKey {
                rechazoid: candidato.rechazoid,
                paisid: candidato.paisid,
                codigo: candidato.cod_prod.clone(),
                grpid: candidato.grpid,
                valor: candidato.propstid.clone(),
            };

            match self.insert_producto(candidato, &descripciones).await {
                Ok(true) => {
                    outcome.inserted += 1;
                    outcome.inserted_details.push(key);
                }
                Ok(false) => {
                    outcome.duplicated += 1;
                    outcome.duplicates.push(key);
                }
                Err(e) => {
                    outcome.failed += 1;
                    outcome
                        .errors
                        .push(format!("RECHAZOID {}: {}", candidato.rechazoid, e));
                }
            }
        }

        Ok(())
    }

    /// Descripciones de producto desde la vista de estructura.
    /// Si la consulta falla se sigue con el fallback para todos.
    async fn descripciones_productos(
        &self,
        candidatos: &[ProductoCandidato],
    ) -> HashMap<String, String> {
        let propstids: BTreeSet<&str> = candidatos
            .iter()
            .filter(|c| !c.propstid.is_empty())
            .map(|c| c.propstid.as_str())
            .collect();
        if propstids.is_empty() {
            return HashMap::new();
        }

        let vista = self.table("VW_ESTRUCTURAPRODUCTOSTOTALPAISES");
        let sql = format!(
            "SELECT PROPSTID, PROPSTNOMBRE FROM {} WHERE PROPSTID IN ({})",
            vista,
            placeholders(propstids.len())
        );
        let mut query = sqlx::query_as::<_, (String, Option<String>)>(&sql);
        for propstid in &propstids {
            query = query.bind(*propstid);
        }

        match query.fetch_all(self.pool()).await {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|(id, nombre)| nombre.map(|n| (id, n)))
                .collect(),
            Err(e) => {
                warn!(error = %e, "no se pudieron obtener descripciones de productos");
                HashMap::new()
            }
        }
    }

    /// Devuelve true si insertó, false si ya existía
    async fn insert_producto(
        &self,
        candidato: &ProductoCandidato,
        descripciones: &HashMap<String, String>,
    ) -> sqlx::Result<bool> {
        let tabla = self.table("PRO_SO_HOMOLOGACION");

        let existentes: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE PAISID = ? AND COD_PROD = ? AND GRPID = ?",
            tabla
        ))
        .bind(candidato.paisid)
        .bind(&candidato.cod_prod)
        .bind(candidato.grpid)
        .fetch_one(self.pool())
        .await?;

        if existentes > 0 {
            return Ok(false);
        }

        let descripcion = descripciones
            .get(&candidato.propstid)
            .map(String::as_str)
            .unwrap_or(DESCRIPCION_PRODUCTO_FALLBACK);
        let fecha_valido_desde = self.fecha_valido_desde(candidato.semanas).await;
        let fecha_actual = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        sqlx::query(&format!(
            "INSERT INTO {} \
             (PAISID, COD_PROD, DESCRIPCION_PRODUCTO, GRPID, PROPSTID, PROPSTCODBARRAS, \
              ACTIVO, CREATE_AT, UPDATE_AT, FECHA_VALIDO_DESDE, FECHA_VALIDO_HASTA) \
             VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
            tabla
        ))
        .bind(candidato.paisid)
        .bind(&candidato.cod_prod)
        .bind(descripcion)
        .bind(candidato.grpid)
        .bind(&candidato.propstid)
        .bind(candidato.propstcodbarras.as_deref())
        .bind(&fecha_actual)
        .bind(&fecha_actual)
        .bind(fecha_valido_desde.as_deref())
        .bind(FECHA_VALIDO_HASTA)
        .execute(self.pool())
        .await?;

        Ok(true)
    }

    /// Inserta homologaciones de sucursal a partir de los rechazos actualizados.
    ///
    /// Califican los rechazos de campo SUCID con motivo de sucursal no
    /// homologada, caso "Homologacion Sucursal" y valor de homologación
    /// cargado. La estructura de la sucursal se resuelve por SUCID; si no
    /// aparece, la fila se reporta como fallida.
    pub async fn insert_homologaciones_sucursales(&self, ids: &[i64]) -> InsertOutcome {
        let mut outcome = InsertOutcome::default();
        if ids.is_empty() {
            return outcome;
        }

        if let Err(e) = self.insert_sucursales_inner(ids, &mut outcome).await {
            outcome.errors.push(format!("Error general: {}", e));
        }
        outcome
    }

    async fn insert_sucursales_inner(
        &self,
        ids: &[i64],
        outcome: &mut InsertOutcome,
    ) -> sqlx::Result<()> {
        let rechazos = self.table("RECHAZOS_SEGUIMIENTO");
        let sql = format!(
            "SELECT r.RECHAZOID, r.PAISID, r.VALOR_RECHAZADO, r.VALOR_HOMOLOGACION, r.SEMANAS \
             FROM {} r \
             WHERE r.RECHAZOID IN ({}) \
               AND r.RESPONSABLE_DE_CASO = ? \
               AND r.MODULO = 'Sellout' \
               AND r.CAMPO_RECHAZADO = 'SUCID' \
               AND r.MOTIVO_RECHAZO = ? \
               AND r.CASO = ? \
               AND r.VALOR_HOMOLOGACION IS NOT NULL",
            rechazos,
            placeholders(ids.len())
        );

        let mut query = sqlx::query_as::<
            _,
            (i64, Option<i64>, Option<String>, Option<String>, Option<i64>),
        >(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query
            .bind(RESPONSABLE_GOBIERNO)
            .bind(MOTIVO_SUCURSAL)
            .bind(CASO_SUCURSAL)
            .fetch_all(self.pool())
            .await?;

        let candidatos: Vec<SucursalCandidato> = rows
            .into_iter()
            .map(|(rechazoid, paisid, valor_rechazado, valor_homologacion, semanas)| {
                SucursalCandidato {
                    rechazoid,
                    paisid: paisid.unwrap_or_default(),
                    num_sucursal: valor_rechazado.unwrap_or_default(),
                    sucid: valor_homologacion.unwrap_or_default(),
                    semanas,
                }
            })
            .collect();

        outcome.total = candidatos.len();

        for candidato in &candidatos {
            match self.insert_sucursal(candidato).await {
                Ok(InsertResult::Inserted(grpid)) => {
                    outcome.inserted += 1;
                    outcome.inserted_details.push(HomologacionKey {
                        rechazoid: candidato.rechazoid,
                        paisid: candidato.paisid,
                        codigo: candidato.num_sucursal.clone(),
                        grpid,
                        valor: candidato.sucid.clone(),
                    });
                }
                Ok(InsertResult::Duplicated(grpid)) => {
                    outcome.duplicated += 1;
                    outcome.duplicates.push(HomologacionKey {
                        rechazoid: candidato.rechazoid,
                        paisid: candidato.paisid,
                        codigo: candidato.num_sucursal.clone(),
                        grpid,
                        valor: candidato.sucid.clone(),
                    });
                }
                Ok(InsertResult::SinEstructura) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!(
                        "RECHAZOID {}: No se encontró información para SUCID='{}'",
                        candidato.rechazoid, candidato.sucid
                    ));
                }
                Err(e) => {
                    outcome.failed += 1;
                    outcome
                        .errors
                        .push(format!("RECHAZOID {}: {}", candidato.rechazoid, e));
                }
            }
        }

        Ok(())
    }

    async fn insert_sucursal(&self, candidato: &SucursalCandidato) -> sqlx::Result<InsertResult> {
        let vista = self.table("VW_ESTRUCTURASUCURSALES");
        let estructura: Option<(i64, i64, Option<String>, Option<String>)> =
            sqlx::query_as(&format!(
                "SELECT GRPID, CADID, SUCNOMBRE, DIRCALLE FROM {} WHERE SUCID = ? LIMIT 1",
                vista
            ))
            .bind(&candidato.sucid)
            .fetch_optional(self.pool())
            .await?;

        let Some((grpid, cadid, sucnombre, dircalle)) = estructura else {
            return Ok(InsertResult::SinEstructura);
        };

        let tabla = self.table("SUC_SO_HOMOLOGACION");
        let existentes: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE PAISID = ? AND NUM_SUCURSAL = ? AND GRPID = ?",
            tabla
        ))
        .bind(candidato.paisid)
        .bind(&candidato.num_sucursal)
        .bind(grpid)
        .fetch_one(self.pool())
        .await?;

        if existentes > 0 {
            return Ok(InsertResult::Duplicated(grpid));
        }

        let descripcion = sucnombre.filter(|s| !s.trim().is_empty());
        let direccion = dircalle.filter(|s| !s.trim().is_empty());
        let fecha_valido_desde = self.fecha_valido_desde(candidato.semanas).await;
        let fecha_actual = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        sqlx::query(&format!(
            "INSERT INTO {} \
             (PAISID, GRPID, CADID, NUM_SUCURSAL, DESCRIPCION, DIRECCION, SUCID, \
              ACTIVO, CREATE_AT, UPDATE_AT, FECHA_VALIDO_DESDE, FECHA_VALIDO_HASTA) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
            tabla
        ))
        .bind(candidato.paisid)
        .bind(grpid)
        .bind(cadid)
        .bind(&candidato.num_sucursal)
        .bind(descripcion.as_deref())
        .bind(direccion.as_deref())
        .bind(&candidato.sucid)
        .bind(&fecha_actual)
        .bind(&fecha_actual)
        .bind(fecha_valido_desde.as_deref())
        .bind(FECHA_VALIDO_HASTA)
        .execute(self.pool())
        .await?;

        Ok(InsertResult::Inserted(grpid))
    }

    /// Resuelve el inicio de la semana YYYYWW contra CATSEMANAS.
    /// Semana ausente o no catalogada => None (la homologación queda sin
    /// FECHA_VALIDO_DESDE, igual que siempre).
    async fn fecha_valido_desde(&self, semanas: Option<i64>) -> Option<String> {
        let semanas = semanas?;
        let (semanio, semnumero) = split_semana(semanas);

        let tabla = self.table("CATSEMANAS");
        match sqlx::query_scalar::<_, String>(&format!(
            "SELECT SEMINICIO FROM {} WHERE SEMANIO = ? AND SEMNUMERO = ?",
            tabla
        ))
        .bind(semanio)
        .bind(semnumero)
        .fetch_optional(self.pool())
        .await
        {
            Ok(inicio) => inicio,
            Err(e) => {
                warn!(error = %e, semanas, "no se pudo resolver FECHA_VALIDO_DESDE");
                None
            }
        }
    }
}

enum InsertResult {
    Inserted(i64),
    Duplicated(i64),
    SinEstructura,
}
