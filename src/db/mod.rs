pub mod homologacion;
pub mod rechazos;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, Result};

/// Entorno de base de datos: dos namespaces intercambiables (DEV/PRD).
/// Cada tabla vive bajo el prefijo del entorno activo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbEnvironment {
    Dev,
    Prd,
}

impl DbEnvironment {
    /// Detecta el entorno activo:
    /// 1. override explícito en la config (`RECHAZOS_ENVIRONMENT=dev|prd`)
    /// 2. prefijo del nombre del archivo de base de datos (PRD* => Prd)
    /// 3. default: Dev
    pub fn detect(config: &AppConfig) -> Self {
        if let Some(explicit) = &config.environment {
            match explicit.trim().to_lowercase().as_str() {
                "prd" | "prod" => return DbEnvironment::Prd,
                "dev" => return DbEnvironment::Dev,
                other => {
                    warn!(value = other, "entorno desconocido en config, usando DEV");
                    return DbEnvironment::Dev;
                }
            }
        }

        let file_name = config
            .database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if stem.starts_with("prd") {
            DbEnvironment::Prd
        } else {
            DbEnvironment::Dev
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            DbEnvironment::Dev => "DEV_",
            DbEnvironment::Prd => "PRD_",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DbEnvironment::Dev => "DEV",
            DbEnvironment::Prd => "PRD",
        }
    }
}

/// Maneja todas las operaciones de base de datos sobre el namespace activo
pub struct DatabaseManager {
    pool: SqlitePool,
    env: DbEnvironment,
}

impl DatabaseManager {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let env = DbEnvironment::detect(config);

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| {
                AppError::Config(format!(
                    "Database URL inválida '{}': {}",
                    config.database_url, e
                ))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.busy_timeout_secs))
            .connect_with(options)
            .await?;

        info!(
            url = %config.database_url,
            environment = env.label(),
            "conectado a base de datos"
        );

        Ok(Self { pool, env })
    }

    /// Construye un manager sobre un pool existente (tests)
    #[cfg(test)]
    pub fn with_pool(pool: SqlitePool, env: DbEnvironment) -> Self {
        Self { pool, env }
    }

    pub fn environment(&self) -> DbEnvironment {
        self.env
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Nombre de tabla calificado con el prefijo del entorno activo
    pub fn table(&self, base: &str) -> String {
        format!("{}{}", self.env.prefix(), base)
    }

    /// Verifica que la tabla de seguimiento exista en el catálogo
    pub async fn verify_table_exists(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?",
        )
        .bind(self.table("RECHAZOS_SEGUIMIENTO"))
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use tempfile::TempDir;

    /// Crea una base temporal con el esquema completo bajo el namespace DEV
    pub async fn manager() -> (TempDir, DatabaseManager) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rechazos_test.db");

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        let schema = [
            "CREATE TABLE DEV_RECHAZOS_SEGUIMIENTO (
                RECHAZOID INTEGER PRIMARY KEY,
                PAISID INTEGER,
                GRPID INTEGER,
                CASO TEXT,
                RESPONSABLE_DE_CASO TEXT,
                VALOR_HOMOLOGACION TEXT,
                MODULO TEXT,
                CAMPO_RECHAZADO TEXT,
                MOTIVO_RECHAZO TEXT,
                VALOR_RECHAZADO TEXT,
                CODIGO_BARRAS TEXT,
                SEMANAS INTEGER,
                UPDATE_AT TEXT,
                FECHA_SOLUCION_RECHAZO TEXT
            )",
            "CREATE TABLE DEV_CF_CLIENTES_SO (GRPID INTEGER, COMPARTE_EAN INTEGER)",
            "CREATE TABLE DEV_PRO_SO_HOMOLOGACION (
                PAISID INTEGER,
                COD_PROD TEXT,
                DESCRIPCION_PRODUCTO TEXT,
                GRPID INTEGER,
                PROPSTID TEXT,
                PROPSTCODBARRAS TEXT,
                ACTIVO INTEGER,
                CREATE_AT TEXT,
                UPDATE_AT TEXT,
                FECHA_VALIDO_DESDE TEXT,
                FECHA_VALIDO_HASTA TEXT
            )",
            "CREATE TABLE DEV_SUC_SO_HOMOLOGACION (
                PAISID INTEGER,
                GRPID INTEGER,
                CADID INTEGER,
                NUM_SUCURSAL TEXT,
                DESCRIPCION TEXT,
                DIRECCION TEXT,
                SUCID TEXT,
                ACTIVO INTEGER,
                CREATE_AT TEXT,
                UPDATE_AT TEXT,
                FECHA_VALIDO_DESDE TEXT,
                FECHA_VALIDO_HASTA TEXT
            )",
            "CREATE TABLE DEV_CATSEMANAS (SEMANIO INTEGER, SEMNUMERO INTEGER, SEMINICIO TEXT)",
            "CREATE TABLE DEV_VW_ESTRUCTURAPRODUCTOSTOTALPAISES (PROPSTID TEXT, PROPSTNOMBRE TEXT)",
            "CREATE TABLE DEV_VW_ESTRUCTURASUCURSALES (
                SUCID TEXT,
                GRPID INTEGER,
                CADID INTEGER,
                SUCNOMBRE TEXT,
                DIRCALLE TEXT
            )",
        ];
        for sql in schema {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }

        (dir, DatabaseManager::with_pool(pool, DbEnvironment::Dev))
    }

    /// Inserta un rechazo de seguimiento con los campos que usan los flujos
    #[allow(clippy::too_many_arguments)]
    pub async fn seed_rechazo(
        manager: &DatabaseManager,
        rechazoid: i64,
        paisid: i64,
        grpid: i64,
        campo_rechazado: &str,
        motivo: &str,
        valor_rechazado: &str,
        codigo_barras: Option<&str>,
        semanas: Option<i64>,
    ) {
        sqlx::query(
            "INSERT INTO DEV_RECHAZOS_SEGUIMIENTO
             (RECHAZOID, PAISID, GRPID, MODULO, CAMPO_RECHAZADO, MOTIVO_RECHAZO,
              VALOR_RECHAZADO, CODIGO_BARRAS, SEMANAS)
             VALUES (?, ?, ?, 'Sellout', ?, ?, ?, ?, ?)",
        )
        .bind(rechazoid)
        .bind(paisid)
        .bind(grpid)
        .bind(campo_rechazado)
        .bind(motivo)
        .bind(valor_rechazado)
        .bind(codigo_barras)
        .bind(semanas)
        .execute(manager.pool())
        .await
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(url: &str, environment: Option<&str>) -> AppConfig {
        AppConfig {
            database_url: url.to_string(),
            environment: environment.map(str::to_string),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_detect_explicit_override_wins() {
        let config = config_with("sqlite://dev_rechazos.db", Some("prd"));
        assert_eq!(DbEnvironment::detect(&config), DbEnvironment::Prd);

        let config = config_with("sqlite://prd_rechazos.db", Some("dev"));
        assert_eq!(DbEnvironment::detect(&config), DbEnvironment::Dev);
    }

    #[test]
    fn test_detect_from_file_name() {
        let config = config_with("sqlite://PRD_STG.db", None);
        assert_eq!(DbEnvironment::detect(&config), DbEnvironment::Prd);

        let config = config_with("sqlite://dev_stg.db", None);
        assert_eq!(DbEnvironment::detect(&config), DbEnvironment::Dev);
    }

    #[test]
    fn test_detect_defaults_to_dev() {
        let config = config_with("sqlite://rechazos.db", Some("staging"));
        assert_eq!(DbEnvironment::detect(&config), DbEnvironment::Dev);

        let config = config_with("sqlite://rechazos.db", None);
        assert_eq!(DbEnvironment::detect(&config), DbEnvironment::Dev);
    }

    #[test]
    fn test_table_prefix() {
        assert_eq!(DbEnvironment::Dev.prefix(), "DEV_");
        assert_eq!(DbEnvironment::Prd.prefix(), "PRD_");
    }

    #[tokio::test]
    async fn test_verify_table_exists() {
        let (_dir, manager) = testutil::manager().await;
        assert!(manager.verify_table_exists().await.unwrap());
        assert_eq!(
            manager.table("RECHAZOS_SEGUIMIENTO"),
            "DEV_RECHAZOS_SEGUIMIENTO"
        );
    }
}
