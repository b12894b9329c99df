use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Configuración de la aplicación.
///
/// Orden de precedencia: defaults < `rechazos.toml` < variables de entorno
/// con prefijo `RECHAZOS_` (ej. `RECHAZOS_DATABASE_URL`, `RECHAZOS_ENVIRONMENT`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Override explícito del entorno: "dev" o "prd". Si falta, se deriva
    /// del nombre del archivo de base de datos.
    pub environment: Option<String>,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://rechazos.db".to_string(),
            environment: None,
            max_connections: 4,
            busy_timeout_secs: 5,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("rechazos.toml"))
            .merge(Env::prefixed("RECHAZOS_"))
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database_url, "sqlite://rechazos.db");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.busy_timeout_secs, 5);
        assert!(config.environment.is_none());
    }
}
