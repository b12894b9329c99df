use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Columnas requeridas en el archivo CSV de entrada (matching case-insensitive)
pub const REQUIRED_COLUMNS: &[&str] = &[
    "IDRechazo",
    "Caso",
    "Responsable de Caso",
    "Valor homologación",
];

/// Mapeo de columna CSV -> columna de base de datos
pub const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("IDRechazo", "RECHAZOID"),
    ("Caso", "CASO"),
    ("Responsable de Caso", "RESPONSABLE_DE_CASO"),
    ("Valor homologación", "VALOR_HOMOLOGACION"),
];

lazy_static! {
    /// IDRechazo debe ser un entero (se admiten espacios alrededor)
    pub static ref NUMERIC_ID_RE: Regex = Regex::new(r"^\s*\d+\s*$").unwrap();
}

/// Fila normalizada, lista para aplicar contra RECHAZOS_SEGUIMIENTO
#[derive(Debug, Clone, Serialize)]
pub struct RechazoUpdate {
    pub rechazoid: i64,
    pub caso: Option<String>,
    pub responsable_de_caso: Option<String>,
    pub valor_homologacion: Option<String>,
    pub update_at: String,
    pub fecha_solucion_rechazo: String,
}

/// Resultado de la fase de UPDATE sobre RECHAZOS_SEGUIMIENTO
#[derive(Debug, Default, Serialize)]
pub struct UpdateOutcome {
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub updated_ids: Vec<i64>,
}

/// Clave de una homologación insertada o duplicada (producto o sucursal)
#[derive(Debug, Clone, Serialize)]
pub struct HomologacionKey {
    pub rechazoid: i64,
    pub paisid: i64,
    /// COD_PROD para productos, NUM_SUCURSAL para sucursales
    pub codigo: String,
    pub grpid: i64,
    /// PROPSTID para productos, SUCID para sucursales
    pub valor: String,
}

/// Resultado de una fase de INSERT condicional de homologaciones
#[derive(Debug, Default, Serialize)]
pub struct InsertOutcome {
    pub total: usize,
    pub inserted: usize,
    pub duplicated: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub duplicates: Vec<HomologacionKey>,
    pub inserted_details: Vec<HomologacionKey>,
}

/// Resumen completo de una corrida de `apply` (serializable con --json)
#[derive(Debug, Serialize)]
pub struct ApplySummary {
    pub environment: String,
    pub update: UpdateOutcome,
    pub homologaciones_productos: Option<InsertOutcome>,
    pub homologaciones_sucursales: Option<InsertOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_id_regex() {
        assert!(NUMERIC_ID_RE.is_match("12345"));
        assert!(NUMERIC_ID_RE.is_match(" 42 "));

        assert!(!NUMERIC_ID_RE.is_match(""));
        assert!(!NUMERIC_ID_RE.is_match("ABC-123"));
        assert!(!NUMERIC_ID_RE.is_match("12.5"));
        assert!(!NUMERIC_ID_RE.is_match("-7"));
    }
}
