use std::collections::HashMap;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::info;

use crate::encoding;
use crate::error::Result;
use crate::models::{RechazoUpdate, COLUMN_MAPPING, NUMERIC_ID_RE, REQUIRED_COLUMNS};

/// Archivo de rechazos parseado (headers + filas sin normalizar).
///
/// Los headers se comparan siempre en minúsculas y sin espacios alrededor,
/// porque los archivos llegan con variantes de mayúsculas según quién los
/// exportó.
pub struct RechazoFile {
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl RechazoFile {
    /// Lee un CSV de rechazos desde disco con fallback de codificación
    pub fn read(path: &str) -> Result<Self> {
        let (text, used) = encoding::read_to_string(path)?;
        info!(encoding = used, path, "archivo decodificado");
        Self::parse_str(&text)
    }

    /// Parsea el contenido ya decodificado
    pub fn parse_str(text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            rows.push(result?);
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Busca una columna por nombre, case-insensitive
    fn find_column(&self, name: &str) -> Option<usize> {
        let target = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == target)
    }

    /// Valor de una celda, trim aplicado; vacío => None
    fn field<'a>(&self, row: &'a StringRecord, col: Option<usize>) -> Option<&'a str> {
        col.and_then(|i| row.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Valida el archivo completo y acumula todos los hallazgos.
    ///
    /// Si faltan columnas requeridas la validación corta ahí (falla
    /// estructural); el resto de los chequeos se reportan juntos.
    pub fn validate(&self) -> (bool, Vec<String>) {
        let mut errors = Vec::new();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| self.find_column(c).is_none())
            .copied()
            .collect();

        if !missing.is_empty() {
            errors.push(format!("Columnas faltantes: {}", missing.join(", ")));
            return (false, errors);
        }

        let id_col = self.find_column("IDRechazo");

        // Registros sin IDRechazo
        let null_ids = self
            .rows
            .iter()
            .filter(|r| self.field(r, id_col).is_none())
            .count();
        if null_ids > 0 {
            errors.push(format!("Se encontraron {} registros sin IDRechazo", null_ids));
        }

        // IDRechazo duplicados
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            if let Some(id) = self.field(row, id_col) {
                *seen.entry(id).or_insert(0) += 1;
            }
        }
        let mut duplicate_values: Vec<&str> = seen
            .iter()
            .filter(|(_, &count)| count > 1)
            .map(|(&id, _)| id)
            .collect();
        if !duplicate_values.is_empty() {
            duplicate_values.sort_unstable();
            // Ocurrencias extra, no valores distintos
            let duplicate_count: usize = seen.values().filter(|&&c| c > 1).map(|&c| c - 1).sum();
            let shown = duplicate_values
                .iter()
                .take(10)
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            let suffix = if duplicate_values.len() > 10 { " ..." } else { "" };
            errors.push(format!(
                "Se encontraron {} IDRechazo duplicados en el archivo. IDs duplicados: {}{}",
                duplicate_count, shown, suffix
            ));
        }

        // IDRechazo no numéricos
        let has_non_numeric = self
            .rows
            .iter()
            .filter_map(|r| self.field(r, id_col))
            .any(|id| !NUMERIC_ID_RE.is_match(id));
        if has_non_numeric {
            errors.push("IDRechazo contiene valores no numéricos".to_string());
        }

        // Al menos una columna de actualización debe traer datos
        let update_columns = ["Caso", "Responsable de Caso", "Valor homologación"];
        let has_update_data = update_columns.iter().any(|name| {
            let col = self.find_column(name);
            self.rows.iter().any(|r| self.field(r, col).is_some())
        });
        if !has_update_data {
            errors.push(
                "No hay datos para actualizar (todas las columnas de actualización están vacías)"
                    .to_string(),
            );
        }

        (errors.is_empty(), errors)
    }

    /// Normaliza las filas al formato de base de datos.
    ///
    /// Filas sin IDRechazo parseable se descartan (ya fueron reportadas por
    /// `validate`). Ambos timestamps se estampan con `now`.
    pub fn transform(&self, now: NaiveDateTime) -> Vec<RechazoUpdate> {
        let stamp = now.format("%Y-%m-%d %H:%M:%S").to_string();

        let columns: HashMap<&str, Option<usize>> = COLUMN_MAPPING
            .iter()
            .map(|(csv_name, db_name)| (*db_name, self.find_column(csv_name)))
            .collect();

        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let Some(id_raw) = self.field(row, columns["RECHAZOID"]) else {
                continue;
            };
            let Ok(rechazoid) = id_raw.parse::<i64>() else {
                continue;
            };

            out.push(RechazoUpdate {
                rechazoid,
                caso: self.field(row, columns["CASO"]).map(str::to_string),
                responsable_de_caso: self
                    .field(row, columns["RESPONSABLE_DE_CASO"])
                    .map(str::to_string),
                valor_homologacion: self
                    .field(row, columns["VALOR_HOMOLOGACION"])
                    .map(str::to_string),
                update_at: stamp.clone(),
                fecha_solucion_rechazo: stamp.clone(),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "IDRechazo,Caso,Responsable de Caso,Valor homologación";

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_headers_case_insensitive() {
        let csv = "idrechazo,CASO,Responsable De Caso,VALOR HOMOLOGACIÓN\n1,C-1,Ana,X9\n";
        let file = RechazoFile::parse_str(csv).unwrap();
        let (ok, errors) = file.validate();
        assert!(ok, "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_missing_columns_stop_validation() {
        let csv = "IDRechazo,Caso\n1,C-1\n";
        let file = RechazoFile::parse_str(csv).unwrap();
        let (ok, errors) = file.validate();
        assert!(!ok);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Columnas faltantes"));
        assert!(errors[0].contains("Responsable de Caso"));
        assert!(errors[0].contains("Valor homologación"));
    }

    #[test]
    fn test_null_and_duplicate_ids() {
        let csv = format!("{HEADER}\n1,C-1,,\n,C-2,,\n1,C-3,,\n2,C-4,,\n");
        let file = RechazoFile::parse_str(&csv).unwrap();
        let (ok, errors) = file.validate();
        assert!(!ok);
        assert!(errors.iter().any(|e| e.contains("1 registros sin IDRechazo")));
        assert!(errors
            .iter()
            .any(|e| e.contains("1 IDRechazo duplicados") && e.contains("IDs duplicados: 1")));
    }

    #[test]
    fn test_non_numeric_ids() {
        let csv = format!("{HEADER}\nABC,C-1,,\n");
        let file = RechazoFile::parse_str(&csv).unwrap();
        let (_, errors) = file.validate();
        assert!(errors
            .iter()
            .any(|e| e.contains("IDRechazo contiene valores no numéricos")));
    }

    #[test]
    fn test_no_update_data() {
        let csv = format!("{HEADER}\n1,,,\n2,,,\n");
        let file = RechazoFile::parse_str(&csv).unwrap();
        let (ok, errors) = file.validate();
        assert!(!ok);
        assert!(errors.iter().any(|e| e.contains("No hay datos para actualizar")));
    }

    #[test]
    fn test_transform_drops_bad_ids_and_trims() {
        let csv = format!("{HEADER}\n 7 ,  C-1  ,Ana,\nXX,C-2,,\n,C-3,,\n8,,,X9\n");
        let file = RechazoFile::parse_str(&csv).unwrap();
        let rows = file.transform(now());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rechazoid, 7);
        assert_eq!(rows[0].caso.as_deref(), Some("C-1"));
        assert_eq!(rows[0].responsable_de_caso.as_deref(), Some("Ana"));
        assert!(rows[0].valor_homologacion.is_none());
        assert_eq!(rows[0].update_at, "2025-03-14 10:30:00");
        assert_eq!(rows[0].fecha_solucion_rechazo, "2025-03-14 10:30:00");

        assert_eq!(rows[1].rechazoid, 8);
        assert_eq!(rows[1].valor_homologacion.as_deref(), Some("X9"));
    }

    #[test]
    fn test_empty_file() {
        let file = RechazoFile::parse_str(&format!("{HEADER}\n")).unwrap();
        assert!(file.is_empty());
        assert_eq!(file.len(), 0);
        let (ok, errors) = file.validate();
        assert!(!ok);
        assert!(errors.iter().any(|e| e.contains("No hay datos para actualizar")));
    }
}
