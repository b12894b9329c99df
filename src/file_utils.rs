use std::path::Path;

use crate::error::{AppError, Result};

/// Calcula el tamaño de un archivo en bytes
pub fn get_file_size(path: &str) -> Result<u64> {
    let metadata = std::fs::metadata(path)?;
    Ok(metadata.len())
}

/// Formatea bytes en formato legible (KB, MB, GB)
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Valida que el archivo de entrada exista y tenga extensión .csv.
/// Solo se aceptan archivos CSV, no Excel (.xlsx, .xls) ni otros formatos.
pub fn validate_csv_input(path: &str) -> Result<()> {
    if !Path::new(path).exists() {
        return Err(AppError::NotFound(format!("Archivo no encontrado: {}", path)));
    }

    let is_csv = Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase() == "csv")
        .unwrap_or(false);

    if !is_csv {
        return Err(AppError::Validation(format!(
            "El archivo '{}' no es un CSV válido. Solo se aceptan archivos con extensión .csv",
            path
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_validate_csv_input_rejects_non_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rechazos.xlsx");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "dummy").unwrap();

        let err = validate_csv_input(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_validate_csv_input_missing_file() {
        let err = validate_csv_input("/no/existe/rechazos.csv").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
