use std::fs;

use encoding_rs::WINDOWS_1252;

use crate::error::Result;

/// Lee un archivo de texto con manejo robusto de codificaciones.
///
/// Los archivos de rechazos llegan exportados desde Excel en Windows, así que
/// además de UTF-8 hay que aceptar Windows-1252 (que cubre Latin-1 en el rango
/// imprimible). Devuelve el contenido decodificado y el nombre de la
/// codificación usada.
pub fn read_to_string(path: &str) -> Result<(String, &'static str)> {
    let bytes = fs::read(path)?;
    Ok(decode(&bytes))
}

/// Decodifica bytes probando UTF-8 estricto primero y Windows-1252 después.
pub fn decode(bytes: &[u8]) -> (String, &'static str) {
    // Quitar BOM UTF-8 si está presente (Excel lo agrega al exportar)
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    if let Ok(s) = std::str::from_utf8(bytes) {
        return (s.to_string(), "utf-8");
    }

    let (decoded, _, _) = WINDOWS_1252.decode(bytes);
    (decoded.into_owned(), "windows-1252")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        let (text, encoding) = decode("IDRechazo,Caso\n1,homologación\n".as_bytes());
        assert_eq!(encoding, "utf-8");
        assert!(text.contains("homologación"));
    }

    #[test]
    fn test_decode_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"IDRechazo\n1\n");
        let (text, encoding) = decode(&bytes);
        assert_eq!(encoding, "utf-8");
        assert!(text.starts_with("IDRechazo"));
    }

    #[test]
    fn test_decode_windows_1252() {
        // "homologación" con ó en un solo byte (0xF3), inválido como UTF-8
        let bytes = b"homologaci\xf3n";
        let (text, encoding) = decode(bytes);
        assert_eq!(encoding, "windows-1252");
        assert_eq!(text, "homologación");
    }

    #[test]
    fn test_decode_windows_1252_smart_quotes() {
        // Comillas tipográficas de Word (0x93 / 0x94)
        let bytes = b"\x93Caso\x94";
        let (text, encoding) = decode(bytes);
        assert_eq!(encoding, "windows-1252");
        assert_eq!(text, "\u{201C}Caso\u{201D}");
    }
}
