use crate::error::{AppError, Result};
use crate::file_utils::{format_bytes, get_file_size, validate_csv_input};
use crate::models::{COLUMN_MAPPING, REQUIRED_COLUMNS};
use crate::processor::RechazoFile;

/// Valida un archivo CSV de rechazos sin tocar la base
pub fn validate(args: &[String]) -> Result<()> {
    if args.len() < 3 {
        eprintln!("Usage: rechazos_tools validate <input.csv>");
        std::process::exit(1);
    }
    let input_file = &args[2];

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Validación de archivo de rechazos                           ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!("📄 Input: {} ({})", input_file, file_size_label(input_file));
    println!();

    validate_csv_input(input_file)?;

    let file = RechazoFile::read(input_file)?;
    println!("✅ Archivo leído correctamente: {} registros encontrados", file.len());
    if file.is_empty() {
        println!("⚠️  El archivo no tiene registros de datos");
    }
    println!();

    println!("📋 Columnas esperadas (sin distinguir mayúsculas/minúsculas):");
    for col in REQUIRED_COLUMNS {
        println!("   - {}", col);
    }
    println!();

    let (is_valid, errors) = file.validate();

    if is_valid {
        println!("✅ Validación exitosa: el archivo está listo para aplicar");
        Ok(())
    } else {
        println!("❌ Errores encontrados en el archivo:");
        for error in &errors {
            println!("   - {}", error);
        }
        Err(AppError::Validation(format!(
            "el archivo contiene {} error(es)",
            errors.len()
        )))
    }
}

/// Muestra las primeras filas ya normalizadas al formato de base de datos
pub fn preview(args: &[String]) -> Result<()> {
    if args.len() < 3 {
        eprintln!("Usage: rechazos_tools preview <input.csv> [n]");
        std::process::exit(1);
    }
    let input_file = &args[2];
    let max_show: usize = args.get(3).and_then(|n| n.parse().ok()).unwrap_or(10);

    validate_csv_input(input_file)?;

    let file = RechazoFile::read(input_file)?;
    let rows = file.transform(chrono::Local::now().naive_local());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Vista previa de datos normalizados                          ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!("📄 Input: {}", input_file);
    println!(
        "📊 Registros en archivo: {} | Normalizados: {}",
        file.len(),
        rows.len()
    );
    println!();

    println!("📋 Mapeo de columnas:");
    for (csv_name, db_name) in COLUMN_MAPPING {
        println!("   {} -> {}", csv_name, db_name);
    }
    println!();

    for (i, row) in rows.iter().take(max_show).enumerate() {
        println!(
            "   [{:2}] RECHAZOID={} | CASO={} | RESPONSABLE_DE_CASO={} | VALOR_HOMOLOGACION={}",
            i + 1,
            row.rechazoid,
            row.caso.as_deref().unwrap_or("-"),
            row.responsable_de_caso.as_deref().unwrap_or("-"),
            row.valor_homologacion.as_deref().unwrap_or("-"),
        );
    }
    if rows.len() > max_show {
        println!("   ... ({} filas más)", rows.len() - max_show);
    }

    Ok(())
}

fn file_size_label(path: &str) -> String {
    get_file_size(path)
        .map(format_bytes)
        .unwrap_or_else(|_| "tamaño desconocido".to_string())
}
