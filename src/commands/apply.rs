use std::fs;

use crate::config::AppConfig;
use crate::db::DatabaseManager;
use crate::error::{AppError, Result};
use crate::file_utils::validate_csv_input;
use crate::models::{ApplySummary, InsertOutcome};
use crate::processor::RechazoFile;

/// Aplica un archivo de rechazos: UPDATE de seguimiento + homologaciones.
///
/// Flags:
///   --dry-run        corta después de la normalización, no conecta a la base
///   --json <path>    escribe el resumen completo en JSON
pub async fn run(args: &[String]) -> Result<()> {
    if args.len() < 3 {
        eprintln!("Usage: rechazos_tools apply <input.csv> [--dry-run] [--json <out.json>]");
        std::process::exit(1);
    }
    let input_file = &args[2];
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let json_output = args
        .iter()
        .position(|a| a == "--json")
        .map(|i| {
            args.get(i + 1)
                .cloned()
                .ok_or_else(|| AppError::Usage("--json requiere una ruta de salida".to_string()))
        })
        .transpose()?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Actualización de seguimiento de rechazos                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!("📄 Input: {}", input_file);
    println!();

    validate_csv_input(input_file)?;

    // Leer y validar
    let file = RechazoFile::read(input_file)?;
    println!("✅ Archivo leído correctamente: {} registros encontrados", file.len());

    let (is_valid, errors) = file.validate();
    if !is_valid {
        println!("❌ Errores encontrados en el archivo:");
        for error in &errors {
            println!("   - {}", error);
        }
        return Err(AppError::Validation(
            "el archivo contiene errores, no se aplicó ningún cambio".to_string(),
        ));
    }
    println!("✅ Validación exitosa");

    // Normalizar
    let rows = file.transform(chrono::Local::now().naive_local());
    println!("📊 {} registros listos para aplicar", rows.len());
    println!();

    if dry_run {
        println!("🛑 Dry-run: no se escribió nada en la base");
        for row in rows.iter().take(10) {
            println!(
                "   RECHAZOID={} | CASO={} | VALOR_HOMOLOGACION={}",
                row.rechazoid,
                row.caso.as_deref().unwrap_or("-"),
                row.valor_homologacion.as_deref().unwrap_or("-"),
            );
        }
        return Ok(());
    }

    // Conectar y verificar tabla
    let config = AppConfig::load()?;
    let manager = DatabaseManager::connect(&config).await?;
    println!(
        "🌐 Entorno actual: {} (tablas con prefijo {})",
        manager.environment().label(),
        manager.environment().prefix()
    );

    if !manager.verify_table_exists().await? {
        return Err(AppError::NotFound(format!(
            "La tabla {} no existe",
            manager.table("RECHAZOS_SEGUIMIENTO")
        )));
    }

    // Fase 1: UPDATE de seguimiento
    println!();
    println!("🔄 Actualizando registros...");
    let update = manager.update_rechazos(&rows).await;

    println!(
        "✅ Proceso completado: {} registros actualizados correctamente",
        update.updated
    );
    if update.failed > 0 {
        println!("⚠️  Registros fallidos: {}", update.failed);
        for error in &update.errors {
            println!("   - {}", error);
        }
    }

    // Fases 2 y 3: homologaciones, solo si hubo actualizaciones
    let (productos, sucursales) = if !update.updated_ids.is_empty() {
        println!();
        println!("🔄 Procesando homologaciones de productos...");
        let productos = manager
            .insert_homologaciones_productos(&update.updated_ids)
            .await;
        report_insert_outcome("Homologaciones de Productos", &productos);

        println!("🔄 Procesando homologaciones de sucursales...");
        let sucursales = manager
            .insert_homologaciones_sucursales(&update.updated_ids)
            .await;
        report_insert_outcome("Homologaciones de Sucursales", &sucursales);

        (Some(productos), Some(sucursales))
    } else {
        (None, None)
    };

    let summary = ApplySummary {
        environment: manager.environment().label().to_string(),
        update,
        homologaciones_productos: productos,
        homologaciones_sucursales: sucursales,
    };

    if let Some(path) = json_output {
        fs::write(&path, serde_json::to_string_pretty(&summary)? )?;
        println!();
        println!("📝 Resumen JSON: {}", path);
    }

    Ok(())
}

/// Verifica conexión, entorno activo y existencia de la tabla de seguimiento
pub async fn check_table(_args: &[String]) -> Result<()> {
    let config = AppConfig::load()?;
    let manager = DatabaseManager::connect(&config).await?;

    println!("🌐 Entorno actual: {}", manager.environment().label());
    println!("📋 Tabla: {}", manager.table("RECHAZOS_SEGUIMIENTO"));

    if manager.verify_table_exists().await? {
        println!("✅ La tabla de seguimiento existe");
        Ok(())
    } else {
        println!("❌ La tabla de seguimiento no existe");
        Err(AppError::NotFound(format!(
            "La tabla {} no existe",
            manager.table("RECHAZOS_SEGUIMIENTO")
        )))
    }
}

fn report_insert_outcome(title: &str, outcome: &InsertOutcome) {
    if outcome.total == 0 {
        return;
    }

    println!("📊 {}:", title);
    if outcome.inserted > 0 {
        println!("   ✅ Se insertaron {} homologaciones nuevas", outcome.inserted);
        for detail in &outcome.inserted_details {
            println!(
                "      RECHAZOID={} | PAISID={} | {} | GRPID={} | {}",
                detail.rechazoid, detail.paisid, detail.codigo, detail.grpid, detail.valor
            );
        }
    }
    if outcome.duplicated > 0 {
        println!(
            "   ⚠️  Se encontraron {} homologaciones duplicadas (no se insertaron)",
            outcome.duplicated
        );
    }
    if outcome.failed > 0 {
        println!("   ❌ Fallaron {} homologaciones", outcome.failed);
        for error in &outcome.errors {
            println!("      - {}", error);
        }
    }
}
