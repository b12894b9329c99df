use std::env;

use tracing_subscriber::EnvFilter;

// Importar módulos locales
mod commands;
mod config;
mod db;
mod encoding;
mod error;
mod file_utils;
mod models;
mod processor;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        help();
        return;
    }

    let command = args[1].as_str();
    let result = match command {
        "validate" => commands::validation::validate(&args),
        "preview" => commands::validation::preview(&args),
        "apply" => commands::apply::run(&args).await,
        "check-table" => commands::apply::check_table(&args).await,
        "version" => {
            print_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            help();
            Ok(())
        }
        other => {
            eprintln!("❌ Unknown command: {}", other);
            help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn print_version() {
    println!(
        "rechazos_tools v{} ({})",
        env!("RECHAZOS_TOOLS_VERSION"),
        env!("BUILD_TARGET")
    );
    println!("Build date: {}", env!("BUILD_DATE"));
}

fn help() {
    println!("rechazos_tools v{}", env!("RECHAZOS_TOOLS_VERSION"));
    println!("Carga de archivos CSV de rechazos contra las tablas de seguimiento y homologación");
    println!();
    println!("Usage: rechazos_tools <command> [args]");
    println!();
    println!("Commands:");
    println!("  validate <input.csv>                        Valida el archivo sin tocar la base");
    println!("  preview <input.csv> [n]                     Muestra las primeras n filas normalizadas");
    println!("  apply <input.csv> [--dry-run] [--json <f>]  Aplica actualizaciones + homologaciones");
    println!("  check-table                                 Verifica conexión, entorno y tabla");
    println!("  version                                     Muestra versión y build");
    println!();
    println!("Configuración (rechazos.toml o variables RECHAZOS_*):");
    println!("  RECHAZOS_DATABASE_URL   URL de la base (default: sqlite://rechazos.db)");
    println!("  RECHAZOS_ENVIRONMENT    Override del entorno: dev | prd");
    println!();
    println!("Columnas requeridas en el CSV (case-insensitive):");
    println!("  IDRechazo, Caso, Responsable de Caso, Valor homologación");
}
