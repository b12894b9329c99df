fn main() {
    // ✅ Timestamp de compilación usando chrono
    let build_time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    // ✅ Versión desde Cargo.toml
    let version = env!("CARGO_PKG_VERSION");

    // ✅ Target platform (e.g., x86_64-unknown-linux-gnu)
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    // ✅ Pasar variables al código Rust usando rustc-env
    println!("cargo:rustc-env=RECHAZOS_TOOLS_VERSION={}", version);
    println!("cargo:rustc-env=BUILD_DATE={}", build_time);
    println!("cargo:rustc-env=BUILD_TARGET={}", target);
}
