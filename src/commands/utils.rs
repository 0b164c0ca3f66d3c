use crate::utils::config::SCHEMA_VERSION;

/// Display version information
pub fn display_version() {
    println!("RefLeak Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Reference-count leak analysis for time-travel debugger captures.");
}
