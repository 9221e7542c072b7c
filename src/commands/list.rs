//! List commands implementation

use sdspi_card::available_transports;

/// List all transports compiled into this binary
pub fn list_transports() {
    let transports = available_transports();

    println!("Supported transports:");
    println!();
    if transports.is_empty() {
        println!("  none (recompile with features)");
        return;
    }

    for transport in &transports {
        println!("  {:<10} - {}", transport.name, transport.description);
        if !transport.aliases.is_empty() {
            println!("  {:<10}   aliases: {}", "", transport.aliases.join(", "));
        }
    }
}
