//! Info command implementation

use sdspi_card::CardHandle;
use sdspi_core::card::{Addressing, CardVersion};

/// Print the parameters of an initialized card
pub fn cmd_info(handle: &mut CardHandle) -> Result<(), Box<dyn std::error::Error>> {
    let info = match handle.info() {
        Some(info) => info.clone(),
        None => handle.initialize()?.clone(),
    };
    let config = *handle.config();
    let ready = handle.is_ready();

    println!("SD Card Information");
    println!("===================");
    println!();
    println!("Transport:       {}", handle.transport_name());
    println!(
        "Version:         {}",
        match info.version {
            CardVersion::V1 => "1.x",
            CardVersion::V2 => "2.0 or later",
        }
    );
    println!("Capacity class:  {}", info.capacity_class());
    println!(
        "Addressing:      {}",
        match info.addressing {
            Addressing::Byte => "byte offsets (block * 512)",
            Addressing::Block => "block numbers",
        }
    );
    println!(
        "Bus clock:       base / {} (negotiated at base / {})",
        info.operating_divider.factor(),
        config.init_divider.factor()
    );
    println!("Ready:           {}", if ready { "yes" } else { "no" });

    Ok(())
}
