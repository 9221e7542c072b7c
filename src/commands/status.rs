//! Status command implementation

use sdspi_card::CardHandle;

/// Print whether the card reports power-up complete
pub fn cmd_status(handle: &mut CardHandle) -> Result<(), Box<dyn std::error::Error>> {
    if handle.is_ready() {
        println!("Card ready");
    } else {
        println!("Card not ready (busy, uninitialized or absent)");
    }
    Ok(())
}
