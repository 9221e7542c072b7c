//! Dump command implementation

use sdspi_card::{CardHandle, BLOCK_SIZE};

const BYTES_PER_LINE: usize = 16;

/// Hex dump one sector to stdout
pub fn cmd_dump(handle: &mut CardHandle, sector: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut buf = [0u8; BLOCK_SIZE];
    handle.read_block(sector, &mut buf)?;

    println!("Sector {} (0x{:X}):", sector, sector);
    let base = u64::from(sector) * BLOCK_SIZE as u64;
    for (i, line) in buf.chunks(BYTES_PER_LINE).enumerate() {
        println!("{}", format_line(base + (i * BYTES_PER_LINE) as u64, line));
    }

    Ok(())
}

/// Format one line as `offset  hex bytes  |ascii|`
fn format_line(offset: u64, bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(BYTES_PER_LINE * 3 + 1);
    for (i, byte) in bytes.iter().enumerate() {
        if i == BYTES_PER_LINE / 2 {
            hex.push(' ');
        }
        hex.push_str(&format!("{:02x} ", byte));
    }

    let ascii: String = bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect();

    format!("{:08x}  {:<49} |{}|", offset, hex, ascii)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_full_line() {
        let bytes: Vec<u8> = (0x41..0x51).collect();
        assert_eq!(
            format_line(0x200, &bytes),
            "00000200  41 42 43 44 45 46 47 48  49 4a 4b 4c 4d 4e 4f 50  |ABCDEFGHIJKLMNOP|"
        );
    }

    #[test]
    fn test_format_replaces_unprintable() {
        let line = format_line(0, &[0x00, b'a', 0xff, b' ']);
        assert!(line.starts_with("00000000  00 61 ff 20 "));
        assert!(line.ends_with("|.a. |"));
    }
}
