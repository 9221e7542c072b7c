//! Read command implementation

use indicatif::{ProgressBar, ProgressStyle};
use sdspi_card::{CardHandle, BLOCK_SIZE};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::CommandError;

/// Sectors read per chunk (32 KiB)
const READ_CHUNK_SECTORS: u32 = 64;

/// Run the read command
pub fn cmd_read(
    handle: &mut CardHandle,
    output: &Path,
    start: u32,
    count: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if count == 0 {
        return Err(CommandError::EmptyRange.into());
    }
    if start.checked_add(count - 1).is_none() {
        return Err(CommandError::RangeOverflow { start, count }.into());
    }

    let output_error = |source| CommandError::Output {
        path: output.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(output).map_err(output_error)?);

    let total_size = u64::from(count) * BLOCK_SIZE as u64;
    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    match copy_sectors(handle, start, count, &mut writer, &pb) {
        Ok(()) => pb.finish_with_message("Read complete"),
        Err(e) => {
            pb.abandon();
            return Err(e);
        }
    }
    writer.flush().map_err(output_error)?;

    println!("Wrote {} bytes to {:?}", total_size, output);

    Ok(())
}

/// Stream `count` sectors starting at `start` into `out`, one chunk at a time
fn copy_sectors<W: Write>(
    handle: &mut CardHandle,
    start: u32,
    count: u32,
    out: &mut W,
    pb: &ProgressBar,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut chunk = vec![0u8; READ_CHUNK_SECTORS as usize * BLOCK_SIZE];
    let mut done = 0u32;

    while done < count {
        let sectors = (count - done).min(READ_CHUNK_SECTORS);
        let buf = &mut chunk[..sectors as usize * BLOCK_SIZE];
        let base = u64::from(done) * BLOCK_SIZE as u64;

        handle.read_blocks_with_progress(start + done, buf, |bytes| {
            pb.set_position(base + bytes as u64);
        })?;
        out.write_all(buf)?;

        done += sectors;
    }

    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use sdspi_card::{open_card, CardError};
    use sdspi_core::card::CardConfig;

    #[test]
    fn test_copy_spans_several_chunks() {
        let mut handle = open_card("dummy:blocks=256", CardConfig::default()).unwrap();
        let mut out = Vec::new();

        copy_sectors(&mut handle, 10, 130, &mut out, &ProgressBar::hidden()).unwrap();
        assert_eq!(out.len(), 130 * BLOCK_SIZE);
    }

    #[test]
    fn test_large_count_stops_at_card_end() {
        let mut handle = open_card("dummy:blocks=8", CardConfig::default()).unwrap();
        let mut out = Vec::new();

        let err = copy_sectors(&mut handle, 0, 4_000_000, &mut out, &ProgressBar::hidden())
            .unwrap_err();
        match err.downcast_ref::<CardError>() {
            Some(CardError::Read { block, .. }) => assert_eq!(*block, 8),
            other => panic!("unexpected error: {:?}", other),
        }
        // Nothing past the failing chunk was written
        assert!(out.is_empty());
    }
}
