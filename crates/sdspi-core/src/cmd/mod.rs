//! Command/response exchange
//!
//! Every command runs with chip-select held by a nested [`ChipSelect`]
//! guard, so it can be issued on its own or from inside an operation that
//! already selected the card.

mod command;
mod frame;
mod response;

pub use command::Command;
pub use frame::CommandFrame;
pub use response::{decode_status, Ocr, Response, Status, R1};

use crate::bus::{BusTransport, ChipSelect};
use crate::consts::{FILL_BYTE, RESPONSE_POLL_LIMIT};
use crate::error::{Error, Result};

/// Poll for the status byte of `cmd` and read its payload
///
/// Fill bytes are skipped for at most [`RESPONSE_POLL_LIMIT`] bytes. The
/// payload is only read after a benign status.
pub fn receive_response<B: BusTransport + ?Sized>(bus: &mut B, cmd: Command) -> Result<Response> {
    let mut status_byte = None;
    for _ in 0..RESPONSE_POLL_LIMIT {
        let byte = bus.transfer_byte(FILL_BYTE)?;
        if byte != FILL_BYTE {
            status_byte = Some(byte);
            break;
        }
    }
    let status = decode_status(status_byte.ok_or(Error::NoResponse)?)?;

    let mut payload = [0u8; 4];
    bus.receive_bytes_le(&mut payload[..cmd.payload_len()])?;

    Ok(Response {
        status,
        payload: u32::from_le_bytes(payload),
    })
}

/// Send `cmd` with `argument` and decode the card's response
pub fn command<B: BusTransport + ?Sized>(
    bus: &mut B,
    cmd: Command,
    argument: u32,
) -> Result<Response> {
    let frame = CommandFrame::new(cmd, argument);
    let mut cs = ChipSelect::acquire(bus)?;

    let result = cs
        .send_bytes(&frame.encode())
        .and_then(|()| receive_response(&mut *cs, cmd));
    log::trace!(
        "sdspi: CMD{} arg=0x{:08X} -> {:?}",
        frame.index,
        frame.argument,
        result
    );

    cs.release()?;
    result
}
