//! Message framing: `{u64 payload_length, u64 opcode, payload}`.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{Opcode, ProtoError, ProtoResult};

/// Upper bound on a single payload.  A full-detail `GET_MAP` of a large
/// rectangle is the biggest legitimate message; anything past this cap is a
/// corrupt or hostile length prefix.
pub const MAX_PAYLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Write one framed message.  The frame is assembled into one buffer so the
/// transport sees a single write (broadcasts from multiple threads are
/// serialized by the caller's send lock, not by write granularity).
pub fn write_frame<W: Write>(out: &mut W, opcode: Opcode, payload: &[u8]) -> ProtoResult<()> {
    let mut frame = Vec::with_capacity(16 + payload.len());
    frame.write_u64::<LittleEndian>(payload.len() as u64)?;
    frame.write_u64::<LittleEndian>(opcode as u64)?;
    frame.extend_from_slice(payload);
    out.write_all(&frame)?;
    out.flush()?;
    Ok(())
}

/// Read one framed message.  Blocks until a full frame arrives; any read
/// error (including a cleanly closed socket mid-frame) surfaces as
/// `ProtoError::Io`.
pub fn read_frame<R: Read>(input: &mut R) -> ProtoResult<(Opcode, Vec<u8>)> {
    let length = input.read_u64::<LittleEndian>()?;
    if length > MAX_PAYLOAD_BYTES {
        return Err(ProtoError::FrameTooLarge(length));
    }
    let code = input.read_u64::<LittleEndian>()?;
    let opcode = Opcode::from_wire(code).ok_or(ProtoError::BadOpcode(code))?;
    let mut payload = vec![0u8; length as usize];
    input.read_exact(&mut payload)?;
    Ok((opcode, payload))
}
