//! Serial frame encoding
//!
//! ```text
//! request:  AB CD | request bytes  | sum
//! response: BA CB | response bytes | sum
//! ```
//!
//! `sum` is the low byte of the sum of the bytes between the magic and the
//! checksum. The response length is not known up front, so a reply is read
//! as magic, the 4-byte response header, `data_len` payload bytes, then
//! the checksum.

use std::io::Read;

use wchflash_core::protocol::frames::{decode_padded, ResponseHeader, RESPONSE_HEADER_LEN};
use wchflash_core::TransportError;

/// Magic preceding every request
pub const REQUEST_MAGIC: [u8; 2] = [0xAB, 0xCD];
/// Magic preceding every response
pub const RESPONSE_MAGIC: [u8; 2] = [0xBA, 0xCB];

/// Additive checksum over `bytes`
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Wrap `request` in a frame
pub fn encode(request: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(request.len() + 3);
    frame.extend_from_slice(&REQUEST_MAGIC);
    frame.extend_from_slice(request);
    frame.push(checksum(request));
    frame
}

/// Wrap `response` in a frame, the way the device does
pub fn encode_response(response: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(response.len() + 3);
    frame.extend_from_slice(&RESPONSE_MAGIC);
    frame.extend_from_slice(response);
    frame.push(checksum(response));
    frame
}

/// Read one response frame from `port` and return the bytes inside it
pub fn read_frame<R: Read + ?Sized>(port: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut magic = [0u8; 2];
    port.read_exact(&mut magic)?;
    if magic != RESPONSE_MAGIC {
        return Err(TransportError::BadMagic {
            expected: RESPONSE_MAGIC,
            found: magic,
        });
    }

    let mut response = vec![0u8; RESPONSE_HEADER_LEN];
    port.read_exact(&mut response)?;
    let data_len = decode_padded::<ResponseHeader>(&response).data_len as usize;

    response.resize(RESPONSE_HEADER_LEN + data_len, 0);
    port.read_exact(&mut response[RESPONSE_HEADER_LEN..])?;

    let mut sum = [0u8; 1];
    port.read_exact(&mut sum)?;
    let computed = checksum(&response);
    if computed != sum[0] {
        return Err(TransportError::BadChecksum {
            computed,
            received: sum[0],
        });
    }

    Ok(response)
}
