//! Fixed request and response layouts
//!
//! These structs are the wire contract. Field order and widths must not
//! change: the bootloader parses them positionally. Multi-byte fields are
//! little-endian except the bootloader version, which is big-endian.
//!
//! Note that the response header's length field is one byte wide even
//! though some replies carry more than 255 bytes on other chips. The
//! layout is kept as the device sends it.

use zerocopy::byteorder::{big_endian, little_endian};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{
    Command, CHIP_TAG, CHUNK_SIZE, CONFIG_LEN, ID_LEN, READ_CHUNK_SIZE, READ_CONFIG_MASK,
    REBOOT_OPTION, SET_KEY_DATA_LEN, WRITE_CONFIG_MASK,
};

/// Size of a request header on the wire
pub const REQUEST_HEADER_LEN: usize = core::mem::size_of::<RequestHeader>();
/// Size of a response header on the wire
pub const RESPONSE_HEADER_LEN: usize = core::mem::size_of::<ResponseHeader>();
/// Payload bytes in a chunk request besides the data
pub const CHUNK_OVERHEAD: usize = 5;

/// Copy `bytes` into a zeroed `T`, truncating or zero-filling as needed
///
/// Replies are decoded as if received into a zero-initialised struct:
/// bytes beyond what the device sent read as zero.
pub fn decode_padded<T: FromBytes + IntoBytes>(bytes: &[u8]) -> T {
    let mut value = T::new_zeroed();
    let dst = value.as_mut_bytes();
    let n = bytes.len().min(dst.len());
    dst[..n].copy_from_slice(&bytes[..n]);
    value
}

/// Request header
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RequestHeader {
    /// Command code
    pub command: u8,
    /// Number of payload bytes after the header
    pub data_len: little_endian::U16,
}

impl RequestHeader {
    /// Create a header for `command` with `data_len` payload bytes
    pub fn new(command: Command, data_len: usize) -> Self {
        Self {
            command: command.code(),
            data_len: little_endian::U16::new(data_len as u16),
        }
    }
}

/// Response header
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ResponseHeader {
    /// Command code being answered
    pub command: u8,
    _reserved0: u8,
    /// Number of payload bytes after the header
    pub data_len: u8,
    _reserved1: u8,
}

impl ResponseHeader {
    /// Create a header answering `command` with `data_len` payload bytes
    pub fn new(command: u8, data_len: usize) -> Self {
        Self {
            command,
            _reserved0: 0,
            data_len: data_len as u8,
            _reserved1: 0,
        }
    }
}

/// A request frame
pub trait Request: IntoBytes + Immutable {
    /// The frame's header
    fn header(&self) -> &RequestHeader;

    /// Bytes to transmit: the header plus `data_len` payload bytes
    fn wire(&self) -> &[u8] {
        let bytes = self.as_bytes();
        let len = REQUEST_HEADER_LEN + self.header().data_len.get() as usize;
        &bytes[..len.min(bytes.len())]
    }
}

/// A response frame
pub trait Reply: FromBytes + IntoBytes + Immutable + Sized {
    /// Bytes the engine reads from this reply
    const MIN_LEN: usize;

    /// Capacity to request from the transport
    const CAPACITY: usize = core::mem::size_of::<Self>();

    /// The frame's header
    fn header(&self) -> &ResponseHeader;
}

macro_rules! impl_request {
    ($($ty:ty),* $(,)?) => {
        $(impl Request for $ty {
            fn header(&self) -> &RequestHeader {
                &self.hdr
            }
        })*
    };
}

macro_rules! impl_reply {
    ($($ty:ty => $min:expr),* $(,)?) => {
        $(impl Reply for $ty {
            const MIN_LEN: usize = $min;

            fn header(&self) -> &ResponseHeader {
                &self.hdr
            }
        })*
    };
}

/// Identify request
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ChipTypeRequest {
    /// Header
    pub hdr: RequestHeader,
    /// Expected chip type, left zero
    pub chip_type: u8,
    /// Expected family, left zero
    pub family: u8,
    /// `"MCU ISP & WCH.CN"`
    pub tag: [u8; 16],
}

impl ChipTypeRequest {
    /// Build the identify request
    pub fn new() -> Self {
        Self {
            hdr: RequestHeader::new(Command::ChipType, 18),
            chip_type: 0,
            family: 0,
            tag: *CHIP_TAG,
        }
    }
}

impl Default for ChipTypeRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Identify reply
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ChipTypeResponse {
    /// Header
    pub hdr: ResponseHeader,
    /// Chip type (CH554 -> 0x54)
    pub chip_type: u8,
    /// Chip family (CH55x -> 0x11)
    pub family: u8,
}

impl ChipTypeResponse {
    /// Build an identify reply
    pub fn new(chip_type: u8, family: u8) -> Self {
        Self {
            hdr: ResponseHeader::new(Command::ChipType.code(), 2),
            chip_type,
            family,
        }
    }
}

/// Read-config request
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ReadConfigRequest {
    /// Header
    pub hdr: RequestHeader,
    /// Selector of the config blocks to return
    pub what: little_endian::U16,
}

impl ReadConfigRequest {
    /// Build the read-config request
    pub fn new() -> Self {
        Self {
            hdr: RequestHeader::new(Command::ReadConfig, 2),
            what: little_endian::U16::new(READ_CONFIG_MASK),
        }
    }
}

impl Default for ReadConfigRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-config reply
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ReadConfigResponse {
    /// Header
    pub hdr: ResponseHeader,
    /// Selector echoed back
    pub what: little_endian::U16,
    /// Opaque configuration bytes
    pub config: [u8; CONFIG_LEN],
    /// Bootloader version, e.g. `00 02 08 00` for 2.8.0
    pub bootloader_version: big_endian::U32,
    /// Unique ID; on some chips the last byte is a checksum
    pub id: [u8; ID_LEN],
}

impl ReadConfigResponse {
    /// Build a read-config reply
    pub fn new(config: [u8; CONFIG_LEN], bootloader_version: u32, id: [u8; ID_LEN]) -> Self {
        Self {
            hdr: ResponseHeader::new(Command::ReadConfig.code(), 26),
            what: little_endian::U16::new(READ_CONFIG_MASK),
            config,
            bootloader_version: big_endian::U32::new(bootloader_version),
            id,
        }
    }
}

/// Write-config request
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct WriteConfigRequest {
    /// Header
    pub hdr: RequestHeader,
    /// Selector of the config blocks being written
    pub what: little_endian::U16,
    /// Configuration bytes
    pub config: [u8; CONFIG_LEN],
}

impl WriteConfigRequest {
    /// Build a write-config request carrying `config`
    pub fn new(config: [u8; CONFIG_LEN]) -> Self {
        Self {
            hdr: RequestHeader::new(Command::WriteConfig, 2 + CONFIG_LEN),
            what: little_endian::U16::new(WRITE_CONFIG_MASK),
            config,
        }
    }
}

/// Set-key request
///
/// The declared payload is shorter than the field; the content is not
/// derived from the key and is sent zeroed.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct SetKeyRequest {
    /// Header
    pub hdr: RequestHeader,
    /// Key seed field
    pub data: [u8; 64],
}

impl SetKeyRequest {
    /// Build the set-key request
    pub fn new() -> Self {
        Self {
            hdr: RequestHeader::new(Command::SetKey, SET_KEY_DATA_LEN as usize),
            data: [0; 64],
        }
    }
}

impl Default for SetKeyRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Set-key reply
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct SetKeyResponse {
    /// Header
    pub hdr: ResponseHeader,
    /// Sum of the key bytes as computed by the device
    pub key_checksum: little_endian::U16,
}

impl SetKeyResponse {
    /// Build a set-key reply
    pub fn new(key_checksum: u16) -> Self {
        Self {
            hdr: ResponseHeader::new(Command::SetKey.code(), 2),
            key_checksum: little_endian::U16::new(key_checksum),
        }
    }
}

/// Code-flash erase request
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct EraseCodeFlashRequest {
    /// Header
    pub hdr: RequestHeader,
    /// Number of 1 KiB blocks to erase
    pub blocks: little_endian::U16,
    _reserved: little_endian::U16,
}

impl EraseCodeFlashRequest {
    /// Build an erase request for `blocks` KiB
    pub fn new(blocks: u16) -> Self {
        Self {
            hdr: RequestHeader::new(Command::EraseCodeFlash, 4),
            blocks: little_endian::U16::new(blocks),
            _reserved: little_endian::U16::new(0),
        }
    }
}

/// Data-flash erase request
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct EraseDataFlashRequest {
    /// Header
    pub hdr: RequestHeader,
    _reserved: little_endian::U32,
    /// Number of 1 KiB blocks to erase
    pub blocks: u8,
}

impl EraseDataFlashRequest {
    /// Build an erase request for `blocks` KiB of data flash
    pub fn new(blocks: u8) -> Self {
        Self {
            hdr: RequestHeader::new(Command::EraseDataFlash, 5),
            _reserved: little_endian::U32::new(0),
            blocks,
        }
    }
}

/// Write/compare chunk request, used for code and data flash
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ChunkRequest {
    /// Header; `data_len` is the chunk length plus 5
    pub hdr: RequestHeader,
    /// Flash offset of the chunk
    pub offset: little_endian::U32,
    _reserved: u8,
    /// Chunk data, only `data_len - 5` bytes are sent
    pub data: [u8; CHUNK_SIZE],
}

impl ChunkRequest {
    /// Build a chunk request for `data` at `offset`
    ///
    /// `data` may be empty (the final empty write) and is truncated to
    /// [`CHUNK_SIZE`].
    pub fn new(command: Command, offset: u32, data: &[u8]) -> Self {
        let len = data.len().min(CHUNK_SIZE);
        let mut buf = [0u8; CHUNK_SIZE];
        buf[..len].copy_from_slice(&data[..len]);
        Self {
            hdr: RequestHeader::new(command, len + CHUNK_OVERHEAD),
            offset: little_endian::U32::new(offset),
            _reserved: 0,
            data: buf,
        }
    }

    /// Data carried by this chunk
    pub fn payload(&self) -> &[u8] {
        let len = (self.hdr.data_len.get() as usize).saturating_sub(CHUNK_OVERHEAD);
        &self.data[..len.min(CHUNK_SIZE)]
    }
}

/// Data-flash read request
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ReadDataFlashRequest {
    /// Header
    pub hdr: RequestHeader,
    /// Data-flash offset
    pub offset: little_endian::U32,
    /// Bytes to read
    pub len: little_endian::U16,
}

impl ReadDataFlashRequest {
    /// Build a read request for `len` bytes at `offset`
    pub fn new(offset: u32, len: u16) -> Self {
        Self {
            hdr: RequestHeader::new(Command::ReadDataFlash, 6),
            offset: little_endian::U32::new(offset),
            len: little_endian::U16::new(len),
        }
    }
}

/// Data-flash read reply
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ReadDataFlashResponse {
    /// Header
    pub hdr: ResponseHeader,
    /// Zero on success
    pub return_code: little_endian::U16,
    /// Data read
    pub data: [u8; READ_CHUNK_SIZE],
}

impl ReadDataFlashResponse {
    /// Build a read reply carrying `data`
    pub fn new(return_code: u16, data: &[u8]) -> Self {
        let len = data.len().min(READ_CHUNK_SIZE);
        let mut buf = [0u8; READ_CHUNK_SIZE];
        buf[..len].copy_from_slice(&data[..len]);
        Self {
            hdr: ResponseHeader::new(Command::ReadDataFlash.code(), 2 + len),
            return_code: little_endian::U16::new(return_code),
            data: buf,
        }
    }
}

/// Reboot request
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RebootRequest {
    /// Header
    pub hdr: RequestHeader,
    /// Reboot option
    pub option: u8,
}

impl RebootRequest {
    /// Build the reboot request
    pub fn new() -> Self {
        Self {
            hdr: RequestHeader::new(Command::Reboot, 1),
            option: REBOOT_OPTION,
        }
    }
}

impl Default for RebootRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Reply carrying only a return code
///
/// Used by write-config, both erases, all chunk writes and compares, and
/// reboot.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct StatusResponse {
    /// Header
    pub hdr: ResponseHeader,
    /// Zero on success
    pub return_code: little_endian::U16,
}

impl StatusResponse {
    /// Build a status reply for `command`
    pub fn new(command: u8, return_code: u16) -> Self {
        Self {
            hdr: ResponseHeader::new(command, 2),
            return_code: little_endian::U16::new(return_code),
        }
    }
}

impl_request!(
    ChipTypeRequest,
    ReadConfigRequest,
    WriteConfigRequest,
    SetKeyRequest,
    EraseCodeFlashRequest,
    EraseDataFlashRequest,
    ChunkRequest,
    ReadDataFlashRequest,
    RebootRequest,
);

impl_reply!(
    ChipTypeResponse => 6,
    ReadConfigResponse => 30,
    SetKeyResponse => 6,
    StatusResponse => 6,
    ReadDataFlashResponse => 6,
);

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::size_of;

    #[test]
    fn test_frame_sizes() {
        assert_eq!(REQUEST_HEADER_LEN, 3);
        assert_eq!(RESPONSE_HEADER_LEN, 4);
        assert_eq!(size_of::<ChipTypeRequest>(), 21);
        assert_eq!(size_of::<ChipTypeResponse>(), 6);
        assert_eq!(size_of::<ReadConfigRequest>(), 5);
        assert_eq!(size_of::<ReadConfigResponse>(), 30);
        assert_eq!(size_of::<WriteConfigRequest>(), 17);
        assert_eq!(size_of::<SetKeyRequest>(), 67);
        assert_eq!(size_of::<EraseCodeFlashRequest>(), 7);
        assert_eq!(size_of::<EraseDataFlashRequest>(), 8);
        assert_eq!(size_of::<ChunkRequest>(), 64);
        assert_eq!(size_of::<ReadDataFlashRequest>(), 9);
        assert_eq!(size_of::<ReadDataFlashResponse>(), 64);
        assert_eq!(size_of::<RebootRequest>(), 4);
        assert_eq!(size_of::<StatusResponse>(), 6);
    }

    #[test]
    fn test_chip_type_request_bytes() {
        let req = ChipTypeRequest::new();
        let wire = req.wire();
        assert_eq!(&wire[..5], &[0xA1, 0x12, 0x00, 0x00, 0x00]);
        assert_eq!(&wire[5..], b"MCU ISP & WCH.CN");
    }

    #[test]
    fn test_set_key_sends_declared_length() {
        let req = SetKeyRequest::new();
        let wire = req.wire();
        assert_eq!(wire.len(), 3 + 0x1E);
        assert_eq!(&wire[..3], &[0xA3, 0x1E, 0x00]);
    }

    #[test]
    fn test_chunk_request_layout() {
        let data: Vec<u8> = (0..48).collect();
        let req = ChunkRequest::new(Command::WriteCodeFlash, 0x0138, &data);
        let wire = req.wire();
        assert_eq!(wire.len(), 3 + 5 + 48);
        assert_eq!(&wire[..8], &[0xA5, 53, 0x00, 0x38, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(&wire[8..], &data[..]);
        assert_eq!(req.payload(), &data[..]);

        let empty = ChunkRequest::new(Command::WriteCodeFlash, 104, &[]);
        assert_eq!(empty.wire(), &[0xA5, 5, 0, 104, 0, 0, 0, 0]);
        assert!(empty.payload().is_empty());
    }

    #[test]
    fn test_erase_requests() {
        assert_eq!(
            EraseCodeFlashRequest::new(8).wire(),
            &[0xA4, 0x04, 0x00, 0x08, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            EraseDataFlashRequest::new(2).wire(),
            &[0xA9, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02]
        );
    }

    #[test]
    fn test_read_config_response_decoding() {
        let mut raw = vec![0xA7, 0x00, 26, 0x00, 0x1F, 0x00];
        raw.extend_from_slice(&[0xFF, 0xFF, 0x4E, 0x00, 0x03, 0, 0, 0, 0xFF, 0x4E, 0, 0]);
        raw.extend_from_slice(&[0x00, 0x02, 0x08, 0x00]);
        raw.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let resp: ReadConfigResponse = decode_padded(&raw);
        assert_eq!(resp.hdr.command, 0xA7);
        assert_eq!(resp.hdr.data_len, 26);
        assert_eq!(resp.bootloader_version.get(), 0x0002_0800);
        assert_eq!(resp.config[2], 0x4E);
        assert_eq!(resp.id, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_decode_padded_zero_fills() {
        let resp: ReadDataFlashResponse = decode_padded(&[0xAB, 0, 4, 0, 0, 0, 0xAA, 0xBB]);
        assert_eq!(resp.return_code.get(), 0);
        assert_eq!(&resp.data[..2], &[0xAA, 0xBB]);
        assert!(resp.data[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_read_data_flash_response_length_is_one_byte() {
        let resp = ReadDataFlashResponse::new(0, &[0x11; READ_CHUNK_SIZE]);
        let bytes = resp.as_bytes();
        assert_eq!(bytes[2], 60);
        assert_eq!(bytes[3], 0);
    }
}
