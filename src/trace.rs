//! Hexdump tracing of bootloader traffic

use wchflash_core::{Transport, TransportError};

/// Bytes per hexdump line
const LINE_LEN: usize = 16;

/// Format `bytes` as hexdump lines: offset, hex bytes, printable ASCII
pub fn hexdump(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(LINE_LEN)
        .enumerate()
        .map(|(i, line)| {
            let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
            let ascii: String = line
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                .collect();
            format!(
                "{:04x}: {:<width$} |{}|",
                i * LINE_LEN,
                hex.join(" "),
                ascii,
                width = LINE_LEN * 3 - 1
            )
        })
        .collect()
}

/// Transport wrapper that dumps each request and reply
pub struct Traced<T> {
    inner: T,
}

impl<T: Transport> Traced<T> {
    /// Trace every exchange made through `inner`
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: Transport> Transport for Traced<T> {
    fn exchange(
        &mut self,
        request: &[u8],
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        log::info!("=> {} bytes", request.len());
        for line in hexdump(request) {
            log::info!("   {}", line);
        }

        let result = self.inner.exchange(request, response_len);
        match &result {
            Ok(reply) => {
                log::info!("<= {} bytes", reply.len());
                for line in hexdump(reply) {
                    log::info!("   {}", line);
                }
            }
            Err(e) => log::info!("<= {}", e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hexdump_lines() {
        let bytes: Vec<u8> = (0x41..0x41 + 20).collect();
        let lines = hexdump(&bytes);
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "0000: 41 42 43 44 45 46 47 48 49 4a 4b 4c 4d 4e 4f 50 |ABCDEFGHIJKLMNOP|"
        );
        assert!(lines[1].starts_with("0010: 51 52 53 54 "));
        assert!(lines[1].ends_with("|QRST|"));
        assert!(hexdump(&[]).is_empty());
    }

    #[test]
    fn test_hexdump_masks_unprintable() {
        let lines = hexdump(&[0xA1, 0x12, b'M']);
        assert!(lines[0].ends_with("|..M|"));
    }

    struct Echo;

    impl Transport for Echo {
        fn exchange(
            &mut self,
            request: &[u8],
            response_len: usize,
        ) -> Result<Vec<u8>, TransportError> {
            Ok(request[..request.len().min(response_len)].to_vec())
        }
    }

    #[test]
    fn test_traced_passes_through() {
        let mut t = Traced::new(Echo);
        assert_eq!(t.exchange(&[1, 2, 3], 2).unwrap(), vec![1, 2]);
    }
}
