use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Encoded width of a [`Record`] in bytes: one `i32` key plus three `f64` fields.
pub const RECORD_WIDTH: usize = 4 + 8 * 3;

/// A single probability record keyed by `key`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: i32,
    pub p_a: f64,
    pub p_b: f64,
    pub p_aub: f64,
}

impl Record {
    pub fn new(key: i32, p_a: f64, p_b: f64, p_aub: f64) -> Self {
        Record { key, p_a, p_b, p_aub }
    }

    /// Encodes `self` into exactly [`RECORD_WIDTH`] little-endian bytes.
    pub fn encode(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= RECORD_WIDTH);
        LittleEndian::write_i32(&mut buf[0..4], self.key);
        LittleEndian::write_f64(&mut buf[4..12], self.p_a);
        LittleEndian::write_f64(&mut buf[12..20], self.p_b);
        LittleEndian::write_f64(&mut buf[20..28], self.p_aub);
    }

    /// Decodes a [`Record`] from a slice at least [`RECORD_WIDTH`] bytes long.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < RECORD_WIDTH {
            return None;
        }
        Some(Record {
            key: LittleEndian::read_i32(&buf[0..4]),
            p_a: LittleEndian::read_f64(&buf[4..12]),
            p_b: LittleEndian::read_f64(&buf[12..20]),
            p_aub: LittleEndian::read_f64(&buf[20..28]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let r = Record::new(42, 0.25, 0.5, 0.625);
        let mut buf = [0u8; RECORD_WIDTH];
        r.encode(&mut buf);
        let back = Record::decode(&buf).unwrap();
        assert_eq!(r, back);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let buf = [0u8; RECORD_WIDTH - 1];
        assert!(Record::decode(&buf).is_none());
    }

    #[test]
    fn negative_key_round_trips() {
        let r = Record::new(-7, -1.0, 2.0, 0.0);
        let mut buf = [0u8; RECORD_WIDTH];
        r.encode(&mut buf);
        assert_eq!(Record::decode(&buf).unwrap(), r);
    }
}
