//! Big-endian byte primitives shared by every box payload codec.
//!
//! Everything here is panic-free: reads past the end of a buffer return
//! [`Jp2Error::Truncated`] instead of indexing out of bounds.

use crate::error::Jp2Error;

fn need(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], Jp2Error> {
    bytes.get(offset..offset + len).ok_or_else(|| {
        Jp2Error::Truncated(format!(
            "expected {len} byte(s) at offset {offset}, buffer is {} byte(s)",
            bytes.len()
        ))
    })
}

pub fn read_u8(bytes: &[u8], offset: usize) -> Result<u8, Jp2Error> {
    Ok(need(bytes, offset, 1)?[0])
}

pub fn read_i8(bytes: &[u8], offset: usize) -> Result<i8, Jp2Error> {
    Ok(need(bytes, offset, 1)?[0] as i8)
}

pub fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, Jp2Error> {
    let b = need(bytes, offset, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

pub fn read_i16(bytes: &[u8], offset: usize) -> Result<i16, Jp2Error> {
    let b = need(bytes, offset, 2)?;
    Ok(i16::from_be_bytes([b[0], b[1]]))
}

pub fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, Jp2Error> {
    let b = need(bytes, offset, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_i32(bytes: &[u8], offset: usize) -> Result<i32, Jp2Error> {
    let b = need(bytes, offset, 4)?;
    Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_u64(bytes: &[u8], offset: usize) -> Result<u64, Jp2Error> {
    let b = need(bytes, offset, 8)?;
    Ok(u64::from_be_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

pub fn slice(bytes: &[u8], range: std::ops::Range<usize>) -> Result<Vec<u8>, Jp2Error> {
    Ok(need(bytes, range.start, range.end - range.start)?.to_vec())
}

pub fn write_u8(buf: &mut Vec<u8>, value: u8) {
    buf.push(value);
}

pub fn write_i8(buf: &mut Vec<u8>, value: i8) {
    buf.push(value as u8);
}

pub fn write_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn write_i16(buf: &mut Vec<u8>, value: i16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn write_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn write_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_msb_first() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u32(&bytes, 0).unwrap(), 0x0102_0304);
    }

    #[test]
    fn truncated_reads_fail_instead_of_panicking() {
        let bytes = [0x01];
        assert!(read_u32(&bytes, 0).is_err());
    }

    #[test]
    fn writes_are_msb_first() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0x0102_0304);
        assert_eq!(buf, vec![0x01, 0x02, 0x03, 0x04]);
    }
}
