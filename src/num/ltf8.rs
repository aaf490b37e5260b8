use std::io::{self, Read, Write};

use super::read_u8;

/// Reads a one-to-nine byte variable-length unsigned 64-bit integer.
///
/// This is the 64-bit analog of [`super::read_itf8`], used for the wider
/// counters (e.g. slice record counters) introduced in CRAM 3.0.
pub fn read_ltf8<R>(reader: &mut R) -> io::Result<i64>
where
    R: Read,
{
    let b0 = i64::from(read_u8(reader)?);

    let value = if b0 & 0x80 == 0 {
        b0
    } else if b0 & 0x40 == 0 {
        let b1 = i64::from(read_u8(reader)?);
        ((b0 & 0x3f) << 8) | b1
    } else if b0 & 0x20 == 0 {
        let b1 = i64::from(read_u8(reader)?);
        let b2 = i64::from(read_u8(reader)?);
        ((b0 & 0x1f) << 16) | (b1 << 8) | b2
    } else if b0 & 0x10 == 0 {
        let b1 = i64::from(read_u8(reader)?);
        let b2 = i64::from(read_u8(reader)?);
        let b3 = i64::from(read_u8(reader)?);
        ((b0 & 0x0f) << 24) | (b1 << 16) | (b2 << 8) | b3
    } else if b0 & 0x08 == 0 {
        let b1 = i64::from(read_u8(reader)?);
        let b2 = i64::from(read_u8(reader)?);
        let b3 = i64::from(read_u8(reader)?);
        let b4 = i64::from(read_u8(reader)?);
        ((b0 & 0x07) << 32) | (b1 << 24) | (b2 << 16) | (b3 << 8) | b4
    } else if b0 & 0x04 == 0 {
        let b1 = i64::from(read_u8(reader)?);
        let b2 = i64::from(read_u8(reader)?);
        let b3 = i64::from(read_u8(reader)?);
        let b4 = i64::from(read_u8(reader)?);
        let b5 = i64::from(read_u8(reader)?);
        ((b0 & 0x03) << 40) | (b1 << 32) | (b2 << 24) | (b3 << 16) | (b4 << 8) | b5
    } else if b0 & 0x02 == 0 {
        let b1 = i64::from(read_u8(reader)?);
        let b2 = i64::from(read_u8(reader)?);
        let b3 = i64::from(read_u8(reader)?);
        let b4 = i64::from(read_u8(reader)?);
        let b5 = i64::from(read_u8(reader)?);
        let b6 = i64::from(read_u8(reader)?);
        ((b0 & 0x01) << 48) | (b1 << 40) | (b2 << 32) | (b3 << 24) | (b4 << 16) | (b5 << 8) | b6
    } else if b0 & 0x01 == 0 {
        let b1 = i64::from(read_u8(reader)?);
        let b2 = i64::from(read_u8(reader)?);
        let b3 = i64::from(read_u8(reader)?);
        let b4 = i64::from(read_u8(reader)?);
        let b5 = i64::from(read_u8(reader)?);
        let b6 = i64::from(read_u8(reader)?);
        let b7 = i64::from(read_u8(reader)?);
        (b1 << 48) | (b2 << 40) | (b3 << 32) | (b4 << 24) | (b5 << 16) | (b6 << 8) | b7
    } else {
        let b1 = i64::from(read_u8(reader)?);
        let b2 = i64::from(read_u8(reader)?);
        let b3 = i64::from(read_u8(reader)?);
        let b4 = i64::from(read_u8(reader)?);
        let b5 = i64::from(read_u8(reader)?);
        let b6 = i64::from(read_u8(reader)?);
        let b7 = i64::from(read_u8(reader)?);
        let b8 = i64::from(read_u8(reader)?);
        (b1 << 56) | (b2 << 48) | (b3 << 40) | (b4 << 32) | (b5 << 24) | (b6 << 16) | (b7 << 8) | b8
    };

    Ok(value)
}

/// Writes `value` as a one-to-nine byte variable-length unsigned 64-bit
/// integer.
pub fn write_ltf8<W>(writer: &mut W, value: i64) -> io::Result<()>
where
    W: Write,
{
    let n = value as u64;

    if n >> 7 == 0 {
        writer.write_all(&[n as u8])
    } else if n >> 14 == 0 {
        let b0 = 0x80 | ((n >> 8) as u8 & 0x3f);
        writer.write_all(&[b0, n as u8])
    } else if n >> 21 == 0 {
        let b0 = 0xc0 | ((n >> 16) as u8 & 0x1f);
        writer.write_all(&[b0, (n >> 8) as u8, n as u8])
    } else if n >> 28 == 0 {
        let b0 = 0xe0 | ((n >> 24) as u8 & 0x0f);
        writer.write_all(&[b0, (n >> 16) as u8, (n >> 8) as u8, n as u8])
    } else if n >> 35 == 0 {
        let b0 = 0xf0 | ((n >> 32) as u8 & 0x07);
        writer.write_all(&[
            b0,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ])
    } else if n >> 42 == 0 {
        let b0 = 0xf8 | ((n >> 40) as u8 & 0x03);
        writer.write_all(&[
            b0,
            (n >> 32) as u8,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ])
    } else if n >> 49 == 0 {
        let b0 = 0xfc | ((n >> 48) as u8 & 0x01);
        writer.write_all(&[
            b0,
            (n >> 40) as u8,
            (n >> 32) as u8,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ])
    } else if n >> 56 == 0 {
        writer.write_all(&[
            0xfe,
            (n >> 48) as u8,
            (n >> 40) as u8,
            (n >> 32) as u8,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ])
    } else {
        writer.write_all(&[
            0xff,
            (n >> 56) as u8,
            (n >> 48) as u8,
            (n >> 40) as u8,
            (n >> 32) as u8,
            (n >> 24) as u8,
            (n >> 16) as u8,
            (n >> 8) as u8,
            n as u8,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: i64) -> io::Result<()> {
        let mut buf = Vec::new();
        write_ltf8(&mut buf, value)?;

        let mut reader = &buf[..];
        assert_eq!(read_ltf8(&mut reader)?, value);

        Ok(())
    }

    #[test]
    fn test_round_trip() -> io::Result<()> {
        for &value in &[
            0,
            1,
            127,
            128,
            16383,
            16384,
            2097151,
            2097152,
            268435455,
            268435456,
            34359738367,
            34359738368,
            4398046511103,
            4398046511104,
            562949953421311,
            562949953421312,
            72057594037927935,
            72057594037927936,
            i64::MAX,
            -1,
            i64::MIN,
        ] {
            round_trip(value)?;
        }

        Ok(())
    }

    #[test]
    fn test_read_ltf8_truncated() {
        let data = [0xff];
        let result = read_ltf8(&mut &data[..]);
        assert!(result.is_err());
    }
}
