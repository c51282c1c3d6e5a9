//! Integer encodings used by the bytecode image.
//!
//! Segment headers are big endian. The header prologue uses the
//! printable "Graal" encodings, which offset every byte by 32.

/// Largest value a Graal short can carry.
pub const GRAAL_SHORT_MAX: u16 = 28767;

#[inline]
pub fn write_u16_be(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[inline]
pub fn write_u32_be(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Single byte offset into the printable range.
///
/// Values from 223 upwards would overflow and are written as is.
#[inline]
pub fn write_graal_byte(out: &mut Vec<u8>, value: u8) {
    out.push(if value < 223 { value + 32 } else { value });
}

/// Two bytes of 7 bits each, offset into the printable range.
///
/// Values are clamped to [`GRAAL_SHORT_MAX`].
pub fn write_graal_short(out: &mut Vec<u8>, value: u16) {
    let value = value.min(GRAAL_SHORT_MAX);
    let high = (value >> 7).min(223);
    let low = value - (high << 7);
    out.push(high as u8 + 32);
    out.push(low as u8 + 32);
}

pub fn read_graal_short(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [high, low, ..] => {
            let high = u16::from(high.checked_sub(32)?);
            let low = u16::from(low.checked_sub(32)?);
            Some((high << 7) + low)
        }
        _ => None,
    }
}

pub fn read_u16_be(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [a, b, ..] => Some(u16::from_be_bytes([*a, *b])),
        _ => None,
    }
}

pub fn read_u32_be(bytes: &[u8]) -> Option<u32> {
    match bytes {
        [a, b, c, d, ..] => Some(u32::from_be_bytes([*a, *b, *c, *d])),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_graal_short() {
        let mut out = vec![];
        write_graal_short(&mut out, 28);
        assert_eq!(out, [32, 60]);
        assert_eq!(read_graal_short(&out), Some(28));

        out.clear();
        write_graal_short(&mut out, 300);
        assert_eq!(out, [34, 76]);
        assert_eq!(read_graal_short(&out), Some(300));

        out.clear();
        write_graal_short(&mut out, u16::MAX);
        assert_eq!(read_graal_short(&out), Some(GRAAL_SHORT_MAX));
    }

    #[test]
    fn test_graal_byte() {
        let mut out = vec![];
        write_graal_byte(&mut out, 0);
        write_graal_byte(&mut out, 222);
        write_graal_byte(&mut out, 230);
        assert_eq!(out, [32, 254, 230]);
    }

    #[test]
    fn test_big_endian() {
        let mut out = vec![];
        write_u32_be(&mut out, 0x01020304);
        write_u16_be(&mut out, 0xABCD);
        assert_eq!(out, [1, 2, 3, 4, 0xAB, 0xCD]);
        assert_eq!(read_u32_be(&out), Some(0x01020304));
        assert_eq!(read_u16_be(&out[4..]), Some(0xABCD));
        assert_eq!(read_u16_be(&out[5..]), None);
    }
}
