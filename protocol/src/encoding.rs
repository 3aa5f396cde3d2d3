//! Firmata carries every value as 7-bit data bytes, least significant group
//! first.

pub fn lsb(value: u32) -> u8 {
    (value & 0x7F) as u8
}

pub fn msb(value: u32) -> u8 {
    ((value >> 7) & 0x7F) as u8
}

/// Third 7-bit group of a 21-bit value.
pub fn xsb(value: u32) -> u8 {
    ((value >> 14) & 0x7F) as u8
}

pub fn combine(lsb: u8, msb: u8) -> u16 {
    (lsb as u16 & 0x7F) | ((msb as u16) << 7)
}

/// Appends `value` as two 7-bit bytes.
pub fn push_u14(buf: &mut Vec<u8>, value: u32) {
    buf.push(lsb(value));
    buf.push(msb(value));
}

/// Appends `value` as three 7-bit bytes.
pub fn push_u21(buf: &mut Vec<u8>, value: u32) {
    buf.push(lsb(value));
    buf.push(msb(value));
    buf.push(xsb(value));
}

/// Decodes consecutive 7-bit pairs into 14-bit words.
///
/// A trailing unpaired byte is dropped.
pub fn words(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2).map(|p| combine(p[0], p[1])).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn split_and_combine() {
        assert_eq!(lsb(544), 0x20);
        assert_eq!(msb(544), 0x04);
        assert_eq!(combine(0x20, 0x04), 544);
        assert_eq!(combine(0x7F, 0x7F), 0x3FFF);
    }

    #[test]
    fn values_are_truncated_to_their_groups() {
        let mut buf = Vec::new();
        push_u14(&mut buf, 0x1_FFFF);
        assert_eq!(buf, [0x7F, 0x7F]);

        let mut buf = Vec::new();
        push_u21(&mut buf, 80_000);
        assert_eq!(buf, [0x00, 0x71, 0x04]);
    }

    #[test]
    fn words_drop_trailing_byte() {
        assert_eq!(words(&[0x68, 0x00, 0x3B, 0x00, 0x01]), vec![0x68, 0x3B]);
        assert!(words(&[0x05]).is_empty());
    }
}
