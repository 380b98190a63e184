//! Bit-field helpers over 32-bit register words.
//!
//! Fields are addressed as `(offset, width)` with the low bit at `offset`.

/// Mask of the low `width` bits.
#[must_use]
pub const fn mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1 << width) - 1
    }
}

/// Unsigned field at `offset`, `width` bits wide.
#[must_use]
pub fn extract(value: u32, offset: u32, width: u32) -> u32 {
    debug_assert!(offset + width <= 32, "field {offset}+{width} out of range");
    if width == 0 {
        return 0;
    }
    (value >> offset) & mask(width)
}

/// Sign-extended field at `offset`, `width` bits wide.
#[must_use]
pub fn extract_signed(value: u32, offset: u32, width: u32) -> i32 {
    debug_assert!(offset + width <= 32, "field {offset}+{width} out of range");
    if width == 0 {
        return 0;
    }
    let shift = 32 - width;
    ((extract(value, offset, width) << shift) as i32) >> shift
}

/// Replace the field at `offset` with the low `width` bits of `field`.
pub fn insert(value: &mut u32, offset: u32, width: u32, field: u32) {
    debug_assert!(offset + width <= 32, "field {offset}+{width} out of range");
    if width == 0 {
        return;
    }
    let m = mask(width) << offset;
    *value = (*value & !m) | ((field << offset) & m);
}

#[must_use]
pub fn bit(value: u32, n: u32) -> bool {
    debug_assert!(n < 32);
    value >> n & 1 != 0
}

pub fn set_bit(value: &mut u32, n: u32, on: bool) {
    insert(value, n, 1, u32::from(on));
}

/// Sign-extend the low `width` bits.
#[must_use]
pub fn sext(value: u32, width: u32) -> i32 {
    extract_signed(value, 0, width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extract_reads_field() {
        assert_eq!(extract(0x1234_5678, 8, 8), 0x56);
        assert_eq!(extract(0xdead_beef, 0, 32), 0xdead_beef);
        assert_eq!(extract(0x8000_0000, 31, 1), 1);
    }

    #[test]
    fn extract_signed_sign_extends() {
        assert_eq!(extract_signed(0x0000_ffff, 0, 16), -1);
        assert_eq!(extract_signed(0x0000_7fff, 0, 16), 0x7fff);
        assert_eq!(extract_signed(0x0002_0000, 0, 18), -0x2_0000);
        assert_eq!(extract_signed(0x8000_0000, 16, 16), -0x8000);
    }

    #[test]
    fn insert_replaces_only_field() {
        let mut v = 0xffff_ffff;
        insert(&mut v, 8, 4, 0);
        assert_eq!(v, 0xffff_f0ff);
        insert(&mut v, 8, 4, 0x1_5);
        assert_eq!(v, 0xffff_f5ff);
    }

    #[test]
    fn set_bit_toggles() {
        let mut v = 0;
        set_bit(&mut v, 24, true);
        assert_eq!(v, 0x0100_0000);
        assert!(bit(v, 24));
        set_bit(&mut v, 24, false);
        assert_eq!(v, 0);
    }

    proptest! {
        #[test]
        fn insert_then_extract_returns_masked_field(
            v in any::<u32>(),
            offset in 0u32..32,
            width in 1u32..=32,
            field in any::<u32>(),
        ) {
            prop_assume!(offset + width <= 32);
            let mut w = v;
            insert(&mut w, offset, width, field);
            prop_assert_eq!(extract(w, offset, width), field & mask(width));
            let outside = !(mask(width) << offset);
            prop_assert_eq!(w & outside, v & outside);
        }

        #[test]
        fn sext_agrees_with_native_casts(v in any::<u32>()) {
            prop_assert_eq!(sext(v, 16), i32::from(v as u16 as i16));
            prop_assert_eq!(sext(v, 8), i32::from(v as u8 as i8));
            prop_assert_eq!(sext(v, 32), v as i32);
        }
    }
}
