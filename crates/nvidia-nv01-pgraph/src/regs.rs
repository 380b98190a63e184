//! NV01 BAR0 register map.
//!
//! PGRAPH registers live at 0x400000-0x40ffff; object methods at
//! `0x400000 | class << 16 | method` for classes 0x01-0x1f.

// PMC
pub const PMC_BOOT_0: u32 = 0x00_0000;
pub const PMC_ENABLE: u32 = 0x00_0200;
/// PMC_ENABLE with PGRAPH held in reset.
pub const PMC_ENABLE_PGRAPH_RESET: u32 = 0xffff_efff;
/// PMC_ENABLE bit that indicates the memory controller is up.
pub const PMC_ENABLE_PFB_BIT: u32 = 24;

// PFB
pub const PFB_BOOT_0: u32 = 0x60_0000;
pub const PFB_CONFIG_0: u32 = 0x60_0200;
/// PFB_CONFIG bits the generator randomizes: width, depth, dual buffer.
pub const PFB_CONFIG_RANDOM: u32 = 0x0000_1370;

/// Start of the VRAM aperture.
pub const VRAM_BASE: u32 = 0x100_0000;

// PGRAPH control
pub const DEBUG: [u32; 3] = [0x40_0080, 0x40_0084, 0x40_0088];
pub const INTR: u32 = 0x40_0100;
pub const INVALID: u32 = 0x40_0104;
pub const INTR_EN: u32 = 0x40_0140;
pub const INVALID_EN: u32 = 0x40_0144;
pub const CTX_SWITCH_0: u32 = 0x40_0180;
pub const CTX_CONTROL: u32 = 0x40_0190;

// Vertex RAM
pub const VTX_X: u32 = 0x40_0400;
pub const VTX_Y: u32 = 0x40_0480;
pub const VTX_X_REL: u32 = 0x40_0500;
pub const VTX_Y_REL: u32 = 0x40_0580;
pub const VTX_BETA: u32 = 0x40_0700;
pub const VTX_COUNT: usize = 18;
pub const VTX_BETA_COUNT: usize = 14;

// Clipping
pub const ICLIP: u32 = 0x40_0450;
pub const ICLIP_REL: u32 = 0x40_0550;
/// X min, X max, Y min, Y max.
pub const UCLIP: u32 = 0x40_0460;
pub const UCLIP_REL: u32 = 0x40_0560;

// Object state
pub const PATTERN_MONO_BITMAP: [u32; 2] = [0x40_0610, 0x40_0614];
pub const PATTERN_CONFIG: u32 = 0x40_0618;
pub const BITMAP_COLOR: [u32; 2] = [0x40_061c, 0x40_0620];
pub const ROP: u32 = 0x40_0624;
pub const PLANE: u32 = 0x40_0628;
pub const CHROMA: u32 = 0x40_062c;
pub const BETA: u32 = 0x40_0630;
pub const CANVAS_CONFIG: u32 = 0x40_0634;

// Hidden state
pub const XY_MISC_0: u32 = 0x40_0640;
pub const XY_MISC_1: u32 = 0x40_0644;
pub const XY_MISC_4: [u32; 2] = [0x40_0648, 0x40_064c];
pub const VALID: u32 = 0x40_0650;
pub const MISC32: u32 = 0x40_0654;
pub const SUBDIVIDE: u32 = 0x40_0658;
pub const EDGEFILL: u32 = 0x40_065c;

// Context and canvas
pub const CTX_SWITCH_1: u32 = 0x40_0680;
pub const NOTIFY: u32 = 0x40_0684;
pub const DST_CANVAS_MIN: u32 = 0x40_0688;
pub const DST_CANVAS_MAX: u32 = 0x40_068c;
pub const CLIPRECT_CTRL: u32 = 0x40_06a0;
pub const ACCESS: u32 = 0x40_06a4;
pub const STATUS: u32 = 0x40_06b0;
pub const TRAP_ADDR: u32 = 0x40_06b4;
pub const TRAP_DATA: u32 = 0x40_06b8;

/// Pattern colour (R10G10B10) for bitmap bit value `i`.
#[must_use]
pub const fn pattern_mono_rgb(i: usize) -> u32 {
    0x40_0600 + i as u32 * 8
}

/// Pattern alpha for bitmap bit value `i`.
#[must_use]
pub const fn pattern_mono_a(i: usize) -> u32 {
    0x40_0604 + i as u32 * 8
}

#[must_use]
pub const fn cliprect_min(i: usize) -> u32 {
    0x40_0690 + i as u32 * 8
}

#[must_use]
pub const fn cliprect_max(i: usize) -> u32 {
    0x40_0694 + i as u32 * 8
}

/// Method port of `class` at method offset `mthd`.
#[must_use]
pub const fn method_addr(class: u32, mthd: u32) -> u32 {
    0x40_0000 | class << 16 | mthd
}

/// Split a BAR0 offset into `(class, method)` if it addresses a method port.
#[must_use]
pub const fn decode_method(offset: u32) -> Option<(u32, u32)> {
    if offset >= 0x41_0000 && offset < 0x60_0000 {
        Some(((offset >> 16) & 0x1f, offset & 0x1ffc))
    } else {
        None
    }
}

// Writable-bit masks
pub const DEBUG_MASK: [u32; 3] = [0x1111_1110, 0x3111_1101, 0x1111_1111];
pub const INTR_EN_MASK: u32 = 0x1111_1111;
pub const INVALID_EN_MASK: u32 = 0x0001_1111;
pub const CTX_SWITCH_0_MASK: u32 = 0x807f_ffff;
pub const CTX_CONTROL_MASK: u32 = 0x1101_0103;
pub const CTX_SWITCH_1_MASK: u32 = 0x0000_ffff;
pub const NOTIFY_MASK: u32 = 0x0011_ffff;
pub const VTX_BETA_MASK: u32 = 0x01ff_ffff;
pub const CLIP_MASK: u32 = 0x0003_ffff;
pub const PATTERN_RGB_MASK: u32 = 0x3fff_ffff;
pub const PATTERN_A_MASK: u32 = 0xff;
pub const PATTERN_CONFIG_MASK: u32 = 3;
pub const COLOR_MASK: u32 = 0x7fff_ffff;
pub const ROP_MASK: u32 = 0xff;
pub const BETA_MASK: u32 = 0x7f80_0000;
pub const CANVAS_CONFIG_MASK: u32 = 0x0111_1011;
pub const CANVAS_MAX_MASK: u32 = 0x0fff_0fff;
pub const CLIPRECT_MASK: u32 = 0x0fff_0fff;
pub const CLIPRECT_CTRL_MASK: u32 = 0x113;
pub const XY_MISC_0_MASK: u32 = 0xf1ff_11ff;
pub const XY_MISC_1_MASK: u32 = 0x0317_7331;
pub const XY_MISC_4_MASK: u32 = 0x30ff_ffff;
pub const VALID_MASK: u32 = 0x111f_f1ff;
pub const SUBDIVIDE_MASK: u32 = 0xffff_00ff;
pub const EDGEFILL_MASK: u32 = 0xffff_0113;
/// ACCESS bits that hold state: enables at 0/4/8, bound class at 12-16.
pub const ACCESS_MASK: u32 = 0x0001_f111;
/// ACCESS write-enable flags, always read back as set.
pub const ACCESS_WRITE_FLAGS: u32 = 0x0f00_0000;
/// ACCESS value the load/dump sequences park the engine in.
pub const ACCESS_PARKED: u32 = 0x0400_0100;

/// The object classes the suite drives.
pub const CLASSES: [u32; 20] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x1d, 0x1e,
    0x10, 0x11, 0x12, 0x13, 0x14,
];

pub mod class {
    pub const BETA: u32 = 0x01;
    pub const ROP: u32 = 0x02;
    pub const CHROMA: u32 = 0x03;
    pub const PLANE: u32 = 0x04;
    pub const CLIP: u32 = 0x05;
    pub const PATTERN: u32 = 0x06;
    pub const POINT: u32 = 0x08;
    pub const LINE: u32 = 0x09;
    pub const LIN: u32 = 0x0a;
    pub const TRI: u32 = 0x0b;
    pub const RECT: u32 = 0x0c;
    pub const TEXLIN: u32 = 0x0d;
    pub const TEXQUAD: u32 = 0x0e;
    pub const BLIT: u32 = 0x10;
    pub const IFC: u32 = 0x11;
    pub const BITMAP: u32 = 0x12;
    pub const IFM: u32 = 0x13;
    pub const ITM: u32 = 0x14;
    pub const TEXLINBETA: u32 = 0x1d;
    pub const TEXQUADBETA: u32 = 0x1e;

    /// Textured classes, with or without beta.
    #[must_use]
    pub const fn is_tex(cls: u32) -> bool {
        matches!(cls, TEXLIN | TEXQUAD | TEXLINBETA | TEXQUADBETA)
    }

    /// Line, lin and triangle: the classes with a solid colour and polylines.
    #[must_use]
    pub const fn is_solid_multi(cls: u32) -> bool {
        matches!(cls, LINE | LIN | TRI)
    }

    /// Image-from-CPU, bitmap and image-from-memory.
    #[must_use]
    pub const fn is_image_in(cls: u32) -> bool {
        matches!(cls, IFC | BITMAP | IFM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_address_round_trips_through_decode() {
        let addr = method_addr(class::TRI, 0x0504);
        assert_eq!(addr, 0x4b_0504);
        assert_eq!(decode_method(addr), Some((0x0b, 0x504)));
    }

    #[test]
    fn pgraph_registers_are_not_methods() {
        assert_eq!(decode_method(ACCESS), None);
        assert_eq!(decode_method(PFB_CONFIG_0), None);
    }

    #[test]
    fn textured_classes() {
        for cls in [0x0d, 0x0e, 0x1d, 0x1e] {
            assert!(class::is_tex(cls));
        }
        for cls in [0x0c, 0x0f, 0x10, 0x1c, 0x1f] {
            assert!(!class::is_tex(cls));
        }
    }
}
