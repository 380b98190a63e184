//! Colour expansion between method formats, the internal A8R10G10B10
//! representation and framebuffer pixels.

use hwtest_core::bits::{bit, extract};

use crate::state::EngineState;

/// Internal colour: 10 bits per channel, 8-bit alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u32,
    pub g: u32,
    pub b: u32,
    pub a: u32,
}

impl Color {
    #[must_use]
    pub const fn new(r: u32, g: u32, b: u32, a: u32) -> Self {
        Self { r, g, b, a }
    }

    /// From a packed R10G10B10 word and a separate alpha.
    #[must_use]
    pub fn from_r10g10b10(rgb: u32, a: u32) -> Self {
        Self::new(extract(rgb, 20, 10), extract(rgb, 10, 10), extract(rgb, 0, 10), a & 0xff)
    }

    #[must_use]
    pub fn r10g10b10(&self) -> u32 {
        self.r << 20 | self.g << 10 | self.b
    }
}

/// Method colour formats, selected by `ctx_switch` bits 9-12 modulo 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    A1R5G5B5,
    A8R8G8B8,
    A2R10G10B10,
    A8Y8,
    A16Y16,
}

impl ColorFormat {
    #[must_use]
    pub fn from_ctx_switch(ctx_switch: u32) -> Self {
        match extract(ctx_switch, 9, 4) % 5 {
            0 => Self::A1R5G5B5,
            1 => Self::A8R8G8B8,
            2 => Self::A2R10G10B10,
            3 => Self::A8Y8,
            _ => Self::A16Y16,
        }
    }

    /// Bytes one pixel takes in an image transfer.
    #[must_use]
    pub fn bytes_in(self) -> u32 {
        match self {
            Self::A1R5G5B5 | Self::A16Y16 => 2,
            Self::A8R8G8B8 | Self::A2R10G10B10 => 4,
            Self::A8Y8 => 1,
        }
    }
}

/// Bytes per source pixel for image transfers in the current context.
#[must_use]
pub fn cpp_in(ctx_switch: u32) -> u32 {
    ColorFormat::from_ctx_switch(ctx_switch).bytes_in()
}

fn widen5(v: u32, replicate: bool) -> u32 {
    let v = v & 0x1f;
    v << 5 | if replicate { v } else { 0 }
}

fn widen8(v: u32, replicate: bool) -> u32 {
    let v = v & 0xff;
    v << 2 | if replicate { v >> 6 } else { 0 }
}

/// Expand a method colour word in the context's format.
///
/// Narrow channels are shifted up; with `canvas_config` bit 20 set, the
/// vacated low bits replicate the channel's top bits.
#[must_use]
pub fn expand_color(state: &EngineState, word: u32) -> Color {
    let replicate = bit(state.canvas_config, 20);
    match ColorFormat::from_ctx_switch(state.ctx_switch[0]) {
        ColorFormat::A1R5G5B5 => Color::new(
            widen5(word >> 10, replicate),
            widen5(word >> 5, replicate),
            widen5(word, replicate),
            if bit(word, 15) { 0xff } else { 0 },
        ),
        ColorFormat::A8R8G8B8 => Color::new(
            widen8(word >> 16, replicate),
            widen8(word >> 8, replicate),
            widen8(word, replicate),
            word >> 24,
        ),
        ColorFormat::A2R10G10B10 => Color::from_r10g10b10(word, extract(word, 30, 2) * 0x55),
        ColorFormat::A8Y8 => {
            let y = widen8(word, replicate);
            Color::new(y, y, y, extract(word, 8, 8))
        }
        ColorFormat::A16Y16 => {
            let y = extract(word, 6, 10);
            Color::new(y, y, y, extract(word, 24, 8))
        }
    }
}

/// Pack to the A1R10G10B10 form the chroma and colour registers hold.
#[must_use]
pub fn to_a1r10g10b10(c: Color) -> u32 {
    u32::from(c.a != 0) << 30 | c.r10g10b10()
}

/// Monochrome bitmap word, bit-reversed within each byte when
/// `ctx_switch` bit 14 selects LSB-first order.
#[must_use]
pub fn expand_mono(state: &EngineState, word: u32) -> u32 {
    if !bit(state.ctx_switch[0], 14) {
        return word;
    }
    u32::from_le_bytes(word.to_le_bytes().map(u8::reverse_bits))
}

/// Framebuffer bytes per pixel from PFB_CONFIG bits 8-9.
#[must_use]
pub fn bytes_per_pixel(pfb_config: u32) -> u32 {
    match extract(pfb_config, 8, 2) {
        0 => 1,
        1 => 2,
        _ => 4,
    }
}

/// Framebuffer pixel to internal colour: Y8, X1R5G5B5 or X2R10G10B10.
#[must_use]
pub fn expand_surf(state: &EngineState, pixel: u32) -> Color {
    match bytes_per_pixel(state.pfb_config) {
        1 => {
            let y = widen8(pixel, true);
            Color::new(y, y, y, 0xff)
        }
        2 => Color::new(
            widen5(pixel >> 10, true),
            widen5(pixel >> 5, true),
            widen5(pixel, true),
            0xff,
        ),
        _ => Color::from_r10g10b10(pixel, 0xff),
    }
}

/// Internal colour to a framebuffer pixel.
#[must_use]
pub fn pack_surf(state: &EngineState, c: Color) -> u32 {
    match bytes_per_pixel(state.pfb_config) {
        1 => ((c.r + c.g + c.b) / 3) >> 2,
        2 => (c.r >> 5) << 10 | (c.g >> 5) << 5 | (c.b >> 5),
        _ => c.r10g10b10(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_format(fmt: u32, replicate: bool) -> EngineState {
        EngineState {
            ctx_switch: [fmt << 9, 0],
            canvas_config: if replicate { 1 << 20 } else { 0 },
            ..EngineState::default()
        }
    }

    #[test]
    fn format_selector_wraps_modulo_five() {
        assert_eq!(ColorFormat::from_ctx_switch(5 << 9), ColorFormat::A1R5G5B5);
        assert_eq!(ColorFormat::from_ctx_switch(14 << 9), ColorFormat::A16Y16);
        assert_eq!(cpp_in(3 << 9), 1);
        assert_eq!(cpp_in(1 << 9), 4);
    }

    #[test]
    fn r5g5b5_expansion() {
        let c = expand_color(&with_format(0, false), 0xfc1f);
        assert_eq!(c, Color::new(0x3e0, 0, 0x3e0, 0xff));
        let c = expand_color(&with_format(0, true), 0x7c00);
        assert_eq!(c, Color::new(0x3ff, 0, 0, 0));
    }

    #[test]
    fn a8r8g8b8_expansion() {
        let c = expand_color(&with_format(1, true), 0x80ff_4000);
        assert_eq!(c, Color::new(0x3ff, 0x101, 0, 0x80));
    }

    #[test]
    fn r10g10b10_alpha_steps() {
        let c = expand_color(&with_format(2, false), 0x8000_0001);
        assert_eq!(c.a, 0xaa);
        assert_eq!(c.b, 1);
        assert_eq!(to_a1r10g10b10(c), 0x4000_0001);
    }

    #[test]
    fn luminance_formats() {
        let c = expand_color(&with_format(3, false), 0x0000_7f40);
        assert_eq!(c, Color::new(0x100, 0x100, 0x100, 0x7f));
        let c = expand_color(&with_format(4, false), 0x1200_ffc0);
        assert_eq!(c, Color::new(0x3ff, 0x3ff, 0x3ff, 0x12));
    }

    #[test]
    fn mono_bit_order() {
        let mut state = EngineState::default();
        assert_eq!(expand_mono(&state, 0x0180_ff01), 0x0180_ff01);
        state.ctx_switch[0] = 1 << 14;
        assert_eq!(expand_mono(&state, 0x0180_ff01), 0x8001_ff80);
    }

    #[test]
    fn surface_formats_round_trip_their_own_pixels() {
        let mut state = EngineState::default();
        for (config, pixel) in [(0x000, 0x5a), (0x100, 0x7c1f), (0x200, 0x3ff0_0401)] {
            state.pfb_config = config;
            let c = expand_surf(&state, pixel);
            assert_eq!(pack_surf(&state, c), pixel, "config {config:03x}");
        }
    }
}
