//! Per-pixel raster operations.

use hwtest_core::bits::{bit, extract};

use super::color::{Color, bytes_per_pixel, expand_color, expand_surf, pack_surf, to_a1r10g10b10};
use crate::state::EngineState;

/// Framebuffer line widths selected by PFB_CONFIG bits 4-6.
const LINE_WIDTHS: [u32; 8] = [576, 640, 800, 1024, 1152, 1280, 1600, 1856];

/// VRAM size from PFB_BOOT_0: 1, 2 or 4 MiB.
#[must_use]
pub fn vram_size(pfb_boot: u32) -> u32 {
    match pfb_boot & 3 {
        0 => 0x10_0000,
        1 => 0x20_0000,
        _ => 0x40_0000,
    }
}

#[must_use]
pub fn line_width(pfb_config: u32) -> u32 {
    LINE_WIDTHS[extract(pfb_config, 4, 3) as usize]
}

/// Byte offset in VRAM of pixel `(x, y)` of framebuffer `buffer`.
///
/// The second buffer of a dual-buffered setup starts halfway into VRAM.
#[must_use]
pub fn pixel_offset(state: &EngineState, x: u32, y: u32, buffer: usize) -> u32 {
    let vram = vram_size(state.pfb_boot);
    let cpp = bytes_per_pixel(state.pfb_config);
    let base = if buffer == 0 { 0 } else { vram / 2 };
    let offset = (y.wrapping_mul(line_width(state.pfb_config)).wrapping_add(x)).wrapping_mul(cpp);
    base.wrapping_add(offset) & (vram - 1)
}

/// Mask of the framebuffers a draw writes: bit 0 for buffer 0, bit 1 for
/// buffer 1. Single-buffered setups always draw to buffer 0 only.
#[must_use]
pub fn dst_buffers(state: &EngineState) -> u32 {
    if !bit(state.pfb_config, 12) {
        return 1;
    }
    (extract(state.ctx_switch[0], 9, 4) / 5 + 1) & 3
}

/// Pattern colour at `(x, y)`.
///
/// Shape 0 is an 8x8 tile, shape 1 a 64x1 strip, shape 2 a 1x64 strip.
#[must_use]
pub fn pattern_pixel(state: &EngineState, x: u32, y: u32) -> Color {
    let index = match state.pattern_config & 3 {
        1 => x & 63,
        2 => y & 63,
        _ => (y & 7) * 8 + (x & 7),
    };
    let bitmap = u64::from(state.pattern_mono_bitmap[1]) << 32
        | u64::from(state.pattern_mono_bitmap[0]);
    let sel = (bitmap >> index & 1) as usize;
    Color::from_r10g10b10(state.pattern_mono_rgb[sel], state.pattern_mono_a[sel])
}

fn inside_cliprect(state: &EngineState, i: usize, x: u32, y: u32) -> bool {
    let (min, max) = (state.cliprect_min[i], state.cliprect_max[i]);
    (extract(min, 0, 12)..extract(max, 0, 12)).contains(&x)
        && (extract(min, 16, 12)..extract(max, 16, 12)).contains(&y)
}

/// Whether `(x, y)` survives the clip rectangles.
///
/// Control bits 0-1: 0 disables clipping, 1 keeps pixels inside any
/// rectangle, 2 keeps pixels outside all, 3 keeps pixels inside both.
/// Bit 4 enables the second rectangle.
#[must_use]
pub fn cliprect_pass(state: &EngineState, x: u32, y: u32) -> bool {
    let ctrl = state.cliprect_ctrl;
    let count = if bit(ctrl, 4) { 2 } else { 1 };
    let mut inside = (0..count).map(|i| inside_cliprect(state, i, x, y));
    match ctrl & 3 {
        0 => true,
        1 => inside.any(|hit| hit),
        2 => !inside.any(|hit| hit),
        _ => inside.all(|hit| hit),
    }
}

/// Whether `(x, y)` lies inside the destination canvas.
#[must_use]
pub fn inside_canvas(state: &EngineState, x: u32, y: u32) -> bool {
    let x = x as i32;
    let y = y as i32;
    let min_x = extract(state.dst_canvas_min, 0, 16) as i16 as i32;
    let min_y = extract(state.dst_canvas_min, 16, 16) as i16 as i32;
    let max_x = extract(state.dst_canvas_max, 0, 12) as i32;
    let max_y = extract(state.dst_canvas_max, 16, 12) as i32;
    (min_x..max_x).contains(&x) && (min_y..max_y).contains(&y)
}

/// Operand routing for ROP codes 0x00-0x17, by the low three bits:
/// which of (pattern, source, destination) feeds each ROP3 input.
const ROUTING: [[Operand; 3]; 8] = {
    use Operand::{D, P, S};
    [
        [P, S, D],
        [S, D, D],
        [D, S, D],
        [S, S, D],
        [D, D, S],
        [S, D, S],
        [D, S, S],
        [S, S, S],
    ]
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    P,
    S,
    D,
}

/// Classic three-operand ROP on one 10-bit channel.
fn rop3(code: u32, p: u32, s: u32, d: u32) -> u32 {
    (0..10).fold(0, |out, i| {
        let index = (p >> i & 1) << 2 | (s >> i & 1) << 1 | (d >> i & 1);
        out | (code >> index & 1) << i
    })
}

fn blend_channel(s: u32, d: u32, f: u32) -> u32 {
    (s * f + d * (0xff - f)) / 0xff
}

fn blend(s: Color, d: Color, f: u32) -> Color {
    Color::new(
        blend_channel(s.r, d.r, f),
        blend_channel(s.g, d.g, f),
        blend_channel(s.b, d.b, f),
        0xff,
    )
}

/// Apply the context's raster operation to one destination pixel.
///
/// The operation is `ctx_switch` bits 0-4. Codes 0x00-0x17 run the ROP
/// register as a ROP3 over routed operands; bit 3 adds a chroma-key reject
/// and bit 4 the plane mask. Codes 0x18-0x1c blend by source alpha or beta.
/// Codes 0x1d-0x1f leave the pixel untouched.
#[must_use]
pub fn rop(state: &EngineState, x: u32, y: u32, dst_pixel: u32, src: Color) -> u32 {
    let op = extract(state.ctx_switch[0], 0, 5);
    if op > 0x1c {
        return dst_pixel;
    }
    if bit(op, 3) && to_a1r10g10b10(src) == state.chroma {
        return dst_pixel;
    }
    let d = expand_surf(state, dst_pixel);
    let p = pattern_pixel(state, x, y);
    let beta = extract(state.beta, 23, 8);
    let mut out = match op {
        0x18 => blend(src, d, src.a),
        0x19 => blend(src, d, src.a * beta / 0xff),
        0x1a => blend(src, d, 0xff - src.a),
        0x1b => blend(src, p, beta),
        0x1c => blend(src, p, 0xff - beta),
        _ => {
            let route = ROUTING[(op & 7) as usize];
            let pick = |operand: Operand, channel: fn(&Color) -> u32| match operand {
                Operand::P => channel(&p),
                Operand::S => channel(&src),
                Operand::D => channel(&d),
            };
            let channel = |get: fn(&Color) -> u32| {
                rop3(
                    state.rop,
                    pick(route[0], get),
                    pick(route[1], get),
                    pick(route[2], get),
                )
            };
            Color::new(channel(|c| c.r), channel(|c| c.g), channel(|c| c.b), 0xff)
        }
    };
    if bit(op, 4) {
        let plane = Color::from_r10g10b10(state.plane, 0);
        out.r = (out.r & plane.r) | (d.r & !plane.r & 0x3ff);
        out.g = (out.g & plane.g) | (d.g & !plane.g & 0x3ff);
        out.b = (out.b & plane.b) | (d.b & !plane.b & 0x3ff);
    }
    pack_surf(state, out)
}

/// Raster a pixel of the solid colour held in `misc32`.
#[must_use]
pub fn solid_rop(state: &EngineState, x: u32, y: u32, dst_pixel: u32) -> u32 {
    rop(state, x, y, dst_pixel, expand_color(state, state.misc32))
}

/// Predict both framebuffers after drawing a point at `(x, y)`.
///
/// `dst` holds the current pixel of each buffer, masked to the pixel size.
#[must_use]
pub fn point_pixels(state: &EngineState, x: u32, y: u32, dst: [u32; 2]) -> [u32; 2] {
    if !inside_canvas(state, x, y) {
        return dst;
    }
    let buffers = dst_buffers(state);
    let pass = cliprect_pass(state, x, y);
    let mut out = dst;
    if buffers & 1 != 0 && pass {
        out[0] = solid_rop(state, x, y, dst[0]);
    }
    if buffers & 2 != 0 && (pass || bit(state.canvas_config, 4)) {
        out[1] = solid_rop(state, x, y, dst[1]);
    }
    out
}

/// Predict both framebuffers after blitting the pixel at `src_xy` to
/// `dst_xy`. `src` and `dst` hold the current pixels of each buffer.
#[must_use]
pub fn blit_pixels(
    state: &EngineState,
    src_xy: (u32, u32),
    dst_xy: (u32, u32),
    src: [u32; 2],
    dst: [u32; 2],
) -> [u32; 2] {
    let (sx, sy) = src_xy;
    let (x, y) = dst_xy;
    if !inside_canvas(state, x, y) {
        return dst;
    }
    let mut spixel = if inside_canvas(state, sx, sy) { src } else { [0; 2] };
    if !cliprect_pass(state, sx, sy) {
        spixel[0] = 0;
        if !bit(state.canvas_config, 4) {
            spixel[1] = 0;
        }
    }
    if !bit(state.pfb_config, 12) {
        spixel[1] = spixel[0];
    }
    let s = expand_surf(state, spixel[usize::from(bit(state.ctx_switch[0], 13))]);
    let buffers = dst_buffers(state);
    let pass = cliprect_pass(state, x, y);
    let mut out = dst;
    if buffers & 1 != 0 && pass {
        out[0] = rop(state, x, y, dst[0], s);
    }
    if buffers & 2 != 0 && (pass || bit(state.canvas_config, 4)) {
        out[1] = rop(state, x, y, dst[1], s);
    }
    out
}
