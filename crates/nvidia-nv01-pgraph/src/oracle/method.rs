//! Object methods: the legal-method table and the effect of each method.
//!
//! A method is a write to `0x400000 | class << 16 | offset`. The class in
//! the address picks the method layout; the class bound in ACCESS (written
//! by the context switch) decides what most of them do to vertex state.

use hwtest_core::bits::{bit, extract, extract_signed, insert, set_bit};

use super::color::{cpp_in, expand_color, expand_mono, to_a1r10g10b10};
use super::geometry::{bump_vtxid, prep_draw, set_clip, set_vtx, vtx_fixup};
use super::mmio::beta_write;
use super::transfer::ifc_data;
use crate::regs::{ROP_MASK, SUBDIVIDE_MASK, class};
use crate::state::{EngineState, X, Y};

/// How far the oracle's prediction can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    /// The predicted state is exact.
    Exact,
    /// The hardware does something the model does not cover.
    Unmodeled,
    /// The hardware is known to lock up on this input.
    Hang,
    /// The hardware sometimes locks up; compare only if it stayed idle.
    MayHang,
}

impl Prediction {
    /// Whether a dumped state with `status` should be compared at all.
    #[must_use]
    pub fn comparable(self, status: u32) -> bool {
        match self {
            Self::Exact => true,
            Self::Unmodeled | Self::Hang => false,
            Self::MayHang => status == 0,
        }
    }
}

/// A single-pixel draw the method issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp {
    Point { x: u32, y: u32 },
    /// Only the origin pixel of the blit is modeled.
    Blit { src: (u32, u32), dst: (u32, u32) },
}

/// Outcome of a method beyond its effect on the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodEffect {
    pub draw: Option<DrawOp>,
    pub prediction: Prediction,
}

impl MethodEffect {
    pub const EXACT: Self = Self {
        draw: None,
        prediction: Prediction::Exact,
    };

    #[must_use]
    pub const fn predicted(prediction: Prediction) -> Self {
        Self {
            draw: None,
            prediction,
        }
    }
}

/// Flags of a method that writes a 16-bit vertex pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VtxKind {
    /// Restarts the vertex cursor.
    pub first: bool,
    /// Triggers a draw after the write.
    pub draw: bool,
    /// Continues a polyline or mesh.
    pub poly: bool,
    /// Fractional texture coordinates.
    pub fract: bool,
}

impl VtxKind {
    const fn new(first: bool, draw: bool, poly: bool) -> Self {
        Self {
            first,
            draw,
            poly,
            fract: false,
        }
    }
}

/// A decoded method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    CtxSwitch,
    Notify,
    Beta,
    Rop,
    Chroma,
    Plane,
    Clip { is_size: bool },
    PatternShape,
    PatternMonoColor(usize),
    PatternMonoBitmap(usize),
    SolidColor,
    Subdivide,
    VtxBeta(usize),
    TexColor,
    Vtx(VtxKind),
    VtxX32 { first: bool, poly: bool },
    VtxY32 { draw: bool, poly: bool },
    Rect { draw: bool },
    SizeOut,
    SizeIn { which: usize },
    Pitch,
    DmaOffset,
    IfcData { bitmap: bool },
    BitmapColor(usize),
}

fn pair(mthd: u32, base: u32) -> usize {
    ((mthd - base) >> 2) as usize
}

/// Even slots of an 8-byte group hold X (or a colour), odd slots Y.
fn odd(mthd: u32) -> bool {
    mthd & 4 != 0
}

fn xy32(mthd: u32, first: bool, draw: bool, poly: bool) -> Method {
    if odd(mthd) {
        Method::VtxY32 { draw, poly }
    } else {
        Method::VtxX32 { first, poly }
    }
}

fn tex_method(cls: u32, mthd: u32) -> Option<Method> {
    let vcnt = if cls & 0xf == 0xe { 9 } else { 4 };
    let with_beta = cls & 0x10 != 0;
    let m = match mthd {
        0x304 => Method::Subdivide,
        m if (0x310..0x310 + vcnt * 4).contains(&m) => Method::Vtx(VtxKind::new(m == 0x310, false, false)),
        m if (0x350..0x350 + vcnt * 4).contains(&m) => Method::Vtx(VtxKind {
            fract: true,
            ..VtxKind::new(m == 0x350, false, false)
        }),
        m if with_beta && (0x380..0x380 + (vcnt + 1) / 2 * 4).contains(&m) => {
            Method::VtxBeta(pair(m, 0x380))
        }
        0x400..=0x47c => Method::TexColor,
        _ => return None,
    };
    Some(m)
}

impl Method {
    /// Decode method offset `mthd` of class `cls`. `None` for methods the
    /// class rejects as invalid.
    #[must_use]
    pub fn decode(cls: u32, mthd: u32) -> Option<Self> {
        use class::{
            BETA, BITMAP, BLIT, CHROMA, CLIP, IFC, IFM, ITM, LIN, LINE, PATTERN, PLANE, POINT,
            RECT, ROP, TRI,
        };
        let vtx = |first, draw, poly| Self::Vtx(VtxKind::new(first, draw, poly));
        let m = match (cls, mthd) {
            (_, 0) => Self::CtxSwitch,
            (_, 0x104) => Self::Notify,
            (BETA, 0x300) => Self::Beta,
            (ROP, 0x300) => Self::Rop,
            (CHROMA, 0x304) => Self::Chroma,
            (PLANE, 0x304) => Self::Plane,
            (CLIP, 0x300 | 0x304) => Self::Clip {
                is_size: mthd == 0x304,
            },
            (PATTERN, 0x308) => Self::PatternShape,
            (PATTERN, 0x310 | 0x314) => Self::PatternMonoColor(pair(mthd, 0x310)),
            (PATTERN, 0x318 | 0x31c) => Self::PatternMonoBitmap(pair(mthd, 0x318)),
            (POINT..=RECT, 0x304) => Self::SolidColor,

            (POINT, 0x400..=0x47c) => vtx(true, true, false),
            (POINT, 0x480..=0x4fc) => xy32(mthd, true, true, false),
            (POINT, 0x500..=0x57c) if !odd(mthd) => Self::SolidColor,
            (POINT, 0x500..=0x57c) => vtx(true, true, false),

            (LINE | LIN, 0x400..=0x47c) => vtx(!odd(mthd), odd(mthd), false),
            (LINE | LIN, 0x480..=0x4fc) => xy32(mthd, mthd & 8 == 0, mthd & 8 != 0, false),
            (LINE | LIN, 0x500..=0x57c) => vtx(false, true, true),
            (LINE | LIN, 0x580..=0x5fc) => xy32(mthd, false, true, true),
            (LINE | LIN, 0x600..=0x67c) if !odd(mthd) => Self::SolidColor,
            (LINE | LIN, 0x600..=0x67c) => vtx(false, true, true),

            (TRI, 0x310) => vtx(true, false, false),
            (TRI, 0x314) => vtx(false, false, false),
            (TRI, 0x318) => vtx(false, true, false),
            (TRI, 0x320 | 0x328 | 0x330) => Self::VtxX32 {
                first: mthd == 0x320,
                poly: false,
            },
            (TRI, 0x324 | 0x32c | 0x334) => Self::VtxY32 {
                draw: mthd == 0x334,
                poly: false,
            },
            (TRI, 0x400..=0x47c) => vtx(false, true, true),
            (TRI, 0x480..=0x4fc) => xy32(mthd, false, true, true),
            (TRI, 0x500..=0x57c) => match mthd & 0xc {
                0x0 => Self::SolidColor,
                0x4 => vtx(true, false, false),
                0x8 => vtx(false, false, false),
                _ => vtx(false, true, false),
            },
            (TRI, 0x580..=0x5fc) if !odd(mthd) => Self::SolidColor,
            (TRI, 0x580..=0x5fc) => vtx(false, true, true),

            (RECT, 0x400..=0x47c) if !odd(mthd) => vtx(true, false, false),
            (RECT, 0x400..=0x47c) => Self::Rect { draw: true },

            (c, _) if class::is_tex(c) => return tex_method(c, mthd),

            (BLIT, 0x300) => vtx(true, false, false),
            (BLIT, 0x304) => vtx(false, false, false),
            (BLIT, 0x308) => Self::Rect { draw: true },

            (IFC, 0x304) => vtx(true, false, false),
            (IFC, 0x308) => Self::SizeOut,
            (IFC, 0x30c) => Self::SizeIn { which: 0 },
            (IFC, 0x400..=0x47c) => Self::IfcData { bitmap: false },

            (BITMAP, 0x308 | 0x30c) => Self::BitmapColor(pair(mthd, 0x308)),
            (BITMAP, 0x310) => vtx(true, false, false),
            (BITMAP, 0x314) => Self::SizeOut,
            (BITMAP, 0x318) => Self::SizeIn { which: 0 },
            (BITMAP, 0x400..=0x47c) => Self::IfcData { bitmap: true },

            (IFM | ITM, 0x308) => vtx(true, false, false),
            (IFM, 0x30c) => Self::SizeIn { which: 1 },
            (ITM, 0x30c) => Self::Rect { draw: false },
            (IFM | ITM, 0x310) => Self::Pitch,
            (IFM | ITM, 0x314) => Self::DmaOffset,
            (IFM, 0x040..=0x07c) => Self::IfcData { bitmap: false },
            _ => return None,
        };
        Some(m)
    }
}

/// Whether class `cls` accepts method offset `mthd`.
#[must_use]
pub fn is_legal_method(cls: u32, mthd: u32) -> bool {
    Method::decode(cls, mthd).is_some()
}

/// Predict a method write of `value` to class `cls`, offset `mthd`.
pub fn method(state: &mut EngineState, cls: u32, mthd: u32, value: u32) -> MethodEffect {
    let effect = match Method::decode(cls, mthd) {
        None => {
            invalid_method(state);
            MethodEffect::EXACT
        }
        Some(Method::Notify) => {
            notify(state, cls, value);
            return MethodEffect::EXACT;
        }
        Some(m) => apply(state, cls, mthd, m, value),
    };
    pending_notify(state);
    effect
}

fn apply(state: &mut EngineState, cls: u32, mthd: u32, m: Method, value: u32) -> MethodEffect {
    match m {
        Method::CtxSwitch => ctx_switch(state, cls, value),
        Method::Notify => notify(state, cls, value),
        Method::Beta => set_beta(state, value),
        Method::Rop => set_rop(state, value),
        Method::Chroma => set_chroma(state, value),
        Method::Plane => set_plane(state, value),
        Method::Clip { is_size } => {
            let blit = is_size && state.class() == class::BLIT;
            set_clip(state, is_size, value);
            if blit {
                return MethodEffect::predicted(Prediction::Unmodeled);
            }
        }
        Method::PatternShape => set_pattern_shape(state, value),
        Method::PatternMonoColor(idx) => set_pattern_mono_color(state, idx, value),
        Method::PatternMonoBitmap(idx) => set_pattern_mono_bitmap(state, idx, value),
        Method::SolidColor => set_solid_color(state, value),
        Method::Subdivide => set_subdivide(state, value),
        Method::VtxBeta(idx) => set_vtx_beta(state, idx, value),
        Method::BitmapColor(idx) => set_bitmap_color(state, idx, value),
        Method::Vtx(kind) => return vtx_method(state, mthd, value, kind),
        Method::VtxX32 { first, poly } => vtx_x32(state, value, first, poly),
        Method::VtxY32 { draw, poly } => return vtx_y32(state, value, draw, poly),
        Method::Rect { draw } => return rect(state, value, draw),
        Method::SizeOut => ifc_size_out(state, value),
        Method::SizeIn { which } => ifc_size_in(state, value, which),
        Method::Pitch => pitch(state, value),
        Method::IfcData { bitmap } => {
            return MethodEffect::predicted(ifc_data(state, value, bitmap));
        }
        Method::TexColor | Method::DmaOffset => {
            return MethodEffect::predicted(Prediction::Unmodeled);
        }
    }
    MethodEffect::EXACT
}

fn drop_enables(state: &mut EngineState) {
    state.access &= !0x101;
}

/// A method the class does not have.
pub fn invalid_method(state: &mut EngineState) {
    state.intr |= 1;
    state.invalid |= 1;
    drop_enables(state);
}

/// A legal method with an out-of-range argument.
fn invalid_argument(state: &mut EngineState) {
    state.intr |= 1;
    state.invalid |= 0x10;
    drop_enables(state);
}

/// A notify armed by an earlier NOTIFY method fires on the next method.
fn pending_notify(state: &mut EngineState) {
    if bit(state.notify, 20) {
        state.intr |= 0x1000_0001;
        state.invalid |= 0x1_0000;
        drop_enables(state);
        set_bit(&mut state.notify, 20, false);
    }
}

/// Method 0: bind class `cls` and load a new context switch word.
///
/// A change of channel (bits 15-22) or a disabled context control raises
/// the context switch interrupt. With bit 31 set and DEBUG_2 bit 28 on,
/// the switch also wipes the volatile drawing state.
pub fn ctx_switch(state: &mut EngineState, cls: u32, value: u32) {
    let enabled = bit(state.ctx_control, 16);
    let chsw = (value ^ state.ctx_switch[0]) & 0x007f_8000 != 0 || !enabled;
    let same_channel = extract(state.ctx_switch[0], 16, 7) == extract(value, 16, 7);
    let volatile_reset = bit(value, 31) && bit(state.debug[2], 28) && (!enabled || same_channel);
    if chsw {
        state.ctx_control |= 0x0101_0000;
        state.intr |= 0x10;
        drop_enables(state);
    } else {
        state.ctx_control &= !0x0100_0000;
    }
    insert(&mut state.access, 12, 5, cls);
    set_bit(&mut state.debug[1], 0, volatile_reset);
    if volatile_reset {
        for color in &mut state.bitmap_color {
            *color &= 0x3fff_ffff;
        }
        state.valid &= 0x1100_0000;
        state.xy_misc_0 = 0;
        state.xy_misc_1 &= 0x3_3300;
        state.xy_misc_4 = [0x0055_5500; 2];
        state.misc32 &= 0x00ff_00ff;
        state.subdivide &= 0xffff_0000;
    }
    state.ctx_switch[0] = value & 0x807f_ffff;
}

/// Method 0x104: request a notify.
///
/// Raises the first applicable of: argument not supported by the class
/// (only the textured classes take one), context without notify support,
/// notify already pending. Otherwise the notify becomes pending.
pub fn notify(state: &mut EngineState, cls: u32, value: u32) {
    if value != 0 && cls & 0xf != 0xd && cls & 0xf != 0xe {
        state.invalid |= 0x10;
    }
    if bit(state.notify, 20) && state.invalid == 0 {
        state.intr |= 0x1000_0000;
    }
    if !bit(state.ctx_switch[0], 8) {
        state.invalid |= 0x100;
    }
    if state.notify & 0x11_0000 != 0 {
        state.invalid |= 0x1000;
    }
    if state.invalid != 0 {
        state.intr |= 1;
        drop_enables(state);
    } else {
        state.notify |= 0x1_0000;
    }
}

pub fn set_beta(state: &mut EngineState, value: u32) {
    state.beta = beta_write(value);
}

pub fn set_rop(state: &mut EngineState, value: u32) {
    state.rop = value & ROP_MASK;
    if value & !ROP_MASK != 0 {
        invalid_argument(state);
    }
}

pub fn set_chroma(state: &mut EngineState, value: u32) {
    state.chroma = to_a1r10g10b10(expand_color(state, value));
}

pub fn set_plane(state: &mut EngineState, value: u32) {
    state.plane = to_a1r10g10b10(expand_color(state, value));
}

/// Shapes 0-2 are 8x8, 64x1 and 1x64; anything above is rejected but
/// still stored.
pub fn set_pattern_shape(state: &mut EngineState, value: u32) {
    state.pattern_config = value & 3;
    if value > 2 {
        invalid_argument(state);
    }
}

pub fn set_pattern_mono_color(state: &mut EngineState, idx: usize, value: u32) {
    let c = expand_color(state, value);
    state.pattern_mono_rgb[idx] = c.r10g10b10();
    state.pattern_mono_a[idx] = c.a;
}

pub fn set_pattern_mono_bitmap(state: &mut EngineState, idx: usize, value: u32) {
    state.pattern_mono_bitmap[idx] = expand_mono(state, value);
}

pub fn set_solid_color(state: &mut EngineState, value: u32) {
    state.misc32 = value;
}

pub fn set_bitmap_color(state: &mut EngineState, idx: usize, value: u32) {
    state.bitmap_color[idx] = to_a1r10g10b10(expand_color(state, value));
}

/// Texture subdivision: eight 4-bit levels, at most 8, the first two at
/// least 2; bits 8-15 must be clear.
pub fn set_subdivide(state: &mut EngineState, value: u32) {
    state.subdivide = value & SUBDIVIDE_MASK;
    let bad_level = (0..8).any(|j| {
        let level = extract(value, 4 * j, 4);
        level > 8 || (j < 2 && level < 2)
    });
    if value & 0xff00 != 0 || bad_level {
        invalid_argument(state);
    }
}

/// Two 16-bit beta factors for vertices `2 * idx` and `2 * idx + 1`.
pub fn set_vtx_beta(state: &mut EngineState, idx: usize, value: u32) {
    let cls = state.class();
    for j in 0..2 {
        let vid = idx * 2 + j;
        if vid == 9 && cls & 0xf == 0xe {
            break;
        }
        let mut beta = (extract(value, 16 * j as u32, 16) & 0xff80) << 8 | 0x4000;
        if bit(beta, 23) {
            beta |= 1 << 24;
        }
        state.vtx_beta[vid] = beta;
    }
    if cls == class::TEXLINBETA || cls == class::TEXQUADBETA {
        state.valid |= 1 << (12 + idx);
    }
}

/// Latch the "vertex written by a method" flags in `xy_misc_1`.
fn latch_vertex(state: &mut EngineState, fract: bool) {
    set_bit(&mut state.xy_misc_1, 0, false);
    set_bit(&mut state.xy_misc_1, 24, true);
    set_bit(&mut state.xy_misc_1, 25, fract);
}

/// Switching between integer and fractional texture coordinates drops
/// the vertices written so far.
fn check_tex_mode(state: &mut EngineState, fract: bool) {
    if class::is_tex(state.class())
        && bit(state.xy_misc_1, 24)
        && bit(state.xy_misc_1, 25) != fract
    {
        state.valid &= !0x00ff_ffff;
    }
}

/// `hangs` lists the bound classes whose accepted draw may wedge the
/// engine on this path.
fn finish_draw(
    state: &mut EngineState,
    poly: bool,
    op: Option<DrawOp>,
    hangs: &[u32],
) -> MethodEffect {
    let cls = state.class();
    let accepted = prep_draw(state, poly);
    let prediction = if class::is_image_in(cls) {
        Prediction::Unmodeled
    } else if hangs.contains(&cls) {
        Prediction::MayHang
    } else {
        Prediction::Exact
    };
    MethodEffect {
        draw: op.filter(|_| accepted),
        prediction,
    }
}

/// A 16-bit X/Y vertex pair.
pub fn vtx_method(state: &mut EngineState, mthd: u32, value: u32, kind: VtxKind) -> MethodEffect {
    let VtxKind {
        first,
        draw,
        poly,
        mut fract,
    } = kind;
    if first {
        state.set_cursor(0);
    }
    let cls = state.class();
    let mut idx = if class::is_image_in(cls) {
        4
    } else {
        state.cursor()
    };
    if class::is_tex(cls) {
        // Textured classes take the slot from the method offset.
        idx = (mthd.wrapping_sub(0x10) >> 2 & 0xf) as usize;
        if idx >= 12 {
            idx -= 8;
        }
        check_tex_mode(state, fract);
    } else {
        fract = false;
    }
    latch_vertex(state, fract);
    bump_vtxid(state);
    set_vtx(state, X, idx, extract_signed(value, 0, 16), false);
    set_vtx(state, Y, idx, extract_signed(value, 16, 16), false);
    let multi = class::is_solid_multi(cls);
    if poly {
        if multi {
            state.valid |= 0x1_0010 << (idx & 3);
        }
    } else {
        if idx <= 8 {
            state.valid |= 0x1001 << idx;
        }
        if multi {
            if first {
                state.valid &= !0x00ff_ffff;
                state.valid |= 0x01_1111;
            } else {
                state.valid |= 0x1_0010 << (idx & 3);
            }
        }
        if (cls == class::BLIT || cls == class::RECT) && first {
            state.valid |= 0x100;
        }
    }
    if !draw {
        return MethodEffect::EXACT;
    }
    let op = (cls == class::POINT && !poly).then(|| DrawOp::Point {
        x: state.vtx_x[idx],
        y: state.vtx_y[idx],
    });
    finish_draw(state, poly, op, &[class::TRI, class::RECT])
}

/// A 32-bit X coordinate. Does not advance the cursor.
pub fn vtx_x32(state: &mut EngineState, value: u32, first: bool, poly: bool) {
    if first {
        state.set_cursor(0);
    }
    let cls = state.class();
    let idx = state.cursor();
    check_tex_mode(state, false);
    latch_vertex(state, false);
    set_vtx(state, X, idx, value as i32, true);
    let multi = class::is_solid_multi(cls);
    if poly {
        if multi {
            if state.valid & 0xf00f != 0 {
                state.valid &= !0x100;
            }
            state.valid |= 0x10 << (idx & 3);
        }
    } else {
        if idx <= 8 {
            state.valid |= 1 << idx;
        }
        if multi {
            if first {
                state.valid &= !0x00ff_ffff;
                state.valid |= 0x111;
            } else {
                state.valid |= 0x10 << (idx & 3);
            }
        }
        if (cls == class::BLIT || cls == class::RECT) && first {
            state.valid |= 0x100;
        }
    }
}

/// A 32-bit Y coordinate, completing the vertex the X half started.
pub fn vtx_y32(state: &mut EngineState, value: u32, draw: bool, poly: bool) -> MethodEffect {
    let cls = state.class();
    let idx = state.cursor();
    check_tex_mode(state, false);
    bump_vtxid(state);
    latch_vertex(state, false);
    set_vtx(state, Y, idx, value as i32, true);
    if !poly && idx <= 8 {
        state.valid |= 0x1000 << idx;
    }
    if class::is_solid_multi(cls) {
        state.valid |= 0x1_0000 << (idx & 3);
    }
    if !draw {
        return MethodEffect::EXACT;
    }
    let op = (cls == class::POINT && !poly).then(|| DrawOp::Point {
        x: state.vtx_x[idx],
        y: state.vtx_y[idx],
    });
    finish_draw(state, poly, op, &[class::TRI])
}

/// Destination size of an image transfer, in vertex slot 5.
pub fn ifc_size_out(state: &mut EngineState, value: u32) {
    let cls = state.class();
    state.vtx_x[5] = extract(value, 0, 16);
    state.vtx_y[5] = extract(value, 16, 16);
    if class::is_solid_multi(cls) {
        state.valid &= !0x00ff_ffff;
    }
    state.valid |= 0x02_0020;
    state.set_cursor(0);
    if class::is_image_in(cls) {
        set_bit(&mut state.xy_misc_1, 0, false);
    }
    if cls == class::BLIT || (class::LINE..=class::RECT).contains(&cls) {
        state.valid |= 0x100;
    }
}

/// Source size of an image transfer, in vertex slot 3 with Y negated.
///
/// `which` is 0 for IFC and BITMAP, 1 for IFM. Records in `xy_misc_0`
/// bit 12 whether the image is empty.
pub fn ifc_size_in(state: &mut EngineState, value: u32, which: usize) {
    let cls = state.class();
    let multi = class::is_solid_multi(cls);
    state.vtx_y[1] = 0;
    state.vtx_x[3] = extract(value, 0, 16);
    state.vtx_y[3] = extract(value, 16, 16).wrapping_neg();
    if class::is_image_in(cls) {
        set_bit(&mut state.xy_misc_1, 0, false);
    }
    if which == 0 {
        if multi {
            state.valid &= !0x00ff_ffff;
        }
        if cls == class::BLIT || (class::LINE..=class::RECT).contains(&cls) {
            state.valid |= 0x100;
        }
    }
    state.valid |= 0x00_8008;
    if multi {
        state.valid |= 0x08_0080;
    }
    state.edgefill &= !0x110;
    if state.vtx_x[3] < 0x20 && cls == class::BITMAP {
        state.edgefill |= 0x100;
    }
    if cls != class::TEXLIN && cls != class::TEXLINBETA {
        insert(&mut state.xy_misc_4[X], 28, 2, 0);
        insert(&mut state.xy_misc_4[Y], 28, 2, 0);
    }
    if state.vtx_x[3] != 0 {
        state.xy_misc_4[X] |= 2 << 28;
    }
    if state.vtx_y[3] != 0 {
        state.xy_misc_4[Y] |= 2 << 28;
    }
    let zero = if cls == class::ITM {
        let pixels = 4 / cpp_in(state.ctx_switch[0]);
        state.vtx_x[3] == pixels || state.vtx_y[3] == 0
    } else {
        extract(state.xy_misc_4[X], 28, 2) == 0 || extract(state.xy_misc_4[Y], 28, 2) == 0
    };
    set_bit(&mut state.xy_misc_0, 12, zero);
    state.set_cursor(0);
}

/// Source pitch of IFM/ITM, in vertex slot 6.
pub fn pitch(state: &mut EngineState, value: u32) {
    state.vtx_x[6] = value;
    state.valid |= 0x04_0040;
}

/// A rectangle size, added to the origin vertex. What the bound class does
/// with it differs: ITM records the size, BLIT derives both corners, the
/// rect and image classes fill the cursor slot, the rest use slot 15.
pub fn rect(state: &mut EngineState, value: u32, draw: bool) -> MethodEffect {
    let cls = state.class();
    let (w, h) = (extract(value, 0, 16), extract(value, 16, 16));
    match cls {
        class::ITM => {
            state.vtx_x[3] = w;
            state.vtx_y[3] = h;
            vtx_fixup(state, X, 2, w, true, Some(0), 2);
            vtx_fixup(state, Y, 2, h, true, Some(0), 2);
            state.valid |= 0x4004;
            set_bit(&mut state.xy_misc_0, 12, false);
            bump_vtxid(state);
        }
        class::BLIT => {
            vtx_fixup(state, X, 2, w, true, Some(0), 2);
            vtx_fixup(state, Y, 2, h, true, Some(0), 2);
            vtx_fixup(state, X, 3, w, true, Some(1), 3);
            vtx_fixup(state, Y, 3, h, true, Some(1), 3);
            bump_vtxid(state);
            bump_vtxid(state);
            state.valid |= 0x00_c00c;
        }
        class::RECT | class::IFC | class::BITMAP | class::IFM => {
            let idx = state.cursor();
            vtx_fixup(state, X, idx, w, true, Some(0), idx & 3);
            vtx_fixup(state, Y, idx, h, true, Some(0), idx & 3);
            bump_vtxid(state);
            if idx <= 8 {
                state.valid |= 0x1001 << idx;
            }
        }
        _ => {
            vtx_fixup(state, X, 15, w, true, Some(15), 1);
            vtx_fixup(state, Y, 15, h, true, Some(15), 1);
            bump_vtxid(state);
            if class::is_solid_multi(cls) {
                state.valid |= 0x08_0080;
            }
        }
    }
    if !draw {
        return MethodEffect::EXACT;
    }
    let op = (cls == class::BLIT).then(|| DrawOp::Blit {
        src: (state.vtx_x[0], state.vtx_y[0]),
        dst: (state.vtx_x[1], state.vtx_y[1]),
    });
    finish_draw(state, false, op, &[class::TRI])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::CLASSES;

    fn bound(cls: u32) -> EngineState {
        EngineState {
            access: 0x0f00_0111 | cls << 12,
            dst_canvas_max: 0x0100_0400,
            ..EngineState::default()
        }
    }

    #[test]
    fn every_class_takes_context_switch_and_notify() {
        for cls in CLASSES {
            assert_eq!(Method::decode(cls, 0), Some(Method::CtxSwitch));
            assert_eq!(Method::decode(cls, 0x104), Some(Method::Notify));
            assert!(!is_legal_method(cls, 0x1ffc));
        }
    }

    #[test]
    fn legal_method_counts_per_class() {
        let count = |cls| (0..0x2000).step_by(4).filter(|&m| is_legal_method(cls, m)).count();
        assert_eq!(count(0x01), 3);
        assert_eq!(count(0x05), 4);
        assert_eq!(count(0x06), 7);
        assert_eq!(count(0x08), 3 + 96);
        assert_eq!(count(0x09), 3 + 160);
        assert_eq!(count(0x0b), 3 + 3 + 6 + 128);
        assert_eq!(count(0x0c), 3 + 32);
        assert_eq!(count(0x0d), 3 + 4 + 4 + 32);
        assert_eq!(count(0x1e), 3 + 9 + 9 + 5 + 32);
        assert_eq!(count(0x10), 5);
        assert_eq!(count(0x12), 2 + 5 + 32);
        assert_eq!(count(0x13), 2 + 4 + 16);
        assert_eq!(count(0x14), 2 + 4);
    }

    #[test]
    fn line_xy32_pairs_alternate() {
        assert_eq!(
            Method::decode(0x09, 0x480),
            Some(Method::VtxX32 {
                first: true,
                poly: false
            })
        );
        assert_eq!(
            Method::decode(0x09, 0x48c),
            Some(Method::VtxY32 {
                draw: true,
                poly: false
            })
        );
    }

    #[test]
    fn tex_vertex_fract_and_beta_slots() {
        let Some(Method::Vtx(kind)) = Method::decode(0x1e, 0x350) else {
            panic!("fract vertex");
        };
        assert!(kind.first && kind.fract);
        assert_eq!(Method::decode(0x1e, 0x390), Some(Method::VtxBeta(4)));
        assert_eq!(Method::decode(0x0e, 0x390), None);
        assert_eq!(Method::decode(0x1d, 0x388), None);
    }

    #[test]
    fn invalid_method_drops_enables() {
        let mut state = bound(0x08);
        let effect = method(&mut state, 0x08, 0x308, 0);
        assert_eq!(effect, MethodEffect::EXACT);
        assert_eq!(state.intr, 1);
        assert_eq!(state.invalid, 1);
        assert_eq!(state.access & 0x101, 0);
    }

    #[test]
    fn context_switch_to_new_channel() {
        let mut state = bound(0x08);
        state.ctx_control = 0x0001_0000;
        method(&mut state, 0x12, 0, 0x0001_8000);
        assert_eq!(state.class(), 0x12);
        assert_eq!(state.ctx_control, 0x0101_0000);
        assert_eq!(state.intr, 0x10);
        assert_eq!(state.access & 0x101, 0);
        assert_eq!(state.ctx_switch[0], 0x0001_8000);
    }

    #[test]
    fn context_switch_same_channel_volatile_reset() {
        let mut state = bound(0x08);
        state.ctx_control = 0x0101_0000;
        state.debug[2] = 1 << 28;
        state.valid = 0x111f_f1ff;
        state.xy_misc_0 = 0x3000_1000;
        state.bitmap_color = [0x7fff_ffff; 2];
        method(&mut state, 0x0c, 0, 0x8000_0123);
        assert_eq!(state.ctx_control, 0x0001_0000);
        assert_eq!(state.intr, 0);
        assert_eq!(state.debug[1], 1);
        assert_eq!(state.valid, 0x1100_0000);
        assert_eq!(state.xy_misc_0, 0);
        assert_eq!(state.bitmap_color, [0x3fff_ffff; 2]);
        assert_eq!(state.ctx_switch[0], 0x8000_0123);
    }

    #[test]
    fn pending_notify_fires_on_next_method() {
        let mut state = bound(0x02);
        state.notify = 0x10_0000;
        method(&mut state, 0x02, 0x300, 0xcc);
        assert_eq!(state.rop, 0xcc);
        assert_eq!(state.intr, 0x1000_0001);
        assert_eq!(state.invalid, 0x1_0000);
        assert_eq!(state.notify, 0);
    }

    #[test]
    fn notify_priorities() {
        let mut state = bound(0x08);
        state.ctx_switch[0] = 0x100;
        method(&mut state, 0x08, 0x104, 0);
        assert_eq!(state.notify, 0x1_0000);
        assert_eq!(state.intr, 0);

        let mut state = bound(0x08);
        method(&mut state, 0x08, 0x104, 5);
        assert_eq!(state.invalid, 0x110);
        assert_eq!(state.intr, 1);

        let mut state = bound(0x0d);
        state.ctx_switch[0] = 0x100;
        state.notify = 0x1_0000;
        method(&mut state, 0x0d, 0x104, 5);
        assert_eq!(state.invalid, 0x1000);
    }

    #[test]
    fn argument_checks() {
        let mut state = bound(0x02);
        method(&mut state, 0x02, 0x300, 0x1ff);
        assert_eq!((state.rop, state.invalid), (0xff, 0x10));

        let mut state = bound(0x06);
        method(&mut state, 0x06, 0x308, 3);
        assert_eq!((state.pattern_config, state.invalid), (3, 0x10));

        let mut state = bound(0x0d);
        method(&mut state, 0x0d, 0x304, 0x8888_0088);
        assert_eq!((state.subdivide, state.invalid), (0x8888_0088, 0));
        method(&mut state, 0x0d, 0x304, 0x0000_0018);
        assert_eq!(state.invalid, 0x10);
    }

    #[test]
    fn vtx_beta_packs_two_factors() {
        let mut state = bound(0x1e);
        method(&mut state, 0x1e, 0x390, 0x1234_ff80);
        assert_eq!(state.vtx_beta[8], 0x01ff_c000);
        assert_eq!(state.vtx_beta[9], 0);
        assert_eq!(state.valid, 1 << 16);
        let mut state = bound(0x1d);
        method(&mut state, 0x1d, 0x384, 0x1234_ff80);
        assert_eq!(state.vtx_beta[3], 0x0012_4000);
    }

    #[test]
    fn point_draw_at_written_vertex() {
        let mut state = bound(0x08);
        let effect = method(&mut state, 0x08, 0x400, 0x0020_0010);
        assert_eq!(effect.draw, Some(DrawOp::Point { x: 0x10, y: 0x20 }));
        assert_eq!(effect.prediction, Prediction::Exact);
        assert_eq!(state.cursor(), 1);
        assert_eq!(state.valid, 0);
        assert_eq!(state.xy_misc_1, 0x0100_0000);
    }

    #[test]
    fn rejected_point_draws_nothing() {
        let mut state = bound(0x08);
        state.canvas_config = 1 << 24;
        let effect = method(&mut state, 0x08, 0x400, 0x0020_0010);
        assert_eq!(effect.draw, None);
        assert_eq!(state.intr, 1 << 20);
    }

    #[test]
    fn line_first_vertex_resets_validity() {
        let mut state = bound(0x09);
        state.valid = 0x00ff_ffff;
        method(&mut state, 0x09, 0x400, 0x0002_0001);
        assert_eq!(state.valid, 0x01_1111);
        method(&mut state, 0x09, 0x480, 0x10);
        assert_eq!(state.valid, 0x111);
        assert_eq!(state.vtx_x[0], 0x10);
    }

    #[test]
    fn y32_bumps_cursor_x32_does_not() {
        let mut state = bound(0x0b);
        state.set_cursor(1);
        method(&mut state, 0x0b, 0x328, 7);
        assert_eq!(state.cursor(), 1);
        method(&mut state, 0x0b, 0x32c, 9);
        assert_eq!(state.cursor(), 2);
        assert_eq!((state.vtx_x[1], state.vtx_y[1]), (7, 9));
        assert_eq!(state.valid, 0x2_2022);
    }

    #[test]
    fn textured_slot_comes_from_offset() {
        let mut state = bound(0x0e);
        method(&mut state, 0x0e, 0x31c, 0xffff_0001);
        assert_eq!(state.vtx_x[3], 1 << 15);
        assert_eq!(state.vtx_y[3], 0xffff_8000);
        assert!(!bit(state.xy_misc_1, 25));
        method(&mut state, 0x0e, 0x35c, 0);
        assert!(bit(state.xy_misc_1, 25));
    }

    #[test]
    fn size_in_records_empty_image() {
        let mut state = bound(0x11);
        method(&mut state, 0x11, 0x30c, 0x0000_0010);
        assert_eq!(state.vtx_y[3], 0);
        assert!(bit(state.xy_misc_0, 12));
        method(&mut state, 0x11, 0x30c, 0x0002_0010);
        assert_eq!(state.vtx_y[3], 0xffff_fffe);
        assert!(!bit(state.xy_misc_0, 12));
        assert_eq!(state.xy_misc_4[X] >> 28, 2);
        assert_eq!(state.xy_misc_4[Y] >> 28, 2);
    }

    #[test]
    fn bitmap_narrow_size_sets_edgefill() {
        let mut state = bound(0x12);
        method(&mut state, 0x12, 0x318, 0x0001_001f);
        assert_eq!(state.edgefill, 0x100);
    }

    #[test]
    fn size_out_and_pitch() {
        let mut state = bound(0x13);
        state.set_cursor(1);
        method(&mut state, 0x13, 0x310, 0x1234);
        method(&mut state, 0x11, 0x308, 0x0040_0080);
        assert_eq!((state.vtx_x[5], state.vtx_y[5]), (0x80, 0x40));
        assert_eq!(state.vtx_x[6], 0x1234);
        assert_eq!(state.valid, 0x06_0060);
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn blit_rect_issues_single_pixel_blit() {
        let mut state = bound(0x10);
        state.vtx_x[..2].copy_from_slice(&[0x30, 0x10]);
        state.vtx_y[..2].copy_from_slice(&[0x40, 0x20]);
        state.valid = 0xf10f;
        state.set_cursor(2);
        state.xy_misc_4 = [0; 2];
        let effect = method(&mut state, 0x10, 0x308, 0x0001_0001);
        assert_eq!(
            effect.draw,
            Some(DrawOp::Blit {
                src: (0x30, 0x40),
                dst: (0x10, 0x20)
            })
        );
        assert_eq!((state.vtx_x[2], state.vtx_y[3]), (0x31, 0x21));
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn point_pair_draws_may_hang_on_tri_and_rect() {
        for cls in [0x0b, 0x0c] {
            let mut state = bound(cls);
            let effect = vtx_method(
                &mut state,
                0x318,
                0x0001_0001,
                VtxKind {
                    first: false,
                    draw: true,
                    poly: false,
                    fract: false,
                },
            );
            assert_eq!(effect.prediction, Prediction::MayHang, "class {cls:02x}");
        }
        assert!(Prediction::MayHang.comparable(0));
        assert!(!Prediction::MayHang.comparable(1));
    }

    #[test]
    fn y32_and_size_draws_may_hang_only_on_tri() {
        let mut tri = bound(0x0b);
        assert_eq!(
            method(&mut tri, 0x0b, 0x334, 0x20).prediction,
            Prediction::MayHang
        );
        let mut tri = bound(0x0b);
        assert_eq!(rect(&mut tri, 0x0001_0001, true).prediction, Prediction::MayHang);

        let mut rect_cls = bound(0x0c);
        assert_eq!(
            method(&mut rect_cls, 0x0c, 0x404, 0x0001_0001).prediction,
            Prediction::Exact
        );
        let mut rect_cls = bound(0x0c);
        assert_eq!(vtx_y32(&mut rect_cls, 0x20, true, false).prediction, Prediction::Exact);
    }

    #[test]
    fn clip_size_on_blit_is_unmodeled() {
        let mut state = bound(0x10);
        let effect = method(&mut state, 0x05, 0x304, 0x0001_0001);
        assert_eq!(effect.prediction, Prediction::Unmodeled);
        let mut state = bound(0x08);
        let effect = method(&mut state, 0x05, 0x304, 0x0001_0001);
        assert_eq!(effect.prediction, Prediction::Exact);
    }
}
