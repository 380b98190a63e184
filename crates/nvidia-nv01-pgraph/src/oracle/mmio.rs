//! Direct register writes and reads.

use hwtest_core::bits::{bit, extract, insert, set_bit};

use super::geometry::{iclip_fixup, uclip_fixup, vtx_fixup};
use crate::regs::{
    ACCESS, ACCESS_MASK, ACCESS_WRITE_FLAGS, BETA, BETA_MASK, BITMAP_COLOR, CANVAS_CONFIG,
    CANVAS_CONFIG_MASK, CANVAS_MAX_MASK, CHROMA, CLIPRECT_CTRL, CLIPRECT_CTRL_MASK, CLIPRECT_MASK,
    COLOR_MASK, CTX_CONTROL, CTX_CONTROL_MASK, CTX_SWITCH_0, CTX_SWITCH_0_MASK, CTX_SWITCH_1,
    CTX_SWITCH_1_MASK, DEBUG, DEBUG_MASK, DST_CANVAS_MAX, DST_CANVAS_MIN, EDGEFILL, EDGEFILL_MASK,
    ICLIP, ICLIP_REL, INTR, INTR_EN, INTR_EN_MASK, INVALID, INVALID_EN, INVALID_EN_MASK, MISC32,
    NOTIFY, NOTIFY_MASK, PATTERN_A_MASK, PATTERN_CONFIG, PATTERN_CONFIG_MASK, PATTERN_MONO_BITMAP,
    PATTERN_RGB_MASK, PFB_BOOT_0, PFB_CONFIG_0, PLANE, ROP, ROP_MASK, STATUS, SUBDIVIDE,
    SUBDIVIDE_MASK, TRAP_ADDR, TRAP_DATA, UCLIP, UCLIP_REL, VALID, VALID_MASK, VTX_BETA,
    VTX_BETA_COUNT, VTX_BETA_MASK, VTX_COUNT, VTX_X, VTX_X_REL, VTX_Y, VTX_Y_REL, XY_MISC_0,
    XY_MISC_0_MASK, XY_MISC_1, XY_MISC_1_MASK, XY_MISC_4, XY_MISC_4_MASK, cliprect_max,
    cliprect_min, pattern_mono_a, pattern_mono_rgb,
};
use crate::state::{EngineState, X, Y};

/// A PGRAPH register, decoded from its BAR0 offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Debug(usize),
    Intr,
    Invalid,
    IntrEn,
    InvalidEn,
    CtxSwitch0,
    CtxControl,
    Vtx { axis: usize, idx: usize, rel: bool },
    Iclip { axis: usize, rel: bool },
    Uclip { axis: usize, which: usize, rel: bool },
    VtxBeta(usize),
    PatternMonoRgb(usize),
    PatternMonoA(usize),
    PatternMonoBitmap(usize),
    PatternConfig,
    BitmapColor(usize),
    Rop,
    Plane,
    Chroma,
    Beta,
    CanvasConfig,
    XyMisc0,
    XyMisc1,
    XyMisc4(usize),
    Valid,
    Misc32,
    Subdivide,
    Edgefill,
    CtxSwitch1,
    Notify,
    DstCanvasMin,
    DstCanvasMax,
    CliprectMin(usize),
    CliprectMax(usize),
    CliprectCtrl,
    Access,
    Status,
    TrapAddr,
    TrapData,
    PfbConfig,
    PfbBoot,
}

fn slot(offset: u32, base: u32, count: usize, stride: u32) -> Option<usize> {
    let delta = offset.checked_sub(base)?;
    let idx = (delta / stride) as usize;
    (delta % stride == 0 && idx < count).then_some(idx)
}

impl Reg {
    /// Decode a BAR0 offset. `None` for offsets with no modeled register.
    #[must_use]
    pub fn decode(offset: u32) -> Option<Self> {
        if let Some(i) = slot(offset, DEBUG[0], 3, 4) {
            return Some(Self::Debug(i));
        }
        for (base, axis, rel) in [
            (VTX_X, X, false),
            (VTX_Y, Y, false),
            (VTX_X_REL, X, true),
            (VTX_Y_REL, Y, true),
        ] {
            if let Some(idx) = slot(offset, base, VTX_COUNT, 4) {
                return Some(Self::Vtx { axis, idx, rel });
            }
        }
        for (base, rel) in [(ICLIP, false), (ICLIP_REL, true)] {
            if let Some(axis) = slot(offset, base, 2, 4) {
                return Some(Self::Iclip { axis, rel });
            }
        }
        for (base, rel) in [(UCLIP, false), (UCLIP_REL, true)] {
            if let Some(i) = slot(offset, base, 4, 4) {
                return Some(Self::Uclip {
                    axis: i >> 1,
                    which: i & 1,
                    rel,
                });
            }
        }
        if let Some(i) = slot(offset, VTX_BETA, VTX_BETA_COUNT, 4) {
            return Some(Self::VtxBeta(i));
        }
        let reg = match offset {
            INTR => Self::Intr,
            INVALID => Self::Invalid,
            INTR_EN => Self::IntrEn,
            INVALID_EN => Self::InvalidEn,
            CTX_SWITCH_0 => Self::CtxSwitch0,
            CTX_CONTROL => Self::CtxControl,
            0x40_0600 | 0x40_0608 => Self::PatternMonoRgb(((offset >> 3) & 1) as usize),
            0x40_0604 | 0x40_060c => Self::PatternMonoA(((offset >> 3) & 1) as usize),
            0x40_0610 | 0x40_0614 => Self::PatternMonoBitmap(((offset >> 2) & 1) as usize),
            PATTERN_CONFIG => Self::PatternConfig,
            0x40_061c => Self::BitmapColor(0),
            0x40_0620 => Self::BitmapColor(1),
            ROP => Self::Rop,
            PLANE => Self::Plane,
            CHROMA => Self::Chroma,
            BETA => Self::Beta,
            CANVAS_CONFIG => Self::CanvasConfig,
            XY_MISC_0 => Self::XyMisc0,
            XY_MISC_1 => Self::XyMisc1,
            0x40_0648 => Self::XyMisc4(0),
            0x40_064c => Self::XyMisc4(1),
            VALID => Self::Valid,
            MISC32 => Self::Misc32,
            SUBDIVIDE => Self::Subdivide,
            EDGEFILL => Self::Edgefill,
            CTX_SWITCH_1 => Self::CtxSwitch1,
            NOTIFY => Self::Notify,
            DST_CANVAS_MIN => Self::DstCanvasMin,
            DST_CANVAS_MAX => Self::DstCanvasMax,
            0x40_0690 | 0x40_0698 => Self::CliprectMin(((offset >> 3) & 1) as usize),
            0x40_0694 | 0x40_069c => Self::CliprectMax(((offset >> 3) & 1) as usize),
            CLIPRECT_CTRL => Self::CliprectCtrl,
            ACCESS => Self::Access,
            STATUS => Self::Status,
            TRAP_ADDR => Self::TrapAddr,
            TRAP_DATA => Self::TrapData,
            PFB_CONFIG_0 => Self::PfbConfig,
            PFB_BOOT_0 => Self::PfbBoot,
            _ => return None,
        };
        Some(reg)
    }
}

/// New ACCESS value after a write: each flag in bits 24-27 lets the
/// matching field through (enables 0/4/8, class 12-16).
#[must_use]
pub fn access_write(old: u32, value: u32) -> u32 {
    let mut next = old;
    if bit(value, 24) {
        set_bit(&mut next, 0, bit(value, 0));
    }
    if bit(value, 25) {
        set_bit(&mut next, 4, bit(value, 4));
    }
    if bit(value, 26) {
        set_bit(&mut next, 8, bit(value, 8));
    }
    if bit(value, 27) {
        insert(&mut next, 12, 5, extract(value, 12, 5));
    }
    (next & ACCESS_MASK) | ACCESS_WRITE_FLAGS
}

/// Beta register write: negative values clamp to zero, then only the
/// 8-bit fraction in bits 23-30 is kept.
#[must_use]
pub fn beta_write(value: u32) -> u32 {
    if bit(value, 31) { 0 } else { value & BETA_MASK }
}

/// Predict the effect of writing `value` to register `offset`.
pub fn mmio_write(state: &mut EngineState, offset: u32, value: u32) {
    let Some(reg) = Reg::decode(offset) else {
        return;
    };
    match reg {
        Reg::Debug(0) => {
            if bit(value, 0) {
                state.reset();
            }
            state.debug[0] = value & DEBUG_MASK[0];
        }
        Reg::Debug(i) => state.debug[i] = value & DEBUG_MASK[i],
        Reg::Intr => state.intr &= !value,
        Reg::Invalid => state.invalid &= !value,
        Reg::IntrEn => state.intr_en = value & INTR_EN_MASK,
        Reg::InvalidEn => state.invalid_en = value & INVALID_EN_MASK,
        Reg::CtxSwitch0 => {
            state.ctx_switch[0] = value & CTX_SWITCH_0_MASK;
            set_bit(&mut state.debug[1], 0, false);
            set_bit(&mut state.ctx_control, 24, false);
        }
        Reg::CtxControl => state.ctx_control = value & CTX_CONTROL_MASK,
        Reg::Vtx { axis, idx, rel } => {
            let sub = if rel { idx & 3 } else { 0 };
            vtx_fixup(state, axis, idx, value, rel, None, sub);
        }
        Reg::Iclip { axis, rel } => {
            for n in [14, 18, 20] {
                set_bit(&mut state.xy_misc_1, n, false);
            }
            iclip_fixup(state, axis, value, rel);
        }
        Reg::Uclip { axis, which, rel } => uclip_fixup(state, axis, which, value, rel),
        Reg::VtxBeta(i) => state.vtx_beta[i] = value & VTX_BETA_MASK,
        Reg::PatternMonoRgb(i) => state.pattern_mono_rgb[i] = value & PATTERN_RGB_MASK,
        Reg::PatternMonoA(i) => state.pattern_mono_a[i] = value & PATTERN_A_MASK,
        Reg::PatternMonoBitmap(i) => state.pattern_mono_bitmap[i] = value,
        Reg::PatternConfig => state.pattern_config = value & PATTERN_CONFIG_MASK,
        Reg::BitmapColor(i) => state.bitmap_color[i] = value & COLOR_MASK,
        Reg::Rop => state.rop = value & ROP_MASK,
        Reg::Plane => state.plane = value & COLOR_MASK,
        Reg::Chroma => state.chroma = value & COLOR_MASK,
        Reg::Beta => state.beta = beta_write(value),
        Reg::CanvasConfig => state.canvas_config = value & CANVAS_CONFIG_MASK,
        Reg::XyMisc0 => state.xy_misc_0 = value & XY_MISC_0_MASK,
        Reg::XyMisc1 => state.xy_misc_1 = value & XY_MISC_1_MASK,
        Reg::XyMisc4(i) => state.xy_misc_4[i] = value & XY_MISC_4_MASK,
        Reg::Valid => state.valid = value & VALID_MASK,
        Reg::Misc32 => state.misc32 = value,
        Reg::Subdivide => state.subdivide = value & SUBDIVIDE_MASK,
        Reg::Edgefill => state.edgefill = value & EDGEFILL_MASK,
        Reg::CtxSwitch1 => state.ctx_switch[1] = value & CTX_SWITCH_1_MASK,
        Reg::Notify => state.notify = value & NOTIFY_MASK,
        Reg::DstCanvasMin => state.dst_canvas_min = value,
        Reg::DstCanvasMax => state.dst_canvas_max = value & CANVAS_MAX_MASK,
        Reg::CliprectMin(i) => state.cliprect_min[i] = value & CLIPRECT_MASK,
        Reg::CliprectMax(i) => state.cliprect_max[i] = value & CLIPRECT_MASK,
        Reg::CliprectCtrl => state.cliprect_ctrl = value & CLIPRECT_CTRL_MASK,
        Reg::Access => state.access = access_write(state.access, value),
        Reg::PfbConfig => state.pfb_config = value,
        Reg::Status | Reg::TrapAddr | Reg::TrapData | Reg::PfbBoot => {}
    }
}

/// Predict a register read, including its side effects on `state`.
///
/// Reading a user clip register drops the cached clip state in
/// `xy_misc_1` bits 12-23.
pub fn mmio_read(state: &mut EngineState, offset: u32) -> u32 {
    let Some(reg) = Reg::decode(offset) else {
        return 0;
    };
    match reg {
        Reg::Debug(i) => state.debug[i],
        Reg::Intr => state.intr,
        Reg::Invalid => state.invalid,
        Reg::IntrEn => state.intr_en,
        Reg::InvalidEn => state.invalid_en,
        Reg::CtxSwitch0 => state.ctx_switch[0],
        Reg::CtxControl => state.ctx_control,
        Reg::Vtx { axis, idx, .. } => state.vtx(axis)[idx],
        Reg::Iclip { axis, .. } => state.iclip[axis],
        Reg::Uclip { axis, which, .. } => {
            state.xy_misc_1 &= !0x00ff_f000;
            if which == 0 {
                state.uclip_min[axis]
            } else {
                state.uclip_max[axis]
            }
        }
        Reg::VtxBeta(i) => state.vtx_beta[i],
        Reg::PatternMonoRgb(i) => state.pattern_mono_rgb[i],
        Reg::PatternMonoA(i) => state.pattern_mono_a[i],
        Reg::PatternMonoBitmap(i) => state.pattern_mono_bitmap[i],
        Reg::PatternConfig => state.pattern_config,
        Reg::BitmapColor(i) => state.bitmap_color[i],
        Reg::Rop => state.rop,
        Reg::Plane => state.plane,
        Reg::Chroma => state.chroma,
        Reg::Beta => state.beta,
        Reg::CanvasConfig => state.canvas_config,
        Reg::XyMisc0 => state.xy_misc_0,
        Reg::XyMisc1 => state.xy_misc_1,
        Reg::XyMisc4(i) => state.xy_misc_4[i],
        Reg::Valid => state.valid,
        Reg::Misc32 => state.misc32,
        Reg::Subdivide => state.subdivide,
        Reg::Edgefill => state.edgefill,
        Reg::CtxSwitch1 => state.ctx_switch[1],
        Reg::Notify => state.notify,
        Reg::DstCanvasMin => state.dst_canvas_min,
        Reg::DstCanvasMax => state.dst_canvas_max,
        Reg::CliprectMin(i) => state.cliprect_min[i],
        Reg::CliprectMax(i) => state.cliprect_max[i],
        Reg::CliprectCtrl => state.cliprect_ctrl,
        Reg::Access => state.access,
        Reg::Status => state.status,
        Reg::TrapAddr => state.trap_addr,
        Reg::TrapData => state.trap_data,
        Reg::PfbConfig => state.pfb_config,
        Reg::PfbBoot => state.pfb_boot,
    }
}

/// Every register the read scenario samples.
#[must_use]
pub fn readable_registers() -> Vec<u32> {
    let mut regs = vec![
        DEBUG[0], DEBUG[1], DEBUG[2], INTR, INVALID, INTR_EN, INVALID_EN, CTX_SWITCH_0,
        CTX_CONTROL,
    ];
    for i in 0..VTX_COUNT as u32 {
        regs.extend([VTX_X + i * 4, VTX_Y + i * 4]);
    }
    regs.extend([ICLIP, ICLIP + 4, UCLIP, UCLIP + 8, UCLIP + 4, UCLIP + 0xc]);
    for i in 0..VTX_BETA_COUNT as u32 {
        regs.push(VTX_BETA + i * 4);
    }
    for i in 0..2 {
        regs.extend([pattern_mono_rgb(i), pattern_mono_a(i), PATTERN_MONO_BITMAP[i]]);
    }
    regs.extend([
        PATTERN_CONFIG,
        BITMAP_COLOR[0],
        BITMAP_COLOR[1],
        ROP,
        PLANE,
        CHROMA,
        BETA,
        CANVAS_CONFIG,
        XY_MISC_0,
        XY_MISC_1,
        XY_MISC_4[0],
        XY_MISC_4[1],
        VALID,
        MISC32,
        SUBDIVIDE,
        EDGEFILL,
        CTX_SWITCH_1,
        NOTIFY,
        DST_CANVAS_MIN,
        DST_CANVAS_MAX,
    ]);
    for i in 0..2 {
        regs.extend([cliprect_min(i), cliprect_max(i)]);
    }
    regs.extend([CLIPRECT_CTRL, ACCESS, STATUS, PFB_CONFIG_0, PFB_BOOT_0]);
    regs
}

/// Write-only aliases that add the written value to the vertex or clip
/// cursor. Reading them returns the absolute register.
#[must_use]
pub fn relative_registers() -> Vec<u32> {
    let mut regs = Vec::new();
    for i in 0..VTX_COUNT as u32 {
        regs.extend([VTX_X_REL + i * 4, VTX_Y_REL + i * 4]);
    }
    regs.extend([ICLIP_REL, ICLIP_REL + 4]);
    regs.extend([UCLIP_REL, UCLIP_REL + 8, UCLIP_REL + 4, UCLIP_REL + 0xc]);
    regs
}
