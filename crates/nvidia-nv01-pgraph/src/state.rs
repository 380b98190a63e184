//! PGRAPH engine state.
//!
//! One plain struct with every register and piece of hidden state the suite
//! can load and dump. Every value is owned by its user: scenarios copy it,
//! the oracle mutates its copy, the comparator reads both.

use std::fmt;

use hwtest_core::bits::{extract, insert};

use crate::regs::{ACCESS_WRITE_FLAGS, VTX_BETA_COUNT, VTX_COUNT};

/// Horizontal and vertical coordinate axes, used as array indices.
pub const X: usize = 0;
pub const Y: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    pub debug: [u32; 3],
    pub intr: u32,
    pub invalid: u32,
    pub intr_en: u32,
    pub invalid_en: u32,
    pub ctx_switch: [u32; 2],
    pub ctx_control: u32,
    pub notify: u32,
    pub access: u32,

    pub iclip: [u32; 2],
    pub uclip_min: [u32; 2],
    pub uclip_max: [u32; 2],
    pub vtx_x: [u32; VTX_COUNT],
    pub vtx_y: [u32; VTX_COUNT],
    pub vtx_beta: [u32; VTX_BETA_COUNT],

    pub pattern_mono_rgb: [u32; 2],
    pub pattern_mono_a: [u32; 2],
    pub pattern_mono_bitmap: [u32; 2],
    pub pattern_config: u32,
    pub bitmap_color: [u32; 2],
    pub rop: u32,
    pub beta: u32,
    pub plane: u32,
    pub chroma: u32,
    pub canvas_config: u32,
    pub dst_canvas_min: u32,
    pub dst_canvas_max: u32,
    pub cliprect_min: [u32; 2],
    pub cliprect_max: [u32; 2],
    pub cliprect_ctrl: u32,

    /// Bit 12: image size is zero. Bits 28-31: vertex cursor.
    pub xy_misc_0: u32,
    /// Bit 0: transfer started. Bits 12/16: user clip armed per axis.
    /// Bits 13/17: inclusive clip armed per axis. Bits 14/18/20: cached
    /// inclusive-clip results. Bit 24: vertex latched. Bit 25: fractional
    /// texture coordinates.
    pub xy_misc_1: u32,
    /// Per axis: carry (0-3), out of range (4-7), and a 4-bit clip status
    /// (8-23) for each of the four sub-slots; sign of sub-slot 2 (28-29).
    pub xy_misc_4: [u32; 2],
    /// Bits 0-8/12-20: vertex X/Y written. Bits 24/28: pending state errors.
    pub valid: u32,
    pub misc32: u32,
    pub subdivide: u32,
    pub edgefill: u32,

    pub status: u32,
    pub trap_addr: u32,
    pub trap_data: u32,

    pub pfb_config: u32,
    pub pfb_boot: u32,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            debug: [0; 3],
            intr: 0,
            invalid: 0,
            intr_en: 0,
            invalid_en: 0,
            ctx_switch: [0; 2],
            ctx_control: 0,
            notify: 0,
            access: ACCESS_WRITE_FLAGS,
            iclip: [0; 2],
            uclip_min: [0; 2],
            uclip_max: [0; 2],
            vtx_x: [0; VTX_COUNT],
            vtx_y: [0; VTX_COUNT],
            vtx_beta: [0; VTX_BETA_COUNT],
            pattern_mono_rgb: [0; 2],
            pattern_mono_a: [0; 2],
            pattern_mono_bitmap: [0; 2],
            pattern_config: 0,
            bitmap_color: [0; 2],
            rop: 0,
            beta: 0,
            plane: 0,
            chroma: 0,
            canvas_config: 0,
            dst_canvas_min: 0,
            dst_canvas_max: 0,
            cliprect_min: [0; 2],
            cliprect_max: [0; 2],
            cliprect_ctrl: 0,
            xy_misc_0: 0,
            xy_misc_1: 0,
            xy_misc_4: [0x0055_5500; 2],
            valid: 0,
            misc32: 0,
            subdivide: 0,
            edgefill: 0,
            status: 0,
            trap_addr: 0,
            trap_data: 0,
            pfb_config: 0,
            pfb_boot: 0,
        }
    }
}

impl EngineState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Object class currently bound, from ACCESS bits 12-16.
    #[must_use]
    pub fn class(&self) -> u32 {
        extract(self.access, 12, 5)
    }

    /// Index of the next vertex slot a method will fill.
    #[must_use]
    pub fn cursor(&self) -> usize {
        extract(self.xy_misc_0, 28, 4) as usize
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        insert(&mut self.xy_misc_0, 28, 4, cursor as u32);
    }

    #[must_use]
    pub fn vtx(&self, axis: usize) -> &[u32; VTX_COUNT] {
        if axis == X { &self.vtx_x } else { &self.vtx_y }
    }

    pub fn vtx_mut(&mut self, axis: usize) -> &mut [u32; VTX_COUNT] {
        if axis == X {
            &mut self.vtx_x
        } else {
            &mut self.vtx_y
        }
    }

    /// Soft reset (DEBUG_0 bit 0): drops vertex validity and the hidden
    /// transfer state, keeps everything software-visible.
    pub fn reset(&mut self) {
        self.valid = 0;
        self.edgefill &= 0xffff_0000;
        self.xy_misc_0 &= 0x1000;
        self.xy_misc_1 &= 0x0300_0000;
        for xy4 in &mut self.xy_misc_4 {
            *xy4 = (*xy4 & 0xff00_0000) | 0x0055_5500;
        }
    }

    /// Every compared field, in report order.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::with_capacity(128);
        fields.push(Field::new("STATUS", None, self.status));
        for (i, &v) in self.debug.iter().enumerate() {
            fields.push(Field::new("DEBUG", Some(i), v));
        }
        for (name, value) in [
            ("INTR", self.intr),
            ("INTR_EN", self.intr_en),
            ("INVALID", self.invalid),
            ("INVALID_EN", self.invalid_en),
        ] {
            fields.push(Field::new(name, None, value));
        }
        fields.push(Field::new("CTX_SWITCH", Some(0), self.ctx_switch[0]));
        fields.push(Field::new("CTX_SWITCH", Some(1), self.ctx_switch[1]));
        fields.push(Field::new("NOTIFY", None, self.notify));
        fields.push(Field::new("CTX_CONTROL", None, self.ctx_control));
        for i in 0..2 {
            fields.push(Field::new("ICLIP", Some(i), self.iclip[i]));
        }
        for i in 0..2 {
            fields.push(Field::new("UCLIP_MIN", Some(i), self.uclip_min[i]));
            fields.push(Field::new("UCLIP_MAX", Some(i), self.uclip_max[i]));
        }
        for i in 0..VTX_COUNT {
            fields.push(Field::new("VTX_X", Some(i), self.vtx_x[i]));
            fields.push(Field::new("VTX_Y", Some(i), self.vtx_y[i]));
        }
        for (i, &v) in self.vtx_beta.iter().enumerate() {
            fields.push(Field::new("VTX_BETA", Some(i), v));
        }
        for (name, value) in [
            ("XY_MISC_0", self.xy_misc_0),
            ("XY_MISC_1", self.xy_misc_1),
        ] {
            fields.push(Field::new(name, None, value));
        }
        fields.push(Field::new("XY_MISC_4", Some(0), self.xy_misc_4[0]));
        fields.push(Field::new("XY_MISC_4", Some(1), self.xy_misc_4[1]));
        for (name, value) in [
            ("VALID", self.valid),
            ("MISC32", self.misc32),
            ("SUBDIVIDE", self.subdivide),
            ("EDGEFILL", self.edgefill),
        ] {
            fields.push(Field::new(name, None, value));
        }
        for i in 0..2 {
            fields.push(Field::new("PATTERN_MONO_RGB", Some(i), self.pattern_mono_rgb[i]));
            fields.push(Field::new("PATTERN_MONO_A", Some(i), self.pattern_mono_a[i]));
        }
        for i in 0..2 {
            fields.push(Field::new(
                "PATTERN_MONO_BITMAP",
                Some(i),
                self.pattern_mono_bitmap[i],
            ));
        }
        fields.push(Field::new("PATTERN_CONFIG", None, self.pattern_config));
        for i in 0..2 {
            fields.push(Field::new("BITMAP_COLOR", Some(i), self.bitmap_color[i]));
        }
        for (name, value) in [
            ("ROP", self.rop),
            ("BETA", self.beta),
            ("PLANE", self.plane),
            ("CHROMA", self.chroma),
            ("DST_CANVAS_MIN", self.dst_canvas_min),
            ("DST_CANVAS_MAX", self.dst_canvas_max),
            ("CANVAS_CONFIG", self.canvas_config),
        ] {
            fields.push(Field::new(name, None, value));
        }
        for i in 0..2 {
            fields.push(Field::new("CLIPRECT_MIN", Some(i), self.cliprect_min[i]));
            fields.push(Field::new("CLIPRECT_MAX", Some(i), self.cliprect_max[i]));
        }
        fields.push(Field::new("CLIPRECT_CTRL", None, self.cliprect_ctrl));
        fields.push(Field::new("ACCESS", None, self.access));
        fields
    }
}

/// One named register value of an [`EngineState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub index: Option<usize>,
    pub value: u32,
}

impl Field {
    #[must_use]
    pub fn new(name: &'static str, index: Option<usize>, value: u32) -> Self {
        Self { name, index, value }
    }

    /// Display name, e.g. `VTX_X[3]`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.index {
            Some(i) => format!("{}[{i}]", self.name),
            None => self.name.to_string(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:08x}", self.label(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_comes_from_access() {
        let state = EngineState {
            access: 0x0f01_4111,
            ..EngineState::default()
        };
        assert_eq!(state.class(), 0x14);
    }

    #[test]
    fn cursor_lives_in_xy_misc_0_top_nibble() {
        let mut state = EngineState::new();
        state.xy_misc_0 = 0x0000_1055;
        state.set_cursor(9);
        assert_eq!(state.xy_misc_0, 0x9000_1055);
        assert_eq!(state.cursor(), 9);
    }

    #[test]
    fn reset_keeps_visible_state() {
        let mut state = EngineState {
            valid: 0x111f_f1ff,
            edgefill: 0xffff_0113,
            xy_misc_0: 0xf1ff_11ff,
            xy_misc_1: 0x0317_7331,
            xy_misc_4: [0x30ff_ffff, 0x1000_000f],
            rop: 0x5a,
            ..EngineState::default()
        };
        state.reset();
        assert_eq!(state.valid, 0);
        assert_eq!(state.edgefill, 0xffff_0000);
        assert_eq!(state.xy_misc_0, 0x1000);
        assert_eq!(state.xy_misc_1, 0x0300_0000);
        assert_eq!(state.xy_misc_4, [0x3055_5500, 0x1055_5500]);
        assert_eq!(state.rop, 0x5a);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut state = EngineState {
            valid: 0x1234,
            xy_misc_4: [0xabcd_ef01, 0x1234_5678],
            ..EngineState::default()
        };
        state.reset();
        let once = state.clone();
        state.reset();
        assert_eq!(state, once);
    }

    #[test]
    fn field_order_starts_with_status_and_ends_with_access() {
        let fields = EngineState::default().fields();
        assert_eq!(fields[0].name, "STATUS");
        assert_eq!(fields.last().map(Field::label).as_deref(), Some("ACCESS"));
        let labels: Vec<String> = fields.iter().map(Field::label).collect();
        let x3 = labels.iter().position(|l| l == "VTX_X[3]");
        let y3 = labels.iter().position(|l| l == "VTX_Y[3]");
        assert_eq!(x3.map(|p| p + 1), y3);
        assert!(!labels.iter().any(|l| l.starts_with("TRAP")));
    }
}
