//! Expected-state prediction.
//!
//! Every function here takes the state a card was loaded with and mutates
//! it into the state the card must hold after one stimulus: a register
//! access, a method submission or a single-pixel draw.

mod color;
mod geometry;
mod method;
mod mmio;
mod raster;
mod transfer;

pub use color::{
    Color, ColorFormat, bytes_per_pixel, cpp_in, expand_color, expand_mono, expand_surf,
    pack_surf, to_a1r10g10b10,
};
pub use geometry::{
    CSTAT_ABOVE_MAX, CSTAT_AT_MAX, CSTAT_AT_MIN, CSTAT_BELOW_MIN, ClipBounds, bump_vtxid,
    canvas_origin, clip_bounds, clip_coord, clip_status, draw_errors, iclip_fixup, prep_draw,
    required_valid, set_clip, set_vtx, set_xym2, uclip_fixup, vertex_count, vtx_add, vtx_cmp,
    vtx_fixup,
};
pub use method::{
    DrawOp, Method, MethodEffect, Prediction, VtxKind, ctx_switch, invalid_method,
    is_legal_method, method, notify, pitch, rect, set_beta, set_bitmap_color, set_chroma,
    set_pattern_mono_bitmap, set_pattern_mono_color, set_pattern_shape, set_plane, set_rop,
    set_solid_color, set_subdivide, set_vtx_beta, ifc_size_in, ifc_size_out, vtx_method,
    vtx_x32, vtx_y32,
};
pub use mmio::{
    Reg, access_write, beta_write, mmio_read, mmio_write, readable_registers, relative_registers,
};
pub use raster::{
    blit_pixels, cliprect_pass, dst_buffers, inside_canvas, line_width, pattern_pixel,
    pixel_offset, point_pixels, rop, solid_rop, vram_size,
};
pub use transfer::{WALK_LIMIT, ifc_data};
