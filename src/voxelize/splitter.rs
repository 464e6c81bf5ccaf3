//! Axis-plane triangle splitting with texture-coordinate interpolation.
//!
//! [`split_triangle`] cuts one triangle by an axis-aligned plane into at most
//! three sub-triangles and sorts them into the `lo` (below the plane) and
//! `hi` (above) output sinks. Passing `None` for a sink discards that side
//! while still performing the split, which is how the per-voxel clipper keeps
//! only the inside of a cube face.

use crate::geometry::TexturedTriangle;
use glam::{Vec2, Vec3};

/// Vertices closer than this to the plane are treated as lying on it.
pub const EPSILON: f32 = 1.0 / 65_536.0;

#[inline]
fn is_zero(x: f32) -> bool {
    x.abs() < EPSILON
}

/// Parameter of the intersection between the ray `org + t * dir` and the
/// plane, along one axis. Plane-parallel edges report 0.
#[inline]
fn intersect_edge_plane(org: f32, dir: f32, plane: f32) -> f32 {
    if is_zero(dir) {
        0.0
    } else {
        (org - plane) / -dir
    }
}

type Sink<'a, 'b> = &'a mut Option<&'b mut Vec<TexturedTriangle>>;

#[inline]
fn emit<'a, 'b>(t: TexturedTriangle, lo: bool, out_lo: Sink<'a, 'b>, out_hi: Sink<'a, 'b>) {
    let sink = if lo { out_lo } else { out_hi };
    if let Some(sink) = sink.as_deref_mut() {
        sink.push(t);
    }
}

/// Splits `t` by the plane `x[axis] = plane`.
///
/// Sub-triangles below the plane are pushed to `out_lo`, those above to
/// `out_hi`; a `None` sink discards its side. Intersection vertices mix
/// geometry and texture coordinates with the same edge parameter, so UVs
/// stay barycentric-consistent with the parent.
///
/// A triangle lying entirely in the plane sorts to `lo`, falling back to
/// `hi` when `lo` is discarded; a boundary face therefore survives the clip
/// of the cell on either side of it.
pub fn split_triangle<'a>(
    axis: usize,
    plane: u32,
    t: &TexturedTriangle,
    mut out_lo: Option<&'a mut Vec<TexturedTriangle>>,
    mut out_hi: Option<&'a mut Vec<TexturedTriangle>>,
) {
    let plane_f = plane as f32;
    let planar = [
        is_zero(t.v[0][axis] - plane_f),
        is_zero(t.v[1][axis] - plane_f),
        is_zero(t.v[2][axis] - plane_f),
    ];
    let planar_sum = planar.iter().filter(|&&p| p).count();

    // Triangle lies in the splitting plane.
    if planar_sum == 3 {
        match (out_lo.as_deref_mut(), out_hi.as_deref_mut()) {
            (Some(lo), _) => lo.push(*t),
            (None, Some(hi)) => hi.push(*t),
            (None, None) => {}
        }
        return;
    }

    let lo_verts = [
        t.v[0][axis] <= plane_f,
        t.v[1][axis] <= plane_f,
        t.v[2][axis] <= plane_f,
    ];
    let lo_sum = lo_verts.iter().filter(|&&l| l).count();

    // All vertices on one side.
    if lo_sum == 0 {
        emit(*t, false, &mut out_lo, &mut out_hi);
        return;
    }
    if lo_sum == 3 {
        emit(*t, true, &mut out_lo, &mut out_hi);
        return;
    }

    // Two vertices on the plane: the triangle has no thickness across it and
    // sorts whole to the side of the remaining vertex.
    if planar_sum == 2 {
        let non_planar = if !planar[0] {
            0
        } else if !planar[1] {
            1
        } else {
            2
        };
        emit(*t, lo_verts[non_planar], &mut out_lo, &mut out_hi);
        return;
    }

    // One vertex on the plane.
    if planar_sum == 1 {
        let pivot = if planar[0] {
            0
        } else if planar[1] {
            1
        } else {
            2
        };
        let others = [(pivot + 1) % 3, (pivot + 2) % 3];

        // Both remaining vertices on one side: no split needed.
        let other_lo_sum = lo_verts[others[0]] as usize + lo_verts[others[1]] as usize;
        if other_lo_sum != 1 {
            emit(*t, other_lo_sum == 2, &mut out_lo, &mut out_hi);
            return;
        }

        // The plane passes through the pivot vertex and the opposing edge:
        // one intersection, two output triangles instead of a quad.
        let edge = t.v[others[1]] - t.v[others[0]];
        let s = intersect_edge_plane(t.v[others[0]][axis], edge[axis], plane_f);
        let cut_v = t.v[others[0]].lerp(t.v[others[1]], s);
        let cut_uv = t.uv[others[0]].lerp(t.uv[others[1]], s);

        let first = TexturedTriangle::new(
            [t.v[pivot], t.v[others[0]], cut_v],
            [t.uv[pivot], t.uv[others[0]], cut_uv],
        );
        let second = TexturedTriangle::new(
            [t.v[pivot], cut_v, t.v[others[1]]],
            [t.uv[pivot], cut_uv, t.uv[others[1]]],
        );

        let first_lo = lo_verts[others[0]];
        emit(first, first_lo, &mut out_lo, &mut out_hi);
        emit(second, !first_lo, &mut out_lo, &mut out_hi);
        return;
    }

    // General case: one vertex isolated on its own side of the plane. The
    // split yields a lone triangle on the isolated side and a quad, emitted
    // as two triangles, on the other.
    debug_assert!(lo_sum == 1 || lo_sum == 2);
    let isolated_lo = lo_sum == 1;
    let isolated = if isolated_lo {
        if lo_verts[0] {
            0
        } else if lo_verts[1] {
            1
        } else {
            2
        }
    } else if !lo_verts[0] {
        0
    } else if !lo_verts[1] {
        1
    } else {
        2
    };
    let others = [(isolated + 1) % 3, (isolated + 2) % 3];

    let cut = |other: usize| -> (Vec3, Vec2) {
        let edge = t.v[other] - t.v[isolated];
        let s = intersect_edge_plane(t.v[isolated][axis], edge[axis], plane_f);
        (t.v[isolated].lerp(t.v[other], s), t.uv[isolated].lerp(t.uv[other], s))
    };
    let (cut0_v, cut0_uv) = cut(others[0]);
    let (cut1_v, cut1_uv) = cut(others[1]);

    let lone = TexturedTriangle::new(
        [t.v[isolated], cut0_v, cut1_v],
        [t.uv[isolated], cut0_uv, cut1_uv],
    );
    let quad = [
        TexturedTriangle::new(
            [cut0_v, t.v[others[0]], t.v[others[1]]],
            [cut0_uv, t.uv[others[0]], t.uv[others[1]]],
        ),
        TexturedTriangle::new(
            [cut0_v, cut1_v, t.v[others[1]]],
            [cut0_uv, cut1_uv, t.uv[others[1]]],
        ),
    ];

    emit(lone, isolated_lo, &mut out_lo, &mut out_hi);
    for half in quad {
        emit(half, !isolated_lo, &mut out_lo, &mut out_hi);
    }
}
