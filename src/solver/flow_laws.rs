//! Pointwise flux laws shared by the lateral and river passes.

/// Upwind flow thickness across a face.
///
/// Takes the depth on the side with the higher head when that side is wet,
/// zero otherwise. `diff` is own head minus neighbor head.
#[inline]
pub fn avg_y(diff: f64, own: f64, neighbor: f64, dry_depth: f64) -> f64 {
    let upwind = if diff > 0.0 { own } else { neighbor };
    if upwind > dry_depth { upwind } else { 0.0 }
}

/// Manning-type flow through a cross-section.
///
/// `q = A · y^(2/3) · grad / (sqrt(sf) · n)`, signed by `grad`.
#[inline]
pub fn overland_flow(y: f64, grad: f64, sf: f64, cross_area: f64, roughness: f64) -> f64 {
    cross_area * y.powf(2.0 / 3.0) * grad / (sf.abs().sqrt() * roughness)
}

/// Directional derivative of a head field sampled at three points.
///
/// `l1`/`l2` are the coordinate arrays of the three stencil points; calling
/// with `(y, x)` gives ∂h/∂x and with `(x, y)` gives ∂h/∂y.
#[inline]
pub fn dh_by_dl(l1: &[f64; 3], l2: &[f64; 3], h: &[f64; 3]) -> f64 {
    -(l1[2] * (h[1] - h[0]) + l1[1] * (h[0] - h[2]) + l1[0] * (h[2] - h[1]))
        / (l2[2] * (l1[1] - l1[0]) + l2[1] * (l1[0] - l1[2]) + l2[0] * (l1[2] - l1[1]))
}

/// Magnitude of the head gradient over a 3-point stencil.
pub fn gradient_magnitude(points: &[(f64, f64); 3], h: &[f64; 3]) -> f64 {
    let x = points.map(|p| p.0);
    let y = points.map(|p| p.1);
    let dhdx = dh_by_dl(&y, &x, h);
    let dhdy = dh_by_dl(&x, &y, h);
    (dhdx * dhdx + dhdy * dhdy).sqrt()
}

/// Broad-crested weir exchange between a channel and its floodplain element.
///
/// Positive when water moves from the river to the element. The crest is
/// the higher of the bank and element elevations.
pub fn bank_overflow(
    element_head: f64,
    element_z: f64,
    river_head: f64,
    bank_z: f64,
    weir_coefficient: f64,
    length: f64,
    gravity: f64,
) -> f64 {
    let crest = bank_z.max(element_z);
    let c = weir_coefficient * 2.0 * (2.0 * gravity).sqrt() * length / 3.0;

    if river_head > element_head {
        if element_head > crest {
            // Submerged
            c * (river_head - element_head).sqrt() * (river_head - crest)
        } else if river_head > crest {
            c * (river_head - crest).sqrt() * (river_head - crest)
        } else {
            0.0
        }
    } else if river_head > crest {
        -c * (element_head - river_head).sqrt() * (element_head - crest)
    } else if element_head > crest {
        -c * (element_head - crest).sqrt() * (element_head - crest)
    } else {
        0.0
    }
}
