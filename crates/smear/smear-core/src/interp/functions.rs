use glam::DVec3;

/// Cubic ease `3u^2 - 2u^3` on `u` clamped to [0, 1]; zero slope at both ends.
#[inline]
pub fn smoothstep(u: f64) -> f64 {
    let u = u.clamp(0.0, 1.0);
    u * u * (3.0 - 2.0 * u)
}

/// Unit vector along `v`, or `v` unchanged when it is shorter than `eps`.
#[inline]
pub fn normalize_or_degenerate(v: DVec3, eps: f64) -> DVec3 {
    let len = v.length();
    if len > eps {
        v / len
    } else {
        v
    }
}

/// Spherical interpolation between the directions of `a` and `b`.
///
/// Inputs are normalized first. Arcs shorter than `angle_threshold` (and
/// near-antipodal pairs, where `sin(omega)` vanishes) use a normalized lerp.
/// Zero inputs stay degenerate instead of producing NaN.
pub fn slerp_direction(a: DVec3, b: DVec3, t: f64, eps: f64, angle_threshold: f64) -> DVec3 {
    let a = normalize_or_degenerate(a, eps);
    let b = normalize_or_degenerate(b, eps);
    let cos = a.dot(b).clamp(-1.0, 1.0);
    let omega = cos.acos();
    let sin = omega.sin();
    if omega < angle_threshold || sin < angle_threshold {
        return normalize_or_degenerate(a.lerp(b, t), eps);
    }
    a * (((1.0 - t) * omega).sin() / sin) + b * ((t * omega).sin() / sin)
}
