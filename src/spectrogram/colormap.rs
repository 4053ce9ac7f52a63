//! Perceptually uniform `inferno` colormap
//!
//! Linear interpolation between eleven evenly spaced samples of the
//! matplotlib table.

const INFERNO: [[f32; 3]; 11] = [
    [0.001462, 0.000466, 0.013866],
    [0.087411, 0.044556, 0.224813],
    [0.258234, 0.038571, 0.406485],
    [0.416331, 0.090203, 0.432943],
    [0.578304, 0.148039, 0.404411],
    [0.735683, 0.215906, 0.330245],
    [0.865006, 0.316822, 0.226055],
    [0.954506, 0.468744, 0.099874],
    [0.987622, 0.645320, 0.039886],
    [0.964394, 0.843848, 0.273391],
    [0.988362, 0.998364, 0.644924],
];

/// 8-bit RGB for `t` in [0, 1]; out-of-range and NaN inputs are clamped
pub fn inferno(t: f32) -> [u8; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let pos = t * (INFERNO.len() - 1) as f32;
    let lo = (pos.floor() as usize).min(INFERNO.len() - 2);
    let frac = pos - lo as f32;

    let mut rgb = [0u8; 3];
    for (c, out) in rgb.iter_mut().enumerate() {
        let v = INFERNO[lo][c] + (INFERNO[lo + 1][c] - INFERNO[lo][c]) * frac;
        *out = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    rgb
}
