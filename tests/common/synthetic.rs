use nalgebra::{Matrix3, Vector3};
use plane_rectifier::image::RgbaBuffer;
use plane_rectifier::HomogeneousPoint;

/// World plane → image, a moderate perspective tilt with some shear.
pub fn world_to_image() -> Matrix3<f64> {
    Matrix3::new(1.0, 0.2, 50.0, 0.1, 0.9, 40.0, 0.0008, 0.0005, 1.0)
}

pub fn project(h: &Matrix3<f64>, p: [f64; 2]) -> HomogeneousPoint {
    let v = h * Vector3::new(p[0], p[1], 1.0);
    HomogeneousPoint::from_xy(v[0] / v[2], v[1] / v[2])
}

pub fn project_xy(h: &Matrix3<f64>, p: [f64; 2]) -> [f64; 2] {
    let q = project(h, p);
    [q.x, q.y]
}

/// Points on a world circle, at angles that avoid any symmetric layout.
pub fn circle_samples(center: [f64; 2], radius: f64, count: usize) -> Vec<[f64; 2]> {
    (0..count)
        .map(|k| {
            let t = 0.3 + k as f64 * 1.2;
            [center[0] + radius * t.cos(), center[1] + radius * t.sin()]
        })
        .collect()
}

/// Five world-orthogonal segment pairs, four points each, at assorted
/// orientations and positions.
pub fn orthogonal_pairs() -> Vec<[f64; 2]> {
    let angles_deg = [0.0f64, 20.0, 45.0, 70.0, 110.0];
    let mut pts = Vec::with_capacity(20);
    for (k, deg) in angles_deg.iter().enumerate() {
        let t = deg.to_radians();
        let (u, n) = ([t.cos(), t.sin()], [-t.sin(), t.cos()]);
        let base = [60.0 + 30.0 * k as f64, 50.0 + 20.0 * k as f64];
        let other = [base[0] + 10.0, base[1] - 15.0];
        pts.push([base[0] - 40.0 * u[0], base[1] - 40.0 * u[1]]);
        pts.push([base[0] + 40.0 * u[0], base[1] + 40.0 * u[1]]);
        pts.push([other[0] - 40.0 * n[0], other[1] - 40.0 * n[1]]);
        pts.push([other[0] + 40.0 * n[0], other[1] + 40.0 * n[1]]);
    }
    pts
}

/// High-contrast RGBA checkerboard.
pub fn checkerboard_rgba(width: usize, height: usize, cell: usize) -> RgbaBuffer {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(cell > 0, "cell size must be positive");

    let mut img = RgbaBuffer::filled(width, height, [0, 0, 0, 255]);
    for y in 0..height {
        for x in 0..width {
            let sum = x / cell + y / cell;
            let val = if sum % 2 == 0 { 32u8 } else { 220u8 };
            img.put_pixel(x, y, [val, val, val, 255]);
        }
    }
    img
}
