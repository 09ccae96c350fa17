mod common;

use common::synthetic::{circle_samples, orthogonal_pairs, project, project_xy, world_to_image};
use common::{approx_eq, init_logger};
use nalgebra::{Matrix3, Vector3};
use plane_rectifier::geometry::{cross_ratio, project_scalar};
use plane_rectifier::rectify::circle_affine;
use plane_rectifier::{
    rectify, HomogeneousPoint, RectificationMethod, RectifyError, RectifyParams, Tolerances,
};

fn marked(world: &[[f64; 2]]) -> Vec<HomogeneousPoint> {
    let h = world_to_image();
    world.iter().map(|p| project(&h, *p)).collect()
}

/// The rectified plane is an affine image of the world iff the composed map
/// has no projective row.
fn assert_affine_after(h_rect: &Matrix3<f64>) {
    let g = h_rect * world_to_image();
    let scale = g[(2, 2)].abs();
    assert!(scale > 0.0);
    assert!(
        g[(2, 0)].abs() <= 1e-8 * scale && g[(2, 1)].abs() <= 1e-8 * scale,
        "projective row left: {:?}",
        g.row(2)
    );
}

fn true_line_at_infinity() -> Vector3<f64> {
    world_to_image().try_inverse().unwrap().transpose() * Vector3::new(0.0, 0.0, 1.0)
}

#[test]
fn parallel_method_recovers_line_at_infinity() {
    init_logger();
    let points = marked(&[
        [0.0, 0.0],
        [100.0, 0.0],
        [0.0, 50.0],
        [100.0, 50.0],
        [0.0, 0.0],
        [0.0, 100.0],
        [80.0, 0.0],
        [80.0, 100.0],
    ]);
    let result = rectify(&points, &RectifyParams::new(RectificationMethod::Parallel)).unwrap();
    let line = result.line_at_infinity.unwrap().to_vector();
    let truth = true_line_at_infinity();
    assert!(line.cross(&truth).norm() <= 1e-6 * line.norm() * truth.norm());
    assert!(!result.already_affine);
    assert_affine_after(&result.homography);
}

#[test]
fn ratio_methods_remove_projective_distortion() {
    init_logger();
    // |AB| = 10, |BC| = 20 along x; |AB| = 20, |BC| = 30 along y
    let three = [
        [0.0, 0.0],
        [10.0, 0.0],
        [30.0, 0.0],
        [0.0, 0.0],
        [0.0, 20.0],
        [0.0, 50.0],
    ];
    for method in [
        RectificationMethod::CrossRatio3,
        RectificationMethod::Homography1d,
        RectificationMethod::Geometric,
    ] {
        let params = RectifyParams::new(method).with_ratios([2.0, 1.5]);
        let result = rectify(&marked(&three), &params).unwrap();
        assert_affine_after(&result.homography);
        let vanishing = result.vanishing.unwrap();
        assert!(!vanishing.v1.is_ideal(1e-12) && !vanishing.v2.is_ideal(1e-12));
    }

    let four = [
        [0.0, 0.0],
        [10.0, 0.0],
        [30.0, 0.0],
        [60.0, 0.0],
        [0.0, 0.0],
        [0.0, 20.0],
        [0.0, 50.0],
        [0.0, 80.0],
    ];
    // (A, B; C, ∞) = |AC| / |BC|
    let params =
        RectifyParams::new(RectificationMethod::CrossRatio4).with_ratios([1.5, 50.0 / 30.0]);
    let result = rectify(&marked(&four), &params).unwrap();
    assert_affine_after(&result.homography);
}

#[test]
fn horizon_method_uses_the_marked_points() {
    let h = world_to_image();
    let v1 = h * Vector3::new(1.0, 0.0, 0.0);
    let v2 = h * Vector3::new(0.0, 1.0, 0.0);
    let points = [
        HomogeneousPoint::from_xy(v1[0] / v1[2], v1[1] / v1[2]),
        HomogeneousPoint::from_xy(v2[0] / v2[2], v2[1] / v2[2]),
    ];
    let result = rectify(&points, &RectifyParams::new(RectificationMethod::Horizon)).unwrap();
    assert_affine_after(&result.homography);
}

#[test]
fn already_parallel_segments_keep_an_ideal_vanishing_point() {
    // first direction is parallel in the image as well
    let points = [
        [10.0, 10.0],
        [200.0, 10.0],
        [10.0, 90.0],
        [200.0, 90.0],
        [10.0, 10.0],
        [40.0, 120.0],
        [200.0, 10.0],
        [170.0, 120.0],
    ]
    .map(HomogeneousPoint::from);
    let result = rectify(&points, &RectifyParams::new(RectificationMethod::Parallel)).unwrap();
    let vanishing = result.vanishing.unwrap();
    assert!(vanishing.v1.is_ideal(1e-12));
    assert!(!vanishing.v2.is_ideal(1e-12));
    let h = result.homography;
    // the horizontal direction stays at infinity
    assert!(approx_eq(h[(2, 0)], 0.0, 1e-15));
}

#[test]
fn metric_method_restores_right_angles_and_ratios() {
    init_logger();
    let points = marked(&orthogonal_pairs());
    let result = rectify(&points, &RectifyParams::new(RectificationMethod::Metric)).unwrap();
    let g = result.homography * world_to_image();
    let map = |p: [f64; 2]| project_xy(&g, p);

    let q = map([120.0, 110.0]);
    let a = map([130.0, 130.0]); // direction (1, 2)
    let b = map([100.0, 120.0]); // direction (-2, 1)
    let u = [a[0] - q[0], a[1] - q[1]];
    let v = [b[0] - q[0], b[1] - q[1]];
    let (lu, lv) = (u[0].hypot(u[1]), v[0].hypot(v[1]));
    let cos = (u[0] * v[0] + u[1] * v[1]) / (lu * lv);
    assert!(cos.abs() < 1e-6, "cos = {cos}");
    assert!(approx_eq(lu / lv, 1.0, 1e-6), "length ratio {}", lu / lv);

    // orientation is preserved: the world x→y turn stays counter-clockwise
    let o = map([0.0, 0.0]);
    let x = map([10.0, 0.0]);
    let y = map([0.0, 10.0]);
    let turn = (x[0] - o[0]) * (y[1] - o[1]) - (x[1] - o[1]) * (y[0] - o[0]);
    assert!(turn > 0.0);
}

#[test]
fn metric_method_rejects_repeated_constraints() {
    let pairs = orthogonal_pairs();
    let first: Vec<[f64; 2]> = pairs[..4].to_vec();
    let repeated: Vec<[f64; 2]> = (0..5).flat_map(|_| first.clone()).collect();
    let err = rectify(&marked(&repeated), &RectifyParams::new(RectificationMethod::Metric));
    assert!(matches!(err, Err(RectifyError::DegenerateRectification(_))));
}

#[test]
fn circle_method_finds_line_at_infinity() {
    init_logger();
    let h = world_to_image();
    // disjoint circles, then overlapping ones
    for (c1, c2) in [([100.0, 100.0], [220.0, 130.0]), ([100.0, 100.0], [150.0, 100.0])] {
        let first: Vec<[f64; 2]> = circle_samples(c1, 40.0, 5)
            .into_iter()
            .map(|p| project_xy(&h, p))
            .collect();
        let second: Vec<[f64; 2]> = circle_samples(c2, 40.0, 5)
            .into_iter()
            .map(|p| project_xy(&h, p))
            .collect();
        let circle = circle_affine(&first, &second, &Tolerances::default()).unwrap();
        let line = circle.line_at_infinity.to_vector();
        let truth = true_line_at_infinity();
        assert!(
            line.cross(&truth).norm() <= 1e-6 * line.norm() * truth.norm(),
            "line {line:?} vs {truth:?}"
        );
        assert_affine_after(&circle.outcome.homography);
        for p in &first {
            assert!(circle.conics[0].eval(p[0], p[1]).abs() < 1e-6);
        }

        let points: Vec<HomogeneousPoint> = first
            .iter()
            .chain(&second)
            .copied()
            .map(HomogeneousPoint::from)
            .collect();
        let result = rectify(&points, &RectifyParams::new(RectificationMethod::Circle)).unwrap();
        assert_affine_after(&result.homography);
    }
}

#[test]
fn circle_method_handles_concentric_circles() {
    init_logger();
    // the pencil's double line is the line at infinity itself
    let h = world_to_image();
    let outer: Vec<[f64; 2]> = circle_samples([100.0, 100.0], 60.0, 5)
        .into_iter()
        .map(|p| project_xy(&h, p))
        .collect();
    let inner: Vec<[f64; 2]> = circle_samples([100.0, 100.0], 20.0, 5)
        .into_iter()
        .map(|p| project_xy(&h, p))
        .collect();
    let circle = circle_affine(&outer, &inner, &Tolerances::default()).unwrap();
    let line = circle.line_at_infinity.to_vector();
    let truth = true_line_at_infinity();
    assert!(
        line.cross(&truth).norm() <= 1e-6 * line.norm() * truth.norm(),
        "line {line:?} vs {truth:?}"
    );
    assert_affine_after(&circle.outcome.homography);
}

#[test]
fn circle_method_reports_collinear_input() {
    let line: Vec<[f64; 2]> = (0..5).map(|k| [k as f64 * 10.0, 5.0]).collect();
    let circle = circle_samples([50.0, 50.0], 20.0, 5);
    assert!(matches!(
        circle_affine(&line, &circle, &Tolerances::default()),
        Err(RectifyError::IllConditionedFit { .. })
    ));
}

#[test]
fn image_cross_ratio_matches_world() {
    let h = world_to_image();
    let world = [[0.0, 10.0], [15.0, 10.0], [40.0, 10.0], [100.0, 10.0]];
    let image: Vec<[f64; 2]> = world.iter().map(|p| project_xy(&h, *p)).collect();
    let s: Vec<f64> = image
        .iter()
        .map(|p| project_scalar(*p, image[0], image[3], 1e-12).unwrap())
        .collect();
    let image_cr = cross_ratio(s[0], s[1], s[2], s[3], 1e-12).unwrap();
    let world_cr = cross_ratio(0.0, 15.0, 40.0, 100.0, 1e-12).unwrap();
    assert!(approx_eq(image_cr, world_cr, 1e-9));
}

#[test]
fn every_method_checks_its_point_count() {
    for method in RectificationMethod::ALL {
        let points = vec![HomogeneousPoint::from_xy(1.0, 2.0); method.required_points() + 1];
        let err = rectify(&points, &RectifyParams::new(method)).unwrap_err();
        assert_eq!(
            err,
            RectifyError::WrongPointCount {
                method: method.name(),
                expected: method.required_points(),
                got: method.required_points() + 1,
            }
        );
    }
}
