#![allow(dead_code)]

pub mod synthetic;

pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
