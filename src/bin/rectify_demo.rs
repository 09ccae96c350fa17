use plane_rectifier::config::rectify_demo;
use plane_rectifier::image::io::{load_rgba_image, save_rgba, write_json_file};
use plane_rectifier::Rectifier;
use std::env;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = rectify_demo::load_config(Path::new(&config_path))?;

    let source = load_rgba_image(&config.input)?;
    let points = config.homogeneous_points();
    let expected = config.method.required_points();
    if points.len() != expected {
        return Err(format!(
            "Method `{}` needs {expected} points, config has {}",
            config.method,
            points.len()
        ));
    }

    let rectifier = Rectifier::new(config.params()).with_warp_options(config.warp);
    let rectified = rectifier
        .process(&points, &source.as_view())
        .map_err(|e| format!("Rectification failed: {e}"))?;

    save_rgba(&rectified.image, &config.output.image)?;
    write_json_file(&config.output.report_json, &rectified.report)?;

    let h = &rectified.report.homography;
    println!(
        "method={} output={}x{} already_affine={} total_ms={:.3}",
        config.method,
        rectified.image.width(),
        rectified.image.height(),
        rectified.report.already_affine,
        rectified.report.timings.total_ms
    );
    for row in h {
        println!("  [{:>14.6e} {:>14.6e} {:>14.6e}]", row[0], row[1], row[2]);
    }
    println!("Saved {}", config.output.image.display());
    println!("Saved {}", config.output.report_json.display());
    Ok(())
}

fn usage() -> String {
    "Usage: rectify_demo <config.json>".to_string()
}
