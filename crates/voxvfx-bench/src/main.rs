use std::path::PathBuf;
use std::process;

use glam::Vec3;
use voxvfx_core::config::{load_config_from_str, RuntimeConfig};

mod report;
mod runner;
mod scenes;

use runner::BenchmarkRunner;

fn usage() {
    eprintln!("Usage: import-bench [OPTIONS] [FILE.vox ...]");
    eprintln!("  --synthetic                    Run the generated scene suite (default without files)");
    eprintln!("  --config <path>                Load a RON runtime config");
    eprintln!("  --camera <x,y,z>               Observer offset from the world centre for files");
    eprintln!("  --iterations <n>               Refresh passes per scene (default: 60)");
    eprintln!("  --gpu                          Also time refreshes against a wgpu device");
    eprintln!("  --output <path>                Save results as a JSON report");
    eprintln!("  --baseline <path>              Load a JSON report for comparison");
    eprintln!("  --regression-threshold <pct>   Regression threshold percentage (default: 10)");
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v,
        None => fail(&format!("missing value for {flag}")),
    }
}

fn parse_camera(text: &str) -> Option<Vec3> {
    let parts: Vec<f32> = text
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    match parts[..] {
        [x, y, z] => Some(Vec3::new(x, y, z)),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut files: Vec<PathBuf> = Vec::new();
    let mut synthetic = false;
    let mut config_path: Option<PathBuf> = None;
    let mut camera_offset = Vec3::new(0.0, 100.0, 400.0);
    let mut iterations = 60u32;
    let mut gpu = false;
    let mut output_path: Option<PathBuf> = None;
    let mut baseline_path: Option<PathBuf> = None;
    let mut regression_threshold = 10.0f64;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--synthetic" => synthetic = true,
            "--gpu" => gpu = true,
            "--config" => {
                i += 1;
                config_path = Some(PathBuf::from(value(&args, i, flag)));
            }
            "--camera" => {
                i += 1;
                camera_offset = parse_camera(value(&args, i, flag))
                    .unwrap_or_else(|| fail("invalid --camera value, expected x,y,z"));
            }
            "--iterations" => {
                i += 1;
                iterations = value(&args, i, flag)
                    .parse()
                    .unwrap_or_else(|_| fail("invalid --iterations value"));
            }
            "--output" => {
                i += 1;
                output_path = Some(PathBuf::from(value(&args, i, flag)));
            }
            "--baseline" => {
                i += 1;
                baseline_path = Some(PathBuf::from(value(&args, i, flag)));
            }
            "--regression-threshold" => {
                i += 1;
                regression_threshold = value(&args, i, flag)
                    .parse()
                    .unwrap_or_else(|_| fail("invalid --regression-threshold value"));
            }
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            other if other.starts_with("--") => {
                usage();
                fail(&format!("Unknown argument: {other}"));
            }
            path => files.push(PathBuf::from(path)),
        }
        i += 1;
    }

    let config = match &config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .unwrap_or_else(|e| fail(&format!("cannot read {}: {e}", path.display())));
            match load_config_from_str(&text) {
                Ok((config, _warnings)) => config,
                Err(e) => fail(&format!("invalid config {}: {e}", path.display())),
            }
        }
        None => RuntimeConfig::default(),
    };

    let mut runner = BenchmarkRunner::new(config, iterations);
    if gpu {
        log::info!("Initializing GPU...");
        runner = runner
            .with_gpu()
            .unwrap_or_else(|e| fail(&format!("GPU init failed: {e}")));
    }

    let mut results = Vec::new();
    for path in &files {
        let name = path.display().to_string();
        let outcome = std::fs::read(path)
            .map_err(runner::BenchError::from)
            .and_then(|bytes| runner.run_bytes(&name, bytes, camera_offset));
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => log::error!("{name}: {e}"),
        }
    }
    if synthetic || files.is_empty() {
        for scene in scenes::standard_scenes() {
            let bytes = scenes::generate_scene(scene.kind);
            match runner.run_bytes(scene.name, bytes, Vec3::from(scene.camera_offset)) {
                Ok(result) => results.push(result),
                Err(e) => log::error!("{}: {e}", scene.name),
            }
        }
    }

    // Print markdown summary
    println!("\n## Import Benchmark Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let report = report::Report {
            timestamp: run_timestamp(),
            results: results.clone(),
        };
        match report::save_report(path, &report) {
            Ok(()) => log::info!("Saved report to {}", path.display()),
            Err(e) => fail(&format!("failed to save report: {e}")),
        }
    }

    if let Some(ref path) = baseline_path {
        if let Some(baseline) = report::load_report(path) {
            let regressions = report::compare(&results, &baseline, regression_threshold);
            println!(
                "{}",
                report::format_comparison(&regressions, regression_threshold)
            );
            if !regressions.is_empty() {
                eprintln!(
                    "ERROR: {} regressions detected, exiting with code 1",
                    regressions.len()
                );
                process::exit(1);
            }
        } else {
            log::warn!("Baseline file not found: {}", path.display());
        }
    }

    log::info!("Benchmark complete.");
}

/// Seconds since the Unix epoch, tagged for the report.
fn run_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    format!("bench-{secs}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camera() {
        assert_eq!(parse_camera("1, 2.5,-3"), Some(Vec3::new(1.0, 2.5, -3.0)));
        assert_eq!(parse_camera("1,2"), None);
        assert_eq!(parse_camera("a,b,c"), None);
    }
}
