use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete report containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Report {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// Load a report from a JSON file. Returns None if the file doesn't exist or
/// does not parse.
pub fn load_report(path: &Path) -> Option<Report> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Save a report to a JSON file.
pub fn save_report(path: &Path, report: &Report) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Compare current refresh times against a baseline report. Returns
/// (scene name, percent change) for every scene over the threshold.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Report,
    threshold_pct: f64,
) -> Vec<(String, f64)> {
    let mut regressions = Vec::new();

    for result in current {
        if let Some(base) = baseline
            .results
            .iter()
            .find(|b| b.scene_name == result.scene_name)
        {
            if base.refresh.mean_ms <= 0.0 {
                continue;
            }
            let pct_change =
                (result.refresh.mean_ms - base.refresh.mean_ms) / base.refresh.mean_ms * 100.0;
            if pct_change > threshold_pct {
                regressions.push((result.scene_name.clone(), pct_change));
            }
        }
    }

    regressions
}

/// Format results as markdown: one table for the import pipeline, one for
/// the per-frame refresh.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Voxels | Dropped | Slots | Catalog voxels | Import (ms) | LOD (ms) |\n");
    out.push_str("|-------|--------|---------|-------|----------------|-------------|----------|\n");
    for r in results {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.2} | {:.2} |\n",
            r.scene_name,
            r.voxel_count,
            r.dropped_voxels,
            r.loaded_slots,
            r.catalog_voxels,
            r.import_ms,
            r.lod_ms,
        ));
    }

    out.push('\n');
    out.push_str("| Scene | Active slots | Active voxels | Mean (ms) | Median (ms) | P95 (ms) | P99 (ms) | GPU mean (ms) |\n");
    out.push_str("|-------|--------------|---------------|-----------|-------------|----------|----------|---------------|\n");
    for r in results {
        let gpu = r
            .gpu_refresh
            .as_ref()
            .map_or_else(|| "-".to_string(), |t| format!("{:.2}", t.mean_ms));
        out.push_str(&format!(
            "| {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {} |\n",
            r.scene_name,
            r.active_slots,
            r.active_voxels,
            r.refresh.mean_ms,
            r.refresh.median_ms,
            r.refresh.p95_ms,
            r.refresh.p99_ms,
            gpu,
        ));
    }

    out
}

/// Format a comparison report showing regressions.
pub fn format_comparison(regressions: &[(String, f64)], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "All scenes within {:.0}% threshold. No regressions detected.\n",
            threshold_pct
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "REGRESSIONS DETECTED (>{:.0}% threshold):\n",
        threshold_pct
    ));
    for (scene, pct) in regressions {
        out.push_str(&format!("  - {}: +{:.1}%\n", scene, pct));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TimingSeries;

    fn result(name: &str, mean_ms: f64) -> BenchmarkResult {
        let timings = TimingSeries {
            mean_ms,
            median_ms: mean_ms,
            p95_ms: mean_ms,
            p99_ms: mean_ms,
            min_ms: mean_ms,
            max_ms: mean_ms,
        };
        BenchmarkResult {
            scene_name: name.to_string(),
            voxel_count: 10,
            dropped_voxels: 0,
            loaded_slots: 3,
            catalog_voxels: 15,
            active_slots: 1,
            active_voxels: 10,
            import_ms: 1.0,
            lod_ms: 1.0,
            iterations: 1,
            refresh: timings,
            gpu_refresh: None,
        }
    }

    #[test]
    fn test_compare_flags_slow_scenes() {
        let baseline = Report {
            timestamp: "t".into(),
            results: vec![result("a", 10.0), result("b", 10.0)],
        };
        let current = vec![result("a", 10.5), result("b", 13.0), result("c", 99.0)];
        let regressions = compare(&current, &baseline, 10.0);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].0, "b");
    }

    #[test]
    fn test_report_json_roundtrip() {
        let report = Report {
            timestamp: "t".into(),
            results: vec![result("a", 1.0)],
        };
        let json = serde_json::to_string(&report).expect("serializes");
        let back: Report = serde_json::from_str(&json).expect("parses");
        assert_eq!(back.results[0].scene_name, "a");
        assert!(back.results[0].gpu_refresh.is_none());
    }

    #[test]
    fn test_markdown_has_row_per_scene() {
        let md = format_markdown(&[result("a", 1.0), result("b", 2.0)]);
        assert_eq!(md.matches("| a |").count(), 2);
        assert_eq!(md.matches("| b |").count(), 2);
    }
}
