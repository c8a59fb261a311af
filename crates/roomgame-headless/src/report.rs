use std::path::Path;

use crate::runner::SceneResult;

/// Results of one headless run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Report {
    pub label: String,
    pub columns: u32,
    pub rows: u32,
    pub results: Vec<SceneResult>,
}

/// Save a report as pretty-printed JSON.
pub fn save_report(path: &Path, report: &Report) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Format results as a markdown summary table.
pub fn format_markdown(results: &[SceneResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Rooms | Room cells | Infected | Sources | Simulated | Instances | Transitions | Outer | Sync | Mean (ms) | P95 (ms) |\n");
    out.push_str("|-------|-------|------------|----------|---------|-----------|-----------|-------------|-------|------|-----------|----------|\n");

    for r in results {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {:.3} | {:.3} |\n",
            r.scene_name,
            r.rooms,
            r.room_cells,
            r.infected_cells,
            r.source_cells,
            r.simulated_cells,
            r.live_instances,
            r.transitions,
            r.outer_influence_mode,
            if r.slave_in_sync { "ok" } else { "DIVERGED" },
            r.timings.mean_ms,
            r.timings.p95_ms,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TimingSeries;

    fn result(name: &str, in_sync: bool) -> SceneResult {
        SceneResult {
            scene_name: name.to_string(),
            frame_count: 10,
            rooms: 2,
            room_cells: 40,
            infected_cells: 3,
            source_cells: 1,
            simulated_cells: 12,
            live_instances: 41,
            transitions: 4,
            outer_influence_mode: "Patrol".to_string(),
            snapshot_bytes: 1024,
            slave_in_sync: in_sync,
            timings: TimingSeries {
                mean_ms: 0.5,
                median_ms: 0.4,
                p95_ms: 1.25,
                max_ms: 2.0,
            },
        }
    }

    #[test]
    fn test_markdown_has_row_per_scene() {
        let md = format_markdown(&[result("a", true), result("b", false)]);
        assert_eq!(md.lines().count(), 4);
        assert!(md.contains("| a | 2 | 40 |"));
        assert!(md.contains("DIVERGED"));
        assert!(md.contains("1.250"));
    }

    #[test]
    fn test_report_json_round_trip() {
        let report = Report {
            label: "test".to_string(),
            columns: 64,
            rows: 64,
            results: vec![result("a", true)],
        };
        let json = serde_json::to_string_pretty(&report).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back.results[0].scene_name, "a");
        assert_eq!(back.results[0].timings.p95_ms, 1.25);
    }
}
