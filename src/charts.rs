//! Chart datasets derived from a file listing.
//!
//! Drawing is left to Chart.js in the dashboard page; the terminal gets plain `#` bars.

use std::collections::HashMap;
use std::fmt::Write;

use serde_json::{json, Value};

use crate::file_info::FileRecord;
use crate::format::{megabytes, truncate_label};

pub const PALETTE: [&str; 6] = ["#4285F4", "#DB4437", "#F4B400", "#0F9D58", "#AB47BC", "#00ACC1"];
pub const RANKING_LEN: usize = 10;
pub const RANKING_LABEL_LEN: usize = 15;
const BAR_WIDTH: usize = 40;

/// Count of files per MIME subtype, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDistribution {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

/// The largest files, biggest first, sized in MB.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeRanking {
    pub labels: Vec<String>,
    pub megabytes: Vec<f64>,
}

/// Part of the MIME type after the last `/`.
fn subtype(mime_type: &str) -> &str {
    match mime_type.rfind('/') {
        Some(i) => &mime_type[i + 1..],
        None => mime_type,
    }
}

impl TypeDistribution {
    pub fn from_files(files: &[FileRecord]) -> TypeDistribution {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut labels = Vec::new();
        let mut counts = Vec::new();
        for file in files {
            let key = subtype(&file.mime_type);
            match index.get(key) {
                Some(&i) => counts[i] += 1,
                None => {
                    index.insert(key, labels.len());
                    labels.push(key.to_string());
                    counts.push(1);
                }
            }
        }
        TypeDistribution { labels, counts }
    }

    pub fn colors(&self) -> Vec<&'static str> {
        (0..self.labels.len())
            .map(|i| PALETTE[i % PALETTE.len()])
            .collect()
    }

    pub fn to_chart_config(&self) -> Value {
        json!({
            "type": "doughnut",
            "data": {
                "labels": self.labels,
                "datasets": [{
                    "data": self.counts,
                    "backgroundColor": self.colors(),
                    "hoverOffset": 4
                }]
            },
            "options": {
                "responsive": true,
                "maintainAspectRatio": false,
                "plugins": {
                    "legend": { "position": "right" }
                }
            }
        })
    }

    pub fn render_text(&self) -> String {
        let values: Vec<f64> = self.counts.iter().map(|&c| c as f64).collect();
        let shown: Vec<String> = self.counts.iter().map(u64::to_string).collect();
        render_bars("File types", &self.labels, &values, &shown)
    }
}

impl SizeRanking {
    pub fn from_files(files: &[FileRecord]) -> SizeRanking {
        let mut sorted: Vec<&FileRecord> = files.iter().collect();
        sorted.sort_by(|a, b| b.size_or_zero().cmp(&a.size_or_zero()));
        sorted.truncate(RANKING_LEN);

        SizeRanking {
            labels: sorted
                .iter()
                .map(|f| truncate_label(&f.name, RANKING_LABEL_LEN))
                .collect(),
            megabytes: sorted.iter().map(|f| megabytes(f.size_or_zero())).collect(),
        }
    }

    pub fn to_chart_config(&self) -> Value {
        json!({
            "type": "bar",
            "data": {
                "labels": self.labels,
                "datasets": [{
                    "label": "Size (MB)",
                    "data": self.megabytes,
                    "backgroundColor": PALETTE[0],
                    "borderRadius": 4
                }]
            },
            "options": {
                "responsive": true,
                "maintainAspectRatio": false,
                "plugins": {
                    "legend": { "display": false }
                },
                "scales": {
                    "y": {
                        "beginAtZero": true,
                        "title": { "display": true, "text": "Size (MB)" }
                    }
                }
            }
        })
    }

    pub fn render_text(&self) -> String {
        let shown: Vec<String> = self.megabytes.iter().map(|mb| format!("{:.2}", mb)).collect();
        render_bars("Largest files (MB)", &self.labels, &self.megabytes, &shown)
    }
}

fn render_bars(title: &str, labels: &[String], values: &[f64], shown: &[String]) -> String {
    let mut out = format!("{}\n", title);
    if labels.is_empty() {
        out.push_str("  (no data)\n");
        return out;
    }

    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max = values.iter().cloned().fold(0.0_f64, f64::max);
    for ((label, &value), text) in labels.iter().zip(values).zip(shown) {
        let mut len = if max > 0.0 {
            (value / max * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        if value > 0.0 && len == 0 {
            len = 1;
        }
        let pad = label_width - label.chars().count();
        let _ = writeln!(
            out,
            "  {}{}  {} {}",
            label,
            " ".repeat(pad),
            "#".repeat(len),
            text
        );
    }
    out
}
