use crate::charts::{SizeRanking, TypeDistribution};
use crate::client::CloudSyncClient;
use crate::error::Result;
use crate::file_info::FileRecord;
use crate::table;

const PAGE_TITLE: &str = "CloudSync Dashboard";

/// One listing and everything rendered from it.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub files: Vec<FileRecord>,
    pub types: TypeDistribution,
    pub sizes: SizeRanking,
}

impl Dashboard {
    pub fn from_files(files: Vec<FileRecord>) -> Dashboard {
        let types = TypeDistribution::from_files(&files);
        let sizes = SizeRanking::from_files(&files);
        Dashboard {
            files,
            types,
            sizes,
        }
    }

    /// Fetches the listing once and derives the table and both charts from it.
    pub async fn load(client: &CloudSyncClient) -> Result<Dashboard> {
        let files = client.list_files().await?;
        Ok(Dashboard::from_files(files))
    }

    pub fn render_table(&self) -> String {
        table::render_text(&self.files)
    }

    pub fn render_charts(&self) -> String {
        format!("{}\n{}", self.types.render_text(), self.sizes.render_text())
    }

    pub fn render_text(&self) -> String {
        format!("{}\n{}", self.render_table(), self.render_charts())
    }

    pub fn chart_configs(&self) -> serde_json::Value {
        serde_json::json!({
            "fileTypeChart": self.types.to_chart_config(),
            "fileSizeChart": self.sizes.to_chart_config(),
        })
    }

    /// Standalone HTML page: the files table plus both charts drawn by Chart.js.
    pub fn render_page(&self, download_base: &str) -> String {
        let rows = table::render_html_rows(&self.files, download_base);
        // `</` inside a script block would end it early.
        let configs = self.chart_configs().to_string().replace("</", "<\\/");
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css">
<script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
</head>
<body class="bg-light">
<div class="container py-4">
<h1 class="h4 mb-4">{title}</h1>
<div class="row mb-4">
<div class="col-md-6" style="height: 300px;"><canvas id="fileTypeChart"></canvas></div>
<div class="col-md-6" style="height: 300px;"><canvas id="fileSizeChart"></canvas></div>
</div>
<table id="filesTable" class="table table-hover bg-white">
<thead><tr><th class="ps-4">Name</th><th>Type</th><th>Size</th><th class="text-end pe-4">Action</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
</div>
<script>
const charts = {configs};
for (const [id, config] of Object.entries(charts)) {{
  new Chart(document.getElementById(id).getContext('2d'), config);
}}
</script>
</body>
</html>
"#,
            title = PAGE_TITLE,
            rows = rows,
            configs = configs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dashboard {
        Dashboard::from_files(vec![
            FileRecord {
                id: "1".to_string(),
                name: "movie.mp4".to_string(),
                mime_type: "video/mp4".to_string(),
                size: Some(50 * 1024 * 1024),
            },
            FileRecord {
                id: "2".to_string(),
                name: "</script>.txt".to_string(),
                mime_type: "text/plain".to_string(),
                size: Some(10),
            },
        ])
    }

    #[test]
    fn derives_everything_from_one_listing() {
        let dashboard = sample();
        assert_eq!(dashboard.types.labels, vec!["mp4", "plain"]);
        assert_eq!(dashboard.sizes.labels[0], "movie.mp4");

        let text = dashboard.render_text();
        assert!(text.starts_with("NAME"));
        assert!(text.contains("50 MB"));
        assert!(text.contains("File types"));
        assert!(text.contains("Largest files (MB)"));
    }

    #[test]
    fn page_embeds_table_and_chart_configs() {
        let page = sample().render_page("/download");

        assert!(page.contains("<table id=\"filesTable\""));
        assert!(page.contains("href=\"/download/1\""));
        assert!(page.contains("\"fileTypeChart\""));
        assert!(page.contains("\"fileSizeChart\""));
        assert_eq!(page.matches("</script>").count(), 2);
    }

    #[test]
    fn empty_page_has_placeholder() {
        let page = Dashboard::from_files(Vec::new()).render_page("/download");
        assert!(page.contains("No files found."));
    }
}
