use std::fmt::Write;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::file_info::FileRecord;
use crate::format::{format_bytes, truncate_label};

pub const EMPTY_PLACEHOLDER: &str = "No files found.";
const NAME_WIDTH: usize = 40;

/// Characters escaped in a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn size_cell(file: &FileRecord) -> String {
    match file.size {
        Some(bytes) => format_bytes(bytes, 2),
        None => "-".to_string(),
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<tbody>` content for the files table. Download links point at `{download_base}/{id}`.
pub fn render_html_rows(files: &[FileRecord], download_base: &str) -> String {
    if files.is_empty() {
        return format!(
            "<tr><td colspan=\"4\" class=\"text-center py-4\">{}</td></tr>\n",
            EMPTY_PLACEHOLDER
        );
    }

    let mut html = String::new();
    for file in files {
        let _ = write!(
            html,
            concat!(
                "<tr>",
                "<td class=\"ps-4 fw-medium text-truncate\" style=\"max-width: 250px;\">",
                "<img src=\"{icon}\" width=\"20\" class=\"me-2\" alt=\"icon\">{name}</td>",
                "<td class=\"text-muted small\">{mime}</td>",
                "<td class=\"text-muted small\">{size}</td>",
                "<td class=\"text-end pe-4\">",
                "<a href=\"{base}/{id}\" class=\"btn btn-sm btn-outline-secondary\">Download</a>",
                "</td></tr>\n"
            ),
            icon = file.kind().icon_url(),
            name = escape_html(&file.name),
            mime = escape_html(&file.mime_type),
            size = size_cell(file),
            base = escape_html(download_base),
            id = escape_html(&utf8_percent_encode(&file.id, PATH_SEGMENT).to_string()),
        );
    }
    html
}

/// Plain text table for the terminal: name, type, size and the id to download with.
pub fn render_text(files: &[FileRecord]) -> String {
    if files.is_empty() {
        return format!("{}\n", EMPTY_PLACEHOLDER);
    }

    let rows: Vec<[String; 4]> = files
        .iter()
        .map(|f| {
            let tag = f.kind().tag();
            let name = if tag.is_empty() {
                f.name.clone()
            } else {
                format!("[{}] {}", tag, f.name)
            };
            [
                truncate_label(&name, NAME_WIDTH),
                f.mime_type.clone(),
                size_cell(f),
                f.id.clone(),
            ]
        })
        .collect();

    let header = ["NAME", "TYPE", "SIZE", "ID"];
    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &header.map(str::to_string), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, &w)| {
            let pad = w - cell.chars().count();
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, mime: &str, size: Option<u64>) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime.to_string(),
            size,
        }
    }

    #[test]
    fn empty_list_renders_placeholder_row() {
        let html = render_html_rows(&[], "/api/sync/download");
        assert_eq!(html.matches("<tr>").count(), 1);
        assert!(html.contains("colspan=\"4\""));
        assert!(html.contains("No files found."));
        assert_eq!(render_text(&[]), "No files found.\n");
    }

    #[test]
    fn renders_one_row_per_record() {
        let files = vec![
            record("f1", "scan.pdf", "application/pdf", Some(1024)),
            record("f2", "Shared", "application/vnd.google-apps.folder", None),
        ];
        let html = render_html_rows(&files, "/api/sync/download");

        assert_eq!(html.matches("<tr>").count(), 2);
        assert!(html.contains("<td class=\"text-muted small\">1 KB</td>"));
        assert!(html.contains("<td class=\"text-muted small\">-</td>"));
        assert!(html.contains("href=\"/api/sync/download/f1\""));
        assert!(html.contains("https://img.icons8.com/color/48/pdf.png"));
        assert!(html.contains("folder-invoices--v1.png"));
    }

    #[test]
    fn zero_size_is_still_formatted() {
        let files = vec![record("z", "empty.txt", "text/plain", Some(0))];
        assert!(render_html_rows(&files, "").contains(">0 Bytes<"));
    }

    #[test]
    fn ids_are_url_encoded_in_links() {
        let files = vec![record("a b/c?d", "x", "text/plain", None)];
        let html = render_html_rows(&files, "/download");
        assert!(html.contains("href=\"/download/a%20b%2Fc%3Fd\""), "{}", html);
    }

    #[test]
    fn names_are_escaped() {
        let files = vec![record("x", "<script>alert(1)</script>", "text/html", Some(1))];
        let html = render_html_rows(&files, "/d");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn text_table_aligns_columns() {
        let files = vec![
            record("id-1", "photo.png", "image/png", Some(1536)),
            record("id-22", "notes", "text/plain", None),
        ];
        let text = render_text(&files);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].starts_with("[img] photo.png"));
        assert!(lines[1].contains("1.5 KB"));
        assert!(lines[2].ends_with("id-22"));
        let type_col = lines[0].find("TYPE").unwrap();
        assert_eq!(lines[1].find("image/png"), Some(type_col));
        assert_eq!(lines[2].find("text/plain"), Some(type_col));
    }
}
