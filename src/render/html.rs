// src/render/html.rs

use std::fmt::Write;

use super::target::{RenderTarget, SortDirection};

pub const EMPTY_TABLE_MESSAGE: &str = "No data available in table";

/// Escape text for HTML element content and attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render one paginated table. All pages are emitted; rows outside the
/// first page carry `hidden` and are toggled by the page script.
pub fn render_table(region_id: &str, target: &RenderTarget) -> String {
    let id = html_escape(region_id);
    let mut out = String::new();

    let _ = write!(
        out,
        r#"<table id="{id}" class="data-table" data-page-size="{size}" data-sort-column="{col}" data-sort-direction="{dir}">"#,
        size = target.page_size,
        col = target.sort_column_index,
        dir = target.sort_direction.as_str(),
    );

    // the page script re-sorts on header clicks, starting from this state
    out.push_str("<thead><tr>");
    for (i, col) in target.columns.iter().enumerate() {
        let aria = if i == target.sort_column_index {
            match target.sort_direction {
                SortDirection::Asc => r#" aria-sort="ascending""#,
                SortDirection::Desc => r#" aria-sort="descending""#,
            }
        } else {
            ""
        };
        let _ = write!(
            out,
            r#"<th data-column="{}"{aria}>{}</th>"#,
            html_escape(&col.name),
            html_escape(&col.title)
        );
    }
    out.push_str("</tr></thead><tbody>");

    if target.rows.is_empty() {
        out.push_str(&message_row(target.columns.len(), EMPTY_TABLE_MESSAGE, "empty"));
    } else {
        let size = target.page_size.max(1);
        for (i, row) in target.sorted_rows().into_iter().enumerate() {
            let page = i / size;
            let hidden = if page > 0 { " hidden" } else { "" };
            let _ = write!(out, r#"<tr data-page="{page}"{hidden}>"#);
            for col in &target.columns {
                let cell = row.get(&col.name).map(|v| v.to_string()).unwrap_or_default();
                let _ = write!(out, "<td>{}</td>", html_escape(&cell));
            }
            out.push_str("</tr>");
        }
    }
    out.push_str("</tbody></table>");

    let pages = target.page_count();
    if pages > 1 {
        let _ = write!(out, r#"<nav class="pager" data-table="{id}">"#);
        for p in 0..pages {
            let current = if p == 0 { r#" class="current""# } else { "" };
            let _ = write!(out, r#"<button data-page="{p}"{current}>{}</button>"#, p + 1);
        }
        out.push_str("</nav>");
    }

    out
}

/// A table region showing only a diagnostic message across its full width.
pub fn render_failure(region_id: &str, colspan: usize, message: &str) -> String {
    format!(
        r#"<table id="{}" class="data-table failed"><tbody>{}</tbody></table>"#,
        html_escape(region_id),
        message_row(colspan, message, "error")
    )
}

fn message_row(colspan: usize, message: &str, class: &str) -> String {
    format!(
        r#"<tr class="{class}"><td colspan="{}">{}</td></tr>"#,
        colspan.max(1),
        html_escape(message)
    )
}
