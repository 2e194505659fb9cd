// src/render/page.rs

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

use super::html::{html_escape, render_failure, render_table};
use crate::{
    config::Source,
    pipeline::RegionOutcome,
    powerflow::render_heatmaps,
    tabs::{TabCoordinator, TabError},
};

/// Column span used for failure rows when the header is unknown.
const FAILURE_COLSPAN: usize = 10;

/// Assemble the whole dashboard: one tab + one region per source.
pub fn render_page(
    title: &str,
    sources: &[Source],
    outcomes: &[RegionOutcome],
    generated_at: DateTime<Utc>,
) -> Result<String, TabError> {
    let tabs = TabCoordinator::new(sources.iter().map(|s| s.id.clone()), None)?;

    let mut nav = String::new();
    let mut regions = String::new();
    for (source, outcome) in sources.iter().zip(outcomes) {
        let active = tabs.is_active(&source.id);
        let id = html_escape(&source.id);
        let _ = write!(
            nav,
            r#"<button class="tab{}" data-tab="{id}">{}</button>"#,
            if active { " active" } else { "" },
            html_escape(&source.title)
        );
        let _ = write!(
            regions,
            r#"<section class="region" id="tab-{id}"{}>{}</section>"#,
            if active { "" } else { " hidden" },
            render_region(source, outcome)
        );
    }

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>{css}</style>
</head>
<body>
<h1>{title}</h1>
<nav class="tabs">{nav}</nav>
{regions}
<footer>Generated {generated}</footer>
<script>{js}</script>
</body>
</html>
"#,
        title = html_escape(title),
        css = CSS,
        nav = nav,
        regions = regions,
        generated = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        js = JS,
    ))
}

fn render_region(source: &Source, outcome: &RegionOutcome) -> String {
    let table_id = format!("{}Table", source.id);
    match outcome {
        RegionOutcome::Table { target, flows } => {
            let mut out = render_table(&table_id, target);
            match flows {
                Some(Ok(series)) => {
                    out.push_str(&render_heatmaps(&format!("{}Heatmap", source.id), series))
                }
                Some(Err(_)) => out.push_str(
                    r#"<p class="heatmap-empty">Power flow columns missing or invalid.</p>"#,
                ),
                None => {}
            }
            out
        }
        failed => render_failure(
            &table_id,
            FAILURE_COLSPAN,
            failed.failure_message().unwrap_or_default(),
        ),
    }
}

const CSS: &str = "body{font-family:sans-serif;margin:2em}\
.tabs button{padding:.5em 1em;border:1px solid #ccc;background:#eee;cursor:pointer}\
.tabs button.active{background:#fff;border-bottom-color:#fff}\
table{border-collapse:collapse;margin-top:1em}\
th,td{border:1px solid #ddd;padding:.3em .6em;text-align:right}\
.data-table th[data-column]{cursor:pointer}\
th[aria-sort=ascending]::after{content:\" \\25B2\"}\
th[aria-sort=descending]::after{content:\" \\25BC\"}\
tr.error td{color:#b00;text-align:center}\
tr.empty td{color:#777;text-align:center}\
.pager button.current{font-weight:bold}\
.heatmap td{width:4em;text-align:center}";

const JS: &str = r#"
function showPage(table, page) {
  table.querySelectorAll('tbody tr[data-page]').forEach(function (tr) {
    tr.hidden = tr.dataset.page !== String(page);
  });
  var nav = document.querySelector('.pager[data-table="' + table.id + '"]');
  if (nav) {
    nav.querySelectorAll('button').forEach(function (b) {
      b.classList.toggle('current', b.dataset.page === String(page));
    });
  }
}
var NUMBER = /^-?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$/;
function sortKey(td) {
  var t = td ? td.textContent : '';
  if (t === '') return [0, ''];
  if (t === 'true' || t === 'false') return [1, t === 'true' ? 1 : 0];
  if (NUMBER.test(t)) return [2, Number(t)];
  return [3, t];
}
function sortTable(table, col, dir) {
  var body = table.tBodies[0];
  var rows = Array.prototype.slice.call(body.querySelectorAll('tr[data-page]'));
  rows.sort(function (a, b) {
    var x = sortKey(a.cells[col]), y = sortKey(b.cells[col]);
    var ord = x[0] !== y[0] ? x[0] - y[0] : (x[1] < y[1] ? -1 : x[1] > y[1] ? 1 : 0);
    return dir === 'desc' ? -ord : ord;
  });
  var size = Number(table.dataset.pageSize) || 10;
  rows.forEach(function (tr, i) {
    tr.dataset.page = String(Math.floor(i / size));
    body.appendChild(tr);
  });
  table.dataset.sortColumn = String(col);
  table.dataset.sortDirection = dir;
  table.querySelectorAll('th[data-column]').forEach(function (th, i) {
    if (i === col) th.setAttribute('aria-sort', dir === 'desc' ? 'descending' : 'ascending');
    else th.removeAttribute('aria-sort');
  });
  showPage(table, 0);
}
document.querySelectorAll('table.data-table').forEach(function (table) {
  table.querySelectorAll('th[data-column]').forEach(function (th, i) {
    th.addEventListener('click', function () {
      var again = Number(table.dataset.sortColumn) === i && table.dataset.sortDirection === 'asc';
      sortTable(table, i, again ? 'desc' : 'asc');
    });
  });
});
document.querySelectorAll('.hour-select').forEach(function (sel) {
  var box = sel.closest('.heatmaps');
  sel.addEventListener('change', function () {
    box.querySelectorAll('.heatmap-hour').forEach(function (grid) {
      grid.hidden = grid.dataset.hour !== sel.value;
    });
  });
});
document.querySelectorAll('.tabs button').forEach(function (btn) {
  btn.addEventListener('click', function () {
    document.querySelectorAll('.tabs button').forEach(function (b) { b.classList.remove('active'); });
    document.querySelectorAll('.region').forEach(function (r) { r.hidden = true; });
    btn.classList.add('active');
    document.getElementById('tab-' + btn.dataset.tab).hidden = false;
  });
});
document.querySelectorAll('.pager').forEach(function (nav) {
  var table = document.getElementById(nav.dataset.table);
  nav.querySelectorAll('button').forEach(function (btn) {
    btn.addEventListener('click', function () { showPage(table, btn.dataset.page); });
  });
});
"#;
