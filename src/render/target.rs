// src/render/target.rs

use serde::{Deserialize, Serialize};

use crate::parse::{Column, Row, Table};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Everything a table widget needs to draw one paginated, sortable table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTarget {
    pub rows: Vec<Row>,
    pub columns: Vec<Column>,
    pub page_size: usize,
    pub sort_column_index: usize,
    pub sort_direction: SortDirection,
}

impl RenderTarget {
    /// Wrap a parsed table with the default paging (10 rows, first column ascending).
    pub fn new(table: Table) -> Self {
        Self {
            rows: table.rows,
            columns: table.columns,
            page_size: DEFAULT_PAGE_SIZE,
            sort_column_index: 0,
            sort_direction: SortDirection::Asc,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_sort(mut self, column_index: usize, direction: SortDirection) -> Self {
        self.sort_column_index = column_index;
        self.sort_direction = direction;
        self
    }

    /// Rows in display order. Stable; an out-of-range sort column keeps file order.
    pub fn sorted_rows(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self.rows.iter().collect();
        let Some(col) = self.columns.get(self.sort_column_index) else {
            return rows;
        };
        rows.sort_by(|a, b| {
            let ord = match (a.get(&col.name), b.get(&col.name)) {
                (Some(x), Some(y)) => x.sort_cmp(y),
                _ => std::cmp::Ordering::Equal,
            };
            match self.sort_direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        rows
    }

    /// Number of pages; an empty table still has one (empty) page.
    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size.max(1)).max(1)
    }

    /// 0-based page of sorted rows. Past the end → empty.
    pub fn page(&self, index: usize) -> Vec<&Row> {
        let size = self.page_size.max(1);
        self.sorted_rows()
            .into_iter()
            .skip(index.saturating_mul(size))
            .take(size)
            .collect()
    }
}
