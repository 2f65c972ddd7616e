//! Fixed-width text rendering of report tables.
//!
//! A report table is a grid whose first row holds column headers and whose
//! first column holds row labels. The top-left cell is dropped and replaced
//! by an empty label so that headers line up above the value columns.

/// Column separator in rendered output.
const COLUMN_GAP: &str = "  ";

/// Headers and rows of a table, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    /// Header row, starting with an empty label column.
    pub headers: Vec<String>,
    /// Data rows, each starting with its row label.
    pub rows: Vec<Vec<String>>,
}

impl TableLayout {
    /// Split a raw grid into headers and rows.
    pub fn from_grid(grid: &[Vec<String>]) -> Self {
        let Some((header_row, data_rows)) = grid.split_first() else {
            return Self {
                headers: Vec::new(),
                rows: Vec::new(),
            };
        };

        let mut headers = vec![String::new()];
        headers.extend(header_row.iter().skip(1).cloned());

        Self {
            headers,
            rows: data_rows.to_vec(),
        }
    }

    /// Number of columns, accounting for ragged rows.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![1; self.column_count()];
        for row in std::iter::once(&self.headers).chain(self.rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        widths
    }

    /// Render as an aligned text block: header line, dashed rule, one line per row.
    pub fn render(&self) -> String {
        if self.headers.is_empty() && self.rows.is_empty() {
            return String::new();
        }

        let widths = self.column_widths();
        let mut lines = Vec::with_capacity(self.rows.len() + 2);

        lines.push(render_line(&self.headers, &widths));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join(COLUMN_GAP),
        );
        for row in &self.rows {
            lines.push(render_line(row, &widths));
        }

        lines.join("\n")
    }
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    let line = widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            format!("{:<width$}", cell, width = *width)
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    line.trim_end().to_string()
}

/// Render a raw table grid as an aligned text block.
pub fn render_table(grid: &[Vec<String>]) -> String {
    TableLayout::from_grid(grid).render()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_layout_replaces_corner_cell() {
        let layout = TableLayout::from_grid(&grid(&[
            &["R", "H1", "H2"],
            &["r1", "1", "2"],
            &["r2", "3", "4"],
        ]));

        assert_eq!(layout.headers, vec!["", "H1", "H2"]);
        assert_eq!(layout.rows, grid(&[&["r1", "1", "2"], &["r2", "3", "4"]]));
    }

    #[test]
    fn test_render_aligns_columns() {
        let rendered = render_table(&grid(&[
            &["", "2020", "2019"],
            &["Revenue", "100", "95"],
            &["Net income", "12", "9"],
        ]));

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "            2020  2019");
        assert_eq!(lines[1], "----------  ----  ----");
        assert_eq!(lines[2], "Revenue     100   95");
        assert_eq!(lines[3], "Net income  12    9");
    }

    #[test]
    fn test_render_pads_ragged_rows() {
        let rendered = render_table(&grid(&[&["", "a", "b"], &["x"], &["y", "1", "2", "3"]]));
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "   a  b");
        assert_eq!(lines[2], "x");
        assert_eq!(lines[3], "y  1  2  3");
    }

    #[test]
    fn test_header_only_table() {
        let rendered = render_table(&grid(&[&["", "2020"]]));
        assert_eq!(rendered, "   2020\n-  ----");
    }

    #[test]
    fn test_empty_table_renders_empty() {
        assert_eq!(render_table(&[]), "");
    }
}
