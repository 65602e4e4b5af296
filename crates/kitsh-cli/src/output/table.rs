//! Column-aligned plain-text tables.

use unicode_width::UnicodeWidthStr;

const COLUMN_GAP: &str = "  ";

/// Rows of cells rendered under a header line.
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub(crate) fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|header| (*header).to_owned()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Missing cells render empty; extra cells are dropped.
    pub(crate) fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Renders the header and rows, one line each, padded by display width.
    pub(crate) fn render(&self) -> String {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(column, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(column))
                    .map(|cell| cell.width())
                    .fold(header.width(), usize::max)
            })
            .collect();

        let mut output = String::new();
        render_line(&mut output, &widths, &self.headers);
        for row in &self.rows {
            render_line(&mut output, &widths, row);
        }
        output
    }
}

fn render_line(output: &mut String, widths: &[usize], cells: &[String]) {
    let mut line = String::new();
    for (column, width) in widths.iter().enumerate() {
        if column > 0 {
            line.push_str(COLUMN_GAP);
        }
        let cell = cells.get(column).map_or("", String::as_str);
        line.push_str(cell);
        let padding = width.saturating_sub(cell.width());
        line.extend(std::iter::repeat_n(' ', padding));
    }
    output.push_str(line.trim_end());
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_align_to_widest_cell() {
        let mut table = Table::new(&["ID", "Size"]);
        table.push_row(vec![String::from("abc"), String::from("1")]);
        table.push_row(vec![String::from("a"), String::from("1024")]);
        assert_eq!(table.render(), "ID   Size\nabc  1\na    1024\n");
    }

    #[test]
    fn wide_characters_use_display_width() {
        let mut table = Table::new(&["Key", "Value"]);
        table.push_row(vec![String::from("名前"), String::from("x")]);
        table.push_row(vec![String::from("k"), String::from("y")]);
        assert_eq!(table.render(), "Key   Value\n名前  x\nk     y\n");
    }

    #[test]
    fn short_rows_leave_cells_empty() {
        let mut table = Table::new(&["A", "B"]);
        table.push_row(vec![String::from("1")]);
        assert_eq!(table.render(), "A  B\n1\n");
    }

    #[test]
    fn header_only_when_no_rows() {
        assert_eq!(Table::new(&["Image ID"]).render(), "Image ID\n");
    }
}
