//! Terminal rendering of comparison results

use crate::reconcile::{Comparison, DiffRow};

const HEADER: [&str; 4] = ["Parameter", "System", "Netbox", "Match"];

fn cells(row: &DiffRow) -> [&str; 4] {
    [
        row.parameter.as_str(),
        row.local.as_str(),
        row.remote.as_str(),
        if row.matches { "True" } else { "False" },
    ]
}

/// ASCII table with one line per compared parameter
pub fn render_table(comparison: &Comparison) -> String {
    let mut widths = HEADER.map(str::len);
    for row in &comparison.rows {
        for (width, cell) in widths.iter_mut().zip(cells(row)) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = {
        let mut line = String::from("+");
        for width in widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let format_line = |values: [&str; 4]| {
        let mut line = String::from("|");
        for (value, width) in values.iter().zip(widths) {
            line.push_str(&format!(" {value:<width$} |"));
        }
        line
    };

    let mut lines = vec![separator.clone(), format_line(HEADER), separator.clone()];
    lines.extend(comparison.rows.iter().map(|row| format_line(cells(row))));
    lines.push(separator);

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table() {
        let comparison = Comparison {
            hostname: "web01".to_string(),
            rows: vec![
                DiffRow::new("vCPUs", "4", "4", true),
                DiffRow::new("Memory", "20480", "10240", false),
            ],
        };

        let expected = "\
+-----------+--------+--------+-------+
| Parameter | System | Netbox | Match |
+-----------+--------+--------+-------+
| vCPUs     | 4      | 4      | True  |
| Memory    | 20480  | 10240  | False |
+-----------+--------+--------+-------+";

        assert_eq!(render_table(&comparison), expected);
    }

    #[test]
    fn test_wide_cells_stretch_columns() {
        let comparison = Comparison {
            hostname: "web01".to_string(),
            rows: vec![DiffRow::new("DNS (eth0)", "web01.example.com", "", false)],
        };

        let table = render_table(&comparison);
        let widths: Vec<_> = table.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
        assert!(table.contains("| DNS (eth0) | web01.example.com |        | False |"));
    }
}
