use std::iter;

use super::TableLayout;

/// `+-----+----+` with one segment per column.
pub(super) fn separator(layout: &TableLayout, columns: usize) -> String {
    let segments: Vec<String> = (0..columns).map(|i| "-".repeat(layout.width(i))).collect();
    format!("+{}+", segments.join("+"))
}

/// `|  cell |  cell |`: each cell right-justified to `width - 1`, then a space.
pub(super) fn format_row(layout: &TableLayout, cells: &[String]) -> String {
    let cells: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| format!("{:>w$} ", cell, w = layout.width(i).saturating_sub(1)))
        .collect();
    format!("|{}|", cells.join("|"))
}

pub(super) fn lines<'r, R>(
    layout: &'r TableLayout,
    header: Vec<String>,
    rows: R,
) -> impl Iterator<Item = String> + 'r
where
    R: Iterator<Item = Vec<String>> + 'r,
{
    let sep = separator(layout, header.len());
    iter::once(sep.clone())
        .chain(iter::once(format_row(layout, &header)))
        .chain(iter::once(sep.clone()))
        .chain(rows.map(move |cells| format_row(layout, &cells)))
        .chain(iter::once(sep))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn separator_has_one_segment_per_column() {
        let layout = TableLayout::new(vec![4, 3]);
        assert_eq!(separator(&layout, 2), "+----+---+");
        assert_eq!(separator(&layout, 3), "+----+---+---+");
    }

    #[test]
    fn cells_are_right_justified() {
        let layout = TableLayout::new(vec![6, 4]);
        assert_eq!(format_row(&layout, &s(&["ab", "1"])), "|   ab |  1 |");
    }

    #[test]
    fn long_cells_overflow_instead_of_truncating() {
        let layout = TableLayout::new(vec![3]);
        assert_eq!(format_row(&layout, &s(&["abcdef"])), "|abcdef |");
    }

    #[test]
    fn table_structure() {
        let layout = TableLayout::new(vec![9, 6]);
        let rows = vec![s(&["advisor", "120"]), s(&["insights", "45"])];
        let out: Vec<String> = lines(&layout, s(&["Service", "Count"]), rows.into_iter()).collect();

        assert_eq!(
            out,
            vec![
                "+---------+------+",
                "| Service |Count |",
                "+---------+------+",
                "| advisor |  120 |",
                "|insights |   45 |",
                "+---------+------+",
            ]
        );
    }

    #[test]
    fn every_line_has_the_same_width() {
        let layout = TableLayout::default();
        let rows = vec![s(&["advisor", "120"]), s(&["notifications", "7"])];
        let out: Vec<String> =
            lines(&layout, s(&["Service", "Request count"]), rows.into_iter()).collect();
        let width = out[0].chars().count();
        assert_eq!(width, 32 + 30 + 3);
        assert!(out.iter().all(|l| l.chars().count() == width));
    }
}
