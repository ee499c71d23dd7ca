use std::iter;

pub(super) fn lines<'r, R>(header: Vec<String>, rows: R) -> impl Iterator<Item = String> + 'r
where
    R: Iterator<Item = Vec<String>> + 'r,
{
    iter::once("<table>".to_string())
        .chain(row(header))
        .chain(rows.flat_map(row))
        .chain(iter::once("</table>".to_string()))
}

fn row(cells: Vec<String>) -> impl Iterator<Item = String> {
    iter::once("<tr>".to_string())
        .chain(cells.into_iter().map(|c| format!("<td>{}</td>", escape(&c))))
        .chain(iter::once("</tr>".to_string()))
}

/// Service identifiers and metric names come from outside; keep them inert.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
