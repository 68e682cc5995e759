//! Minimal CSV writer for exports opened in spreadsheet tools.

/// Cells starting with these characters are evaluated as formulas by
/// spreadsheet applications.
fn needs_formula_guard(value: &str) -> bool {
    matches!(value.chars().next(), Some('=' | '+' | '-' | '@' | '\t' | '\r'))
}

fn escape_cell(value: &str) -> String {
    let mut cell = String::with_capacity(value.len() + 3);
    cell.push('"');
    if needs_formula_guard(value) {
        cell.push('\'');
    }
    for ch in value.chars() {
        if ch == '"' {
            cell.push('"');
        }
        cell.push(ch);
    }
    cell.push('"');
    cell
}

/// Appends one quoted, comma-separated row terminated by `\n`.
pub fn append_csv_row(buffer: &mut String, fields: &[String]) {
    let row: Vec<String> = fields.iter().map(|f| escape_cell(f)).collect();
    buffer.push_str(&row.join(","));
    buffer.push('\n');
}
