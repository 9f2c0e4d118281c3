//! CSV helpers for spreadsheet-style exports.

use std::fmt::Write;

/// Quote one cell, doubling embedded quotes.
pub fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// Append one quoted, comma-separated row terminated by `\n`.
pub fn write_row<I, S>(output: &mut String, cells: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let row: Vec<String> = cells.into_iter().map(|c| quote(c.as_ref())).collect();
    writeln!(output, "{}", row.join(",")).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("5\" chain"), "\"5\"\" chain\"");
    }

    #[test]
    fn test_write_row() {
        let mut out = String::new();
        write_row(&mut out, ["a", "b,c"]);
        assert_eq!(out, "\"a\",\"b,c\"\n");
    }
}
