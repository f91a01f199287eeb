use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    write_table(&mut stdout.lock(), headers, &rows)?;
    Ok(())
}

/// Left-aligned columns two spaces apart, a dashed rule under the header and
/// no trailing blanks. Cells past the last header are dropped.
fn write_table<W: Write>(
    out: &mut W,
    headers: &[&str],
    rows: &[Vec<String>],
) -> std::io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    writeln!(out, "{}", table_line(headers.iter().copied(), &widths))?;
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    writeln!(out, "{}", rule.join("  "))?;
    for row in rows {
        writeln!(out, "{}", table_line(row.iter().map(String::as_str), &widths))?;
    }
    Ok(())
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:w$}"))
        .collect();
    padded.join("  ").trim_end().to_string()
}

/// Path shown to the user: relative to `base` when it lives under it.
pub fn display_path(base: &Path, path: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut buf = Vec::new();
        write_table(&mut buf, headers, rows).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn columns_align_to_widest_cell() {
        let out = render(
            &["FILE", "ACTION", "TAG"],
            &[
                row(&["ci.yml:5", "actions/checkout", "v4"]),
                row(&["release.yaml:12", "org/tool", "v2.1"]),
            ],
        );
        assert_eq!(
            out,
            "\
FILE             ACTION            TAG
---------------  ----------------  ----
ci.yml:5         actions/checkout  v4
release.yaml:12  org/tool          v2.1
"
        );
    }

    #[test]
    fn lines_carry_no_trailing_blanks() {
        let out = render(&["FILE", "TAG"], &[row(&["a", "v1"]), row(&["b", ""])]);
        for line in out.lines() {
            assert_eq!(line, line.trim_end(), "{line:?}");
        }
    }

    #[test]
    fn extra_cells_are_dropped() {
        let out = render(&["A"], &[row(&["x", "surplus"])]);
        assert_eq!(out, "A\n-\nx\n");
    }

    #[test]
    fn display_path_is_relative_under_base() {
        let base = Path::new("/work/.github/workflows");
        assert_eq!(display_path(base, &base.join("ci.yml")), "ci.yml");
        assert_eq!(display_path(base, Path::new("/tmp/x.yml")), "/tmp/x.yml");
    }
}
