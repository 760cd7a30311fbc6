use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Indented JSON, used for the record store and the stats summary.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Single-line JSON, used for the coordinate cache.
pub fn write_json_compact<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of the first `max_rows` rows.
pub fn render_table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CountRow;

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("years.csv");
        let rows = vec![
            CountRow { key: "2020".into(), count: 3 },
            CountRow { key: "2021".into(), count: 5 },
        ];
        write_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Key,Count\n2020,3\n2021,5\n");
    }

    #[test]
    fn table_preview_truncates() {
        let rows = vec![
            CountRow { key: "a".into(), count: 1 },
            CountRow { key: "b".into(), count: 2 },
        ];
        let table = render_table_rows(&rows, 1);
        assert!(table.contains("| a "));
        assert!(!table.contains("| b "));
        assert_eq!(render_table_rows::<CountRow>(&[], 3), "(no rows)");
    }
}
