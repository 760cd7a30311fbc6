use crate::error::{Error, Result};
use crate::output::write_json_pretty;
use crate::types::FireRecord;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_records: usize,
    pub with_coordinates: usize,
    pub converted: usize,
}

impl LoadReport {
    fn of(records: &[FireRecord]) -> Self {
        LoadReport {
            total_records: records.len(),
            with_coordinates: records.iter().filter(|r| r.grid_point().is_some()).count(),
            converted: records.iter().filter(|r| r.wgs84.is_some()).count(),
        }
    }
}

/// Read the record store. A missing file and an unparseable file are reported
/// as different errors, both carrying the attempted path.
pub fn load_records(path: &Path) -> Result<(Vec<FireRecord>, LoadReport)> {
    let shown = path.display().to_string();
    if !path.exists() {
        return Err(Error::DataMissing { path: shown });
    }
    let text = std::fs::read_to_string(path).map_err(|e| Error::DataUnreadable {
        path: shown.clone(),
        reason: e.to_string(),
    })?;
    let records: Vec<FireRecord> = serde_json::from_str(&text).map_err(|e| Error::DataUnreadable {
        path: shown.clone(),
        reason: e.to_string(),
    })?;

    let report = LoadReport::of(&records);
    debug!(
        "loaded {} records from {} ({} with grid coordinates, {} already converted)",
        report.total_records, shown, report.with_coordinates, report.converted
    );
    Ok((records, report))
}

/// Write the whole record collection back to the store.
pub fn save_records(path: &Path, records: &[FireRecord]) -> Result<()> {
    write_json_pretty(path, records).map_err(|e| Error::StoreWrite {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoPoint;
    use serde_json::json;

    #[test]
    fn missing_store_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        match load_records(&path) {
            Err(Error::DataMissing { path: p }) => assert!(p.ends_with("nope.json")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn garbage_store_is_unreadable_not_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_records(&path), Err(Error::DataUnreadable { .. })));
    }

    #[test]
    fn store_round_trips_partial_wgs84() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"[
              {"location":"강원도 고성군","fire_date":"202103010800","fire_size":"1.2ha","fire_cause":"입산자실화","coordinates":[300000.0,500000.0]},
              {"location":"경기도 가평군","fire_date":"2020","fire_size":"","fire_cause":"","coordinates":[],"wgs84":[127.5,37.8]}
            ]"#,
        )
        .unwrap();

        let (mut records, report) = load_records(&path).unwrap();
        assert_eq!(report.total_records, 2);
        assert_eq!(report.with_coordinates, 1);
        assert_eq!(report.converted, 1);

        records[0].wgs84 = Some(GeoPoint::new(128.7, 36.5));
        save_records(&path, &records).unwrap();

        let (again, _) = load_records(&path).unwrap();
        assert_eq!(again, records);
        assert_eq!(again[1].coordinates, Some(json!([])));
    }

    #[test]
    fn one_malformed_record_does_not_sink_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"[
              {"location":"강원도 고성군","fire_date":"202103010800","fire_cause":"입산자실화","coordinates":[300000,500000]},
              {"location":"강원도 인제군","fire_date":"202104011200","fire_cause":null,"coordinates":["x","y"]}
            ]"#,
        )
        .unwrap();

        let (records, report) = load_records(&path).unwrap();
        assert_eq!(report.total_records, 2);
        assert_eq!(report.with_coordinates, 1);
        assert!(records[0].grid_point().is_some());
        assert_eq!(records[1].grid_point(), None);
        assert_eq!(records[1].fire_cause, "");
    }

    #[test]
    fn save_keeps_integer_grid_values_and_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"[{"location":"강원도 고성군","fire_date":"202103010800","coordinates":[300000,500000],"coordinates_note":"TM"}]"#,
        )
        .unwrap();

        let (mut records, _) = load_records(&path).unwrap();
        records[0].wgs84 = Some(GeoPoint::new(128.7, 36.5));
        save_records(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("300000.0"), "{text}");
        assert!(!text.contains("fire_size"), "{text}");
        assert!(!text.contains("fire_cause"), "{text}");
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v[0]["coordinates"], json!([300000, 500000]));
        assert_eq!(v[0]["coordinates_note"], "TM");
        assert_eq!(v[0]["wgs84"], json!([128.7, 36.5]));
    }
}
