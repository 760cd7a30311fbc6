use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tabled::Tabled;

/// Planar (x, y) position in the national TM surveying grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

/// Geographic WGS84 position. Serialized as a `[lng, lat]` pair, which is the
/// shape used by both the record store and the coordinate cache.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(p: [f64; 2]) -> Self {
        GeoPoint::new(p[0], p[1])
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> Self {
        [p.lng, p.lat]
    }
}

/// One wildfire incident as stored in the record file.
///
/// Reading is lenient so one odd record never makes the whole store
/// unreadable: text fields accept `null` or numbers, and `coordinates` is kept
/// as the raw JSON value so malformed entries survive a write-back untouched.
/// Use [`FireRecord::grid_point`] to get a usable position. Empty text fields
/// are left out on write, and keys this struct does not know about are carried
/// in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FireRecord {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "String::is_empty")]
    pub fire_date: String,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "String::is_empty")]
    pub fire_size: String,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "String::is_empty")]
    pub fire_cause: String,
    #[serde(default, deserialize_with = "raw_value", skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Value>,
    #[serde(default, deserialize_with = "lenient_point", skip_serializing_if = "Option::is_none")]
    pub wgs84: Option<GeoPoint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Strings as-is, `null` as empty, anything else as its JSON text.
fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Present keys keep their value, `null` included.
fn raw_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(d).map(Some)
}

/// A `wgs84` that is not a `[lng, lat]` pair counts as not converted yet.
fn lenient_point<'de, D: Deserializer<'de>>(d: D) -> Result<Option<GeoPoint>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(serde_json::from_value(v).ok().flatten())
}

impl FireRecord {
    /// Composite identity used as the coordinate cache key.
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.location, self.fire_date)
    }

    /// The grid position, if `coordinates` is an array of exactly two numbers.
    pub fn grid_point(&self) -> Option<GridPoint> {
        match self.coordinates.as_ref()?.as_array()?.as_slice() {
            [x, y] => Some(GridPoint { x: x.as_f64()?, y: y.as_f64()? }),
            _ => None,
        }
    }
}

/// A single `key -> count` line of a stats table, used for CSV export and
/// console previews.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CountRow {
    #[serde(rename = "Key")]
    #[tabled(rename = "Key")]
    pub key: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsOverview {
    pub total_fires: usize,
    pub distinct_years: usize,
    pub distinct_regions: usize,
    pub distinct_causes: usize,
    pub converted_records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_keeps_unknown_fields_and_missing_wgs84() {
        let src = r#"{"location":"강원도 고성군","fire_date":"202103010800","coordinates":[300000.5,500000.25],"source_id":17}"#;
        let rec: FireRecord = serde_json::from_str(src).unwrap();
        assert_eq!(rec.fire_size, "");
        assert!(rec.wgs84.is_none());
        assert_eq!(rec.extra.get("source_id"), Some(&Value::from(17)));

        let back: Value = serde_json::to_value(&rec).unwrap();
        assert_eq!(back["source_id"], Value::from(17));
        assert!(back.get("wgs84").is_none());
        assert_eq!(back["coordinates"][1], Value::from(500000.25));
    }

    #[test]
    fn wgs84_is_a_pair_on_the_wire() {
        let rec = FireRecord {
            location: "경기도".into(),
            wgs84: Some(GeoPoint::new(127.1, 37.2)),
            ..Default::default()
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["wgs84"], json!([127.1, 37.2]));
    }

    #[test]
    fn grid_point_requires_exactly_two_numbers() {
        let mut rec = FireRecord::default();
        assert_eq!(rec.grid_point(), None);
        for bad in [json!(null), json!([]), json!([1.0, 2.0, 3.0]), json!(["x", "y"]), json!("1,2")] {
            rec.coordinates = Some(bad);
            assert_eq!(rec.grid_point(), None);
        }
        rec.coordinates = Some(json!([1, 2.5]));
        assert_eq!(rec.grid_point(), Some(GridPoint { x: 1.0, y: 2.5 }));
    }

    #[test]
    fn odd_field_values_do_not_fail_the_record() {
        let src = r#"{"location":"강원도 인제군","fire_date":202104011200,"fire_cause":null,"coordinates":["x","y"],"wgs84":"n/a"}"#;
        let rec: FireRecord = serde_json::from_str(src).unwrap();
        assert_eq!(rec.fire_date, "202104011200");
        assert_eq!(rec.fire_cause, "");
        assert_eq!(rec.coordinates, Some(json!(["x", "y"])));
        assert_eq!(rec.grid_point(), None);
        assert_eq!(rec.wgs84, None);
    }

    #[test]
    fn write_back_keeps_the_ingested_shape() {
        let src = r#"{"location":"강원도 고성군","coordinates":[300000,500000]}"#;
        let rec: FireRecord = serde_json::from_str(src).unwrap();
        assert_eq!(serde_json::to_string(&rec).unwrap(), src);
    }

    #[test]
    fn cache_key_joins_location_and_date() {
        let rec = FireRecord {
            location: "강원도 고성군".into(),
            fire_date: "202103010800".into(),
            ..Default::default()
        };
        assert_eq!(rec.cache_key(), "강원도 고성군_202103010800");
    }
}
