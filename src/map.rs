//! Kakao map page for a set of fire records.

use crate::geo::{Resolution, StrategyChain};
use crate::types::{FireRecord, GeoPoint};
use crate::util::{format_fire_date, or_placeholder};
use serde::Serialize;

/// Map center when there is nothing to show.
const KOREA_CENTER: GeoPoint = GeoPoint::new(127.5, 36.5);

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Marker {
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    pub date: String,
    pub size: String,
    pub cause: String,
}

impl Marker {
    pub fn at(r: &FireRecord, p: GeoPoint) -> Self {
        Marker {
            lat: p.lat,
            lng: p.lng,
            title: or_placeholder(&r.location, "위치 정보 없음").to_string(),
            date: or_placeholder(&format_fire_date(&r.fire_date), "날짜 정보 없음").to_string(),
            size: or_placeholder(&r.fire_size, "크기 정보 없음").to_string(),
            cause: or_placeholder(&r.fire_cause, "원인 정보 없음").to_string(),
        }
    }
}

/// Markers for records with a known position: the stored `wgs84` when set,
/// otherwise the local approximation of their grid coordinates. Records with
/// neither are left off the map.
pub fn markers(records: &[&FireRecord], chain: &StrategyChain) -> Vec<Marker> {
    records
        .iter()
        .filter_map(|r| {
            let p = r.wgs84.or_else(|| r.grid_point().map(|g| chain.resolve_local(g).point()))?;
            Some(Marker::at(r, p))
        })
        .collect()
}

/// The record's stored position, else a local fit of its grid coordinates
/// that lands inside the box. Never the fixed default.
pub fn approximate(r: &FireRecord, chain: &StrategyChain) -> Option<GeoPoint> {
    if r.wgs84.is_some() {
        return r.wgs84;
    }
    match chain.resolve_local(r.grid_point()?) {
        Resolution::Accepted { point, .. } => Some(point),
        Resolution::Fallback(_) => None,
    }
}

pub fn center_of(markers: &[Marker]) -> GeoPoint {
    if markers.is_empty() {
        return KOREA_CENTER;
    }
    let n = markers.len() as f64;
    GeoPoint::new(
        markers.iter().map(|m| m.lng).sum::<f64>() / n,
        markers.iter().map(|m| m.lat).sum::<f64>() / n,
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Complete HTML page centered on `center`. Marker data is embedded as JSON
/// and every string is escaped by the page script before it reaches the DOM.
pub fn render_html(
    title: &str,
    center: GeoPoint,
    markers: &[Marker],
    map_api_key: &str,
) -> serde_json::Result<String> {
    // "</" inside a string literal would end the script element early.
    let data = serde_json::to_string(markers)?.replace("</", "<\\/");
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  body, html {{ margin: 0; padding: 0; width: 100%; height: 100%; }}
  #map {{ width: 100%; height: 100%; }}
  .info-window {{ padding: 10px; max-width: 300px; }}
  .info-window h4 {{ margin: 0 0 10px 0; }}
  .info-window p {{ margin: 5px 0; }}
  .info-window .label {{ font-weight: bold; }}
</style>
</head>
<body>
<div id="map"></div>
<script type="text/javascript" src="https://dapi.kakao.com/v2/maps/sdk.js?appkey={key}&libraries=clusterer"></script>
<script>
  function esc(s) {{
    return String(s).replace(/[&<>"']/g, function (c) {{
      return {{ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' }}[c];
    }});
  }}
  var map = new kakao.maps.Map(document.getElementById('map'), {{
    center: new kakao.maps.LatLng({lat}, {lng}),
    level: 9
  }});
  var clusterer = new kakao.maps.MarkerClusterer({{ map: map, averageCenter: true, minLevel: 5 }});
  var markerData = {data};
  var markers = [];
  markerData.forEach(function (d) {{
    var marker = new kakao.maps.Marker({{ position: new kakao.maps.LatLng(d.lat, d.lng), title: d.title }});
    var info = new kakao.maps.InfoWindow({{
      removable: true,
      content: '<div class="info-window"><h4>' + esc(d.title) + '</h4>' +
        '<p><span class="label">발생일:</span> ' + esc(d.date) + '</p>' +
        '<p><span class="label">규모:</span> ' + esc(d.size) + '</p>' +
        '<p><span class="label">원인:</span> ' + esc(d.cause) + '</p></div>'
    }});
    kakao.maps.event.addListener(marker, 'click', function () {{ info.open(map, marker); }});
    markers.push(marker);
  }});
  clusterer.addMarkers(markers);
</script>
</body>
</html>
"#,
        title = escape_html(title),
        key = escape_html(map_api_key),
        lat = center.lat,
        lng = center.lng,
        data = data,
    ))
}
