//! Standalone Leaflet page with a single marker.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::MapConfig;
use crate::gps::GpsCoordinate;
use crate::pipeline;

const LEAFLET_VERSION: &str = "1.9.4";

/// Render the page: one marker at `coord`, centred on it.
pub fn render_map_html(coord: GpsCoordinate, title: &str, config: &MapConfig) -> String {
    let lat = coord.latitude;
    let lon = coord.longitude;
    let popup = format!("{}<br>{coord}", html_escape(title));

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title_html}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@{v}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{v}/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map('map').setView([{lat:.7}, {lon:.7}], {zoom});
L.tileLayer({tiles}, {{ attribution: {attribution}, maxZoom: 19 }}).addTo(map);
L.marker([{lat:.7}, {lon:.7}]).addTo(map).bindPopup({popup});
</script>
</body>
</html>
"#,
        title_html = html_escape(title),
        v = LEAFLET_VERSION,
        zoom = config.zoom,
        tiles = js_string(&config.tile_url),
        attribution = js_string(&config.attribution),
        popup = js_string(&popup),
    )
}

/// Write the map page next to the image (`photo.jpg` → `photo.jpg-map.html`).
pub fn write_map(coord: GpsCoordinate, image_path: &Path, config: &MapConfig) -> Result<PathBuf> {
    let title = image_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    let html = render_map_html(coord, &title, config);

    let map_path = pipeline::map_path(image_path);
    std::fs::write(&map_path, html).context("Failed to write map file")?;
    log::info!("Map written to {}", map_path.display());
    Ok(map_path)
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON string literal, safe inside a `<script>` element.
fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string())
        .to_string()
        .replace("</", "<\\/")
}
