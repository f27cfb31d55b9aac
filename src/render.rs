use crate::overlay;
use crate::processing::{ChoroplethLayer, LegendBinding, MapDocument};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

const LEAFLET_CSS: &str = r#"<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" integrity="sha256-p4NxAoJBhIIN+hmNHrzRCf9tD/miZyoHS5obTRR9BMY=" crossorigin=""/>"#;
const LEAFLET_JS: &str = r#"<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" integrity="sha256-20nQCchB9co0qIjJZRGuk2/Z9VM+kNiyxNV1lvTlZBo=" crossorigin=""></script>"#;

const PAGE_CSS: &str = r#"
    html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
    #map { position: absolute; top: 0; bottom: 0; right: 0; left: 0; }
    .phenology-legend {
        background: rgba(255, 255, 255, 0.85);
        padding: 6px 8px;
        border-radius: 4px;
        font: 12px sans-serif;
        min-width: 260px;
    }
    .phenology-legend-caption { font-weight: bold; margin-bottom: 4px; }
    .phenology-legend-bar { display: flex; height: 10px; }
    .phenology-legend-bar span { flex: 1; }
    .phenology-legend-ticks { display: flex; justify-content: space-between; margin-top: 2px; }
    .leaflet-tooltip table th { text-align: left; padding-right: 6px; }
"#;

// Shared by all layers; kept out of format! strings because of the braces.
const SCRIPT_HELPERS: &str = r#"
    function escapeHtml(text) {
        return String(text)
            .replace(/&/g, '&amp;')
            .replace(/</g, '&lt;')
            .replace(/>/g, '&gt;')
            .replace(/"/g, '&quot;');
    }

    function phenologyTooltip(properties, fields) {
        var rows = fields.map(function (field) {
            var value = properties[field];
            return '<tr><th>' + escapeHtml(field) + '</th><td>'
                + (value === null || value === undefined ? '' : escapeHtml(value))
                + '</td></tr>';
        });
        return '<table>' + rows.join('') + '</table>';
    }

    function choroplethLegend(colors, ticks, caption) {
        var legend = L.control({ position: 'topright' });
        legend.onAdd = function () {
            var div = L.DomUtil.create('div', 'phenology-legend');
            var html = '<div class="phenology-legend-caption">' + escapeHtml(caption) + '</div>';
            html += '<div class="phenology-legend-bar">';
            colors.forEach(function (color) {
                html += '<span style="background:' + color + '"></span>';
            });
            html += '</div><div class="phenology-legend-ticks">';
            ticks.forEach(function (tick) {
                html += '<span>' + escapeHtml(tick) + '</span>';
            });
            div.innerHTML = html + '</div>';
            L.DomEvent.disableClickPropagation(div);
            return div;
        };
        return legend;
    }
"#;

pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).context("Failed to serialize map data")?;
    Ok(json.replace("</", "<\\/"))
}

pub fn render_html(doc: &MapDocument) -> Result<String> {
    let (overlay_head, overlay_body) = match &doc.overlay {
        Some(info) => (overlay::render_head(info), overlay::render_body(info)),
        None => (String::new(), String::new()),
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    {leaflet_css}
    {leaflet_js}
    <style>{page_css}</style>{overlay_head}
</head>
<body>
    <div id="map"></div>{overlay_body}
    <script>{helpers}{script}
    </script>
</body>
</html>
"#,
        lang = html_escape(&doc.lang),
        title = html_escape(&doc.title),
        leaflet_css = LEAFLET_CSS,
        leaflet_js = LEAFLET_JS,
        page_css = PAGE_CSS,
        overlay_head = overlay_head,
        overlay_body = overlay_body,
        helpers = SCRIPT_HELPERS,
        script = render_script(doc)?,
    ))
}

fn render_script(doc: &MapDocument) -> Result<String> {
    let base = &doc.base;
    let mut js = String::new();

    writeln!(
        js,
        "\n    var map = L.map('map', {{ center: {center}, zoom: {zoom} }});",
        center = script_json(&base.center)?,
        zoom = base.zoom,
    )?;

    let subdomains = match &base.tiles.subdomains {
        Some(s) => format!(", subdomains: {}", script_json(s)?),
        None => String::new(),
    };
    writeln!(
        js,
        "    var tile_layer = L.tileLayer({url}, {{ attribution: {attr}, maxZoom: {max_zoom}{subdomains} }}).addTo(map);",
        url = script_json(&base.tiles.url)?,
        attr = script_json(&base.attribution)?,
        max_zoom = base.tiles.max_zoom,
        subdomains = subdomains,
    )?;

    for layer in &doc.layers {
        js.push_str(&render_layer(layer)?);
    }
    for legend in &doc.legends {
        js.push_str(&render_legend(legend)?);
    }

    let mut overlays = Vec::with_capacity(doc.layers.len());
    for layer in &doc.layers {
        overlays.push(format!("{}: {}", script_json(&layer.name)?, layer.id));
    }
    writeln!(
        js,
        "    L.control.layers({{ {base_name}: tile_layer }}, {{ {overlays} }}, {{ collapsed: {collapsed} }}).addTo(map);",
        base_name = script_json(&base.tiles.name)?,
        overlays = overlays.join(", "),
        collapsed = doc.layer_control.collapsed,
    )?;

    if let Some(bounds) = &doc.fit_bounds {
        writeln!(js, "    map.fitBounds({});", script_json(bounds)?)?;
    }

    Ok(js)
}

fn render_layer(layer: &ChoroplethLayer) -> Result<String> {
    let style = &layer.style;
    let mut js = String::new();

    writeln!(js, "\n    // {}", layer.name.replace('\n', " "))?;
    writeln!(js, "    var {}_colors = {};", layer.id, script_json(&layer.fill_colors)?)?;
    writeln!(
        js,
        r#"    var {id} = L.geoJSON({data}, {{
        style: function (feature) {{
            var fill = {id}_colors[feature.id];
            return {{
                color: {line_color},
                weight: {line_weight},
                opacity: {line_opacity},
                fillColor: fill || {nan_color},
                fillOpacity: {fill_opacity}
            }};
        }}
    }});
    {id}.bindTooltip(function (layer) {{
        return phenologyTooltip(layer.feature.properties, {fields});
    }}, {{ sticky: true }});"#,
        id = layer.id,
        data = script_json(&layer.features)?,
        line_color = script_json(&style.line_color)?,
        line_weight = style.line_weight,
        line_opacity = style.line_opacity,
        nan_color = script_json(&style.nan_fill_color)?,
        fill_opacity = style.fill_opacity,
        fields = script_json(&layer.tooltip_fields)?,
    )?;

    if layer.show {
        writeln!(js, "    {}.addTo(map);", layer.id)?;
    }

    Ok(js)
}

fn render_legend(legend: &LegendBinding) -> Result<String> {
    let colormap = &legend.colormap;
    let colors: Vec<String> = colormap.colors.iter().map(|c| c.to_hex()).collect();

    Ok(format!(
        r#"
    var {id} = choroplethLegend({colors}, {ticks}, {caption}).addTo(map);
    {id}.getContainer().style.display = '{display}';
    map.on('overlayadd', function (eventLayer) {{
        if (eventLayer.layer === {layer}) {{
            {id}.getContainer().style.display = 'block';
        }}
    }});
    map.on('overlayremove', function (eventLayer) {{
        if (eventLayer.layer === {layer}) {{
            {id}.getContainer().style.display = 'none';
        }}
    }});
"#,
        id = legend.id,
        layer = legend.layer_id,
        colors = script_json(&colors)?,
        ticks = script_json(&colormap.tick_labels())?,
        caption = script_json(&colormap.caption)?,
        display = if legend.visible { "block" } else { "none" },
    ))
}

/// Creates the parent directory of `path` when needed.
pub fn write_html(doc: &MapDocument, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    }

    let html = render_html(doc)?;
    fs::write(path, html)
        .with_context(|| format!("Failed to write map: {:?}", path))?;

    info!("Wrote map with {} layers to {:?}", doc.layers.len(), path);
    Ok(())
}
