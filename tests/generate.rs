use phenology_map::config::{AppConfig, Preset};
use phenology_map::types::PhenologyEvent;
use phenology_map::{build_document, generate_map};
use serde_json::json;
use std::fs;
use std::path::Path;

fn feature(id: u32, x: f64, emergence: u32, heading: u32) -> serde_json::Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[x, 47.0], [x + 0.01, 47.0], [x + 0.01, 47.01], [x, 47.01], [x, 47.0]]]
        },
        "properties": {
            "id": id,
            "emergence_date:doy": emergence,
            "heading_date:doy": heading,
            "Auflaufen (BBCH 09)": format!("E-{}-{}", id, emergence),
            "Ende des Aehrenschieben (BBCH 59)": format!("H-{}-{}", id, heading)
        }
    })
}

fn write_year(dir: &Path, name: &str, base_doy: u32) {
    let features: Vec<_> = (0..4)
        .map(|i| feature(i, 7.0 + i as f64 * 0.02, base_doy + i * 3, 150 + i * 2))
        .collect();
    let doc = json!({ "type": "FeatureCollection", "features": features });
    fs::write(dir.join(name), doc.to_string()).unwrap();
}

fn config(data_dir: &Path, out_dir: &Path, years: Vec<i32>) -> AppConfig {
    let mut config = AppConfig::preset(Preset::Primary);
    config.input.data_dir = data_dir.to_path_buf();
    config.input.selected_years = years;
    config.output.dir = out_dir.to_path_buf();
    config
}

fn data_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_year(dir.path(), "ww_phenology_2016.geojson", 280);
    write_year(dir.path(), "ww_phenology_2018.geojson", 285);
    write_year(dir.path(), "ww_phenology-2019.geojson", 290);
    dir
}

#[test]
fn selected_years_produce_one_layer_pair_each() {
    let data = data_dir();
    let out = tempfile::tempdir().unwrap();

    let doc = build_document(&config(data.path(), out.path(), vec![2018, 2019])).unwrap();

    assert_eq!(doc.layers.len(), 4);
    assert_eq!(doc.legends.len(), 4);
    let mut years = doc.years();
    years.sort();
    assert_eq!(years, vec![2018, 2019]);
    assert!(doc.layers.iter().all(|l| l.year != 2016));

    let path = generate_map(&config(data.path(), out.path(), vec![2018, 2019])).unwrap();
    let html = fs::read_to_string(path).unwrap();
    assert!(html.contains("2018 Auflaufen"));
    assert!(html.contains("2019 Ährenschieben"));
    assert!(!html.contains("2016 Auflaufen"));
    assert!(!html.contains("Beginn des Auflaufens 2016"));
}

#[test]
fn tooltips_are_never_swapped() {
    let data = data_dir();
    let out = tempfile::tempdir().unwrap();
    let config = config(data.path(), out.path(), vec![2018]);
    let columns = config.input.columns.clone();

    let doc = build_document(&config).unwrap();
    for layer in &doc.layers {
        let (shown, hidden, prefix) = match layer.event {
            PhenologyEvent::Emergence => (&columns.emergence_date, &columns.heading_date, "E-"),
            PhenologyEvent::Heading => (&columns.heading_date, &columns.emergence_date, "H-"),
        };
        assert_eq!(&layer.tooltip_fields, &vec![shown.clone()]);
        for feature in &layer.features.features {
            let props = feature.properties.as_ref().unwrap();
            assert!(props[shown].as_str().unwrap().starts_with(prefix));
            assert!(!props.contains_key(hidden));
        }
    }
}

#[test]
fn only_the_first_layer_starts_visible() {
    let data = data_dir();
    let out = tempfile::tempdir().unwrap();

    let doc = build_document(&config(data.path(), out.path(), vec![2016, 2018, 2019])).unwrap();
    assert_eq!(doc.layers.len(), 6);

    let visible: Vec<_> = doc.layers.iter().filter(|l| l.show).collect();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, doc.layers[0].id);
    assert_eq!(visible[0].event, PhenologyEvent::Emergence);

    for legend in &doc.legends {
        let layer = doc.layers.iter().find(|l| l.id == legend.layer_id).unwrap();
        assert_eq!(legend.visible, layer.show);
    }
}

#[test]
fn every_input_identifier_reaches_its_layer() {
    let data = data_dir();
    let out = tempfile::tempdir().unwrap();

    let doc = build_document(&config(data.path(), out.path(), vec![2019])).unwrap();
    for layer in &doc.layers {
        let mut ids: Vec<String> = layer
            .features
            .features
            .iter()
            .map(|f| f.properties.as_ref().unwrap()["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["0", "1", "2", "3"]);
        assert_eq!(layer.fill_colors.len(), 4);
    }
}

#[test]
fn empty_selection_renders_base_map_and_overlay_only() {
    let data = data_dir();
    let out = tempfile::tempdir().unwrap();

    let path = generate_map(&config(data.path(), out.path(), vec![])).unwrap();
    assert_eq!(path, out.path().join("index.html"));

    let html = fs::read_to_string(path).unwrap();
    assert!(html.contains("L.tileLayer("));
    assert!(html.contains(r#"class="textbox""#));
    assert!(!html.contains("L.geoJSON("));
}

#[test]
fn malformed_file_name_fails_the_run() {
    let data = data_dir();
    write_year(data.path(), "ww_phenology_latest.geojson", 300);
    let out = tempfile::tempdir().unwrap();

    let err = generate_map(&config(data.path(), out.path(), vec![2018])).unwrap_err();
    assert!(format!("{:#}", err).contains("ww_phenology_latest"));
    assert!(!out.path().join("index.html").exists());
}

#[test]
fn missing_attribute_column_fails_the_run() {
    let data = tempfile::tempdir().unwrap();
    let doc = json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": { "type": "Polygon", "coordinates": [[[7.0, 47.0], [7.1, 47.0], [7.1, 47.1], [7.0, 47.0]]] },
            "properties": { "id": 1, "emergence_date:doy": 290 }
        }]
    });
    fs::write(data.path().join("ww_phenology_2018.geojson"), doc.to_string()).unwrap();
    let out = tempfile::tempdir().unwrap();

    assert!(generate_map(&config(data.path(), out.path(), vec![2018])).is_err());
}

#[test]
fn switzerland_preset_writes_its_own_file() {
    let data = data_dir();
    let out = tempfile::tempdir().unwrap();

    let mut config = AppConfig::preset(Preset::Switzerland);
    config.input.data_dir = data.path().to_path_buf();
    config.output.dir = out.path().join("nested");

    let path = generate_map(&config).unwrap();
    assert_eq!(path, out.path().join("nested").join("ww_phenology_ch.html"));

    let html = fs::read_to_string(path).unwrap();
    assert!(html.contains("2016 Auflaufen"));
    assert!(!html.contains("2018 Auflaufen"));
    assert!(!html.contains(".draggable("));
}

#[test]
fn year_with_only_null_headings_keeps_the_other_years() {
    let data = data_dir();
    let features: Vec<_> = (0..3)
        .map(|i| {
            let mut f = feature(i, 7.0 + i as f64 * 0.02, 300 + i, 0);
            let props = f["properties"].as_object_mut().unwrap();
            props.insert("heading_date:doy".to_string(), serde_json::Value::Null);
            props.insert("Ende des Aehrenschieben (BBCH 59)".to_string(), serde_json::Value::Null);
            f
        })
        .collect();
    let doc = json!({ "type": "FeatureCollection", "features": features });
    fs::write(data.path().join("ww_phenology_2020.geojson"), doc.to_string()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let path = generate_map(&config(data.path(), out.path(), vec![2018, 2020])).unwrap();
    let html = fs::read_to_string(path).unwrap();
    assert!(html.contains("2018 Ährenschieben"));
    assert!(html.contains("2020 Ährenschieben"));
    assert!(html.contains("Ende des Ährenschiebens 2020 (Tag des Jahres)"));
}

#[test]
fn empty_feature_collection_is_rendered_as_empty_layers() {
    let data = tempfile::tempdir().unwrap();
    let doc = json!({ "type": "FeatureCollection", "features": [] });
    fs::write(data.path().join("ww_phenology_2020.geojson"), doc.to_string()).unwrap();
    let out = tempfile::tempdir().unwrap();

    let doc = build_document(&config(data.path(), out.path(), vec![2020])).unwrap();
    assert_eq!(doc.layers.len(), 2);
    assert!(doc.layers.iter().all(|l| l.features.features.is_empty() && l.fill_colors.is_empty()));
}
