use crate::colormap::StepColormap;
use crate::config::{AppConfig, StyleConfig, TileSource};
use crate::data::AttributeIndex;
use crate::types::{PhenologyEvent, YearDataset};
use anyhow::{Context, Result};
use geo::BoundingRect;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Everything the rendered page is made of, in document order.
#[derive(Debug, Clone)]
pub struct MapDocument {
    pub title: String,
    pub lang: String,
    pub base: BaseMap,
    pub overlay: Option<InfoBox>,
    pub layers: Vec<ChoroplethLayer>,
    pub legends: Vec<LegendBinding>,
    pub layer_control: LayerControl,
    /// `[[south, west], [north, east]]` of all rendered fields, when the view
    /// should be fitted to the data.
    pub fit_bounds: Option<[[f64; 2]; 2]>,
}

#[derive(Debug, Clone)]
pub struct BaseMap {
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: TileSource,
    pub attribution: String,
}

#[derive(Debug, Clone)]
pub struct InfoBox {
    pub title: String,
    pub body: String,
    pub logo_url: Option<String>,
    pub draggable: bool,
}

#[derive(Debug, Clone)]
pub struct LayerStyle {
    pub fill_opacity: f64,
    pub line_opacity: f64,
    pub line_color: String,
    pub line_weight: f64,
    pub nan_fill_color: String,
}

impl From<&StyleConfig> for LayerStyle {
    fn from(style: &StyleConfig) -> Self {
        Self {
            fill_opacity: style.fill_opacity,
            line_opacity: style.line_opacity,
            line_color: style.line_color.clone(),
            line_weight: style.line_weight,
            nan_fill_color: style.nan_fill_color.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChoroplethLayer {
    /// JavaScript variable name, unique within the document.
    pub id: String,
    pub name: String,
    pub year: i32,
    pub event: PhenologyEvent,
    pub show: bool,
    pub features: FeatureCollection,
    /// Fill color per field identifier; fields without a value are absent.
    pub fill_colors: BTreeMap<String, String>,
    pub style: LayerStyle,
    pub tooltip_fields: Vec<String>,
}

/// A legend shown only while its layer is on the map.
#[derive(Debug, Clone)]
pub struct LegendBinding {
    pub id: String,
    pub layer_id: String,
    pub colormap: StepColormap,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct LayerControl {
    pub collapsed: bool,
}

impl MapDocument {
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.layers.iter().map(|l| l.year).collect();
        years.dedup();
        years
    }
}

pub struct DocumentBuilder<'a> {
    config: &'a AppConfig,
    document: MapDocument,
    extent: Option<geo::Rect<f64>>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(config: &'a AppConfig) -> Result<Self> {
        let tiles = TileSource::resolve(&config.map.tiles)?;

        let overlay = config.overlay.enabled.then(|| InfoBox {
            title: config.overlay.title.clone(),
            body: config.overlay.body.clone(),
            logo_url: config.overlay.logo_url.clone(),
            draggable: config.overlay.draggable,
        });

        Ok(Self {
            config,
            document: MapDocument {
                title: config.map.title.clone(),
                lang: config.map.lang.clone(),
                base: BaseMap {
                    center: config.map.center,
                    zoom: config.map.zoom,
                    tiles,
                    attribution: config.map.attribution.clone(),
                },
                overlay,
                layers: Vec::new(),
                legends: Vec::new(),
                layer_control: LayerControl { collapsed: false },
                fit_bounds: None,
            },
            extent: None,
        })
    }

    /// Appends the emergence and heading layers of one season.
    pub fn add_year(&mut self, dataset: &YearDataset) -> Result<()> {
        let index = AttributeIndex::build(dataset)?;
        debug!("Indexed {} fields for {}", index.len(), dataset.year);

        for event in PhenologyEvent::ALL {
            self.add_layer(dataset, &index, event)
                .with_context(|| format!("Failed to build {} layer for {}", event, dataset.year))?;
        }

        for field in &dataset.fields {
            if let Some(rect) = field.geometry.bounding_rect() {
                self.extent = Some(match self.extent {
                    Some(e) => geo::Rect::new(
                        geo::coord! { x: e.min().x.min(rect.min().x), y: e.min().y.min(rect.min().y) },
                        geo::coord! { x: e.max().x.max(rect.max().x), y: e.max().y.max(rect.max().y) },
                    ),
                    None => rect,
                });
            }
        }

        Ok(())
    }

    fn add_layer(
        &mut self,
        dataset: &YearDataset,
        index: &AttributeIndex<'_>,
        event: PhenologyEvent,
    ) -> Result<()> {
        let columns = &self.config.input.columns;
        let (doy_column, date_column) = match event {
            PhenologyEvent::Emergence => (&columns.emergence_doy, &columns.emergence_date),
            PhenologyEvent::Heading => (&columns.heading_doy, &columns.heading_date),
        };

        let seq = self.document.layers.len();
        let layer_id = format!("choropleth_{}", seq);
        let show = seq == 0;

        let has_values = dataset
            .fields
            .iter()
            .any(|f| f.attributes.doy(event).map_or(false, f64::is_finite));
        if !has_values {
            warn!(
                "No {} values for {} in {:?}, drawing every field with the missing-value color",
                event,
                dataset.year,
                dataset.source
            );
        }

        let colormap = StepColormap::from_values(
            self.config.style.palette,
            self.config.style.bins,
            dataset.fields.iter().filter_map(|f| f.attributes.doy(event)),
            event.legend_caption(dataset.year),
        )?;

        let mut features = Vec::with_capacity(dataset.fields.len());
        let mut fill_colors = BTreeMap::new();

        for field in &dataset.fields {
            let attributes = index.lookup(&field.id)?;
            let doy = attributes.doy(event);

            let mut properties = JsonObject::new();
            properties.insert(columns.id.clone(), JsonValue::from(field.id.clone()));
            properties.insert(doy_column.clone(), doy.map(JsonValue::from).unwrap_or(JsonValue::Null));
            properties.insert(
                date_column.clone(),
                attributes.date_label(event).map(JsonValue::from).unwrap_or(JsonValue::Null),
            );

            if let Some(v) = doy.filter(|v| v.is_finite()) {
                fill_colors.insert(field.id.clone(), colormap.color_for(v).to_hex());
            }

            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&field.geometry))),
                id: Some(geojson::feature::Id::String(field.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            });
        }

        info!(
            "Layer '{}': {} fields, day of year {:.0}..{:.0}",
            event.layer_name(dataset.year),
            features.len(),
            colormap.vmin(),
            colormap.vmax()
        );

        self.document.legends.push(LegendBinding {
            id: format!("legend_{}", seq),
            layer_id: layer_id.clone(),
            colormap,
            visible: show,
        });

        self.document.layers.push(ChoroplethLayer {
            id: layer_id,
            name: event.layer_name(dataset.year),
            year: dataset.year,
            event,
            show,
            features: FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            },
            fill_colors,
            style: LayerStyle::from(&self.config.style),
            tooltip_fields: vec![date_column.clone()],
        });

        Ok(())
    }

    pub fn finish(mut self) -> MapDocument {
        if self.config.map.fit_to_data {
            self.document.fit_bounds = self
                .extent
                .map(|r| [[r.min().y, r.min().x], [r.max().y, r.max().x]]);
        }
        self.document
    }
}
