use crate::colormap::Palette;
use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data_dir: PathBuf,
    #[serde(default)]
    pub selected_years: Vec<i32>,
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// Attribute names expected on every feature of an input file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnConfig {
    pub id: String,
    pub emergence_doy: String,
    pub heading_doy: String,
    pub emergence_date: String,
    pub heading_date: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            emergence_doy: "emergence_date:doy".to_string(),
            heading_doy: "heading_date:doy".to_string(),
            emergence_date: "Auflaufen (BBCH 09)".to_string(),
            heading_date: "Ende des Aehrenschieben (BBCH 59)".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// `[lat, lon]`
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: String,
    pub attribution: String,
    pub title: String,
    pub lang: String,
    pub fit_to_data: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [47.0, 7.5],
            zoom: 8,
            tiles: "cartodbpositron".to_string(),
            attribution: "© Terensis (2023). Basemap data © CartoDB".to_string(),
            title: "Phänologie Demo Terensis".to_string(),
            lang: "de".to_string(),
            fit_to_data: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub palette: Palette,
    pub bins: usize,
    pub fill_opacity: f64,
    pub line_opacity: f64,
    pub line_color: String,
    pub line_weight: f64,
    pub nan_fill_color: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            palette: Palette::Viridis,
            bins: 6,
            fill_opacity: 0.7,
            line_opacity: 0.2,
            line_color: "black".to_string(),
            line_weight: 1.0,
            nan_fill_color: "black".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
    pub draggable: bool,
    pub title: String,
    pub body: String,
    pub logo_url: Option<String>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            draggable: true,
            title: "Winterweizen Phänologie".to_string(),
            body: "Die Karte zeigt das Auflaufdatum (BBCH 09) und das Datum\n\
                   des Ende des Ährenschiebens (BBCH 59) in Winterweizen.\n\
                   Die Phänologiedaten beruhen auf einer Simulation mit\n\
                   hochaufgelösten Wetterdaten von MeteoSchweiz."
                .to_string(),
            logo_url: Some(
                "https://github.com/terensis/ww_phenology_demo/raw/main/resources/terensis_logo.png"
                    .to_string(),
            ),
        }
    }
}

/// Built-in invocation variants of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// index.html for 2018-2020 with a draggable info box
    Primary,
    /// ww_phenology_ch.html for 2016 with a static info box
    Switzerland,
}

/// Basemap tile source resolved from `map.tiles`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSource {
    pub name: String,
    pub url: String,
    pub subdomains: Option<String>,
    pub max_zoom: u8,
}

impl TileSource {
    pub fn resolve(tiles: &str) -> Result<Self> {
        let named = |url: &str, subdomains: Option<&str>, max_zoom| TileSource {
            name: tiles.to_string(),
            url: url.to_string(),
            subdomains: subdomains.map(str::to_string),
            max_zoom,
        };

        match tiles.to_lowercase().as_str() {
            "cartodbpositron" => Ok(named(
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
                Some("abcd"),
                20,
            )),
            "cartodbdark_matter" => Ok(named(
                "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
                Some("abcd"),
                20,
            )),
            "openstreetmap" => Ok(named(
                "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
                None,
                19,
            )),
            _ if tiles.contains("{z}") => Ok(TileSource {
                name: "basemap".to_string(),
                url: tiles.to_string(),
                subdomains: None,
                max_zoom: 18,
            }),
            _ => Err(anyhow!("Unknown tile provider: {}", tiles)),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    pub fn preset(preset: Preset) -> Self {
        let (name, years, draggable) = match preset {
            Preset::Primary => ("index.html", vec![2018, 2019, 2020], true),
            Preset::Switzerland => ("ww_phenology_ch.html", vec![2016], false),
        };

        AppConfig {
            input: InputConfig {
                data_dir: PathBuf::from("data"),
                selected_years: years,
                columns: ColumnConfig::default(),
            },
            output: OutputConfig {
                dir: PathBuf::from("."),
                name: name.to_string(),
            },
            map: MapConfig::default(),
            style: StyleConfig::default(),
            overlay: OverlayConfig {
                draggable,
                ..OverlayConfig::default()
            },
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.style.bins == 0 {
            bail!("style.bins must be at least 1");
        }
        for (key, value) in [
            ("style.fill_opacity", self.style.fill_opacity),
            ("style.line_opacity", self.style.line_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1], got {}", key, value);
            }
        }

        let name = self.output.name.trim();
        if name.is_empty() {
            bail!("output.name must not be empty");
        }
        if name.contains('/') || name.contains('\\') {
            bail!("output.name must be a file name, got {:?}", self.output.name);
        }

        TileSource::resolve(&self.map.tiles)?;
        Ok(())
    }
}
