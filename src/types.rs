use geo::MultiPolygon;
use std::fmt;
use std::path::PathBuf;

/// Phenological stage rendered as its own choropleth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhenologyEvent {
    /// BBCH 09
    Emergence,
    /// BBCH 59, end of heading
    Heading,
}

impl PhenologyEvent {
    pub const ALL: [PhenologyEvent; 2] = [PhenologyEvent::Emergence, PhenologyEvent::Heading];

    pub fn bbch(self) -> u8 {
        match self {
            PhenologyEvent::Emergence => 9,
            PhenologyEvent::Heading => 59,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            PhenologyEvent::Emergence => "emergence",
            PhenologyEvent::Heading => "heading",
        }
    }

    /// Entry shown in the layer control.
    pub fn layer_name(self, year: i32) -> String {
        match self {
            PhenologyEvent::Emergence => format!("{} Auflaufen", year),
            PhenologyEvent::Heading => format!("{} Ährenschieben", year),
        }
    }

    pub fn legend_caption(self, year: i32) -> String {
        match self {
            PhenologyEvent::Emergence => format!("Beginn des Auflaufens {} (Tag des Jahres)", year),
            PhenologyEvent::Heading => format!("Ende des Ährenschiebens {} (Tag des Jahres)", year),
        }
    }
}

impl fmt::Display for PhenologyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (BBCH {:02})", self.slug(), self.bbch())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAttributes {
    pub emergence_doy: Option<f64>,
    pub heading_doy: Option<f64>,
    // Human readable dates, shown in tooltips
    pub emergence_date: Option<String>,
    pub heading_date: Option<String>,
}

impl FieldAttributes {
    pub fn doy(&self, event: PhenologyEvent) -> Option<f64> {
        match event {
            PhenologyEvent::Emergence => self.emergence_doy,
            PhenologyEvent::Heading => self.heading_doy,
        }
    }

    pub fn date_label(&self, event: PhenologyEvent) -> Option<&str> {
        match event {
            PhenologyEvent::Emergence => self.emergence_date.as_deref(),
            PhenologyEvent::Heading => self.heading_date.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldFeature {
    pub id: String,
    pub geometry: MultiPolygon<f64>,
    pub attributes: FieldAttributes,
}

/// Simulation results of one season, loaded from a single input file.
#[derive(Debug, Clone)]
pub struct YearDataset {
    pub year: i32,
    pub source: PathBuf,
    pub fields: Vec<FieldFeature>,
}

/// An input file whose name carried a selected year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearInput {
    pub year: i32,
    pub path: PathBuf,
}
