pub mod colormap;
pub mod config;
pub mod data;
pub mod overlay;
pub mod processing;
pub mod render;
pub mod types;

use anyhow::Result;
use config::AppConfig;
use processing::{DocumentBuilder, MapDocument};
use std::path::PathBuf;
use tracing::info;

pub fn build_document(config: &AppConfig) -> Result<MapDocument> {
    config.validate()?;

    let inputs = data::select_inputs(&config.input.data_dir, &config.input.selected_years)?;
    let mut builder = DocumentBuilder::new(config)?;

    for input in &inputs {
        let dataset = data::load_year(input, &config.input.columns)?;
        builder.add_year(&dataset)?;
    }

    Ok(builder.finish())
}

pub fn generate_map(config: &AppConfig) -> Result<PathBuf> {
    info!("Generating map for years {:?}", config.input.selected_years);
    let document = build_document(config)?;
    let path = config.output_path();
    render::write_html(&document, &path)?;
    Ok(path)
}
