use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use phenology_map::config::{AppConfig, Preset};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the phenology map to a standalone HTML file
    Generate(GenerateArgs),
}

#[derive(Args, Default)]
struct GenerateArgs {
    /// TOML configuration; the preset is used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Defaults to primary
    #[arg(short, long, value_enum, conflicts_with = "config")]
    preset: Option<Preset>,

    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    #[arg(long, value_name = "NAME")]
    output_name: Option<String>,

    /// Comma separated, e.g. 2018,2019; a bare --years selects none
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    years: Option<Vec<i32>>,
}

impl GenerateArgs {
    fn into_config(self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config: {:?}", path);
                AppConfig::load_from_file(path)?
            }
            None => AppConfig::preset(self.preset.unwrap_or(Preset::Primary)),
        };

        if let Some(dir) = self.data_dir {
            config.input.data_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output.dir = dir;
        }
        if let Some(name) = self.output_name {
            config.output.name = name;
        }
        if let Some(years) = self.years {
            config.input.selected_years = years;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Generate(GenerateArgs::default())) {
        Commands::Generate(args) => {
            let config = args.into_config()?;
            let path = phenology_map::generate_map(&config)?;
            println!("Map written to {}", path.display());
        }
    }

    Ok(())
}
