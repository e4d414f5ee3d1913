use crate::core::calculator::CalculationRequest;
use crate::domain::model::{GrowthStage, Range, Reading, Strain, UnitSystem};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hydro-calc")]
#[command(about = "Professional hydroponic nutrient calculator")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file (defaults to ./hydro-calc.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory from the configuration
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Track timing and memory per operation")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List nutrient lines, or show the products of one line
    Lines { name: Option<String> },

    /// Calculate a nutrient recipe
    Calculate {
        #[command(flatten)]
        calc: CalcArgs,

        #[arg(long, help = "Print the recipe as JSON")]
        json: bool,

        /// Save the recipe under this name
        #[arg(long)]
        save: Option<String>,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Step-by-step mixing instructions for a calculation
    Instructions {
        #[command(flatten)]
        calc: CalcArgs,
    },

    /// Phased mixing protocol with target parameters
    Protocol {
        #[command(flatten)]
        calc: CalcArgs,
    },

    /// Compare reservoir readings with a saved recipe's targets
    Check {
        recipe: String,
        #[command(flatten)]
        reading: ReadingArgs,
    },

    /// Troubleshooting guide for common reservoir problems
    Troubleshoot,

    #[command(subcommand)]
    Strains(StrainCommand),

    #[command(subcommand)]
    Recipes(RecipeCommand),

    /// Run the JSON API server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Args)]
pub struct CalcArgs {
    /// Nutrient line (defaults to the configured line)
    #[arg(short, long)]
    pub line: Option<String>,

    #[arg(long)]
    pub volume: f64,

    /// US or Metric
    #[arg(long)]
    pub unit: Option<UnitSystem>,

    #[arg(long)]
    pub stage: GrowthStage,

    /// Percent of full strength (25-125)
    #[arg(long)]
    pub strength: Option<f64>,

    /// Supplement to include; repeat for several. Omit for line defaults.
    #[arg(long = "supplement")]
    pub supplements: Vec<String>,

    /// Use a strain from the local strain database
    #[arg(long)]
    pub strain: Option<String>,
}

impl CalcArgs {
    pub fn to_request(
        &self,
        default_line: &str,
        default_unit: UnitSystem,
        default_strength: f64,
        strain: Option<Strain>,
    ) -> CalculationRequest {
        let line = self.line.as_deref().unwrap_or(default_line);
        let mut request = CalculationRequest::new(line, self.volume, self.stage);
        request.unit_system = self.unit.unwrap_or(default_unit);
        request.strength_percent = self.strength.unwrap_or(default_strength);
        if !self.supplements.is_empty() {
            request.supplements = Some(self.supplements.clone());
        }
        request.strain = strain;
        request
    }
}

#[derive(Debug, Args)]
pub struct ReadingArgs {
    #[arg(long)]
    pub ec: Option<f64>,
    #[arg(long)]
    pub ph: Option<f64>,
    /// Water temperature in °F
    #[arg(long)]
    pub temp: Option<f64>,
}

impl From<&ReadingArgs> for Reading {
    fn from(args: &ReadingArgs) -> Self {
        Reading {
            ec: args.ec,
            ph: args.ph,
            temperature_f: args.temp,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum StrainCommand {
    /// List stored strains
    List,
    Show { name: String },
    /// Add or replace a strain profile
    Add {
        name: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "Medium")]
        feeding: crate::domain::model::FeedingType,
        /// EC range, e.g. 1.2-1.6
        #[arg(long)]
        ec: Option<Range>,
        /// pH range, e.g. 5.8-6.2
        #[arg(long)]
        ph: Option<Range>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    Remove { name: String },
    /// Search the local database, or the strain service with --remote
    Search {
        query: String,
        #[arg(long)]
        remote: bool,
    },
    Categories {
        #[arg(long)]
        remote: bool,
    },
    /// Ask the strain service for a profile in a category
    Generate {
        category: String,
        #[arg(long, help = "Store the generated strain locally")]
        save: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum RecipeCommand {
    List,
    Show { name: String },
    Delete { name: String },
    /// Saved recipes, newest first
    History {
        #[arg(long)]
        strain: Option<String>,
        #[arg(long)]
        stage: Option<GrowthStage>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Write a recipe as JSON to stdout or a file
    Export {
        name: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    Import { name: String, file: PathBuf },
    Duplicate { name: String, new_name: String },
    /// Log a reservoir reading against a recipe
    Result {
        name: String,
        #[command(flatten)]
        reading: ReadingArgs,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Export a recipe's product table as CSV
    Csv {
        name: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
