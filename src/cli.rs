//! Command-line arguments of the native binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use paperpix::api::TrendingPeriod;
use paperpix_gallery::SortMode;

/// Extract the images of a research paper from its DOI or PDF.
#[derive(Debug, Parser)]
#[command(name = "paperpix", about, version)]
pub struct Cli {
    /// Config file (default: platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server base URL, overriding the config
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Country code for chat and the leaderboard, overriding the config
    #[arg(long, global = true)]
    pub country: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract images from the paper behind a DOI
    Extract {
        doi: String,

        #[command(flatten)]
        gallery: GalleryArgs,
    },

    /// Extract images from a local PDF
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        gallery: GalleryArgs,
    },

    /// Show the most liked images
    Trending {
        #[arg(long, value_enum, default_value_t = PeriodArg::All)]
        period: PeriodArg,
    },

    /// Like a trending image by id
    Vote { id: String },

    /// Show or edit the recent DOI history
    History {
        /// Remove this DOI from the history
        #[arg(long, value_name = "DOI")]
        remove: Option<String>,
    },

    /// Join the chat
    Chat {
        /// Send this message once connected
        #[arg(long, short)]
        message: Option<String>,

        /// Seconds to stay connected and print incoming messages
        #[arg(long, default_value_t = 10)]
        listen: u64,
    },

    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

/// What to do with the gallery once an extraction finished.
#[derive(Debug, Clone, Args)]
pub struct GalleryArgs {
    /// Hide images below this percentile of image area (0-100)
    #[arg(long, value_name = "PERCENT")]
    pub threshold: Option<u32>,

    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Select images by number, e.g. `--select 1,4`
    #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u32).range(1..))]
    pub select: Vec<u32>,

    /// Select every image displayed between two numbers
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"],
          value_parser = clap::value_parser!(u32).range(1..))]
    pub range: Vec<u32>,

    /// Delete the selection, then download what is left visible
    #[arg(long)]
    pub delete: bool,

    /// Only list the images
    #[arg(long)]
    pub list: bool,

    /// Submit this image to the hall of fame
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub like: Option<u32>,

    /// Also save the source PDF when the server sends it back
    #[arg(long)]
    pub pdf: bool,

    /// Output directory (default: config download dir, else current dir)
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Original,
    Smallest,
    Largest,
}

impl From<SortArg> for SortMode {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Original => SortMode::Original,
            SortArg::Smallest => SortMode::AreaAscending,
            SortArg::Largest => SortMode::AreaDescending,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    All,
    Week,
    Month,
    Year,
}

impl From<PeriodArg> for TrendingPeriod {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::All => TrendingPeriod::All,
            PeriodArg::Week => TrendingPeriod::Week,
            PeriodArg::Month => TrendingPeriod::Month,
            PeriodArg::Year => TrendingPeriod::Year,
        }
    }
}
