use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "segue")]
#[command(about = "Play a recording stored as several files as one timeline", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the player with its HTTP control surface until Ctrl-C
    Serve(ServeCliArgs),
    /// Show fragments, offsets and the stitched duration
    Inspect(InspectCliArgs),
    /// Map a stitched time to its fragment and local time
    Locate(LocateCliArgs),
    /// Print version information
    Version,
}

/// Where the fragment list comes from.
#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// JSON manifest listing the fragments in playback order
    #[arg(long)]
    pub manifest: Option<PathBuf>,
    /// Single recording (path or URL) with no fragment list
    #[arg(long)]
    pub src: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct ServeCliArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Override the API port from the config file
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(ClapArgs, Debug)]
pub struct InspectCliArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Read each fragment's real duration instead of trusting the manifest
    #[arg(long)]
    pub probe: bool,
}

#[derive(ClapArgs, Debug)]
pub struct LocateCliArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Position on the stitched timeline, in seconds
    #[arg(long)]
    pub time: f64,
    /// Read each fragment's real duration instead of trusting the manifest
    #[arg(long)]
    pub probe: bool,
}
