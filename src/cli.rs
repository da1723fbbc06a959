use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "nread",
    version,
    about = "A terminal reader for plain-text novels that remembers where you stopped.",
    long_about = None
)]
pub struct Cli {
    /// Print reading history
    #[clap(short = 'r', long)]
    pub history: bool,

    /// Dump the segmented text instead of opening the reader
    #[clap(short, long)]
    pub dump: bool,

    /// Use a specific configuration file
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Open the novel with this key
    #[clap(long, value_name = "KEY")]
    pub novel: Option<String>,

    /// Read one chapter file at a time from a directory of `<id>.txt` files
    #[clap(long, value_name = "DIR", conflicts_with = "novel")]
    pub chapters: Option<PathBuf>,

    /// Chapter id to open in chapter mode
    #[clap(long, value_name = "ID", requires = "chapters")]
    pub chapter: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug output
    #[clap(long)]
    pub debug: bool,

    /// Novel text files
    #[clap(name = "FILES")]
    pub files: Vec<PathBuf>,
}
