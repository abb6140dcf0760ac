use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bpub-resolver")]
#[command(version)]
#[command(about = "Resolve cross-book bpub:// links to files in unpacked bloomPUBs", long_about = None)]
#[command(after_help = "Examples:\n  \
  bpub-resolver -s ~/Books bpub://bloom-player/book/ID123/index.htm\n  \
  bpub-resolver -s ~/Books -w /tmp/books URL1 URL2 URL3   resolve several links concurrently")]
pub struct Cli {
    /// Request URLs to resolve
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,

    /// Folder to search for bloomPUB archives
    #[arg(short = 's', long = "search", value_name = "DIR")]
    pub search_folder: PathBuf,

    /// Folder to unpack books into
    #[arg(short = 'w', long = "work-dir", value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Only search the top level of the search folder
    #[arg(long)]
    pub no_recurse: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode, errors only
    #[arg(short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("bpub-resolver"))
    }

    pub fn recursive(&self) -> bool {
        !self.no_recurse
    }
}
