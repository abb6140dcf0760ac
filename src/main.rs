//! Main entry point for the bpub-resolver CLI.
//!
//! Resolves every URL given on the command line through one shared
//! [`BookResolver`], so links into the same book unpack it only once.

use clap::Parser;
use futures::future::join_all;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

use bpub_resolver::{BookResolver, Cli, FolderLocator, ZipUnpacker, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let work_dir = cli.work_dir();
    debug!(
        search = %cli.search_folder.display(),
        work_dir = %work_dir.display(),
        "starting"
    );

    let resolver = BookResolver::new(
        Arc::new(FolderLocator::new(cli.recursive())),
        Arc::new(ZipUnpacker::new(work_dir)),
    );

    let lookups = cli.urls.iter().map(|url| {
        let resolver = resolver.clone();
        let search_folder = cli.search_folder.clone();
        let url = url.clone();
        tokio::spawn(async move {
            let path = resolver.resolve_resource_path(&url, &search_folder).await;
            (url, path)
        })
    });

    let mut failed = 0usize;
    for joined in join_all(lookups).await {
        match joined {
            Ok((url, Some(path))) => println!("{url}\t{}", path.display()),
            Ok((url, None)) => {
                eprintln!("{url}\tnot resolved");
                failed += 1;
            }
            Err(e) => {
                eprintln!("Error: lookup task failed: {e}");
                failed += 1;
            }
        }
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
