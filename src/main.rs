use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use rtdocs::{ApiClient, DocFetcher, ProjectLister};
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rtdocs")]
#[command(about = "CLI utility to list ReadTheDocs.org projects and fetch their EPUB, HTMLZip, and PDF documents")]
#[command(version = "0.1.0")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all projects hosted on ReadTheDocs.org, printing each page of the
    /// listing as a JSON array of project records
    List {
        /// Be verbose about the requests made to the API
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Show the download links to the EPUB, HTMLZip, and PDF documents of the
    /// given projects, optionally saving one format to disk
    Fetch {
        /// Save the documentation in the given format (default: only show links)
        #[arg(short = 's', long = "save-format")]
        save_format: Option<String>,

        /// Save the documentation(s) to this directory (only used with -s)
        #[arg(short = 'd', long = "destination-dir", default_value = ".")]
        destination_dir: PathBuf,

        /// Do not print the per-project metadata lines, just the download URLs
        #[arg(short = 'n', long = "no-comments")]
        no_comments: bool,

        /// Names (slugs) of the projects on ReadTheDocs.org
        #[arg(required = true)]
        slugs: Vec<String>,
    },
}

async fn run(command: Commands) -> Result<()> {
    let api = ApiClient::new()?;

    match command {
        Commands::List { .. } => {
            let lister = ProjectLister::new(api);
            lister.run().await
        }
        Commands::Fetch {
            save_format,
            destination_dir,
            no_comments,
            slugs,
        } => {
            let fetcher = DocFetcher::new(api, save_format, destination_dir, no_comments);
            fetcher.run(&slugs).await
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let verbose = matches!(&args.command, Commands::List { verbose: true });
    let default_directive = if verbose { "rtdocs=debug" } else { "rtdocs=info" };

    let filter = EnvFilter::from_default_env().add_directive(default_directive.parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if let Err(e) = run(args.command).await {
        error!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}
