use crate::config::GithubOptions;
use crate::github::{ContentAggregator, GithubAggregator};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Parser)]
#[command(name = "repo")]
#[command(about = "Browse the configured GitHub repository")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// List every file in the repository
    #[clap(name = "files")]
    Files(FilesOptions),

    /// Print the contents of the given files
    #[clap(name = "contents")]
    Contents(ContentsOptions),
}

#[derive(Debug, clap::Args)]
pub struct FilesOptions {
    /// Only list paths containing this text
    #[arg(long)]
    filter: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    github: GithubOptions,
}

#[derive(Debug, clap::Args)]
pub struct ContentsOptions {
    /// Repository paths to read
    #[arg(required = true)]
    paths: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    github: GithubOptions,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::Files(options) => files(options, global).await,
        Commands::Contents(options) => contents(options, global).await,
    }
}

async fn files(options: FilesOptions, global: crate::Global) -> Result<()> {
    let config = options.github.into_config()?;

    if global.verbose {
        eprintln!(
            "Fetching files from {}/{} ({})",
            config.owner, config.repo, config.branch
        );
    }

    let aggregator = GithubAggregator::new(config)?;
    let mut files = aggregator.list_files().await?;

    if let Some(filter) = &options.filter {
        files.retain(|path| path.contains(filter.as_str()));
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("No files found.");
        return Ok(());
    }

    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row!["#", "Path"]);
    for (i, path) in files.iter().enumerate() {
        table.add_row(prettytable::row![i + 1, path]);
    }
    table.printstd();

    Ok(())
}

async fn contents(options: ContentsOptions, global: crate::Global) -> Result<()> {
    let aggregator = GithubAggregator::new(options.github.into_config()?)?;

    if global.verbose {
        eprintln!("Fetching {} file(s)", options.paths.len());
    }

    let records = aggregator.fetch_contents(&options.paths).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in records {
            println!("==> {} <==", record.path);
            println!("{}", record.content);
        }
    }

    Ok(())
}
