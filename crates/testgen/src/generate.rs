use crate::backend::{GenerationBackend, RigBackend};
use crate::config::{BackendOptions, GithubOptions};
use crate::github::{ContentAggregator, GithubAggregator};
use crate::pipeline::Pipeline;
use crate::prelude::{eprintln, println, *};
use colored::Colorize;
use std::sync::Arc;
use testgen_core::{build_code_prompt, CodeStatus, SummaryItem};

#[derive(Debug, clap::Parser)]
#[command(name = "generate")]
#[command(about = "Generate test case summaries and test code")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Suggest test case summaries for repository files
    #[clap(name = "summaries")]
    Summaries(SummariesOptions),

    /// Generate test code for a single summary
    #[clap(name = "code")]
    Code(CodeOptions),

    /// Suggest summaries, then generate code for the picked ones
    #[clap(name = "run")]
    Run(RunOptions),
}

#[derive(Debug, clap::Args)]
pub struct SummariesOptions {
    /// Repository paths to summarize
    #[arg(required = true)]
    paths: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    github: GithubOptions,

    #[command(flatten)]
    backend: BackendOptions,
}

#[derive(Debug, clap::Args)]
pub struct CodeOptions {
    /// Test case summary to implement
    summary: String,

    #[command(flatten)]
    backend: BackendOptions,
}

#[derive(Debug, clap::Args)]
pub struct RunOptions {
    /// Repository paths to summarize
    #[arg(required = true)]
    paths: Vec<String>,

    /// Summary numbers (1-based) to generate code for; all when omitted
    #[arg(long, value_delimiter = ',')]
    pick: Vec<usize>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    github: GithubOptions,

    #[command(flatten)]
    backend: BackendOptions,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::Summaries(options) => summaries(options, global).await,
        Commands::Code(options) => code(options, global).await,
        Commands::Run(options) => run_pipeline(options, global).await,
    }
}

fn build_pipeline(options: BackendOptions, global: &crate::Global) -> Result<Pipeline> {
    let config = options.into_config()?;

    if global.verbose {
        eprintln!("Provider: {:?}", config.provider);
        eprintln!("Model: {}", config.model);
    }

    let backend: Arc<dyn GenerationBackend> = Arc::new(RigBackend::from_config(&config)?);
    Ok(Pipeline::new(backend, config.resolution))
}

/// Convert 1-based picks to indices, all indices when nothing was picked.
fn pick_indices(picks: &[usize], available: usize) -> Result<Vec<usize>> {
    if picks.is_empty() {
        return Ok((0..available).collect());
    }

    let mut indices = Vec::with_capacity(picks.len());
    for &pick in picks {
        if pick == 0 || pick > available {
            return Err(eyre!(
                "--pick {} is out of range, {} summaries available",
                pick,
                available
            ));
        }
        if !indices.contains(&(pick - 1)) {
            indices.push(pick - 1);
        }
    }
    Ok(indices)
}

fn print_summaries(items: &[SummaryItem]) {
    if items.is_empty() {
        println!("The model returned no summaries.");
        return;
    }

    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row!["#", "Summary"]);
    for item in items {
        table.add_row(prettytable::row![item.index + 1, item.text]);
    }
    table.printstd();
}

async fn summaries(options: SummariesOptions, global: crate::Global) -> Result<()> {
    let aggregator = GithubAggregator::new(options.github.into_config()?)?;
    let pipeline = build_pipeline(options.backend, &global)?;

    let files = aggregator.fetch_contents(&options.paths).await?;
    let items = pipeline.generate_summaries(&files).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print_summaries(&items);
    }

    Ok(())
}

async fn code(options: CodeOptions, global: crate::Global) -> Result<()> {
    let config = options.backend.into_config()?;
    let prompt = build_code_prompt(&options.summary)?;

    if global.verbose {
        eprintln!("Model: {}", config.model);
        eprintln!("Prompt length: {} chars", prompt.len());
    }

    let backend = RigBackend::from_config(&config)?;
    let code = backend.complete(&prompt).await?;

    print!("{}", code);

    Ok(())
}

async fn run_pipeline(options: RunOptions, global: crate::Global) -> Result<()> {
    let aggregator = GithubAggregator::new(options.github.into_config()?)?;
    let pipeline = build_pipeline(options.backend, &global)?;

    let files = aggregator.fetch_contents(&options.paths).await?;
    let items = pipeline.generate_summaries(&files).await?;

    if !options.json {
        print_summaries(&items);
    }

    if items.is_empty() {
        return Ok(());
    }

    let indices = pick_indices(&options.pick, items.len())?;

    if global.verbose {
        eprintln!("Generating code for {} summaries", indices.len());
    }

    let statuses = pipeline.generate_code_for(&indices).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&pipeline.snapshot())?);
        return Ok(());
    }

    print_code(&pipeline, &statuses);

    Ok(())
}

fn print_code(pipeline: &Pipeline, statuses: &[(usize, CodeStatus)]) {
    let summaries = pipeline.summaries();

    for (index, _) in statuses {
        let Some(item) = summaries.get(*index) else {
            continue;
        };

        println!();
        println!("{}", f!("── {} ", item.text).bold());

        match pipeline.status(*index) {
            CodeStatus::Succeeded => {
                let code = pipeline.code_state(*index).and_then(|state| state.code);
                println!("{}", code.unwrap_or_default());
            }
            CodeStatus::Idle => println!("{}", "[idle]".dimmed()),
            status => println!("{}", f!("[{}]", status).red()),
        }
    }
}
