mod analyze;
mod client;
mod read;
#[cfg(test)]
pub(crate) mod testing;
mod write;

use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::ConfluenceConfig;
use crate::prelude::{println, *};
use confluence_mcp_core::analysis::{AnalysisReport, Severity};
use confluence_mcp_core::confluence::normalize::storage_to_plaintext;
use confluence_mcp_core::confluence::{PageRecord, PageRequest};
use confluence_mcp_core::suggestions::SuggestionReport;

pub use client::ConfluenceClient;

/// Confluence commands
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Check connectivity and credentials
    #[clap(name = "ping")]
    Ping(OutputOptions),

    /// List spaces visible to the current user
    #[clap(name = "spaces")]
    Spaces(ListOptions),

    /// Search Confluence content using CQL
    #[clap(name = "search")]
    Search(SearchOptions),

    /// Get a page by id
    #[clap(name = "get")]
    Get(PageOptions),

    /// List the direct children of a page
    #[clap(name = "children")]
    Children(ChildrenOptions),

    /// Review a page against documentation best practices
    #[clap(name = "analyze")]
    Analyze(PageOptions),

    /// Suggest concrete fixes for the issues found on a page
    #[clap(name = "suggest")]
    Suggest(PageOptions),
}

#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct OutputOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct ListOptions {
    /// Maximum number of results to return
    #[arg(short, long, default_value = "25")]
    pub limit: usize,

    /// Offset of the first result
    #[arg(short, long, default_value = "0")]
    pub start: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct SearchOptions {
    /// CQL query (e.g., "space = SPACE AND text ~ 'keyword'")
    #[clap(env = "CONFLUENCE_QUERY")]
    pub query: String,

    /// Maximum number of results to return
    #[arg(short, long, default_value = "25")]
    pub limit: usize,

    /// Offset of the first result
    #[arg(short, long, default_value = "0")]
    pub start: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct PageOptions {
    /// Page id
    pub page_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct ChildrenOptions {
    /// Parent page id
    pub page_id: String,

    /// Maximum number of results to return
    #[arg(short, long, default_value = "25")]
    pub limit: usize,

    /// Offset of the first result
    #[arg(short, long, default_value = "0")]
    pub start: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn client_from_env() -> Result<ConfluenceClient> {
    let config = ConfluenceConfig::from_env()?;
    Ok(ConfluenceClient::new(&config)?)
}

fn print_json<T: Serialize>(data: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn or_na(value: Option<&str>) -> String {
    value.unwrap_or("N/A").to_string()
}

async fn ping_handler(options: OutputOptions) -> Result<()> {
    let result = client_from_env()?.ping().await;

    if options.json {
        return print_json(&result);
    }

    if result.ok {
        let name = result
            .user
            .as_ref()
            .map(|u| u.display_name.clone())
            .unwrap_or_default();
        println!("{} authenticated as {}", "OK".green().bold(), name.cyan());
    } else {
        println!(
            "{} {}",
            "FAILED".red().bold(),
            result.error.unwrap_or_default()
        );
    }

    Ok(())
}

async fn spaces_handler(options: ListOptions) -> Result<()> {
    let data = client_from_env()?
        .list_spaces(PageRequest::new(options.limit, options.start))
        .await?;

    if options.json {
        return print_json(&data);
    }

    println!("Found {} space(s):\n", data.size);

    let mut table = new_table();
    table.add_row(prettytable::row!["Key", "Name", "Type", "URL"]);
    for space in data.results {
        table.add_row(prettytable::row![
            space.key.bold(),
            space.name,
            or_na(space.space_type.as_deref()),
            or_na(space.url.as_deref())
        ]);
    }
    table.printstd();

    if data.has_more {
        println!("\nMore results available (use --start {}).", data.start + data.limit);
    }

    Ok(())
}

async fn search_handler(options: SearchOptions) -> Result<()> {
    let data = client_from_env()?
        .search(
            &options.query,
            PageRequest::new(options.limit, options.start),
            None,
        )
        .await?;

    if options.json {
        return print_json(&data);
    }

    println!(
        "Found {} result(s):\n",
        data.total_size.unwrap_or(data.size)
    );

    if data.results.is_empty() {
        println!("No pages found.");
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["ID", "Title", "Type", "Space", "URL"]);
    for hit in data.results {
        table.add_row(prettytable::row![
            hit.id,
            hit.title,
            hit.content_type,
            or_na(hit.space_key.as_deref()),
            or_na(hit.url.as_deref())
        ]);
    }
    table.printstd();

    Ok(())
}

fn display_page(page: &PageRecord) {
    println!("\n{} - {}\n", page.id.bold().cyan(), page.title.bright_white());

    let mut table = new_table();
    table.add_row(prettytable::row!["Status".bold().cyan(), page.status.green()]);
    table.add_row(prettytable::row![
        "Space".bold().cyan(),
        f!("{} ({})", page.space_key, page.space_name)
    ]);
    table.add_row(prettytable::row!["Version".bold().cyan(), page.version]);
    table.add_row(prettytable::row![
        "Last modified".bold().cyan(),
        f!(
            "{} by {}",
            or_na(page.last_modified_at.as_deref()),
            or_na(page.last_modified_by.as_deref())
        )
    ]);
    if !page.labels.is_empty() {
        table.add_row(prettytable::row![
            "Labels".bold().cyan(),
            page.labels.join(", ")
        ]);
    }
    table.add_row(prettytable::row![
        "URL".bold().cyan(),
        or_na(page.url.as_deref())
    ]);
    table.printstd();

    if !page.body.is_empty() {
        println!("\n{}\n", "Body".bold().cyan());
        println!("{}", storage_to_plaintext(&page.body));
    }
}

async fn get_handler(options: PageOptions) -> Result<()> {
    let page = client_from_env()?.get_page(&options.page_id, None).await?;

    if options.json {
        return print_json(&page);
    }

    display_page(&page);
    Ok(())
}

async fn children_handler(options: ChildrenOptions) -> Result<()> {
    let data = client_from_env()?
        .get_children(
            &options.page_id,
            PageRequest::new(options.limit, options.start),
        )
        .await?;

    if options.json {
        return print_json(&data);
    }

    if data.results.is_empty() {
        println!("Page {} has no children.", options.page_id);
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["ID", "Title", "Version", "URL"]);
    for page in data.results {
        table.add_row(prettytable::row![
            page.id,
            page.title,
            page.version.map(|v| v.to_string()).unwrap_or_default(),
            or_na(page.url.as_deref())
        ]);
    }
    table.printstd();

    Ok(())
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Error => "error".red().bold().to_string(),
        Severity::Warning => "warning".yellow().bold().to_string(),
        Severity::Info => "info".blue().to_string(),
    }
}

fn display_analysis(report: &AnalysisReport) {
    println!(
        "\n{} - {}\n",
        report.page_id.bold().cyan(),
        report.title.bright_white()
    );
    println!("{}\n", report.summary.message);

    if report.findings.is_empty() {
        return;
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Severity", "Category", "Issue", "Recommendation"]);
    for finding in &report.findings {
        table.add_row(prettytable::row![
            severity_label(finding.severity),
            finding.category,
            finding.message,
            finding.recommendation
        ]);
    }
    table.printstd();
}

fn display_suggestions(report: &SuggestionReport) {
    println!(
        "\n{} - {}\n",
        report.page_id.bold().cyan(),
        report.title.bright_white()
    );

    if report.suggestions.is_empty() {
        println!("Page follows best practices!");
        return;
    }

    for suggestion in &report.suggestions {
        println!(
            "[{}] {}",
            severity_label(suggestion.severity),
            suggestion.finding.bold()
        );
        for action in &suggestion.actions {
            println!("  - {}", action.description);
            if let Some(example) = &action.example {
                println!("    {}", example.dimmed());
            }
        }
    }

    if !report.priority_actions.is_empty() {
        println!("\n{}", "Priority".bold().cyan());
        for (index, action) in report.priority_actions.iter().enumerate() {
            println!("  {}. {action}", index + 1);
        }
    }
}

async fn analyze_handler(options: PageOptions) -> Result<()> {
    let report = client_from_env()?.analyze_page(&options.page_id).await?;

    if options.json {
        return print_json(&report);
    }

    display_analysis(&report);
    Ok(())
}

async fn suggest_handler(options: PageOptions) -> Result<()> {
    let report = client_from_env()?
        .suggest_improvements(&options.page_id)
        .await?;

    if options.json {
        return print_json(&report);
    }

    display_suggestions(&report);
    Ok(())
}

/// Run Confluence commands
pub async fn run(cmd: Commands, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Running Confluence command...");
    }

    match cmd {
        Commands::Ping(options) => ping_handler(options).await,
        Commands::Spaces(options) => spaces_handler(options).await,
        Commands::Search(options) => search_handler(options).await,
        Commands::Get(options) => get_handler(options).await,
        Commands::Children(options) => children_handler(options).await,
        Commands::Analyze(options) => analyze_handler(options).await,
        Commands::Suggest(options) => suggest_handler(options).await,
    }
}
