#[derive(Debug, clap::Parser)]
#[command(name = "mcp")]
#[command(about = "Serve Confluence tools over the Model Context Protocol")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Serve over stdin/stdout, one JSON-RPC message per line
    #[clap(name = "stdio")]
    Stdio,

    /// Serve over HTTP with an SSE endpoint
    #[clap(name = "sse")]
    Sse(SseOptions),
}

#[derive(Debug, clap::Args)]
pub struct SseOptions {
    /// Port to listen on
    #[arg(short, long, env = "CONFLUENCE_MCP_PORT", default_value = "3000")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, env = "CONFLUENCE_MCP_HOST", default_value = "127.0.0.1")]
    pub host: String,
}
