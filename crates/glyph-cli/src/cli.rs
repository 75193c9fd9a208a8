use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use glyph_types::{Address, FormatTag};

#[derive(Parser)]
#[command(
    name = "glyph",
    about = "Glyph Registry: versioned icon storage keyed by slug",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Registry config file
    #[arg(short, long, global = true, default_value = "glyph.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the canonical key of a slug
    Key(KeyArgs),
    /// Store a file as the next version of a slug
    Set(SetArgs),
    /// Store every entry of a JSON manifest, all or nothing
    SetBatch(SetBatchArgs),
    /// Bind an entity on a domain to a slug
    Bind(BindArgs),
    /// Apply every binding of a JSON mapping, all or nothing
    BindBatch(BindBatchArgs),
    /// Bind a domain to a slug
    BindDomain(BindDomainArgs),
    /// Fetch content bytes
    Get(GetArgs),
    /// Show the record and version history of a slug
    Info(SlugArgs),
    /// Show the current version number of a slug
    Version(SlugArgs),
    /// Resolve an entity or domain binding to its key
    Resolve(ResolveArgs),
    /// Print content as a data URI
    Uri(UriArgs),
    /// Count registered keys
    Count,
    /// List registered keys in insertion order
    List(ListArgs),
}

#[derive(Args)]
pub struct KeyArgs {
    pub slug: String,
}

#[derive(Args)]
pub struct SlugArgs {
    pub slug: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub slug: String,
    pub path: PathBuf,
    #[arg(long)]
    pub width: u32,
    #[arg(long)]
    pub height: u32,
    /// png, svg or webp; inferred from the file extension when omitted
    #[arg(long = "type")]
    pub kind: Option<FormatTag>,
}

#[derive(Args)]
pub struct SetBatchArgs {
    #[arg(long)]
    pub manifest: PathBuf,
}

#[derive(Args)]
pub struct BindArgs {
    pub entity: Address,
    pub domain: u64,
    pub slug: String,
}

#[derive(Args)]
pub struct BindBatchArgs {
    #[arg(long)]
    pub mapping: PathBuf,
}

#[derive(Args)]
pub struct BindDomainArgs {
    pub domain: u64,
    pub slug: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub slug: String,
    /// A specific version instead of the current one
    #[arg(long)]
    pub version: Option<u32>,
    /// Write the bytes here instead of printing a summary
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub domain: u64,
    /// Resolve this entity's binding instead of the domain binding
    #[arg(long)]
    pub entity: Option<Address>,
}

#[derive(Args)]
pub struct UriArgs {
    pub slug: String,
    /// png, svg or webp; detected from the stored bytes when omitted
    #[arg(long = "type")]
    pub kind: Option<FormatTag>,
    /// Override the MIME type implied by --type
    #[arg(long)]
    pub mime: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, default_value = "0")]
    pub offset: u64,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: u64,
}
