use camino::Utf8PathBuf;
use clap::Parser;

/// Aligns an event-script document against a compiled schema grammar and
/// prints the committed traversal
#[derive(Parser, Debug)]
#[command(name = "schemapath", version)]
pub struct CommandLineArgs {
    /// The document to align, as an event script ("-" reads stdin)
    pub document: Utf8PathBuf,

    /// Config file mapping root elements to grammar files
    #[arg(short, long, value_name = "FILE")]
    pub config_file: Option<Utf8PathBuf>,

    /// Grammar file to use directly, bypassing the config's stem lookup
    #[arg(short, long, value_name = "FILE", conflicts_with = "config_file")]
    pub grammar: Option<Utf8PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
