use std::io::Read as _;

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use schemapath_config::{CommandLineArgs, Config};
use schemapath_matcher::{Direction, PathFinder};
use schemapath_sax::{EventScript, ScriptEvent};

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("SCHEMAPATH_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let CommandLineArgs {
        document,
        config_file,
        grammar,
        verbose,
    } = CommandLineArgs::parse();

    init_logger(verbose);

    let text = if document.as_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Reading document from stdin")?;
        text
    } else {
        std::fs::read_to_string(&document)
            .with_context(|| format!("Reading document {document}"))?
    };
    let script = EventScript::parse(&text)?;

    let mut config = Config::new();
    let machine = match (grammar, config_file) {
        (Some(path), _) => config.machine_from(path)?,
        (None, Some(path)) => {
            config.load(path)?;
            let root = script
                .events()
                .iter()
                .find_map(|event| match event {
                    ScriptEvent::Start { name, .. } => Some(name.clone()),
                    _ => None,
                })
                .ok_or_else(|| anyhow!("Document contains no elements"))?;
            config.machine_for(&root)?
        }
        (None, None) => {
            return Err(anyhow!("Either --grammar or --config-file is required"));
        }
    };

    let mut finder = PathFinder::new(machine);
    script.drive(&mut finder)?;

    let mut depth = 0usize;
    for step in finder.path() {
        let printed = match step.direction {
            Direction::Child => {
                let here = depth;
                depth += 1;
                here
            }
            Direction::Sibling | Direction::Content => depth.saturating_sub(1),
            Direction::Parent => {
                depth = depth.saturating_sub(1);
                depth.saturating_sub(1)
            }
        };
        println!(
            "{0:1$}{2} {3} #{4}",
            "",
            printed * 2,
            step.direction,
            machine.node(step.state),
            step.iteration,
        );
    }
    Ok(())
}
