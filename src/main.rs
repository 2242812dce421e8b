use anyhow::Context;
use clap::Parser;
use layercfg::config::{load_table, ConfigArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "layercfg")]
#[command(about = "Check a TOML config file and print it after env expansion", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = &cli.config.conf_path;

    let table = load_table(path)?;
    tracing::info!(path = %path.display(), keys = table.len(), "Config file parsed");

    if cli.config.print_conf {
        let rendered = toml::to_string_pretty(&table).context("Failed to render config")?;
        println!("config file:{}", path.display());
        print!("{rendered}");
    }

    Ok(())
}
