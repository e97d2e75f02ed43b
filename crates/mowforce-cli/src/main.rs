//! mowforce-consent: diagnostics CLI for the visitor consent store.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Command;
use mowforce_core::ConsentConfig;

/// Remove `flag <value>` from `args`, returning the value.
fn take_flag(args: &mut Vec<String>, flag: &str) -> anyhow::Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        anyhow::bail!("{} requires a value", flag);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays parseable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let mut config = match take_flag(&mut args, "--config")? {
        Some(path) => ConsentConfig::load(&PathBuf::from(path)),
        None => ConsentConfig::from_env(),
    };
    if let Some(store) = take_flag(&mut args, "--store")? {
        config.storage_path = PathBuf::from(store);
    }
    config.validate()?;

    let command = Command::parse(&args)?;
    if command == Command::Help {
        commands::print_help();
        return Ok(());
    }

    info!(
        "Consent store: {} (expiry {} days)",
        config.storage_path.display(),
        config.expiry_days
    );

    let report = commands::run(command, &config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
