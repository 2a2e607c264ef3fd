//! `bnd-jni` command: writes the linkage plan for the headers named in a
//! `bnd-jni.toml`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Classify and link C declarations for a Java/JNI binding and dump the plan.
#[derive(Parser, Debug)]
#[command(
    name = "bnd-jni",
    version,
    about = "Plan Java/JNI/native call chains for the functions, structs and enums of C headers"
)]
struct Cli {
    /// Generation config: package, container class, partitions and rules.
    #[arg(default_value = "bnd-jni.toml")]
    config: PathBuf,

    /// Where to write the plan; defaults to `[output].file` next to the config.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bnd_jni=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let written = bnd_jni::run(&cli.config, cli.output.as_deref())?;
    tracing::info!(path = %written.display(), "plan written");
    Ok(())
}
