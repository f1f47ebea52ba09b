// Copyright 2026 Caselookup Contributors
// SPDX-License-Identifier: Apache-2.0

//! caselookup: look a court case up across DataJud, e-SAJ and eproc.

mod config;

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;

use caselookup::{CaseLocator, LookupRequest, Origin};

#[derive(Parser)]
#[command(
    name = "caselookup",
    about = "Look up a Brazilian court case by its CNJ number and print a merged record as JSON",
    version
)]
struct Cli {
    /// Case number, e.g. 1000032-18.2023.8.26.0100 (punctuation optional).
    #[arg(required_unless_present = "completions")]
    identifier: Option<String>,

    /// Restrict the lookup to these sources (repeatable). Default: all.
    #[arg(short, long = "source", value_enum)]
    sources: Vec<SourceArg>,

    /// DataJud court alias (tjsp, trf4, ...). Derived from the number if omitted.
    #[arg(long)]
    court: Option<String>,

    /// DataJud API key. Also reads CASELOOKUP_DATAJUD_API_KEY.
    #[arg(long)]
    api_key: Option<String>,

    /// Print the report on one line.
    #[arg(long)]
    compact: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Print shell completions and exit.
    ///
    /// Example:
    ///   caselookup --completions zsh > ~/.zfunc/_caselookup
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Datajud,
    Esaj,
    Eproc,
}

impl From<SourceArg> for Origin {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Datajud => Origin::Datajud,
            SourceArg::Esaj => Origin::Esaj,
            SourceArg::Eproc => Origin::Eproc,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "caselookup", &mut std::io::stdout());
        return Ok(());
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let identifier = cli
        .identifier
        .ok_or_else(|| anyhow::anyhow!("a case number is required"))?;
    let config = config::resolve_config(cli.api_key.as_deref())?;
    let locator = CaseLocator::from_config(&config)?;

    let mut request = LookupRequest::new(identifier).targets(cli.sources.into_iter().map(Origin::from));
    if let Some(court) = cli.court {
        request = request.court(court);
    }

    let report = locator.locate(&request).await?;
    if report.is_partial() {
        tracing::warn!(failed = report.errors.len(), "some sources failed; the record may be incomplete");
    }
    if !report.found() {
        tracing::info!("no source has a record for this case");
    }

    let out = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{out}");
    Ok(())
}
