use std::{io::Write, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use dcap_quote_client::{Error, FetcherConfig, QuoteFetcher, ResponseMode};
use log::debug;

/// Fetch a DCAP quote for the given report data from a remote attestation
/// service and print it on stdout
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Report data: 64 bytes as 128 hex characters
    report_data: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the attestation service
    #[arg(long, env = "DCAP_QUOTE_URL")]
    url: Option<String>,

    /// Shape of the service response: `direct` or `line-delimited`
    #[arg(long, env = "DCAP_QUOTE_MODE")]
    mode: Option<ResponseMode>,

    /// Timeout in seconds for connecting and reading the response
    #[arg(long, env = "DCAP_QUOTE_TIMEOUT")]
    timeout: Option<u64>,

    /// User-Agent header sent to the service
    #[arg(long, env = "DCAP_QUOTE_USER_AGENT")]
    user_agent: Option<String>,

    /// Largest accepted response body, in bytes
    #[arg(long, env = "DCAP_QUOTE_MAX_RESPONSE_SIZE")]
    max_response_size: Option<u64>,

    /// Write the quote to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn fetcher_config(&self) -> Result<FetcherConfig> {
        let mut config = match &self.config {
            Some(path) => FetcherConfig::from_json_file(path)
                .with_context(|| format!("can't load configuration {path:?}"))?,
            None => FetcherConfig::default(),
        };

        if let Some(url) = &self.url {
            config.base_url = url.clone();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        if let Some(max_response_size) = self.max_response_size {
            config.max_response_size = max_response_size;
        }

        config.validate()?;

        Ok(config)
    }

    fn run(&self) -> Result<()> {
        let config = self.fetcher_config()?;
        debug!("Configuration: {config:?}");

        let quote = QuoteFetcher::new(&config)?.fetch(&self.report_data)?;

        match &self.output {
            Some(path) => quote
                .write_to_file(path)
                .with_context(|| format!("can't write quote to {path:?}"))?,
            None => {
                let mut stdout = std::io::stdout().lock();
                quote.write_to(&mut stdout)?;
            }
        }

        Ok(())
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::ValidationError { .. }) => 2,
        Some(Error::TransportError { .. }) => 3,
        Some(Error::RemoteError { .. }) => 4,
        Some(Error::EmptyResponseError) => 5,
        Some(Error::OversizedResponseError { .. }) => 6,
        _ => 1,
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(std::io::stderr(), "Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
