mod config;

use clap::Parser;
use config::{load_certificate, CliConfig};
use idcard_ocsp::{OcspError, OcspValidator};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EXIT_GOOD: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_REVOKED: i32 = 2;

/// Check a smart-card certificate's revocation status over OCSP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "ocsp_check")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "ocsp_check.json")]
    config: PathBuf,

    /// Subject certificate (PEM or DER)
    #[arg(value_name = "SUBJECT", required_unless_present = "write_example")]
    subject: Option<PathBuf>,

    /// Issuer certificate (PEM or DER)
    #[arg(value_name = "ISSUER", required_unless_present = "write_example")]
    issuer: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Write an example configuration to CONFIG and exit
    #[arg(long)]
    write_example: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.write_example {
        init_tracing("info");
        if let Err(e) = CliConfig::example().to_file(&cli.config) {
            error!("Error creating example config: {}", e);
            process::exit(EXIT_FAILURE);
        }
        info!("Wrote example configuration to {}", cli.config.display());
        process::exit(EXIT_GOOD);
    }

    let cli_config = match CliConfig::from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing("info");
            error!("Could not load config file {}: {}", cli.config.display(), e);
            process::exit(EXIT_FAILURE);
        }
    };

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| cli_config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&log_level);

    process::exit(run(&cli, cli_config));
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli, cli_config: CliConfig) -> i32 {
    let config = match cli_config.into_ocsp_configuration() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return EXIT_FAILURE;
        }
    };

    let (Some(subject_path), Some(issuer_path)) = (&cli.subject, &cli.issuer) else {
        error!("Subject and issuer certificates are required");
        return EXIT_FAILURE;
    };

    let certificates = load_certificate(subject_path)
        .and_then(|subject| Ok((subject, load_certificate(issuer_path)?)));
    let (subject, issuer) = match certificates {
        Ok(pair) => pair,
        Err(e) => {
            error!("{}", e);
            return EXIT_FAILURE;
        }
    };

    info!(
        url = %config.service_url,
        responders = config.trusted_certificates.len(),
        "Checking certificate {}",
        subject_path.display()
    );

    let result = OcspValidator::from_config(&config)
        .and_then(|validator| validator.validate(&subject, &issuer, &config));
    report(&result);
    exit_code(&result)
}

fn report(result: &Result<(), OcspError>) {
    match result {
        Ok(()) => println!("GOOD"),
        Err(OcspError::Revoked(status)) => println!("{}", status),
        Err(e) => {
            warn!("{}", e);
            println!("ERROR: {}", e);
        }
    }
}

/// 0 for GOOD, 2 for REVOKED or UNKNOWN, 1 when the status could not be established
fn exit_code(result: &Result<(), OcspError>) -> i32 {
    match result {
        Ok(()) => EXIT_GOOD,
        Err(e) if e.is_revocation() => EXIT_REVOKED,
        Err(_) => EXIT_FAILURE,
    }
}
