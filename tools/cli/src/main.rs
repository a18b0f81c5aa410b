//! AxiomPass CLI - Command line interface for password derivation.
//!
//! This tool derives per-service passwords from a master password and
//! manages the user configuration that supplies the derivation defaults.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use axiompass_common::{OutputLength, SecureBytes};
use axiompass_config::{AppConfig, SETTABLE_KEYS};
use axiompass_crypto::{
    entropy_bits, DerivationRequest, KdfParams, PasswordGenerator, CHARSET_LEN,
};

#[derive(Parser)]
#[command(name = "axiompass")]
#[command(about = "AxiomPass - Deterministic password generator")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this configuration file instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the password for a service.
    Generate {
        /// Service identifier (e.g., "github.com").
        #[arg(short, long)]
        service: String,

        /// Account identifier (default: configured default account).
        #[arg(short, long)]
        account: Option<String>,

        /// Password length, 4 to 128 (default: configured length).
        #[arg(short = 'n', long)]
        length: Option<usize>,

        /// Prompt for a pepper mixed into the salt.
        #[arg(short, long)]
        pepper: bool,

        /// KDF strength: "standard", "interactive", "moderate", or "sensitive".
        /// Overrides the configured parameters.
        #[arg(long)]
        strength: Option<String>,
    },

    /// Show usage statistics and the active derivation settings.
    Metrics,

    /// Manage the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration.
    Show,

    /// Print the configuration file location.
    Path,

    /// Restore the default settings, keeping usage statistics.
    Reset,

    /// Change a single setting.
    Set {
        /// Setting name.
        key: String,

        /// New value.
        value: String,
    },

    /// Write the configuration to a file.
    Export {
        /// Destination file.
        file: PathBuf,
    },

    /// Replace the configuration with the contents of a file.
    Import {
        /// Source file.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Generate {
            service,
            account,
            length,
            pepper,
            strength,
        } => cmd_generate(
            config_path,
            &service,
            account,
            length,
            pepper,
            strength.as_deref(),
        ),

        Commands::Metrics => cmd_metrics(config_path),

        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(config_path),
            ConfigAction::Path => cmd_config_path(config_path),
            ConfigAction::Reset => cmd_config_reset(config_path),
            ConfigAction::Set { key, value } => cmd_config_set(config_path, &key, &value),
            ConfigAction::Export { file } => cmd_config_export(config_path, &file),
            ConfigAction::Import { file } => cmd_config_import(config_path, &file),
        },
    }
}

/// Prompt for a secret without echo.
fn prompt_secret(prompt: &str) -> Result<SecureBytes> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read input")?;
    Ok(SecureBytes::from(secret))
}

/// Map a strength name to its KDF preset.
fn kdf_preset(strength: &str) -> Result<KdfParams> {
    match strength {
        "standard" => Ok(KdfParams::standard()),
        "interactive" => Ok(KdfParams::interactive()),
        "moderate" => Ok(KdfParams::moderate()),
        "sensitive" => Ok(KdfParams::sensitive()),
        _ => anyhow::bail!(
            "Invalid strength. Use: standard, interactive, moderate, or sensitive"
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")
}

fn save_config(config: &AppConfig, path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => config.save_to(path).map(|_| path.to_path_buf()),
        None => config.save(),
    }
    .context("Failed to save configuration")
}

/// Derive and print a password.
fn cmd_generate(
    config_path: Option<&Path>,
    service: &str,
    account: Option<String>,
    length: Option<usize>,
    ask_pepper: bool,
    strength: Option<&str>,
) -> Result<()> {
    let mut config = load_config(config_path)?;

    let service = service.trim();
    if service.is_empty() {
        anyhow::bail!("Service name cannot be empty");
    }

    let account = account.unwrap_or_else(|| config.default_account.clone());
    let output_length = match length {
        Some(length) => OutputLength::new(length).context("Invalid password length")?,
        None => config
            .output_length()
            .context("Invalid default length in configuration")?,
    };
    let kdf_params = match strength {
        Some(name) => kdf_preset(name)?,
        None => config
            .derivation_params()
            .context("Invalid KDF parameters in configuration")?,
    };

    let master = prompt_secret("Enter master password: ")?;
    if master.is_empty() {
        anyhow::bail!("Master password cannot be empty");
    }

    let mut request = DerivationRequest::new(service, account, output_length, kdf_params);
    if ask_pepper {
        let pepper = rpassword::prompt_password("Enter pepper: ").context("Failed to read pepper")?;
        request = request.with_pepper(pepper);
    }

    info!("Deriving {}-character password for {}", output_length, service);
    debug!(
        "KDF: time_cost={}, memory_cost_kib={}, parallelism={}, key_length={}",
        kdf_params.time_cost,
        kdf_params.memory_cost_kib,
        kdf_params.parallelism,
        kdf_params.key_length
    );

    let started = Instant::now();
    let password = PasswordGenerator::new()
        .generate(master, &request)
        .context("Password generation failed")?;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    debug!("Derivation took {} ms", elapsed_ms);

    config.record_generation(elapsed_ms);
    if let Err(e) = save_config(&config, config_path) {
        warn!("Usage statistics not saved: {:#}", e);
    }

    let text = password
        .as_str()
        .context("Generated password is not valid UTF-8")?;
    println!("{}", text);
    eprintln!("Length: {} characters", password.len());

    Ok(())
}

/// Print usage statistics and derivation settings.
fn cmd_metrics(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", metrics_report(&config));
    Ok(())
}

fn metrics_report(config: &AppConfig) -> String {
    const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";
    let stats = &config.stats;
    let mut lines = vec!["Usage".to_string()];

    lines.push(format!("  Passwords generated: {}", stats.passwords_generated));
    if let Some(first) = stats.first_used {
        lines.push(format!("  First used: {}", first.format(TIME_FORMAT)));
    }
    if let Some(last) = stats.last_used {
        lines.push(format!("  Last used: {}", last.format(TIME_FORMAT)));
    }
    if let (Some(days), Some(per_day)) = (stats.active_days(), stats.average_per_day()) {
        lines.push(format!("  Active days: {}", days));
        lines.push(format!("  Average per day: {:.1}", per_day));
    }

    lines.push("Security".to_string());
    lines.push(format!("  Charset size: {}", CHARSET_LEN));
    lines.push(format!(
        "  Entropy at {} characters: {:.1} bits",
        config.default_length,
        entropy_bits(config.default_length)
    ));

    lines.push("Performance".to_string());
    match stats.average_generation_ms() {
        Some(ms) => lines.push(format!("  Average generation time: {:.0} ms", ms)),
        None => lines.push("  Average generation time: no data".to_string()),
    }
    let kdf = &config.kdf;
    lines.push(format!(
        "  Argon2id: time_cost={}, memory={} MiB, parallelism={}, key_length={}",
        kdf.time_cost,
        kdf.memory_cost_kib / 1024,
        kdf.parallelism,
        kdf.key_length
    ));

    let mut report = lines.join("\n");
    report.push('\n');
    report
}

/// Print the current configuration.
fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    println!("{}", config.to_json()?);
    Ok(())
}

/// Print the configuration file location.
fn cmd_config_path(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => axiompass_config::config_path()?,
    };
    println!("{}", path.display());
    Ok(())
}

/// Restore default settings.
fn cmd_config_reset(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?.reset();
    let path = save_config(&config, config_path)?;
    println!("Configuration reset: {}", path.display());
    Ok(())
}

/// Change one setting.
fn cmd_config_set(config_path: Option<&Path>, key: &str, value: &str) -> Result<()> {
    let mut config = load_config(config_path)?;
    config
        .set(key, value)
        .with_context(|| format!("Settable keys: {}", SETTABLE_KEYS.join(", ")))?;
    save_config(&config, config_path)?;
    println!("Updated {} = {}", key, value);
    Ok(())
}

/// Export to a file.
fn cmd_config_export(config_path: Option<&Path>, file: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    config
        .export(file)
        .context("Failed to export configuration")?;
    println!("Configuration exported to {}", file.display());
    Ok(())
}

/// Import from a file and make it the active configuration.
fn cmd_config_import(config_path: Option<&Path>, file: &Path) -> Result<()> {
    let config = AppConfig::import(file).context("Failed to import configuration")?;
    let path = save_config(&config, config_path)?;
    println!(
        "Configuration imported from {} into {}",
        file.display(),
        path.display()
    );
    Ok(())
}
