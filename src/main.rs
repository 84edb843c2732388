mod api;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use coinsend_client::config::CONFIG_FILE_NAME;
use coinsend_client::{ClientConfig, KeyStoreResolver, TransferClient};
use coinsend_keyring::{FileKeyStore, KeyStore, KeyWriter};
use coinsend_log::{info, warn};
use coinsend_math::parse_coins;
use coinsend_types::AccAddress;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const PASSWORD_ENV: &str = "COINSEND_KEYRING_PASSWORD";

#[derive(Parser)]
#[command(
    name = "coinsend",
    about = "Sign and broadcast Cosmos SDK bank transfers",
    version,
    author
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Home directory for configuration and keys"
    )]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the admin HTTP API")]
    Serve,

    #[command(about = "Send coins from a local key")]
    Send {
        #[arg(long, value_name = "KEY", help = "Sender key name or address")]
        from: String,

        #[arg(long, value_name = "ADDRESS", help = "Receiver address")]
        to: String,

        #[arg(long, value_name = "COINS", help = "Amount, e.g. 100stake")]
        amount: String,

        #[arg(long, value_name = "COINS", help = "Fee; defaults to the configured fee")]
        fee: Option<String>,

        #[arg(long, value_name = "UNITS", help = "Gas limit")]
        gas: Option<u64>,

        #[arg(long, help = "Transaction memo")]
        memo: Option<String>,
    },

    #[command(about = "Key management utilities")]
    Keys {
        #[command(subcommand)]
        command: KeysCommands,
    },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    #[command(about = "Display version information")]
    Version,
}

#[derive(Subcommand)]
enum KeysCommands {
    #[command(about = "Add a new key")]
    Add {
        #[arg(value_name = "NAME", help = "Key name")]
        name: String,

        #[arg(long, help = "Recover key from mnemonic")]
        recover: bool,
    },

    #[command(about = "List all keys")]
    List,
}

#[derive(Subcommand)]
enum ConfigCommands {
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },

    #[command(about = "Show current configuration")]
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let home = cli.home.unwrap_or_else(ClientConfig::default_home);

    match cli.command {
        Commands::Serve => serve_command(&home).await,
        Commands::Send {
            from,
            to,
            amount,
            fee,
            gas,
            memo,
        } => send_command(&home, from, to, amount, fee, gas, memo).await,
        Commands::Keys { command } => keys_command(&home, command).await,
        Commands::Config { command } => config_command(&home, command),
        Commands::Version => version_command(),
    }
}

fn load_config(home: &Path) -> Result<ClientConfig> {
    let config = ClientConfig::load_or_default(home)
        .with_context(|| format!("loading {}", home.join(CONFIG_FILE_NAME).display()))?;
    coinsend_log::init_tracing(config.log.format, &config.log.level).map_err(|e| anyhow!(e))?;
    Ok(config)
}

fn keyring_password() -> Result<String> {
    match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => Ok(password),
        _ => rpassword::prompt_password("Keyring password: ").context("reading password"),
    }
}

async fn open_keys(home: &Path, config: &ClientConfig) -> Result<Arc<FileKeyStore>> {
    let dir = config.keyring_dir(home);
    let store = FileKeyStore::open(&dir, keyring_password()?)
        .await
        .with_context(|| format!("opening key store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

async fn serve_command(home: &Path) -> Result<()> {
    let config = load_config(home)?;
    let pipeline = config.pipeline()?;
    let keys = open_keys(home, &config).await?;
    info!(keys = keys.list().len(), "key store loaded");

    let client = TransferClient::connect(pipeline, Arc::new(KeyStoreResolver::new(keys.clone())))
        .await
        .context("node liveness check failed")?;

    let shutdown = CancellationToken::new();
    let state = api::AppState {
        client: Arc::new(client),
        keys,
        bech32_prefix: config.bech32_prefix.clone(),
        shutdown: shutdown.clone(),
    };
    let app = api::router(state, config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;
    info!(listen = %config.server.listen, "admin API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("could not install the ctrl-c handler");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}

async fn send_command(
    home: &Path,
    from: String,
    to: String,
    amount: String,
    fee: Option<String>,
    gas: Option<u64>,
    memo: Option<String>,
) -> Result<()> {
    let config = load_config(home)?;
    let pipeline = config.pipeline()?;

    let amount = parse_coins(&amount).with_context(|| format!("invalid amount {amount:?}"))?;
    let fee = fee
        .as_deref()
        .map(parse_coins)
        .transpose()
        .context("invalid fee")?;

    let keys = open_keys(home, &config).await?;
    let sender = match AccAddress::parse_with_prefix(&from, &config.bech32_prefix) {
        Ok(_) => from,
        Err(_) => {
            let key = keys
                .key_by_name(&from)
                .with_context(|| format!("no key named {from}"))?;
            key.public_key().to_address().to_bech32(&config.bech32_prefix)?
        }
    };

    let client = TransferClient::connect(pipeline, Arc::new(KeyStoreResolver::new(keys)))
        .await
        .context("node liveness check failed")?;
    let request = client.request(sender, to, amount, fee, gas, memo);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let receipt = client.send(&request, &cancel).await?;
    println!("{}", receipt.hash);
    Ok(())
}

async fn keys_command(home: &Path, command: KeysCommands) -> Result<()> {
    let config = load_config(home)?;
    let keys = open_keys(home, &config).await?;
    let prefix = &config.bech32_prefix;

    match command {
        KeysCommands::Add { name, recover } => {
            if recover {
                let mnemonic =
                    rpassword::prompt_password("Mnemonic: ").context("reading mnemonic")?;
                let info = keys.import_mnemonic(&name, mnemonic.trim()).await?;
                println!("{}\t{}", info.name, info.address.to_bech32(prefix)?);
            } else {
                let (info, mnemonic) = keys.create_key(&name).await?;
                println!("{}\t{}", info.name, info.address.to_bech32(prefix)?);
                println!();
                println!("Write this mnemonic down; it is the only way to recover the key:");
                println!("{}", mnemonic.as_str());
            }
        }
        KeysCommands::List => {
            let infos = keys.list();
            if infos.is_empty() {
                println!("No keys found");
            } else {
                println!("NAME\tADDRESS");
                for info in infos {
                    println!("{}\t{}", info.name, info.address.to_bech32(prefix)?);
                }
            }
        }
    }
    Ok(())
}

fn config_command(home: &Path, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init { force } => {
            let path = home.join(CONFIG_FILE_NAME);
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            ClientConfig::init(home, force)?;
            println!("{}", path.display());
        }
        ConfigCommands::Show => {
            let config = ClientConfig::load_or_default(home)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn version_command() -> Result<()> {
    println!("coinsend {}", env!("CARGO_PKG_VERSION"));
    println!("build: {}", env!("CARGO_PKG_NAME"));
    Ok(())
}
