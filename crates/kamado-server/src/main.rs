use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{ensure, Result};
use clap::{CommandFactory, Parser};
use kamado::codec::ByteCodec;
use kamado::compute::Echo;
use kamado::CompletionEngine;
use log::LevelFilter;
use tokio::{
    fs::File,
    io::{AsyncReadExt, BufReader},
    net::TcpListener,
};

use crate::config::{Config, ModelKind};
use crate::gateway::Gateway;

mod config;
mod gateway;

pub async fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let file = File::open(path).await?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents).await?;
    Ok(toml::from_str(&contents)?)
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(long, short)]
    ip: Option<IpAddr>,
    #[arg(long, short)]
    port: Option<u16>,
    /// Overrides `log_level` from the config file.
    #[arg(long)]
    log_level: Option<LevelFilter>,
}

fn build_engine(config: &Config) -> Result<CompletionEngine> {
    ensure!(
        config.gateway.samples_per_request > 0,
        "gateway.samples_per_request must be at least 1"
    );
    let engine = match config.model.kind {
        ModelKind::Echo => {
            ensure!(
                config.engine.pad_id == ByteCodec::PAD_ID,
                "the echo model uses the byte codec, which pads with id {}",
                ByteCodec::PAD_ID
            );
            if let Some(path) = &config.model.path {
                log::warn!("echo model ignores model path {}", path.display());
            }
            CompletionEngine::new(config.engine.clone(), ByteCodec::new(), Echo::new(config.engine.pad_id))?
        }
    };
    Ok(engine)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let path = args
        .config
        .clone()
        .unwrap_or("assets/configs/config.toml".into());
    let mut config = load_config(&path).await?;
    if let Some(ip) = args.ip {
        config.listen.address = ip;
    }
    if let Some(port) = args.port {
        config.listen.port = port;
    }

    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .with_module_level("kamado", args.log_level.unwrap_or(config.log_level))
        .with_module_level("kamado_server", args.log_level.unwrap_or(config.log_level))
        .init()?;

    let cmd = Args::command();
    let version = cmd.get_version().unwrap_or("0.0.1");
    let bin_name = cmd.get_bin_name().unwrap_or("kamado-server");
    log::info!("{}\tversion: {}", bin_name, version);
    log::info!("read config {}", path.to_string_lossy());

    let engine = Arc::new(build_engine(&config)?);
    let gateway = Arc::new(Gateway::new(engine.clone(), config.gateway.clone()));

    let addr = config.listen.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");

    tokio::select! {
        served = gateway::accept_loop(listener, gateway) => served?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            log::info!("shutting down");
        }
    }

    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.shutdown().await,
        Err(_) => log::warn!("connections still open, engine stops when the last one closes"),
    }
    Ok(())
}
