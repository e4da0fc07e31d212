//! rsblocker 命令行入口

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rsblocker::{default_sources, ConfigManager, RuleLoader};

#[derive(Debug, Parser)]
#[command(name = "rsblocker", version, about = "Fetch, cache and compile content-blocker filter lists")]
struct Cli {
    /// 缓存目录
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// HTTP 超时（秒）
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// 日志级别：-v info，-vv debug
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 加载全部过滤列表（优先使用缓存）
    Fetch {
        /// 忽略缓存，强制从网络刷新
        #[arg(long)]
        force: bool,
    },
    /// 查看缓存状态
    Status,
    /// 清除缓存
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("rsblocker=warn"),
        1 => EnvFilter::new("rsblocker=info"),
        _ => EnvFilter::new("rsblocker=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut builder = ConfigManager::custom().http_timeout(cli.timeout);
    if let Some(dir) = cli.cache_dir {
        builder = builder.cache_dir(dir);
    }
    let config = builder.build();

    let loader = RuleLoader::new(&config, default_sources()).context("failed to build rule loader")?;

    match cli.command {
        Command::Fetch { force } => {
            let lists = loader
                .get_lists(force)
                .await
                .context("failed to load filter lists")?;
            for (source, list) in loader.sources().iter().zip(&lists) {
                println!("{:<28} {:>8} rules", source.identifier, list.rule_count());
            }
        }
        Command::Status => {
            let status = loader.cache_status().await?;
            if status.is_empty() {
                println!("no cached lists in {}", config.cache_dir.display());
            }
            for item in status {
                println!(
                    "{:<28} {:>6}h  {}",
                    item.entry.identifier,
                    item.age.as_secs() / 3600,
                    if item.fresh { "fresh" } else { "stale" }
                );
            }
        }
        Command::Clear => {
            let removed = loader.clear_cache().await?;
            println!("removed {} cached lists", removed);
        }
    }

    Ok(())
}
