use clap::{Parser, Subcommand};
use flickr_snaps::{
    commands::{self, ListArgs, MergeArgs, SnapsArgs},
    config::{AppConfig, LogConfig, DEFAULT_CONFIG_PATH},
    logging,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "flickr-snaps", version)]
#[command(about = "按标签获取 Flickr 照片列表并下载图片到本地缓存", long_about = None)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// 输出详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 按标签搜索照片并保存为列表文件
    List(ListArgs),

    /// 下载列表中的图片到本地缓存
    Snaps(SnapsArgs),

    /// 合并多个照片列表（按 id 去重）
    Merge(MergeArgs),
}

/// 加载日志配置
///
/// 只读取配置文件中的 [log] 段，失败时返回默认配置
async fn load_log_config(config_path: &str) -> LogConfig {
    if let Ok(content) = tokio::fs::read_to_string(config_path).await {
        if let Ok(config) = toml::from_str::<toml::Value>(&content) {
            if let Some(log_table) = config.get("log") {
                if let Ok(log_config) = log_table.clone().try_into::<LogConfig>() {
                    return log_config;
                }
            }
        }
    }

    LogConfig::default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = load_log_config(&cli.config).await;

    // 🔥 必须保持 _log_guard 存活
    let _log_guard = logging::init_logging(&log_config, cli.verbose);

    info!("flickr-snaps v{} 启动", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::List(args) => {
            let config = AppConfig::load_or_default(&cli.config).await;
            commands::list::run(&config, &args).await?;
        }
        Commands::Snaps(args) => {
            let config = AppConfig::load_or_default(&cli.config).await;
            let stats = commands::snaps::run(&config, &args).await?;
            info!(
                "全部完成: 下载 {}, 跳过 {}, 失败 {}",
                stats.downloaded, stats.skipped, stats.failed
            );
        }
        Commands::Merge(args) => {
            commands::merge::run(&args).await?;
        }
    }

    Ok(())
}
