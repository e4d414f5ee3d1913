use anyhow::Context;
use clap::Parser;
use hydro_calc::app::{commands, server};
use hydro_calc::config::cli::{Cli, Command};
use hydro_calc::utils::error::{ErrorSeverity, HydroError};
use hydro_calc::utils::{logger, monitor::OperationMonitor, validation::Validate};
use hydro_calc::{AppConfig, AppContext};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            exit_with(&anyhow::Error::new(e).context("Failed to load configuration"));
        }
    };

    // 初始化日誌: server 用 JSON, 其他指令用 CLI 格式
    if matches!(cli.command, Command::Serve { .. }) {
        logger::init_server_logger(&config.server.log_level);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if let Err(e) = run(cli, config).await {
        exit_with(&e);
    }
}

async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    if let Command::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }
    tracing::debug!("Configuration: {:?}", config);

    // 驗證配置
    config.validate().context("Configuration validation failed")?;

    let mut ctx = AppContext::open(config)
        .await
        .context("Failed to open the data directory")?;

    if let Command::Serve { .. } = cli.command {
        tracing::info!(
            "{} Starting {} v{}",
            ctx.config.app.emoji,
            ctx.config.app.title,
            ctx.config.app.version
        );
        server::serve(ctx).await?;
        return Ok(());
    }

    let mut monitor = OperationMonitor::new(cli.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }
    commands::execute(cli.command, &mut ctx, &mut monitor).await?;
    monitor.log_final_stats();
    Ok(())
}

fn exit_with(e: &anyhow::Error) -> ! {
    let Some(err) = e.downcast_ref::<HydroError>() else {
        tracing::error!("❌ {:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    };

    tracing::error!(
        "❌ {:#} (Category: {:?}, Severity: {:?})",
        e,
        err.category(),
        err.severity()
    );
    eprintln!("❌ {}", err.user_friendly_message());
    eprintln!("💡 Suggestion: {}", err.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match err.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
