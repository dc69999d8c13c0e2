//! DupLynx 服务主入口

use duplynx::{
    config::AppConfig, db, handlers::health, middleware::AppState, repository::Repositories,
    routes, seed, telemetry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

/// 子命令
enum Command {
    Serve,
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    let command = match args.get(1).map(String::as_str) {
        None | Some("serve") => Command::Serve,
        Some("seed") => Command::Seed,
        Some("--version") => {
            println!("duplynx {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some("--help") => {
            print_help();
            return Ok(());
        }
        Some(other) => {
            eprintln!("未知参数: {}", other);
            print_help();
            std::process::exit(1);
        }
    };

    // 按优先级加载：.env.local > .env.development > .env
    // 生产环境应该直接设置环境变量，不依赖 .env 文件
    if let Ok(env) = std::env::var("DUPLYNX_ENV") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志与指标
    telemetry::init_telemetry(&config.logging);
    telemetry::init_metrics();

    // 3. 数据库连接池 + 迁移
    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    match command {
        Command::Seed => {
            let report = seed::seed_postgres(&pool, &seed::canonical_dataset()).await?;
            println!(
                "seeded tenants={} machines={} scans={} duplicate_groups={} file_instances={} action_audits={}",
                report.tenants,
                report.machines,
                report.scans,
                report.duplicate_groups,
                report.file_instances,
                report.action_audits
            );
            Ok(())
        }
        Command::Serve => serve(config, pool).await,
    }
}

async fn serve(config: AppConfig, pool: sqlx::PgPool) -> anyhow::Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "DupLynx starting...");

    db::record_pool_metrics(&pool);

    // 4. 构建应用状态与路由
    let state = Arc::new(AppState::new(config.clone(), Repositories::postgres(pool)));
    let app = routes::create_router(state);

    // 5. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 6. 优雅关闭
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 收到信号后立即停止接收新连接；超过宽限期仍未结束则强制退出。
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

/// 打印帮助信息
fn print_help() {
    println!("duplynx {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: duplynx [命令] [选项]");
    println!();
    println!("命令:");
    println!("  serve         启动 HTTP 服务（默认）");
    println!("  seed          写入演示数据集后退出");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 DUPLYNX_ 前缀的环境变量完成，层级以 __ 分隔");
    println!("  例如 DUPLYNX_DATABASE__URL、DUPLYNX_DISPATCHER__OPERATION_TIMEOUT_SECS");
}
