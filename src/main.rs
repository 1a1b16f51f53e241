use invoice_flatten::{run, AppConfig};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式，RUST_LOG 控制级别
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 加载配置
    let config = AppConfig::from_env();
    info!("Starting with config: {:?}", config);

    let report = run(&config)?;

    // 同时输出到控制台
    println!(
        "Flattened {} invoices into {} rows ({} invoices skipped, {} items skipped)",
        report.invoices_seen, report.items_emitted, report.invoices_discarded, report.items_discarded
    );
    println!("Data saved to {} successfully.", config.output.csv_file.display());

    Ok(())
}
