use anyhow::Result;
use daily_shorts::config::Config;
use daily_shorts::init;
use daily_shorts::pipeline::Pipeline;

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cfg = Config::from_env()?;
    init::ensure_directories(&cfg).await?;

    let missing = init::missing_tools().await;
    if !missing.is_empty() {
        tracing::warn!("{} not found in PATH. Please install FFmpeg.", missing.join(", "));
    }

    let pipeline = Pipeline::from_config(cfg)?;
    let summary = pipeline.run_today().await?;

    println!("✅ Generated: {}", summary.outputs.video.display());
    if let Some(delivery) = &summary.delivery {
        for (chat_id, reason) in &delivery.failed {
            eprintln!("Failed to send to {}: {}", chat_id, reason);
        }
        println!(
            "Delivered to {} of {} recipients",
            delivery.delivered.len(),
            delivery.delivered.len() + delivery.failed.len()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run().await {
        eprintln!("[ERROR] {:#}", err);
        std::process::exit(1);
    }
}
