use anyhow::Context;
use lendledger::datasource::LoggingRegistry;
use lendledger::{
    config::Config, db::init_db, Engine, EngineSettings, Event, ExternalReads, Outcome,
    Repository, RpcChainReader, SqliteStore,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("Replay failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let pool = init_db(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let repo = Repository::new(Arc::new(SqliteStore::new(pool)));
    let reads = ExternalReads::new(Arc::new(RpcChainReader::new(config.rpc_url.clone())));
    let mut engine = Engine::new(
        repo,
        reads,
        Arc::new(LoggingRegistry),
        EngineSettings::from_config(&config),
    );

    tracing::info!(
        database = %config.database_path,
        comptroller = %config.comptroller_address,
        "Starting event replay"
    );

    let (applied, skipped) = match &config.events_path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path))?;
            replay(&mut engine, BufReader::new(file)).await?
        }
        None => replay(&mut engine, BufReader::new(tokio::io::stdin())).await?,
    };

    tracing::info!(applied, skipped, "Replay complete");
    Ok(())
}

/// Apply one JSON event per line. Blank lines are ignored.
async fn replay<R>(engine: &mut Engine, reader: R) -> anyhow::Result<(usize, usize)>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_number = 0usize;
    let mut applied = 0usize;
    let mut skipped = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event = serde_json::from_str(&line)
            .with_context(|| format!("Invalid event on line {}", line_number))?;
        match engine
            .process(&event)
            .await
            .with_context(|| format!("Failed to process event on line {}", line_number))?
        {
            Outcome::Applied => applied += 1,
            Outcome::Skipped(_) => skipped += 1,
        }
    }

    Ok((applied, skipped))
}
