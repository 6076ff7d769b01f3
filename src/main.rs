use anyhow::Result;
use species_flashcards::utils::logging;
use species_flashcards::{App, Config};
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let args: Vec<String> = std::env::args().skip(1).collect();

    // 初始化应用
    let app = App::initialize(config).await?;

    match args.split_first() {
        Some((command, names)) if command == "pronounce" => {
            for name in names {
                match app.pronounce(name).await {
                    Ok(reply) => println!("{}", serde_json::to_string_pretty(&reply)?),
                    Err(e) => error!("{}: {}", name, e),
                }
            }
        }
        Some((command, _)) => {
            anyhow::bail!("未知命令: {} (可用: pronounce <学名>...)", command);
        }
        None => app.run().await?,
    }

    app.shutdown().await?;

    Ok(())
}
