use human_panic::setup_panic;
use rexplorer::cli::{app, commands::get_args};
use rexplorer::{config::Config, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_panic!();
    let matches = get_args().get_matches();

    match matches.subcommand() {
        Some(("connect", sub_matches)) => {
            let config = Config::from_matches(sub_matches)?;
            let _guard = logging::init(&config.log_dir, config.log_file_prefix(), config.debug)?;
            tracing::info!("Starting rexplorer against {}", config.server_addr);
            app::run(config).await
        }
        _ => {
            println!("Unknown subcommand");
            Ok(())
        }
    }
}
