/// paperpix command-line client for native builds
#[cfg(not(target_arch = "wasm32"))]
mod cli;
#[cfg(not(target_arch = "wasm32"))]
mod commands;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use clap::Parser;
    use cli::{Cli, Commands};
    use commands::{Context, Source};
    use paperpix::config::AppConfig;

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(AppConfig::default_path);
    let mut config = config_path
        .as_deref()
        .and_then(AppConfig::load_from_path)
        .unwrap_or_default();
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(country) = cli.country {
        config.country = country;
    }

    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();
    log::debug!("Using server {}", config.server_url);

    let ctx = Context {
        config,
        config_path,
    };
    let result = match cli.command {
        Commands::Extract { doi, gallery } => commands::extract(&ctx, Source::Doi(doi), &gallery),
        Commands::Upload { file, gallery } => commands::extract(&ctx, Source::File(file), &gallery),
        Commands::Trending { period } => commands::trending(&ctx, period),
        Commands::Vote { id } => commands::vote(&ctx, &id),
        Commands::History { remove } => commands::history(remove.as_deref()),
        Commands::Chat { message, listen } => {
            commands::chat(&ctx, message, std::time::Duration::from_secs(listen))
        }
        Commands::Config { save } => commands::show_config(&ctx, save),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Application error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
