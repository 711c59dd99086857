use clap::Parser;
use quiz_raid_server::config;
use quiz_raid_server::logging;
use quiz_raid_server::websocket;

/// Quiz Raid -- server-authoritative coordinator for cooperative boss-battle quiz games
#[derive(Parser, Debug)]
#[command(name = "quiz-raid-server")]
#[command(about = "A real-time WebSocket server for cooperative boss-battle quiz games")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,

    /// Read configuration JSON from stdin before applying other sources
    /// (same switch as QUIZ_RAID_CONFIG_STDIN=1).
    #[arg(long)]
    config_stdin: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.config_stdin {
        std::env::set_var("QUIZ_RAID_CONFIG_STDIN", "1");
    }

    let cfg = config::load();

    // Handle --print-config: output the loaded configuration as JSON
    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() already runs validation but only logs failures and
    // continues. Capture the result here to give --validate-config a real
    // exit code and to fail normal startup on a broken config.
    let validation_result = config::validate_config(&cfg);

    // Handle --validate-config: exit after validation
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Listen address: {}:{}", cfg.server.host, cfg.port);
                println!("  Base boss health: {}", cfg.game.base_boss_health);
                println!("  Players to start: {}", cfg.game.min_players_to_start);
                println!(
                    "  Question time limit: {}s",
                    cfg.game.question_time_limit_secs
                );
                println!("  Starting lives: {}", cfg.game.starting_lives);
                println!("  Reconnect grace: {}s", cfg.rooms.reconnect_grace_secs);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    // In normal operation, propagate validation errors
    validation_result?;

    // Initialize logging from config.
    logging::init_with_config(&cfg.logging);

    tracing::info!(
        host = %cfg.server.host,
        port = cfg.port,
        "Starting quiz raid server"
    );

    websocket::run_server(cfg).await
}
