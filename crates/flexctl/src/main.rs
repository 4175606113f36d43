use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells};
use flexctl_core::DatabaseEngine;
use flexctl_core::config::Config;
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands, EngineCommands};
use connection::ConnectionManager;
use error::FlexCtlError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let loaded = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        Config::load_from_path(&path).map(|config| (config, Some(path)))
    } else {
        debug!("Loading config from default location");
        Config::load().map(|config| (config, None))
    };
    let (config, config_path) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            FlexCtlError::from(e).print_diagnostic();
            std::process::exit(1);
        }
    };
    debug!(
        "Creating ConnectionManager with config_path: {:?}",
        config_path
    );
    let conn_mgr = ConnectionManager::with_config_path(config, config_path);

    // Execute command
    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "flexctl=warn,flexctl_core=warn",
            1 => "flexctl=info,flexctl_core=info",
            2 => "flexctl=debug,flexctl_core=debug",
            _ => "flexctl=trace,flexctl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    // stdout carries command output only
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose > 0)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), FlexCtlError> {
    // Log command execution with sanitized parameters
    trace!("Executing command: {}", format_command(&cli.command));
    info!("Command: {}", format_command(&cli.command));

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Version => {
            debug!("Showing version information");
            match cli.output {
                cli::OutputFormat::Json | cli::OutputFormat::Yaml => {
                    let output_data = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "name": env!("CARGO_PKG_NAME"),
                    });
                    let fmt = output::OutputFormat::from_cli(cli.output, output::OutputFormat::Json);
                    output::print_output(&output_data, fmt, None)?;
                }
                _ => {
                    println!("flexctl {}", env!("CARGO_PKG_VERSION"));
                }
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            debug!("Generating completions for {:?}", shell);
            generate_completions(*shell);
            Ok(())
        }
        Commands::Profile(profile_cmd) => {
            debug!("Executing profile command");
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, cli.output)
        }
        Commands::LocalContext(context_cmd) => {
            debug!("Executing local-context command");
            commands::local_context::handle_local_context_command(
                context_cmd,
                conn_mgr,
                cli.output,
                cli.query.as_deref(),
            )
        }
        Commands::Mysql(engine_cmd) => {
            execute_engine_command(cli, conn_mgr, DatabaseEngine::Mysql, engine_cmd).await
        }
        Commands::Postgres(engine_cmd) => {
            execute_engine_command(cli, conn_mgr, DatabaseEngine::Postgres, engine_cmd).await
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

async fn execute_engine_command(
    cli: &Cli,
    conn_mgr: &ConnectionManager,
    engine: DatabaseEngine,
    engine_cmd: &EngineCommands,
) -> Result<(), FlexCtlError> {
    match engine_cmd {
        EngineCommands::FlexibleServer(server_cmd) => {
            debug!("Executing {} flexible-server command", engine.command_group());
            commands::flexible_server::handle_flexible_server_command(
                engine,
                server_cmd,
                conn_mgr,
                cli.profile.as_deref(),
                cli.output,
                cli.query.as_deref(),
            )
            .await
        }
    }
}

/// Generate shell completions
fn generate_completions(shell: cli::Shell) {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    match shell {
        cli::Shell::Bash => generate(shells::Bash, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Zsh => generate(shells::Zsh, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Fish => generate(shells::Fish, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, name, &mut std::io::stdout())
        }
        cli::Shell::Elvish => generate(shells::Elvish, &mut cmd, name, &mut std::io::stdout()),
    }
}

/// Format command for human-readable logging (without sensitive data)
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Version => "version".to_string(),
        Commands::Completions { shell } => format!("completions {:?}", shell),
        Commands::Profile(cmd) => {
            use cli::ProfileCommands::*;
            match cmd {
                List => "profile list".to_string(),
                Path => "profile path".to_string(),
                Show { name } => format!("profile show {}", name),
                Set { name, .. } => format!("profile set {} [credentials redacted]", name),
                Remove { name, .. } => format!("profile remove {}", name),
                Default { name } => format!("profile default {}", name),
            }
        }
        Commands::LocalContext(cmd) => format!("local-context {:?}", cmd).to_lowercase(),
        Commands::Mysql(EngineCommands::FlexibleServer(cmd)) => {
            format!("mysql flexible-server {}", format_server_command(cmd))
        }
        Commands::Postgres(EngineCommands::FlexibleServer(cmd)) => {
            format!("postgres flexible-server {}", format_server_command(cmd))
        }
    }
}

/// Subcommand name plus target, never passwords
fn format_server_command(command: &cli::FlexibleServerCommands) -> String {
    use cli::FlexibleServerCommands::*;
    let target = |t: &cli::ServerTarget| {
        format!(
            "-g {} -n {}",
            t.resource_group.as_deref().unwrap_or("<context>"),
            t.name.as_deref().unwrap_or("<context>")
        )
    };
    match command {
        Create(args) => format!("create {} [password redacted]", target(&args.target)),
        Show(t) => format!("show {}", target(t)),
        Update(args) => format!("update {} [password redacted]", target(&args.target)),
        Delete { target: t, .. } => format!("delete {}", target(t)),
        Start(t) => format!("start {}", target(t)),
        Stop(t) => format!("stop {}", target(t)),
        Restart(t) => format!("restart {}", target(t)),
        List { resource_group } => format!("list {:?}", resource_group),
        ListSkus { location } => format!("list-skus {:?}", location),
        ShowConnectionString { server_name, .. } => {
            format!("show-connection-string {:?} [password redacted]", server_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &str) -> Cli {
        Cli::try_parse_from(args.split_whitespace()).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_log_line_hides_password() {
        let cli = parse(
            "flexctl mysql flexible-server create -g rg -n my1 --admin-password Secret123!",
        );
        let line = format_command(&cli.command);
        assert!(line.starts_with("mysql flexible-server create -g rg -n my1"));
        assert!(!line.contains("Secret123!"));
    }

    #[test]
    fn postgres_alias_and_fs_alias() {
        let cli = parse("flexctl postgresql fs show -g rg -n pg1");
        assert!(matches!(
            cli.command,
            Commands::Postgres(EngineCommands::FlexibleServer(
                cli::FlexibleServerCommands::Show(_)
            ))
        ));
    }

    #[test]
    fn vnet_auto_conflicts_with_vnet() {
        assert!(
            Cli::try_parse_from([
                "flexctl",
                "mysql",
                "flexible-server",
                "create",
                "--vnet-auto",
                "--vnet",
                "v1",
            ])
            .is_err()
        );
    }

    #[test]
    fn tags_accept_several_pairs() {
        let cli = parse("flexctl mysql flexible-server create --tags env=dev team=db");
        match cli.command {
            Commands::Mysql(EngineCommands::FlexibleServer(
                cli::FlexibleServerCommands::Create(args),
            )) => assert_eq!(args.tags, vec!["env=dev", "team=db"]),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
