//! Flexible server command implementations for both engines

use colored::Colorize;
use flexctl_core::arm::models::Server;
use flexctl_core::config::{FileSettingsStore, SERVER_NAME_KEY, SettingsStore};
use flexctl_core::generators::RandomGenerator;
use flexctl_core::network::VnetSpec;
use flexctl_core::server::{CreateServerArgs, UpdateServerArgs, connection_strings, resolve_target};
use flexctl_core::{ArmClient, DatabaseEngine, Provisioner, ServerResponse};
use indicatif::ProgressBar;
use serde::Serialize;
use serde_json::Value;
use tabled::{Table, settings::Style};
use tracing::debug;

use crate::cli::{CreateArgs, FlexibleServerCommands, OutputFormat, ServerTarget, UpdateArgs};
use crate::commands::utils::{DetailRow, confirm_action, operation_spinner, parse_tags};
use crate::connection::ConnectionManager;
use crate::error::{FlexCtlError, Result as CliResult};
use crate::output::{self, print_output};

/// Summary row for `list` in table mode
#[derive(Debug, Serialize)]
struct ServerSummary {
    name: String,
    #[serde(rename = "resourceGroup")]
    resource_group: String,
    location: String,
    version: String,
    sku: String,
    tier: String,
    state: String,
}

impl ServerSummary {
    fn from_server(server: &Server) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            name: text(&server.name),
            resource_group: server
                .id
                .as_deref()
                .and_then(resource_group_of)
                .unwrap_or_default(),
            location: text(&server.location),
            version: text(&server.properties.version),
            sku: server.sku.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
            tier: server
                .sku
                .as_ref()
                .and_then(|s| s.tier.clone())
                .unwrap_or_default(),
            state: text(&server.properties.state),
        }
    }
}

/// Flattened capability row for `list-skus` in table mode
#[derive(Debug, Serialize, PartialEq)]
struct SkuRow {
    tier: String,
    version: String,
    sku: String,
    #[serde(rename = "vCores")]
    vcores: String,
}

fn resource_group_of(id: &str) -> Option<String> {
    let mut segments = id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments.next().map(str::to_string);
        }
    }
    None
}

fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn array_field<'v>(value: &'v Value, key: &str) -> &'v [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Flatten provider capabilities into tier/version/sku rows
fn flatten_capabilities(capabilities: &Value) -> Vec<SkuRow> {
    let locations = match capabilities {
        Value::Array(items) => items.as_slice(),
        other => array_field(other, "value"),
    };

    let mut rows = Vec::new();
    for location in locations {
        for edition in array_field(location, "supportedFlexibleServerEditions") {
            let tier = text_field(edition, "name");
            for version in array_field(edition, "supportedServerVersions") {
                let version_name = text_field(version, "name");
                for vcore in array_field(version, "supportedVcores") {
                    let row = SkuRow {
                        tier: tier.clone(),
                        version: version_name.clone(),
                        sku: text_field(vcore, "name"),
                        vcores: text_field(vcore, "vCores"),
                    };
                    if !rows.contains(&row) {
                        rows.push(row);
                    }
                }
            }
        }
    }
    rows
}

/// Handle `<engine> flexible-server` commands
pub async fn handle_flexible_server_command(
    engine: DatabaseEngine,
    command: &FlexibleServerCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let settings = conn_mgr.settings_store()?;

    match command {
        FlexibleServerCommands::Create(args) => {
            handle_create(engine, args, conn_mgr, profile_name, &settings, output_format, query)
                .await
        }
        FlexibleServerCommands::Show(target) => {
            let client = conn_mgr.create_client(profile_name, None)?;
            let generator = RandomGenerator::new();
            let provisioner = Provisioner::new(&client, engine, &generator, &generator, &settings);
            let server = provisioner
                .show_server(
                    target.resource_group.as_deref(),
                    target.name.as_deref(),
                )
                .await?;
            print_output(
                &server,
                output::OutputFormat::from_cli(output_format, output::OutputFormat::Json),
                query,
            )?;
            Ok(())
        }
        FlexibleServerCommands::Update(args) => {
            handle_update(engine, args, conn_mgr, profile_name, &settings, output_format, query)
                .await
        }
        FlexibleServerCommands::Delete { target, yes } => {
            handle_delete(engine, target, *yes, conn_mgr, profile_name, &settings).await
        }
        FlexibleServerCommands::Start(target) => {
            handle_power(engine, PowerAction::Start, target, conn_mgr, profile_name, &settings)
                .await
        }
        FlexibleServerCommands::Stop(target) => {
            handle_power(engine, PowerAction::Stop, target, conn_mgr, profile_name, &settings)
                .await
        }
        FlexibleServerCommands::Restart(target) => {
            handle_power(engine, PowerAction::Restart, target, conn_mgr, profile_name, &settings)
                .await
        }
        FlexibleServerCommands::List { resource_group } => {
            let client = conn_mgr.create_client(profile_name, None)?;
            let generator = RandomGenerator::new();
            let provisioner = Provisioner::new(&client, engine, &generator, &generator, &settings);
            let servers = provisioner.list_servers(resource_group.as_deref()).await?;
            debug!("Found {} servers", servers.len());

            match output::OutputFormat::from_cli(output_format, output::OutputFormat::Json) {
                output::OutputFormat::Table => {
                    let rows: Vec<ServerSummary> =
                        servers.iter().map(ServerSummary::from_server).collect();
                    if rows.is_empty() {
                        println!("No {} flexible servers found.", engine.display_name());
                        return Ok(());
                    }
                    print_output(&rows, output::OutputFormat::Table, query)?;
                }
                format => print_output(&servers, format, query)?,
            }
            Ok(())
        }
        FlexibleServerCommands::ListSkus { location } => {
            let client = conn_mgr.create_client(profile_name, None)?;
            let generator = RandomGenerator::new();
            let provisioner = Provisioner::new(&client, engine, &generator, &generator, &settings);
            let capabilities = provisioner.list_skus(location.as_deref()).await?;

            match output::OutputFormat::from_cli(output_format, output::OutputFormat::Json) {
                output::OutputFormat::Table => {
                    let rows = flatten_capabilities(&capabilities);
                    if rows.is_empty() {
                        print_output(&capabilities, output::OutputFormat::Json, query)?;
                    } else {
                        print_output(&rows, output::OutputFormat::Table, query)?;
                    }
                }
                format => print_output(&capabilities, format, query)?,
            }
            Ok(())
        }
        FlexibleServerCommands::ShowConnectionString {
            server_name,
            admin_user,
            admin_password,
            database_name,
        } => handle_show_connection_string(
            engine,
            server_name.as_deref(),
            admin_user.as_deref(),
            admin_password.as_deref(),
            database_name.as_deref(),
            &settings,
            output_format,
            query,
        ),
    }
}

fn create_args(args: &CreateArgs) -> CliResult<CreateServerArgs> {
    Ok(CreateServerArgs {
        resource_group: args.target.resource_group.clone(),
        name: args.target.name.clone(),
        location: args.location.clone(),
        sku_name: args.sku_name.clone(),
        tier: args.tier.clone(),
        version: args.version.clone(),
        admin_user: args.admin_user.clone(),
        admin_password: args.admin_password.clone(),
        storage_mb: args.storage_mb,
        backup_retention_days: args.backup_retention_days,
        public_network_access: args.public_network_access.clone(),
        assign_identity: args.assign_identity,
        tags: parse_tags(&args.tags)?,
        network: VnetSpec {
            vnet: args.vnet.clone(),
            subnet: args.subnet.clone(),
            vnet_address_prefix: args.vnet_address_prefix.clone(),
            subnet_address_prefix: args.subnet_address_prefix.clone(),
        },
        vnet_auto: args.vnet_auto,
    })
}

async fn handle_create(
    engine: DatabaseEngine,
    args: &CreateArgs,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    settings: &FileSettingsStore,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let request = create_args(args)?;

    let (pb, client) = client_with_spinner(
        conn_mgr,
        profile_name,
        &format!("Creating {} flexible server", engine.display_name()),
    )?;
    let generator = RandomGenerator::new();
    let provisioner = Provisioner::new(&client, engine, &generator, &generator, settings);

    let result = provisioner.create_server(&request).await;
    pb.finish_and_clear();
    let response = result?;

    print_server_response(&response, output_format, query)
}

/// Create responses print as a Property/Value table in table mode, JSON otherwise
fn print_server_response(
    response: &ServerResponse,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    match output::OutputFormat::from_cli(output_format, output::OutputFormat::Json) {
        output::OutputFormat::Table if query.is_none() => {
            let rows: Vec<DetailRow> = response
                .table_rows()
                .into_iter()
                .map(|(property, value)| DetailRow {
                    property: property.to_string(),
                    value,
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::modern());
            println!("{}", table);
        }
        format => print_output(response, format, query)?,
    }
    Ok(())
}

async fn handle_update(
    engine: DatabaseEngine,
    args: &UpdateArgs,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    settings: &FileSettingsStore,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let update = UpdateServerArgs {
        sku_name: args.sku_name.clone(),
        tier: args.tier.clone(),
        storage_mb: args.storage_mb,
        backup_retention_days: args.backup_retention_days,
        admin_password: args.admin_password.clone(),
        tags: args.tags.as_deref().map(parse_tags).transpose()?,
    };

    let (pb, client) = client_with_spinner(
        conn_mgr,
        profile_name,
        &format!("Updating {} flexible server", engine.display_name()),
    )?;
    let generator = RandomGenerator::new();
    let provisioner = Provisioner::new(&client, engine, &generator, &generator, settings);

    let result = provisioner
        .update_server(
            args.target.resource_group.as_deref(),
            args.target.name.as_deref(),
            &update,
        )
        .await;
    pb.finish_and_clear();
    let server = result?;

    print_output(
        &server,
        output::OutputFormat::from_cli(output_format, output::OutputFormat::Json),
        query,
    )?;
    Ok(())
}

async fn handle_delete(
    engine: DatabaseEngine,
    target: &ServerTarget,
    yes: bool,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    settings: &FileSettingsStore,
) -> CliResult<()> {
    let (resource_group, name) = resolve_target(
        engine,
        target.resource_group.as_deref(),
        target.name.as_deref(),
        settings,
    )?;

    if !yes
        && !confirm_action(&format!(
            "delete server '{}' in resource group '{}'",
            name, resource_group
        ))?
    {
        println!("Operation cancelled");
        return Ok(());
    }

    let (pb, client) = client_with_spinner(
        conn_mgr,
        profile_name,
        &format!("Deleting server '{}'", name),
    )?;
    let generator = RandomGenerator::new();
    let provisioner = Provisioner::new(&client, engine, &generator, &generator, settings);
    let result = provisioner
        .delete_server(Some(&resource_group), Some(&name))
        .await;
    pb.finish_and_clear();
    result?;

    println!(
        "{} Deleted server '{}' in resource group '{}'",
        "✓".green(),
        name,
        resource_group
    );
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum PowerAction {
    Start,
    Stop,
    Restart,
}

impl PowerAction {
    fn verb(self) -> &'static str {
        match self {
            PowerAction::Start => "Started",
            PowerAction::Stop => "Stopped",
            PowerAction::Restart => "Restarted",
        }
    }

    fn progressive(self) -> &'static str {
        match self {
            PowerAction::Start => "Starting",
            PowerAction::Stop => "Stopping",
            PowerAction::Restart => "Restarting",
        }
    }
}

async fn handle_power(
    engine: DatabaseEngine,
    action: PowerAction,
    target: &ServerTarget,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    settings: &FileSettingsStore,
) -> CliResult<()> {
    let (resource_group, name) = resolve_target(
        engine,
        target.resource_group.as_deref(),
        target.name.as_deref(),
        settings,
    )?;

    let (pb, client) = client_with_spinner(
        conn_mgr,
        profile_name,
        &format!("{} server '{}'", action.progressive(), name),
    )?;
    let generator = RandomGenerator::new();
    let provisioner = Provisioner::new(&client, engine, &generator, &generator, settings);
    let (rg, n) = (Some(resource_group.as_str()), Some(name.as_str()));
    let result = match action {
        PowerAction::Start => provisioner.start_server(rg, n).await,
        PowerAction::Stop => provisioner.stop_server(rg, n).await,
        PowerAction::Restart => provisioner.restart_server(rg, n).await,
    };
    pb.finish_and_clear();
    result?;

    println!("{} {} server '{}'", "✓".green(), action.verb(), name);
    Ok(())
}

/// Spinner plus a client that reports long-running operation progress to it
fn client_with_spinner(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    message: &str,
) -> CliResult<(ProgressBar, ArmClient)> {
    let (pb, on_progress) = operation_spinner(message);
    match conn_mgr.create_client(profile_name, Some(on_progress)) {
        Ok(client) => Ok((pb, client)),
        Err(e) => {
            pb.finish_and_clear();
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_show_connection_string(
    engine: DatabaseEngine,
    server_name: Option<&str>,
    admin_user: Option<&str>,
    admin_password: Option<&str>,
    database_name: Option<&str>,
    settings: &dyn SettingsStore,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let server_name = server_name
        .map(str::to_string)
        .or_else(|| settings.get(engine.command_group(), SERVER_NAME_KEY))
        .ok_or_else(|| FlexCtlError::InvalidInput {
            message: "--server-name is required (no server name in local context)".to_string(),
        })?;

    let strings = connection_strings(engine, &server_name, admin_user, admin_password, database_name);

    match output::OutputFormat::from_cli(output_format, output::OutputFormat::Table) {
        output::OutputFormat::Table => print_output(&strings, output::OutputFormat::Table, query)?,
        format => print_output(
            serde_json::json!({ "connectionStrings": strings }),
            format,
            query,
        )?,
    }
    Ok(())
}
