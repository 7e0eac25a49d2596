use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use ipchanger_core::{ApplierConfig, ApplyOutcome, ConnectionApplier};
use ipchanger_storage::{
    find, remove, upsert, validate, FileSettings, Profile, ProfileInput, ProfileStore,
    SettingsBackend, ValidationErrors,
};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "ipchanger", version, subcommand_required = true)]
pub struct Args {
    /// Directory holding the profile settings (defaults to the user config dir)
    #[arg(long, global = true)]
    pub settings_dir: Option<PathBuf>,
    /// nmcli executable to drive
    #[arg(long, global = true, default_value = "nmcli")]
    pub nmcli: PathBuf,
    /// Milliseconds between taking the connection down and bringing it up again
    #[arg(long, global = true, default_value_t = 2000)]
    pub cycle_delay_ms: u64,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show saved IP profiles
    List,
    /// Save a new IP profile
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        ip: String,
        /// CIDR prefix length
        #[arg(long, default_value = "24")]
        subnet: String,
        #[arg(long)]
        gateway: String,
        /// Comma-separated DNS servers (optional)
        #[arg(long, default_value = "")]
        dns: String,
    },
    /// Change fields of a saved IP profile
    Edit {
        /// Profile id (or name)
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        subnet: Option<String>,
        #[arg(long)]
        gateway: Option<String>,
        #[arg(long)]
        dns: Option<String>,
    },
    /// Delete a saved IP profile
    Remove {
        /// Profile id
        id: String,
    },
    /// Apply an IP profile to the active connection
    Apply {
        /// Profile id or name
        profile: String,
    },
    /// Reset the active connection to DHCP
    Dhcp,
    /// Print the name of the active connection
    Active,
}

pub async fn run_cli(args: Args) -> anyhow::Result<()> {
    let settings = match args.settings_dir {
        Some(dir) => FileSettings::with_dir(dir),
        None => FileSettings::new()?,
    };
    debug!("Settings directory: {:?}", settings.dir());
    let store = ProfileStore::new(settings);
    let nmcli = args.nmcli;
    let applier = ConnectionApplier::new(ApplierConfig {
        nmcli: nmcli.clone(),
        cycle_delay: Duration::from_millis(args.cycle_delay_ms),
    });

    match args.command {
        Command::List => list_profiles(&store),
        Command::Add {
            name,
            ip,
            subnet,
            gateway,
            dns,
        } => {
            let input = ProfileInput {
                id: None,
                name,
                ip,
                subnet,
                gateway,
                dns,
            };
            let profile = save_profile(&store, input)?;
            println!("Added IP profile: {} ({})", profile.name(), profile.id());
            Ok(())
        }
        Command::Edit {
            id,
            name,
            ip,
            subnet,
            gateway,
            dns,
        } => {
            let profiles = store.load();
            let existing =
                find(&profiles, &id).ok_or_else(|| anyhow!("No IP profile '{id}'"))?;
            let mut input = ProfileInput::from(existing);
            if let Some(v) = name {
                input.name = v;
            }
            if let Some(v) = ip {
                input.ip = v;
            }
            if let Some(v) = subnet {
                input.subnet = v;
            }
            if let Some(v) = gateway {
                input.gateway = v;
            }
            if let Some(v) = dns {
                input.dns = v;
            }
            let profile = save_profile(&store, input)?;
            println!("Updated IP profile: {}", profile.name());
            Ok(())
        }
        Command::Remove { id } => {
            let profiles = store.load();
            let before = profiles.len();
            let profiles = remove(profiles, &id);
            if profiles.len() == before {
                println!("No IP profile with id '{id}'");
                return Ok(());
            }
            store
                .save(&profiles)
                .context("Failed to save IP profiles")?;
            println!("Removed IP profile {id}");
            Ok(())
        }
        Command::Apply { profile } => {
            let profiles = store.load();
            let profile =
                find(&profiles, &profile).ok_or_else(|| anyhow!("No IP profile '{profile}'"))?;
            let outcome = applier
                .apply_profile(profile)
                .await
                .map_err(|e| anyhow!("Failed to apply IP profile: {e}"))?;
            finish(&applier, &nmcli, outcome).await;
            Ok(())
        }
        Command::Dhcp => {
            let outcome = applier
                .reset_to_dhcp()
                .await
                .map_err(|e| anyhow!("Failed to switch to DHCP: {e}"))?;
            finish(&applier, &nmcli, outcome).await;
            Ok(())
        }
        Command::Active => match applier.active_connection_name().await {
            Some(name) => {
                println!("{name}");
                Ok(())
            }
            None => bail!("No active connection found"),
        },
    }
}

fn list_profiles<B: SettingsBackend>(store: &ProfileStore<B>) -> anyhow::Result<()> {
    let profiles = store.load();
    if profiles.is_empty() {
        println!("No IP profiles configured");
        return Ok(());
    }
    for p in &profiles {
        println!(
            "{}  {}  IP: {}  gateway: {}  dns: {}",
            p.id(),
            p.name(),
            p.address(),
            p.gateway(),
            p.dns().unwrap_or("-")
        );
    }
    Ok(())
}

/// Validate, replace-or-append, and persist. Every invalid field is listed.
fn save_profile<B: SettingsBackend>(
    store: &ProfileStore<B>,
    input: ProfileInput,
) -> anyhow::Result<Profile> {
    let profile = validate(input).map_err(|errors| {
        report_invalid(&errors);
        anyhow!("Invalid IP profile")
    })?;
    let profiles = upsert(store.load(), profile.clone());
    store
        .save(&profiles)
        .context("Failed to save IP profiles")?;
    Ok(profile)
}

fn report_invalid(errors: &ValidationErrors) {
    for e in errors.iter() {
        eprintln!("  {}: {}", e.field, e.reason);
    }
}

/// Print the notification, then keep the process alive until the connection
/// is back up. Ctrl-C cancels the pending cycle.
async fn finish(applier: &ConnectionApplier, nmcli: &Path, outcome: ApplyOutcome) {
    println!("{}", outcome.notification);
    info!("Restarting connection '{}'", outcome.connection);
    tokio::select! {
        result = outcome.cycle.wait() => {
            if let Err(w) = result {
                debug!("Cycle ended with warning: {w}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            if applier.cancel_pending_cycle() {
                eprintln!("{}", cancelled_notice(nmcli, &outcome.connection));
            }
        }
    }
}

/// What to tell the user when the cycle was aborted: the connection may have
/// been taken down already and nothing will bring it back up.
fn cancelled_notice(nmcli: &Path, connection: &str) -> String {
    format!(
        "Connection restart cancelled; '{connection}' may be left down.\n\
         Restore it with: {} connection up {}",
        nmcli.display(),
        shell_quote(connection)
    )
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
