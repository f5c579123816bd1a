use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use guild_ledger::{EventRecord, RegistryEvent, WeightSubject};
use guild_registry::{MembershipRegistry, RegistryConfig, SystemClock};
use guild_types::{AccountId, Capability, CredentialId, Timepoint};
use serde_json::json;

use crate::cli::*;

type Registry = MembershipRegistry<SystemClock>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let out = Output { format: cli.format };
    let state = cli.state.as_path();
    match cli.command {
        Command::Init(args) => cmd_init(state, args, &out),
        Command::Account(args) => cmd_account(args, &out),
        Command::Mint(args) => mutate(state, |r| cmd_mint(r, args, &out)),
        Command::Burn(args) => mutate(state, |r| cmd_burn(r, args, &out)),
        Command::BurnBatch(args) => mutate(state, |r| cmd_burn_batch(r, args, &out)),
        Command::Grant(args) => mutate(state, |r| {
            let changed = r.grant(args.caller, args.capability, args.account)?;
            out.role_change("Granted", args.capability, &args.account, changed);
            Ok(())
        }),
        Command::Revoke(args) => mutate(state, |r| {
            let changed = r.revoke(args.caller, args.capability, args.account)?;
            out.role_change("Revoked", args.capability, &args.account, changed);
            Ok(())
        }),
        Command::Renounce(args) => mutate(state, |r| {
            let changed = r.renounce(args.caller, args.capability, args.confirm)?;
            out.role_change("Renounced", args.capability, &args.caller, changed);
            Ok(())
        }),
        Command::Delegate(args) => mutate(state, |r| cmd_delegate(r, args, &out)),
        Command::Balance(args) => query(state, |r| cmd_balance(r, args, &out)),
        Command::Owner(args) => query(state, |r| cmd_owner(r, args, &out)),
        Command::Uri(args) => query(state, |r| cmd_uri(r, args, &out)),
        Command::Votes(args) => query(state, |r| cmd_votes(r, args, &out)),
        Command::Supply(args) => query(state, |r| cmd_supply(r, args, &out)),
        Command::Roles(args) => query(state, |r| cmd_roles(r, args, &out)),
        Command::Events(args) => query(state, |r| cmd_events(r, args, &out)),
        Command::Verify => query(state, |r| cmd_verify(r, &out)),
    }
}

fn load(state: &Path) -> anyhow::Result<Registry> {
    if !state.exists() {
        bail!("no registry at {} (run `guild init` first)", state.display());
    }
    MembershipRegistry::load_snapshot(SystemClock::new(), state)
        .with_context(|| format!("loading registry from {}", state.display()))
}

fn query(state: &Path, f: impl FnOnce(&Registry) -> anyhow::Result<()>) -> anyhow::Result<()> {
    f(&load(state)?)
}

/// Load, apply, and persist only if the operation succeeded.
fn mutate(state: &Path, f: impl FnOnce(&Registry) -> anyhow::Result<()>) -> anyhow::Result<()> {
    let registry = load(state)?;
    f(&registry)?;
    registry
        .save_snapshot(state)
        .with_context(|| format!("saving registry to {}", state.display()))
}

/// An existing snapshot is never replaced; remove the file to start over.
fn cmd_init(state: &Path, args: InitArgs, out: &Output) -> anyhow::Result<()> {
    if state.exists() {
        bail!(
            "{} already holds a registry; remove it first to start a new one",
            state.display()
        );
    }
    let config = RegistryConfig::load(&args.config)
        .with_context(|| format!("reading config {}", args.config.display()))?;
    let registry = MembershipRegistry::from_config(SystemClock::new(), &config)?;
    registry.save_snapshot(state)?;

    match out.format {
        OutputFormat::Text => {
            println!(
                "{} Initialized registry {} ({}) in {}",
                "✓".green().bold(),
                config.name.bold(),
                config.symbol.yellow(),
                state.display()
            );
            println!("  Admin: {}", config.admin.to_string().cyan());
            println!("  Timelock: {}", config.timelock.to_string().cyan());
        }
        OutputFormat::Json => out.json(json!({
            "name": config.name,
            "symbol": config.symbol,
            "admin": config.admin,
            "timelock": config.timelock,
        })),
    }
    Ok(())
}


fn cmd_account(args: AccountArgs, out: &Output) -> anyhow::Result<()> {
    let account = AccountId::from_label(&args.label);
    out.value(
        &format!("{} {}", args.label.bold(), account.to_hex().cyan()),
        json!({ "label": args.label, "account": account }),
    );
    Ok(())
}

fn cmd_mint(registry: &Registry, args: MintArgs, out: &Output) -> anyhow::Result<()> {
    let ids = registry.mint(args.caller, &args.recipients)?;
    match out.format {
        OutputFormat::Text => {
            println!("{} Minted {} credentials", "✓".green().bold(), ids.len());
            for (id, recipient) in ids.iter().zip(&args.recipients) {
                println!("  {} → {}", id.to_string().yellow(), recipient.to_string().cyan());
            }
        }
        OutputFormat::Json => out.json(json!({
            "minted": ids.iter().zip(&args.recipients)
                .map(|(id, to)| json!({ "id": id.value(), "to": to }))
                .collect::<Vec<_>>(),
        })),
    }
    Ok(())
}

fn cmd_burn(registry: &Registry, args: BurnArgs, out: &Output) -> anyhow::Result<()> {
    registry.burn(args.caller, CredentialId(args.id))?;
    out.done(&format!("Burned credential {}", args.id), json!({ "burned": [args.id] }));
    Ok(())
}

fn cmd_burn_batch(registry: &Registry, args: BurnBatchArgs, out: &Output) -> anyhow::Result<()> {
    let ids: Vec<_> = args.ids.iter().copied().map(CredentialId).collect();
    registry.burn_batch(args.caller, &ids)?;
    out.done(&format!("Burned {} credentials", ids.len()), json!({ "burned": args.ids }));
    Ok(())
}

fn cmd_delegate(registry: &Registry, args: DelegateArgs, out: &Output) -> anyhow::Result<()> {
    registry.delegate(args.caller, args.delegatee)?;
    out.done(
        &format!("{} now delegates to {}", args.caller, display_account(&args.delegatee)),
        json!({ "delegator": args.caller, "delegatee": args.delegatee }),
    );
    Ok(())
}

fn cmd_balance(registry: &Registry, args: AccountQueryArgs, out: &Output) -> anyhow::Result<()> {
    let balance = registry.balance_of(&args.account)?;
    out.value(
        &format!("{}: {} credentials", args.account, balance.to_string().bold()),
        json!({ "account": args.account, "balance": balance }),
    );
    Ok(())
}

fn cmd_owner(registry: &Registry, args: CredentialArgs, out: &Output) -> anyhow::Result<()> {
    let owner = registry.owner_of(CredentialId(args.id))?;
    out.value(
        &format!("Credential {} held by {}", args.id, owner.to_string().cyan()),
        json!({ "id": args.id, "owner": owner }),
    );
    Ok(())
}

fn cmd_uri(registry: &Registry, args: CredentialArgs, out: &Output) -> anyhow::Result<()> {
    let uri = registry.token_uri(CredentialId(args.id))?;
    let shown = if uri.is_empty() {
        "(none)".dimmed().to_string()
    } else {
        uri.blue().to_string()
    };
    out.value(&shown, json!({ "id": args.id, "uri": uri }));
    Ok(())
}

fn cmd_roles(registry: &Registry, args: AccountQueryArgs, out: &Output) -> anyhow::Result<()> {
    let caps = registry.capabilities_of(&args.account)?;
    let names: Vec<_> = caps.iter().map(Capability::as_str).collect();
    let shown = if names.is_empty() {
        "(none)".dimmed().to_string()
    } else {
        names.join(", ").yellow().to_string()
    };
    out.value(
        &format!("{}: {}", args.account, shown),
        json!({ "account": args.account, "capabilities": names }),
    );
    Ok(())
}

fn cmd_votes(registry: &Registry, args: VotesArgs, out: &Output) -> anyhow::Result<()> {
    let votes = match args.at {
        Some(at) => registry.get_past_votes(&args.account, Timepoint(at))?,
        None => registry.get_votes(&args.account)?,
    };
    let delegatee = registry.delegates(&args.account)?;
    let when = args.at.map(format_time).unwrap_or_else(|| "now".into());
    out.value(
        &format!(
            "{}: {} votes at {} (delegates to {})",
            args.account,
            votes.to_string().bold(),
            when,
            display_account(&delegatee)
        ),
        json!({
            "account": args.account,
            "votes": votes,
            "at": args.at,
            "delegates": delegatee,
        }),
    );
    Ok(())
}

fn cmd_supply(registry: &Registry, args: SupplyArgs, out: &Output) -> anyhow::Result<()> {
    let weight = match args.at {
        Some(at) => registry.get_past_total_supply(Timepoint(at))?,
        None => registry.get_total_supply()?,
    };
    let held = registry.total_supply()?;
    let next = registry.next_credential_id()?;
    match out.format {
        OutputFormat::Text => {
            println!("{} {}", registry.name()?.bold(), registry.symbol()?.yellow());
            println!("  Voting weight: {}", weight.to_string().bold());
            if args.at.is_none() {
                println!("  Held credentials: {}", held);
                println!("  Minted so far: {}", next.value());
            }
        }
        OutputFormat::Json => out.json(json!({
            "voting_weight": weight,
            "at": args.at,
            "held": held,
            "next_id": next.value(),
            "clock_mode": registry.clock_mode(),
        })),
    }
    Ok(())
}

fn cmd_events(registry: &Registry, args: EventsArgs, out: &Output) -> anyhow::Result<()> {
    let records = registry.events_since(args.since)?;
    match out.format {
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No events.");
            }
            for record in &records {
                println!(
                    "{} {} {:<18} {}",
                    format!("#{}", record.seq).yellow(),
                    format_time(record.timepoint.as_secs()).dimmed(),
                    record.event.kind().bold(),
                    describe(record)
                );
            }
        }
        OutputFormat::Json => out.json(serde_json::to_value(&records)?),
    }
    Ok(())
}

fn cmd_verify(registry: &Registry, out: &Output) -> anyhow::Result<()> {
    let count = registry.events()?.len();
    registry.verify_events()?;
    out.done(
        &format!("Event log integrity verified ({count} records)"),
        json!({ "verified": true, "records": count }),
    );
    Ok(())
}

fn describe(record: &EventRecord) -> String {
    match &record.event {
        RegistryEvent::Initialized { name, symbol } => format!("{name} ({symbol})"),
        RegistryEvent::Transfer { from, to, id } => format!(
            "{id}: {} → {}",
            from.map(|a| a.to_string()).unwrap_or_else(|| "∅".into()),
            to.map(|a| a.to_string()).unwrap_or_else(|| "∅".into())
        ),
        RegistryEvent::RoleGranted { capability, account, sender }
        | RegistryEvent::RoleRevoked { capability, account, sender } => {
            format!("{capability} {account} by {sender}")
        }
        RegistryEvent::DelegateChanged { delegator, from_delegate, to_delegate } => format!(
            "{delegator}: {} → {}",
            display_account(from_delegate),
            display_account(to_delegate)
        ),
        RegistryEvent::WeightCheckpointed { subject, previous, current } => {
            let subject = match subject {
                WeightSubject::Account(account) => account.to_string(),
                WeightSubject::Total => "total".into(),
            };
            format!("{subject}: {previous} → {current}")
        }
    }
}

fn display_account(account: &AccountId) -> String {
    if account.is_null() {
        "nobody".into()
    } else {
        account.to_string()
    }
}

fn format_time(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| format!("{secs}s"))
}

struct Output {
    format: OutputFormat,
}

impl Output {
    fn json(&self, value: serde_json::Value) {
        println!("{value:#}");
    }

    fn done(&self, text: &str, value: serde_json::Value) {
        match self.format {
            OutputFormat::Text => println!("{} {}", "✓".green().bold(), text),
            OutputFormat::Json => self.json(value),
        }
    }

    fn value(&self, text: &str, value: serde_json::Value) {
        match self.format {
            OutputFormat::Text => println!("{text}"),
            OutputFormat::Json => self.json(value),
        }
    }

    fn role_change(&self, verb: &str, capability: Capability, account: &AccountId, changed: bool) {
        let text = if changed {
            format!("{verb} {} for {}", capability.as_str().yellow(), account)
        } else {
            format!("{} {} for {}: no change", verb, capability.as_str(), account)
        };
        self.done(
            &text,
            json!({ "capability": capability, "account": account, "changed": changed }),
        );
    }
}
