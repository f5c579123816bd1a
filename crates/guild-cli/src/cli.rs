use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use guild_types::{AccountId, Capability};

#[derive(Parser)]
#[command(
    name = "guild",
    about = "Guild membership registry: credentials, roles and voting power",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Registry snapshot file
    #[arg(long, global = true, default_value = "guild-state.json")]
    pub state: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new registry from a TOML config
    Init(InitArgs),
    /// Show the account id derived from a label
    Account(AccountArgs),
    /// Issue credentials to recipients
    Mint(MintArgs),
    /// Burn one credential
    Burn(BurnArgs),
    /// Burn several credentials, all or nothing
    BurnBatch(BurnBatchArgs),
    /// Grant a capability
    Grant(RoleArgs),
    /// Revoke a capability
    Revoke(RoleArgs),
    /// Give up one of the caller's capabilities
    Renounce(RenounceArgs),
    /// Delegate the caller's voting weight
    Delegate(DelegateArgs),
    /// Show an account's credential count
    Balance(AccountQueryArgs),
    /// Show the holder of a credential
    Owner(CredentialArgs),
    /// Show a credential's URI
    Uri(CredentialArgs),
    /// Show an account's voting weight
    Votes(VotesArgs),
    /// Show total voting weight
    Supply(SupplyArgs),
    /// List an account's capabilities
    Roles(AccountQueryArgs),
    /// List recorded events
    Events(EventsArgs),
    /// Verify event log integrity
    Verify,
}

/// Hex digits at or above which an unprefixed string is taken as a mistyped
/// id rather than a label.
const HEX_LOOKALIKE_DIGITS: usize = 32;

/// Accepts a 64-character hex id (optionally `0x`-prefixed), `null`, or a
/// label to derive an id from.
///
/// Anything with a `0x` prefix must be a full id. An unprefixed run of at
/// least 32 hex digits is rejected unless it has exactly 64, so a truncated
/// id is never silently hashed into an unrelated account.
pub fn parse_account(s: &str) -> Result<AccountId, String> {
    if s.eq_ignore_ascii_case("null") {
        return Ok(AccountId::NULL);
    }
    if let Some(hex) = s.strip_prefix("0x") {
        return parse_hex_account(hex);
    }
    let looks_hex = s.len() >= HEX_LOOKALIKE_DIGITS && s.chars().all(|c| c.is_ascii_hexdigit());
    if s.len() == 64 || looks_hex {
        return parse_hex_account(s);
    }
    Ok(AccountId::from_label(s))
}

fn parse_hex_account(hex: &str) -> Result<AccountId, String> {
    if hex.len() != 64 {
        return Err(format!("account id must be 64 hex digits, got {}", hex.len()));
    }
    AccountId::from_hex(hex).map_err(|e| e.to_string())
}

#[derive(Args)]
pub struct InitArgs {
    #[arg(short, long)]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct AccountArgs {
    pub label: String,
}

#[derive(Args)]
pub struct MintArgs {
    #[arg(long, value_parser = parse_account)]
    pub caller: AccountId,
    #[arg(required = true, value_parser = parse_account)]
    pub recipients: Vec<AccountId>,
}

#[derive(Args)]
pub struct BurnArgs {
    #[arg(long, value_parser = parse_account)]
    pub caller: AccountId,
    pub id: u64,
}

#[derive(Args)]
pub struct BurnBatchArgs {
    #[arg(long, value_parser = parse_account)]
    pub caller: AccountId,
    #[arg(required = true)]
    pub ids: Vec<u64>,
}

#[derive(Args)]
pub struct RoleArgs {
    #[arg(long, value_parser = parse_account)]
    pub caller: AccountId,
    pub capability: Capability,
    #[arg(value_parser = parse_account)]
    pub account: AccountId,
}

#[derive(Args)]
pub struct RenounceArgs {
    #[arg(long, value_parser = parse_account)]
    pub caller: AccountId,
    pub capability: Capability,
    /// Must repeat the caller
    #[arg(long, value_parser = parse_account)]
    pub confirm: AccountId,
}

#[derive(Args)]
pub struct DelegateArgs {
    #[arg(long, value_parser = parse_account)]
    pub caller: AccountId,
    /// `null` to abstain
    #[arg(value_parser = parse_account)]
    pub delegatee: AccountId,
}

#[derive(Args)]
pub struct AccountQueryArgs {
    #[arg(value_parser = parse_account)]
    pub account: AccountId,
}

#[derive(Args)]
pub struct CredentialArgs {
    pub id: u64,
}

#[derive(Args)]
pub struct VotesArgs {
    #[arg(value_parser = parse_account)]
    pub account: AccountId,
    /// Past timepoint (UNIX seconds)
    #[arg(long)]
    pub at: Option<u64>,
}

#[derive(Args)]
pub struct SupplyArgs {
    #[arg(long)]
    pub at: Option<u64>,
}

#[derive(Args)]
pub struct EventsArgs {
    /// Only events after this sequence number
    #[arg(long, default_value = "0")]
    pub since: u64,
}
