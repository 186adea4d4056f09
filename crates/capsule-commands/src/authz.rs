//! Authorization gate: who may run which command.

use std::fmt;
use std::str::FromStr;

use capsule_core::models::Registry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    User,
    Admin,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::User => "user",
            Tier::Admin => "admin",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every command the router knows. Anything else parses to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    Help,
    Init,
    Status,
    Rename,
    Snooze,
    Unsnooze,
    Doctor,
    Archive,
    Unarchive,
    Upgrade,
    List,
    AdminAdd,
    AdminRemove,
    SyncConfig,
    Unknown,
}

impl Command {
    /// Known commands, in help order.
    pub const KNOWN: [Command; 14] = [
        Command::Help,
        Command::Init,
        Command::Status,
        Command::Rename,
        Command::Snooze,
        Command::Unsnooze,
        Command::Doctor,
        Command::Archive,
        Command::Unarchive,
        Command::Upgrade,
        Command::List,
        Command::AdminAdd,
        Command::AdminRemove,
        Command::SyncConfig,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Init => "init",
            Command::Status => "status",
            Command::Rename => "rename",
            Command::Snooze => "snooze",
            Command::Unsnooze => "unsnooze",
            Command::Doctor => "doctor",
            Command::Archive => "archive",
            Command::Unarchive => "unarchive",
            Command::Upgrade => "upgrade",
            Command::List => "list",
            Command::AdminAdd => "admin-add",
            Command::AdminRemove => "admin-remove",
            Command::SyncConfig => "sync-config",
            Command::Unknown => "unknown",
        }
    }

    /// Lenient parse for user input: a leading `/` and case are ignored,
    /// unrecognized names become `Unknown`.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().trim_start_matches('/').to_ascii_lowercase();
        name.parse().unwrap_or(Command::Unknown)
    }

    pub fn required_tier(self) -> Tier {
        match self {
            Command::Help
            | Command::Init
            | Command::Status
            | Command::Rename
            | Command::Snooze
            | Command::Unsnooze
            | Command::Doctor => Tier::User,
            Command::Archive
            | Command::Unarchive
            | Command::Upgrade
            | Command::List
            | Command::AdminAdd
            | Command::AdminRemove
            | Command::SyncConfig => Tier::Admin,
            // Anything unrecognized needs the highest tier.
            Command::Unknown => Tier::Admin,
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Init => "init <slug> [type]",
            Command::Status => "status",
            Command::Rename => "rename <name>",
            Command::Snooze => "snooze [days]",
            Command::Unsnooze => "unsnooze",
            Command::Doctor => "doctor",
            Command::Archive => "archive",
            Command::Unarchive => "unarchive",
            Command::Upgrade => "upgrade",
            Command::List => "list",
            Command::AdminAdd => "admin-add <id>",
            Command::AdminRemove => "admin-remove <id>",
            Command::SyncConfig => "sync-config",
            Command::Unknown => "",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Command::KNOWN
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Denied { message: String },
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allowed)
    }

    fn denied(message: impl Into<String>) -> Self {
        AuthDecision::Denied {
            message: message.into(),
        }
    }
}

/// Decide whether `caller_id` may run `command`.
///
/// With no admins yet, user-tier commands are open to anyone and admin-tier
/// commands to no one. Once admins exist, admin-tier needs admin membership
/// and user-tier needs admin membership or a place on `allow_list`. Ids are
/// compared exactly.
pub fn authorize(
    command: Command,
    caller_id: &str,
    registry: &Registry,
    allow_list: &[String],
) -> AuthDecision {
    let tier = command.required_tier();

    if registry.admin_ids.is_empty() {
        return match tier {
            Tier::User => AuthDecision::Allowed,
            Tier::Admin => AuthDecision::denied(format!(
                "`{command}` needs an admin, and none is configured yet. Run `init` first."
            )),
        };
    }

    if registry.is_admin(caller_id) {
        return AuthDecision::Allowed;
    }
    match tier {
        Tier::Admin => AuthDecision::denied(format!("`{command}` is restricted to admins.")),
        Tier::User if allow_list.iter().any(|id| id == caller_id) => AuthDecision::Allowed,
        Tier::User => AuthDecision::denied(format!("You are not allowed to run `{command}` here.")),
    }
}
