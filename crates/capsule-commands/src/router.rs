//! CommandRouter: authorize, dispatch, and answer one tenant command.
//!
//! Every command runs against the tenant addressed by `(group_id, thread_id)`.
//! User-correctable problems come back as response text; only store and
//! artifact integrity failures surface as `CommandError`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use capsule_core::config::CapsuleConfig;
use capsule_core::constants::{
    CURRENT_CAPSULE_VERSION, DEFAULT_MAX_ENTRIES, DEFAULT_SNOOZE_DAYS, MAX_NAME_LEN,
    MAX_SNOOZE_DAYS,
};
use capsule_core::errors::{CommandError, StoreError};
use capsule_core::models::{
    is_valid_slug, InteractiveControl, Registry, TenantEntry, TenantKey, TenantStatus,
    TenantType,
};
use capsule_core::tracing::events;
use capsule_core::traits::{ArtifactSource, Clock, GatewayControl};
use capsule_storage::config_artifact::regenerate;
use capsule_storage::{registry_hash, GeneratedConfig, RegistryStore};
use capsule_validation::{CheckContext, CheckEngine, CheckSettings, JobRegistry};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use crate::authz::{authorize, AuthDecision, Command};
use crate::restart::RestartThrottle;

/// One command invocation as received from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub name: String,
    /// Everything after the command name, untrimmed.
    #[serde(default)]
    pub args: String,
    pub caller_id: String,
    pub group_id: String,
    pub thread_id: String,
    /// Per-call allow-list; replaces the configured one when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_list: Option<Vec<String>>,
}

impl CommandRequest {
    pub fn new(
        name: impl Into<String>,
        args: impl Into<String>,
        caller_id: impl Into<String>,
        key: &TenantKey,
    ) -> Self {
        Self {
            name: name.into(),
            args: args.into(),
            caller_id: caller_id.into(),
            group_id: key.group_id.clone(),
            thread_id: key.thread_id.clone(),
            allow_list: None,
        }
    }

    /// Rebuild a request from an interactive control payload of the form
    /// `<command>:<group>:<thread>[:<args>]`.
    pub fn from_control(action: &str, caller_id: impl Into<String>) -> Option<Self> {
        let mut parts = action.splitn(4, ':');
        let name = parts.next().filter(|s| !s.is_empty())?;
        let group = parts.next().filter(|s| !s.is_empty())?;
        let thread = parts.next().filter(|s| !s.is_empty())?;
        let args = parts.next().unwrap_or_default();
        Some(Self::new(name, args, caller_id, &TenantKey::new(group, thread)))
    }

    pub fn with_allow_list(mut self, allow_list: Vec<String>) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    pub fn key(&self) -> TenantKey {
        TenantKey::new(&self.group_id, &self.thread_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandResponse {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<InteractiveControl>,
}

impl CommandResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            controls: Vec::new(),
        }
    }

    pub fn with_control(mut self, control: InteractiveControl) -> Self {
        self.controls.push(control);
        self
    }
}

/// Router inputs that come from configuration rather than the request.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Secret written into a registry created by the first `init`.
    pub shared_secret: String,
    pub max_entries: u32,
    pub user_allow_list: Vec<String>,
    pub restart_cooldown: Duration,
    pub config_artifact_path: PathBuf,
    pub checks: CheckSettings,
}

impl RouterSettings {
    pub fn new(config_artifact_path: impl Into<PathBuf>) -> Self {
        Self::from_config(&CapsuleConfig::default(), Path::new("."))
            .with_config_artifact_path(config_artifact_path)
    }

    pub fn from_config(config: &CapsuleConfig, root: &Path) -> Self {
        Self {
            shared_secret: String::new(),
            max_entries: config.store.effective_max_entries(),
            user_allow_list: config.auth.user_allow_list.clone(),
            restart_cooldown: config.auth.effective_restart_cooldown(),
            config_artifact_path: config.store.effective_config_artifact_path(root),
            checks: CheckSettings::from_config(config),
        }
    }

    pub fn with_shared_secret(mut self, secret: impl Into<String>) -> Self {
        self.shared_secret = secret.into();
        self
    }

    pub fn with_config_artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_artifact_path = path.into();
        self
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            shared_secret: String::new(),
            max_entries: DEFAULT_MAX_ENTRIES,
            user_allow_list: Vec::new(),
            restart_cooldown: CapsuleConfig::default().auth.effective_restart_cooldown(),
            config_artifact_path: PathBuf::new(),
            checks: CheckSettings::default(),
        }
    }
}

pub struct CommandRouter<A, G, C> {
    store: RegistryStore,
    artifacts: A,
    gateway: G,
    clock: C,
    engine: CheckEngine,
    settings: RouterSettings,
    jobs: Option<JobRegistry>,
    restart: Mutex<RestartThrottle>,
}

impl<A, G, C> CommandRouter<A, G, C>
where
    A: ArtifactSource,
    G: GatewayControl,
    C: Clock,
{
    pub fn new(store: RegistryStore, artifacts: A, gateway: G, clock: C, settings: RouterSettings) -> Self {
        let restart = Mutex::new(RestartThrottle::new(settings.restart_cooldown));
        Self {
            store,
            artifacts,
            gateway,
            clock,
            engine: CheckEngine::new(),
            settings,
            jobs: None,
            restart,
        }
    }

    pub fn with_jobs(mut self, jobs: JobRegistry) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Handle one command. Denials and user mistakes are answered, not raised.
    pub async fn handle(&self, request: &CommandRequest) -> Result<CommandResponse, CommandError> {
        let command = Command::parse(&request.name);
        let span = info_span!("command", command = command.as_str(), caller = %request.caller_id);
        self.handle_inner(command, request).instrument(span).await
    }

    async fn handle_inner(
        &self,
        command: Command,
        request: &CommandRequest,
    ) -> Result<CommandResponse, CommandError> {
        let registry = match self.store.read() {
            Ok(registry) => registry,
            Err(StoreError::NotFound { .. }) => Registry::new(""),
            Err(err) => return Err(err.into()),
        };
        let allow_list = request
            .allow_list
            .as_deref()
            .unwrap_or(self.settings.user_allow_list.as_slice());
        if let AuthDecision::Denied { message } =
            authorize(command, &request.caller_id, &registry, allow_list)
        {
            events::command_denied(command.as_str(), &request.caller_id);
            return Ok(CommandResponse::text(message));
        }

        let outcome = self.dispatch(command, request, &registry, allow_list).await;
        match outcome {
            Ok(response) => {
                tracing::info!(command = command.as_str(), "command handled");
                Ok(response)
            }
            Err(CommandError::Rejected { message }) => Ok(CommandResponse::text(message)),
            Err(CommandError::Store(StoreError::NotFound { .. })) => Ok(CommandResponse::text(
                "Capsule is not set up in this workspace yet. Run `init <slug>` in a topic first.",
            )),
            Err(err) => {
                tracing::warn!(command = command.as_str(), error = %err, "command failed");
                Err(err)
            }
        }
    }

    async fn dispatch(
        &self,
        command: Command,
        request: &CommandRequest,
        registry: &Registry,
        allow_list: &[String],
    ) -> Result<CommandResponse, CommandError> {
        let key = request.key();
        let args = request.args.trim();
        match command {
            Command::Help => Ok(self.help(&request.caller_id, registry, allow_list)),
            Command::Init => self.init(&key, &request.caller_id, args).await,
            Command::Status => {
                let entry = registry.get(&key).ok_or_else(not_initialized)?;
                Ok(CommandResponse::text(describe(entry)))
            }
            Command::Rename => self.rename(&key, args).await,
            Command::Snooze => self.snooze(&key, args).await,
            Command::Unsnooze => {
                self.update_tenant(&key, |entry| {
                    if entry.status != TenantStatus::Snoozed {
                        return Err(CommandError::rejected("This topic is not snoozed."));
                    }
                    entry.wake();
                    Ok(CommandResponse::text(format!("{} is active again.", entry.name)))
                })
                .await
            }
            Command::Doctor => self.doctor(registry, &key),
            Command::Archive => {
                self.update_tenant(&key, |entry| {
                    if entry.is_archived() {
                        return Err(CommandError::rejected("This topic is already archived."));
                    }
                    entry.archive();
                    Ok(CommandResponse::text(format!("{} archived.", entry.name)))
                })
                .await
            }
            Command::Unarchive => {
                self.update_tenant(&key, |entry| {
                    if !entry.is_archived() {
                        return Err(CommandError::rejected("This topic is not archived."));
                    }
                    entry.wake();
                    Ok(CommandResponse::text(format!("{} restored.", entry.name)))
                })
                .await
            }
            Command::Upgrade => self.upgrade(&key).await,
            Command::List => Ok(list(registry)),
            Command::AdminAdd => self.admin_add(args).await,
            Command::AdminRemove => self.admin_remove(args).await,
            Command::SyncConfig => self.sync_config().await,
            Command::Unknown => Ok(CommandResponse::text(format!(
                "Unknown command `{}`. Try `help`.",
                request.name.trim()
            ))),
        }
    }

    fn help(&self, caller_id: &str, registry: &Registry, allow_list: &[String]) -> CommandResponse {
        let mut text = String::from("Available commands:");
        for command in Command::KNOWN {
            if authorize(command, caller_id, registry, allow_list).is_allowed() {
                let _ = write!(text, "\n- {}", command.usage());
            }
        }
        CommandResponse::text(text)
    }

    /// Create the entry and its artifact scaffold in one locked mutation.
    /// A scaffold failure aborts the write.
    async fn init(&self, key: &TenantKey, caller_id: &str, args: &str) -> Result<CommandResponse, CommandError> {
        let mut words = args.split_whitespace();
        let slug = words
            .next()
            .ok_or_else(|| CommandError::rejected(format!("Usage: {}", Command::Init.usage())))?
            .to_ascii_lowercase();
        if !is_valid_slug(&slug) {
            return Err(CommandError::rejected(format!(
                "`{slug}` is not a valid slug. Use lowercase letters, digits, and dashes."
            )));
        }
        let tenant_type = match words.next() {
            Some(raw) => raw.parse::<TenantType>().map_err(|()| {
                let known: Vec<&str> = TenantType::ALL.iter().map(|t| t.as_str()).collect();
                CommandError::rejected(format!("Unknown type `{raw}`. Use one of: {}.", known.join(", ")))
            })?,
            None => TenantType::General,
        };

        let mut seed = Registry::new(self.settings.shared_secret.clone());
        seed.max_entries = self.settings.max_entries;
        self.store.create(seed).await?;

        let key_str = key.to_string();
        if self.store.quarantined_keys()?.contains(&key_str) {
            return Err(CommandError::rejected(
                "This topic has a damaged registry record. Repair it before running init again.",
            ));
        }
        let (name, promoted) = self
            .store
            .mutate(|reg| {
                if reg.get(key).is_some() {
                    return Err(CommandError::rejected("This topic is already initialized."));
                }
                if reg.is_full() {
                    return Err(CommandError::rejected(format!(
                        "The registry is full ({} topics). Archive or remove one first.",
                        reg.max_entries
                    )));
                }
                if let Some(other) = reg.find_by_slug(&slug) {
                    return Err(CommandError::rejected(format!(
                        "Slug `{slug}` is already used by {}.",
                        other.key()
                    )));
                }
                let entry = TenantEntry::new(key, &slug, &slug, tenant_type, CURRENT_CAPSULE_VERSION);
                self.artifacts.scaffold(&entry)?;
                let name = entry.name.clone();
                reg.insert(entry);
                let promoted = reg.admin_ids.is_empty();
                if promoted {
                    reg.admin_ids.insert(caller_id.to_string());
                }
                Ok((name, promoted))
            })
            .await?;

        tracing::info!(key = %key_str, slug = %slug, promoted, "tenant initialized");
        let mut text = format!("Initialized {name} ({tenant_type}) for this topic.");
        if promoted {
            text.push_str(" You are now an admin of this workspace.");
        }
        Ok(CommandResponse::text(text))
    }

    async fn rename(&self, key: &TenantKey, args: &str) -> Result<CommandResponse, CommandError> {
        if args.is_empty() {
            return Err(CommandError::rejected(format!("Usage: {}", Command::Rename.usage())));
        }
        if args.chars().count() > MAX_NAME_LEN {
            return Err(CommandError::rejected(format!(
                "Names are limited to {MAX_NAME_LEN} characters."
            )));
        }
        let name = args.to_string();
        self.update_tenant(key, move |entry| {
            let old = std::mem::replace(&mut entry.name, name);
            Ok(CommandResponse::text(format!("Renamed {old} to {}.", entry.name)))
        })
        .await
    }

    async fn snooze(&self, key: &TenantKey, args: &str) -> Result<CommandResponse, CommandError> {
        let days = if args.is_empty() {
            DEFAULT_SNOOZE_DAYS
        } else {
            match args.parse::<i64>() {
                Ok(days) if (1..=MAX_SNOOZE_DAYS).contains(&days) => days,
                _ => {
                    return Err(CommandError::rejected(format!(
                        "Snooze takes a number of days between 1 and {MAX_SNOOZE_DAYS}."
                    )))
                }
            }
        };
        let until = self.clock.now() + Duration::days(days);
        self.update_tenant(key, |entry| {
            if entry.is_archived() {
                return Err(CommandError::rejected("Archived topics cannot be snoozed."));
            }
            entry.snooze(until);
            Ok(CommandResponse::text(format!(
                "{} snoozed until {}.",
                entry.name,
                until.format("%Y-%m-%d")
            )))
        })
        .await
    }

    fn doctor(&self, registry: &Registry, key: &TenantKey) -> Result<CommandResponse, CommandError> {
        let entry = registry.get(key).ok_or_else(not_initialized)?;
        let artifacts = self.artifacts.load(entry)?;

        let generated = match GeneratedConfig::load(&self.settings.config_artifact_path) {
            Ok(generated) => generated,
            Err(err) => {
                tracing::warn!(error = %err, "generated config unreadable, skipping config checks");
                None
            }
        };
        let hash = registry_hash(registry)?;
        let mut ctx = CheckContext::new(self.clock.now()).with_settings(self.settings.checks);
        if let Some(ref generated) = generated {
            ctx = ctx.with_generated_config(generated, &hash);
        }
        if let Some(ref jobs) = self.jobs {
            ctx = ctx.with_jobs(jobs);
        }

        let report = self.engine.run(&artifacts, entry, &ctx);
        let mut text = format!("{}: {}", entry.name, report.summary_line());
        if report.findings.is_empty() {
            text.push_str("\nAll checks passed.");
        }
        for finding in &report.findings {
            let _ = write!(text, "\n{finding}");
            if let Some(ref hint) = finding.remediation {
                let _ = write!(text, " ({hint})");
            }
        }
        Ok(CommandResponse::text(text))
    }

    /// Raise the capsule version and add any scaffold files that are missing.
    async fn upgrade(&self, key: &TenantKey) -> Result<CommandResponse, CommandError> {
        self.update_tenant(key, |entry| {
            if entry.capsule_version >= CURRENT_CAPSULE_VERSION {
                return Err(CommandError::rejected(format!(
                    "{} is already at capsule version {}.",
                    entry.name, entry.capsule_version
                )));
            }
            self.artifacts.scaffold(entry)?;
            let from = entry.capsule_version;
            entry.capsule_version = CURRENT_CAPSULE_VERSION;
            Ok(CommandResponse::text(format!(
                "Upgraded {} from capsule version {from} to {CURRENT_CAPSULE_VERSION}.",
                entry.name
            )))
        })
        .await
    }

    async fn admin_add(&self, args: &str) -> Result<CommandResponse, CommandError> {
        let id = single_id(args, Command::AdminAdd)?;
        self.store
            .mutate(|reg| {
                if !reg.admin_ids.insert(id.clone()) {
                    return Err(CommandError::rejected(format!("{id} is already an admin.")));
                }
                Ok(CommandResponse::text(format!("{id} is now an admin.")))
            })
            .await
    }

    async fn admin_remove(&self, args: &str) -> Result<CommandResponse, CommandError> {
        let id = single_id(args, Command::AdminRemove)?;
        self.store
            .mutate(|reg| {
                if !reg.admin_ids.contains(&id) {
                    return Err(CommandError::rejected(format!("{id} is not an admin.")));
                }
                if reg.admin_ids.len() == 1 {
                    return Err(CommandError::rejected("The last admin cannot be removed."));
                }
                reg.admin_ids.remove(&id);
                Ok(CommandResponse::text(format!("{id} is no longer an admin.")))
            })
            .await
    }

    /// Regenerate the config artifact from a fresh read, then ask the gateway
    /// to reload unless a restart was requested within the cooldown.
    async fn sync_config(&self) -> Result<CommandResponse, CommandError> {
        let registry = self.store.read()?;
        let doc = regenerate(&self.settings.config_artifact_path, &registry)?;
        let hash = doc.registry_hash.as_deref().unwrap_or_default();
        let short = hash.get(..12).unwrap_or(hash);
        let mut text = format!("Config regenerated for {} topics (hash {short}).", doc.topics.len());

        let acquired = {
            let mut throttle = self.restart.lock().unwrap_or_else(|p| p.into_inner());
            throttle.try_acquire(self.clock.now())
        };
        match acquired {
            Err(left) => {
                let _ = write!(
                    text,
                    " Gateway restart skipped: the last one was requested less than {} seconds ago ({}s left).",
                    self.settings.restart_cooldown.num_seconds(),
                    left.num_seconds()
                );
            }
            Ok(()) => match self.gateway.request_restart().await {
                Ok(()) => text.push_str(" Gateway restart requested."),
                Err(err) => {
                    tracing::warn!(error = %err, "gateway restart failed");
                    let _ = write!(text, " Gateway restart failed: {err}.");
                }
            },
        }
        Ok(CommandResponse::text(text))
    }

    /// Mutate the addressed tenant under the store lock.
    async fn update_tenant<F>(&self, key: &TenantKey, f: F) -> Result<CommandResponse, CommandError>
    where
        F: FnOnce(&mut TenantEntry) -> Result<CommandResponse, CommandError>,
    {
        self.store
            .mutate(|reg| {
                let entry = reg.get_mut(key).ok_or_else(not_initialized)?;
                f(entry)
            })
            .await
    }
}

fn not_initialized() -> CommandError {
    CommandError::rejected("This topic is not initialized. Run `init <slug>` first.")
}

fn single_id(args: &str, command: Command) -> Result<String, CommandError> {
    let mut words = args.split_whitespace();
    match (words.next(), words.next()) {
        (Some(id), None) => Ok(id.to_string()),
        _ => Err(CommandError::rejected(format!("Usage: {}", command.usage()))),
    }
}

fn describe(entry: &TenantEntry) -> String {
    let mut text = format!(
        "{} (`{}`, {})\nStatus: {}\nCapsule version: {}",
        entry.name, entry.slug, entry.tenant_type, entry.status, entry.capsule_version
    );
    if let Some(until) = entry.snooze_until {
        let _ = write!(text, "\nSnoozed until: {}", until.format("%Y-%m-%d %H:%M UTC"));
    }
    let stamp = |at: Option<chrono::DateTime<chrono::Utc>>| {
        at.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    };
    let _ = write!(
        text,
        "\nLast message: {}\nLast health report: {}\nLast daily report: {}",
        stamp(entry.last_message_at),
        stamp(entry.last_check_report_at),
        stamp(entry.last_daily_report_at)
    );
    if let Some(ref err) = entry.last_delivery_error {
        let _ = write!(text, "\nLast delivery error: {err}");
    }
    text
}

fn list(registry: &Registry) -> CommandResponse {
    if registry.entries.is_empty() {
        return CommandResponse::text("No topics registered.");
    }
    let mut text = format!("{} of {} topics:", registry.entries.len(), registry.max_entries);
    for (key, entry) in &registry.entries {
        let _ = write!(
            text,
            "\n- {} [{key}] {} {} v{}",
            entry.slug, entry.status, entry.tenant_type, entry.capsule_version
        );
    }
    CommandResponse::text(text)
}
