//! Hot/archival tier migration
//!
//! Dispatch only decides which assets may move and starts one remote job
//! for the batch. The registry is updated later, when the job's log is
//! reconciled.

use std::sync::Arc;

use mediavault_store::{AssetKey, Tier};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::authority::PermissionAuthority;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::identity::Identity;
use crate::jobs::{CommandStatus, RemoteExecutor};
use crate::lifecycle::{validate_caller, validate_object_key};
use crate::registry::{MAX_TRANSITION_ATTEMPTS, Registry, Write};
use crate::upstream::{bounded, read_with_retry};

pub const NOT_TRACKED: &str = "asset is not currently being tracked";
pub const ALREADY_IN_TIER: &str = "already in target tier";
pub const PERMISSION_DENIED: &str = "permission denied";

/// `download: s3://container/key to <path>` or `upload: s3://container/key`
///
/// Keys may contain spaces, so the URI runs to the ` to ` separator or the
/// end of the line.
static TRANSFER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(download|upload)\b\W*(s3://.+?)(?:\s+to\s+.*)?$")
        .expect("Invalid transfer regex")
});

/// Characters PowerShell treats as single quotes inside a literal string
const POWERSHELL_QUOTES: [char; 5] = ['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieringRequest {
    pub keys: Vec<AssetKey>,
    pub target: Tier,
    pub target_host: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieringItemStatus {
    Submitted,
    Skipped,
    Denied,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieringItem {
    pub key: AssetKey,
    pub status: TieringItemStatus,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieringDispatch {
    pub items: Vec<TieringItem>,
    /// Remote command started for the batch, if anything was submitted
    pub command_id: Option<String>,
}

/// What a reconciled log changed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieringReconciliation {
    pub updated: Vec<AssetKey>,
    pub untracked: Vec<AssetKey>,
    pub ignored_lines: usize,
}

pub struct TieringCoordinator {
    registry: Registry,
    authority: Arc<PermissionAuthority>,
    executor: Arc<dyn RemoteExecutor>,
    config: CoreConfig,
}

impl TieringCoordinator {
    pub fn new(
        registry: Registry,
        authority: Arc<PermissionAuthority>,
        executor: Arc<dyn RemoteExecutor>,
        config: CoreConfig,
    ) -> Self {
        Self {
            registry,
            authority,
            executor,
            config,
        }
    }

    /// Decide per asset and start one migration job for everything submitted
    pub async fn dispatch(
        &self,
        identity: &Identity,
        request: &TieringRequest,
    ) -> CoreResult<TieringDispatch> {
        validate_caller(identity)?;
        let container = validate_request(request)?;

        let moving = match request.target {
            Tier::Archival => "moving to archival tier",
            Tier::Hot => "moving to hot tier",
        };

        let mut items = Vec::with_capacity(request.keys.len());
        for key in &request.keys {
            let (status, reason) = self.decide(identity, key, request.target, moving).await?;
            items.push(TieringItem {
                key: key.clone(),
                status,
                reason: reason.to_string(),
            });
        }

        let files: Vec<&str> = items
            .iter()
            .filter(|i| i.status == TieringItemStatus::Submitted)
            .map(|i| i.key.key.as_str())
            .collect();
        if files.is_empty() {
            debug!("Nothing to migrate for {}", identity.username);
            return Ok(TieringDispatch {
                items,
                command_id: None,
            });
        }

        let script = self.migration_script(container, request.target, &files);
        let command_id = bounded(
            self.config.upstream_timeout(),
            "remote command",
            self.executor.send_command(&request.target_host, &script),
        )
        .await?;
        info!(
            "Started migration {} of {} asset(s) to {} on {}",
            command_id,
            files.len(),
            request.target,
            request.target_host
        );

        Ok(TieringDispatch {
            items,
            command_id: Some(command_id),
        })
    }

    async fn decide(
        &self,
        identity: &Identity,
        key: &AssetKey,
        target: Tier,
        moving: &'static str,
    ) -> CoreResult<(TieringItemStatus, &'static str)> {
        match self
            .authority
            .authorize(identity, &key.container, &key.prefix())
            .await
        {
            Ok(()) => {}
            Err(CoreError::PermissionDenied(_)) => {
                return Ok((TieringItemStatus::Denied, PERMISSION_DENIED));
            }
            Err(e) => return Err(e),
        }

        Ok(match self.registry.get(key).await? {
            None => (TieringItemStatus::Skipped, NOT_TRACKED),
            Some(record) if record.tier == target => (TieringItemStatus::Skipped, ALREADY_IN_TIER),
            Some(_) => (TieringItemStatus::Submitted, moving),
        })
    }

    fn migration_script(&self, container: &str, target: Tier, files: &[&str]) -> String {
        let to_archival = match target {
            Tier::Archival => 1,
            Tier::Hot => 0,
        };
        let files: Vec<String> = files.iter().map(|f| powershell_literal(f)).collect();
        format!(
            ".\\{} -bucket {} -toFsx {} -files {} -fsxmount {}",
            self.config.tiering.script,
            powershell_literal(container),
            to_archival,
            files.join(","),
            powershell_literal(&self.config.tiering.archival_mount)
        )
    }

    /// Fetch a finished command's log, then reconcile it
    pub async fn reconcile_command(
        &self,
        command_id: &str,
        target_host: &str,
        status: CommandStatus,
    ) -> CoreResult<TieringReconciliation> {
        if !status.is_success() {
            info!("Ignoring migration {} with status {:?}", command_id, status);
            return Ok(TieringReconciliation::default());
        }
        let log = read_with_retry(self.config.upstream_timeout(), "command output", || {
            self.executor.fetch_output(command_id, target_host)
        })
        .await?;
        self.reconcile(status, &log).await
    }

    /// Record the tier of every asset a migration log reports as moved
    pub async fn reconcile(
        &self,
        status: CommandStatus,
        log: &str,
    ) -> CoreResult<TieringReconciliation> {
        let mut outcome = TieringReconciliation::default();
        if !status.is_success() {
            info!("Ignoring migration log with status {:?}", status);
            return Ok(outcome);
        }

        for (key, tier) in parse_transfer_log(log, &mut outcome.ignored_lines) {
            if self.apply_tier(&key, tier).await? {
                outcome.updated.push(key);
            } else {
                outcome.untracked.push(key);
            }
        }
        info!(
            "Reconciled migration log: {} updated, {} untracked, {} ignored line(s)",
            outcome.updated.len(),
            outcome.untracked.len(),
            outcome.ignored_lines
        );
        Ok(outcome)
    }

    /// Returns false if the key is not tracked
    async fn apply_tier(&self, key: &AssetKey, tier: Tier) -> CoreResult<bool> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let Some(record) = self.registry.get(key).await? else {
                warn!("Migration log names untracked {}", key);
                return Ok(false);
            };
            if record.tier == tier {
                return Ok(true);
            }

            // Editor is carried over unchanged
            let expected = record.lock_state();
            let mut next = record;
            next.tier = tier;
            if self.registry.update(&next, &expected).await? == Write::Applied {
                info!("{} is now in the {} tier", key, tier);
                return Ok(true);
            }
        }
        Err(CoreError::StateConflict(format!(
            "{key} is changing concurrently, try again"
        )))
    }
}

fn validate_request(request: &TieringRequest) -> CoreResult<&str> {
    if request.target_host.trim().is_empty() {
        return Err(CoreError::MalformedInput("target host is required".into()));
    }
    let Some(first) = request.keys.first() else {
        return Err(CoreError::MalformedInput("nothing to migrate".into()));
    };
    for key in &request.keys {
        validate_object_key(key)?;
        if key.key.chars().any(char::is_control) {
            return Err(CoreError::MalformedInput(format!(
                "'{}' contains control characters",
                key.key.escape_debug()
            )));
        }
        if key.container != first.container {
            return Err(CoreError::MalformedInput(
                "a migration batch must stay within one container".into(),
            ));
        }
    }
    Ok(&first.container)
}

/// Single-quoted PowerShell string; embedded quotes are doubled
fn powershell_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if POWERSHELL_QUOTES.contains(&c) {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Transfer markers in a migration log, in order
///
/// `download` means the object was copied to the archival tier and `upload`
/// that it was restored to the hot tier.
fn parse_transfer_log(log: &str, ignored: &mut usize) -> Vec<(AssetKey, Tier)> {
    let mut transfers = Vec::new();
    for line in log.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = TRANSFER_LINE.captures(line) else {
            debug!("Ignoring migration log line: {}", line);
            *ignored += 1;
            continue;
        };
        let Some(key) = AssetKey::from_storage_uri(&caps[2]) else {
            warn!("Malformed transfer marker: {}", line);
            *ignored += 1;
            continue;
        };
        let tier = if caps[1].eq_ignore_ascii_case("download") {
            Tier::Archival
        } else {
            Tier::Hot
        };
        transfers.push((key, tier));
    }
    transfers
}
