//! Per-invocation state: resolved config, open database and type registry.

use std::path::Path;

use anyhow::{Context as _, Result};
use relgraph_core::config::{self, Config, DB_ENV_VAR};
use relgraph_core::db;
use relgraph_core::error::ErrorCode;
use relgraph_core::services::{AccessControl, FixedAccessLevel, TracingNotifier};
use relgraph_core::summary::SummaryOptions;
use relgraph_core::{BugId, BugRecord, RelationshipStore, TypeRegistry};
use rusqlite::Connection;

use crate::output::{CliError, OutputMode, fail, fail_with};

pub struct AppContext {
    pub config: Config,
    pub registry: TypeRegistry,
    pub conn: Connection,
    pub output: OutputMode,
}

impl AppContext {
    /// Resolve config and open the database.
    pub fn open(
        config_flag: Option<&Path>,
        db_flag: Option<&Path>,
        output: OutputMode,
    ) -> Result<Self> {
        let cwd = std::env::current_dir().context("read current directory")?;
        let config = config::resolve_config(config_flag, &cwd).map_err(|err| {
            fail_with(
                output,
                CliError::with_details(
                    format!("{err:#}"),
                    ErrorCode::ConfigParseError.hint().unwrap_or_default(),
                    ErrorCode::ConfigParseError.code(),
                ),
            )
        })?;
        let registry = config.registry().map_err(|err| fail(output, &err))?;

        let db_path =
            config::resolve_database_path(db_flag, std::env::var(DB_ENV_VAR).ok(), &config);
        let conn = db::open_database(&db_path)?;
        tracing::debug!(db = %db_path.display(), types = registry.len(), "opened relgraph database");

        Ok(Self {
            config,
            registry,
            conn,
            output,
        })
    }

    pub fn store(&self) -> RelationshipStore<'_> {
        db::store(
            &self.conn,
            &self.registry,
            self.config.resolve_policy(),
            self.config.status.read_only_threshold,
            TracingNotifier,
        )
    }

    pub const fn access(&self) -> FixedAccessLevel {
        FixedAccessLevel(self.config.access.current_level)
    }

    pub const fn summary_options(&self) -> SummaryOptions {
        SummaryOptions {
            view_threshold: self.config.access.view_threshold,
            update_threshold: self.config.access.update_threshold,
            width: self.config.summary.width,
        }
    }

    /// Load a bug or render `E2004`.
    pub fn require_bug(&self, store: &RelationshipStore<'_>, bug: BugId) -> Result<BugRecord> {
        let record = store.bugs().load(bug).map_err(|err| fail(self.output, &err))?;
        record.ok_or_else(|| {
            fail_with(
                self.output,
                CliError::with_details(
                    format!("bug {bug} not found"),
                    "Create it first with `relgraph bug new`.",
                    ErrorCode::BugNotFound.code(),
                ),
            )
        })
    }

    /// The caller-side checks the store expects before a mutation: the
    /// viewer may update `source` and see `destination`, and `source` is
    /// not read-only.
    pub fn check_can_link(
        &self,
        store: &RelationshipStore<'_>,
        source: BugId,
        destination: BugId,
    ) -> Result<()> {
        let allowed = self
            .may_link(store, source, destination)
            .map_err(|err| fail(self.output, &err))?;
        if allowed {
            return Ok(());
        }

        let code = ErrorCode::PermissionDenied;
        Err(fail_with(
            self.output,
            CliError::with_details(
                format!("not allowed to change relationships of bug {source}"),
                code.hint().unwrap_or_default(),
                code.code(),
            ),
        ))
    }

    fn may_link(
        &self,
        store: &RelationshipStore<'_>,
        source: BugId,
        destination: BugId,
    ) -> relgraph_core::Result<bool> {
        let access = self.access();
        let thresholds = self.config.access;
        Ok(access.has_permission(thresholds.update_threshold, source)?
            && !store.bugs().is_read_only(source)?
            && access.has_permission(thresholds.view_threshold, destination)?)
    }
}
