//! Sync orchestration
//!
//! [`SyncEngine::handle`] drives one notification through the
//! normalize → resolve → plan → read → transcode → apply sequence. The
//! engine carries only immutable state (settings, schemas, the cached
//! field plan), so concurrent `handle` calls need no synchronization;
//! overlapping syncs of the same record resolve to last-write-wins at
//! apply time.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::codec;
use super::codec::CodecError;
use super::planner::FieldPlan;
use super::resolver::LinkResolver;
use super::resolver::ResolveError;
use super::retry::RetryDecision;
use super::retry::RetryPolicy;
use super::types::ChangeNotification;
use super::types::FieldSkip;
use super::types::SkipKind;
use super::types::SkipReason;
use super::types::SyncResult;
use super::types::SyncStatus;
use crate::board::BoardSchema;
use crate::board::ColumnId;
use crate::config::SyncSettings;
use crate::errors::AutolinkError;
use crate::store::RecordStore;
use crate::store::StoreError;

/// Cross-board sync engine.
///
/// Built once per configuration via [`SyncEngine::load`]; schemas and
/// the field plan are fetched/computed at load time and reused for
/// every notification.
pub struct SyncEngine<S: RecordStore> {
    store: Arc<S>,
    settings: SyncSettings,
    target_schema: BoardSchema,
    plan: FieldPlan,
    resolver: LinkResolver,
    retry: RetryPolicy,
}

impl<S: RecordStore> SyncEngine<S> {
    /// Fetch both board schemas and compute the field plan.
    pub async fn load(store: Arc<S>, settings: SyncSettings) -> Result<Self, AutolinkError> {
        let source_schema = store.board_schema(settings.source_board()).await?;
        let target_schema = store.board_schema(settings.target_board()).await?;

        let plan = FieldPlan::compute(
            &source_schema,
            &settings.excluded_column_ids(),
            &settings.source_id_column(),
        );
        let resolver = LinkResolver::new(
            settings.source_id_column(),
            settings.target_board(),
            settings.target_id_column(),
        );
        let retry = settings.retry_policy();

        info!(
            source_board = %settings.source_board(),
            target_board = %settings.target_board(),
            planned_fields = plan.len(),
            "sync engine ready"
        );

        Ok(Self {
            store,
            settings,
            target_schema,
            plan,
            resolver,
            retry,
        })
    }

    /// The cached field plan for this configuration.
    #[must_use]
    pub fn plan(&self) -> &FieldPlan {
        &self.plan
    }

    /// Process one change notification end to end.
    pub async fn handle(&self, notification: &ChangeNotification) -> SyncResult {
        let source = notification.record_id;

        // Normalize: only configured trigger events on the source board
        // are acted upon.
        if notification.board_id != self.settings.source_board() {
            debug!(board = %notification.board_id, "notification for a different board");
            return SyncResult::skipped(
                source,
                SkipReason::UnrecognizedEvent,
                format!("board {} is not the configured source board", notification.board_id),
            );
        }
        if !self.settings.is_trigger(&notification.event_type) {
            debug!(event = %notification.event_type, "event type is not a trigger");
            return SyncResult::skipped(
                source,
                SkipReason::UnrecognizedEvent,
                format!("event type {:?} is not a trigger", notification.event_type),
            );
        }

        // Resolve the mirror record. Missing counterparts are routine;
        // ambiguous ones are a data-quality fault.
        let target = match self.resolver.resolve(self.store.as_ref(), source).await {
            Ok(target) => target,
            Err(ResolveError::NoLinkValue(_)) => {
                info!(%source, "skipped: no link value");
                return SyncResult::skipped(source, SkipReason::NoLinkValue, "no link value");
            }
            Err(ResolveError::NoMatch { value, .. }) => {
                info!(%source, link = %value, "skipped: no matching target record");
                return SyncResult::skipped(
                    source,
                    SkipReason::NoMatch,
                    format!("no target record with link value {value:?}"),
                );
            }
            Err(ResolveError::Store(e)) => {
                warn!(%source, error = %e, "resolution failed");
                return SyncResult::failed(source, None, e.to_string());
            }
        };

        // Read the planned source fields in one batch.
        let mut values = match self
            .store
            .get_record_values(source, self.plan.columns())
            .await
        {
            Ok(values) => values,
            Err(e) => {
                warn!(%source, error = %e, "failed to read source record");
                return SyncResult::failed(source, Some(target), e.to_string());
            }
        };

        // Transcode field by field; unsound fields reduce the write set
        // instead of aborting the sync.
        let mut write_set: BTreeMap<ColumnId, Value> = BTreeMap::new();
        let mut skipped: Vec<FieldSkip> = Vec::new();

        for column in self.plan.columns() {
            if column == &self.settings.target_id_column() {
                // Never touch the link field on the target side.
                continue;
            }
            let Some(raw) = values.remove(column) else {
                warn!(%source, %column, "source has no value entry for planned column");
                skipped.push(FieldSkip {
                    column: column.clone(),
                    reason: SkipKind::NotFound,
                });
                continue;
            };
            let Some(target_def) = self.target_schema.column(column) else {
                warn!(%column, "column does not exist on the target board");
                skipped.push(FieldSkip {
                    column: column.clone(),
                    reason: SkipKind::NotFound,
                });
                continue;
            };

            let encoded = codec::decode(&raw).and_then(|value| codec::encode(target_def, &value));
            match encoded {
                Ok(wire) => {
                    write_set.insert(column.clone(), wire);
                }
                Err(e) => {
                    warn!(%column, error = %e, "field dropped from write set");
                    skipped.push(FieldSkip {
                        column: column.clone(),
                        reason: skip_kind(&e),
                    });
                }
            }
        }

        let attempted = self.plan.len();
        let written = write_set.len();

        // Apply: clear the columns we are about to write, then write.
        // Clearing first guarantees that emptied source fields actually
        // become empty on the target instead of no-op overwrites.
        if !write_set.is_empty() {
            let clear_set: Vec<ColumnId> = write_set.keys().cloned().collect();
            if let Err(e) = self
                .with_retry("clear_columns", || {
                    self.store
                        .clear_columns(self.settings.target_board(), target, &clear_set)
                })
                .await
            {
                warn!(%target, error = %e, "clear failed");
                return SyncResult::failed(source, Some(target), format!("clear failed: {e}"));
            }

            if let Err(e) = self
                .with_retry("set_columns", || {
                    self.store
                        .set_columns(self.settings.target_board(), target, &write_set)
                })
                .await
            {
                // The clear has already been committed; re-delivery of a
                // later notification is the recovery path.
                warn!(%target, error = %e, "write failed after clear");
                return SyncResult::failed(source, Some(target), format!("write failed: {e}"));
            }
        }

        info!(%source, %target, attempted, written, skipped = skipped.len(), "sync applied");
        SyncResult {
            status: SyncStatus::Success,
            source,
            target: Some(target),
            attempted,
            written,
            skipped,
            detail: None,
        }
    }

    /// Run one mutating call under the bounded retry policy.
    async fn with_retry<F, Fut>(&self, operation: &str, call: F) -> Result<(), StoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<(), StoreError>>,
    {
        let mut attempt = 1u32;
        loop {
            match call().await {
                Ok(()) => return Ok(()),
                Err(e) => match self.retry.decide(attempt, &e) {
                    RetryDecision::Retry(delay) => {
                        warn!(
                            operation,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "transient failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::GiveUp => return Err(e),
                },
            }
        }
    }
}

const fn skip_kind(error: &CodecError) -> SkipKind {
    match error {
        CodecError::OptionMismatch { .. } => SkipKind::OptionMismatch,
        CodecError::UnsupportedType { .. } | CodecError::ReadOnlyType { .. } => {
            SkipKind::UnsupportedType
        }
        CodecError::Malformed { .. } => SkipKind::Malformed,
    }
}
