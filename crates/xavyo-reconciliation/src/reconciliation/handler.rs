//! Per-record handling while a connector streams changes.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use xavyo_connector::change::ChangeRecord;
use xavyo_connector::traits::ChangeHandler;

use crate::binding::KindBinding;
use crate::correlation::CorrelationEngine;
use crate::dispatcher::Dispatcher;
use crate::result::SyncResult;

use super::profile::RunProfile;

/// Correlates, resolves and dispatches each streamed record, appending the
/// results to the run profile.
pub(crate) struct RecordHandler<'a> {
    profile: &'a mut RunProfile,
    bindings: &'a [KindBinding],
    correlation: &'a CorrelationEngine,
    dispatcher: &'a Dispatcher,
    cancel: &'a CancellationToken,
    progress_interval: u64,
    processed: u64,
    skipped: u64,
}

impl<'a> RecordHandler<'a> {
    pub(crate) fn new(
        profile: &'a mut RunProfile,
        bindings: &'a [KindBinding],
        correlation: &'a CorrelationEngine,
        dispatcher: &'a Dispatcher,
        cancel: &'a CancellationToken,
        progress_interval: u64,
    ) -> Self {
        Self {
            profile,
            bindings,
            correlation,
            dispatcher,
            cancel,
            progress_interval,
            processed: 0,
            skipped: 0,
        }
    }

    /// Records received and records skipped before dispatch.
    pub(crate) fn counters(&self) -> (u64, u64) {
        (self.processed, self.skipped)
    }

    async fn process(&mut self, record: &ChangeRecord) -> Vec<SyncResult> {
        let Some(binding) = self
            .bindings
            .iter()
            .find(|b| b.object_class() == record.object_class())
        else {
            warn!(
                uid = %record.uid(),
                object_class = %record.object_class(),
                "No mapping for object class, skipping record"
            );
            self.skipped += 1;
            return Vec::new();
        };

        let matches = match self.correlation.find_matches(record, binding).await {
            Ok(matches) => matches,
            Err(e) => {
                error!(
                    uid = %record.uid(),
                    entity_kind = %binding.kind(),
                    error = %e,
                    "Correlation failed, skipping record"
                );
                self.skipped += 1;
                return Vec::new();
            }
        };

        if matches.is_empty() {
            return self.dispatcher.unmatched(self.profile, binding, record).await;
        }

        let targets = self.profile.conflict_resolution().resolve(matches);
        if targets.is_empty() {
            self.skipped += 1;
            return Vec::new();
        }
        self.dispatcher
            .matched(self.profile, binding, record, &targets)
            .await
    }
}

#[async_trait]
impl ChangeHandler for RecordHandler<'_> {
    async fn handle(&mut self, record: ChangeRecord) -> bool {
        if self.cancel.is_cancelled() {
            info!("Cancellation requested, stopping the stream");
            return false;
        }

        self.processed += 1;
        let results = self.process(&record).await;
        self.profile.extend_results(results);

        if self.progress_interval > 0 && self.processed % self.progress_interval == 0 {
            info!(
                records_processed = self.processed,
                records_skipped = self.skipped,
                results = self.profile.results().len(),
                "Reconciliation progress"
            );
        }

        !self.cancel.is_cancelled()
    }
}
