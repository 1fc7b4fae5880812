//! Connector traits consumed by the reconciliation engine.
//!
//! A connector pushes change records into a [`ChangeHandler`] one at a time,
//! in the order the external system reports them. The handler decides
//! whether streaming continues.

use async_trait::async_trait;

use crate::change::{ChangeRecord, ObjectClass, SyncToken};
use crate::error::ConnectorResult;

/// Receiver for change records streamed by a connector.
#[async_trait]
pub trait ChangeHandler: Send {
    /// Handle one change record.
    ///
    /// Returns `false` to ask the connector to stop streaming.
    async fn handle(&mut self, record: ChangeRecord) -> bool;
}

/// Base connector trait.
///
/// # Example
///
/// ```ignore
/// use xavyo_connector::traits::{ChangeHandler, Connector};
///
/// async fn full_scan(connector: &dyn Connector, handler: &mut dyn ChangeHandler) {
///     connector
///         .stream_changes(&ObjectClass::Principal, None, handler)
///         .await?;
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable name of this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the target system.
    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }

    /// Stream changes of one object class into `handler`.
    ///
    /// With `token == None` every object of the class is delivered as a
    /// `CreateOrUpdate` record (full scan). With a token only changes after
    /// that cursor are delivered.
    async fn stream_changes(
        &self,
        object_class: &ObjectClass,
        token: Option<&SyncToken>,
        handler: &mut dyn ChangeHandler,
    ) -> ConnectorResult<()>;

    /// The most recent sync token for an object class.
    async fn latest_token(&self, object_class: &ObjectClass) -> ConnectorResult<SyncToken>;
}
