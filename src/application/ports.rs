//! Ports to the host's collaborators: the record store and the broadcast sink.

use std::future::Future;
use std::sync::Arc;

use crate::domain::{BroadcastEvent, Result, StatusRecord};

/// Persistent store owning the status singleton and device rows.
pub trait RecordStore: Send + Sync {
    /// Fetch the singleton status record, if one exists.
    fn status_record(&self) -> Result<Option<StatusRecord>>;

    /// Count devices whose in-use flag is set.
    fn count_active_devices(&self) -> Result<usize>;

    /// Persist the status record.
    fn save_status_record(&self, record: &StatusRecord) -> Result<()>;
}

impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    fn status_record(&self) -> Result<Option<StatusRecord>> {
        (**self).status_record()
    }

    fn count_active_devices(&self) -> Result<usize> {
        (**self).count_active_devices()
    }

    fn save_status_record(&self, record: &StatusRecord) -> Result<()> {
        (**self).save_status_record(record)
    }
}

/// Delivers events to the host's subscribers.
pub trait EventSink: Send + Sync {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: BroadcastEvent) -> impl Future<Output = Result<()>> + Send;
}

impl<T: EventSink> EventSink for Arc<T> {
    fn publish(&self, event: BroadcastEvent) -> impl Future<Output = Result<()>> + Send {
        (**self).publish(event)
    }
}
