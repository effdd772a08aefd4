//! Event bus port — publish/subscribe for domain events.

use taghub_domain::error::TaghubError;
use taghub_domain::event::Event;

/// Publishes domain events to interested subscribers.
///
/// Publishing is synchronous: it runs on the push-update path, which never awaits.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying transport rejects the event.
    fn publish(&self, event: Event) -> Result<(), TaghubError>;
}

impl<T: EventPublisher + ?Sized> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> Result<(), TaghubError> {
        (**self).publish(event)
    }
}
