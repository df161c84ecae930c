pub mod notifier;
pub mod publisher;
pub mod types;

pub use notifier::Notifier;
pub use publisher::{EventPublisher, NotificationSink, PublishError};
pub use types::{Notification, NotificationStatus};
