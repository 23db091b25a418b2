pub mod notifier;

pub use notifier::{
    CustomerNotification, LogNotificationSink, NotificationRelay, NotificationSink, NotifyError,
};
