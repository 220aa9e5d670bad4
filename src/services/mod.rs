pub mod message_service;
pub mod notification;

pub use message_service::{MessageService, NewMessage};
pub use notification::{DisabledNotificationSender, HttpEmailSender, NotificationSender};
