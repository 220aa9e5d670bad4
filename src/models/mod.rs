pub mod connection_request;
pub mod message;
pub mod user;

pub use connection_request::{ConnectionRequest, RequestStatus};
pub use message::{Message, MessageKind};
pub use user::UserProfile;
