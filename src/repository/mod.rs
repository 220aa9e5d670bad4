pub mod connection_requests;
pub mod messages;
pub mod users;

pub use connection_requests::{ConnectionRequestRepository, PgConnectionRequestRepository};
pub use messages::{MessageRepository, PgMessageRepository};
pub use users::{PgUserRepository, UserRepository};
