//! HGSmart cloud API integration

pub mod client;
pub mod command;

pub use self::client::{ApiError, HgSmartClient, DEFAULT_BASE_URL};
pub use self::command::{ControlFrame, FeedCommand};
