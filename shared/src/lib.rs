pub mod entity;
pub mod error;
pub mod filter;
pub mod format;
pub mod level;
pub mod store;
pub mod wire;

pub use entity::*;
pub use error::*;
pub use filter::{LevelFilter, filter};
pub use level::{CrowdLevel, LevelKind};
pub use store::{EntityStore, StoreDiff};
pub use wire::ApiContract;
