pub mod engine;
pub mod features;
pub mod history;
pub mod normalizer;
pub mod projector;
pub mod reconcile;

pub use crate::domain::model::{Draw, PayoutTier, RawRecord};
pub use crate::domain::ports::{AuthoritativeSource, BulkSource, ConfigProvider, Storage};
pub use crate::utils::error::Result;
