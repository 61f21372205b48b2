//! Domain types for PriceWatch

pub mod bar;
pub mod ids;
pub mod period;

pub use bar::{canonicalize, is_canonical, Bar};
pub use ids::{AlertId, DatasetHash};
pub use period::{Interval, Period};
