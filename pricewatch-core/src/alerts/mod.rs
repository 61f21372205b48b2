//! Price alerts: rules, the session registry, the evaluation cycle and the
//! background monitor.
//!
//! Rule lifecycle is `Active -> Fired` or `Active -> Cancelled`; both end
//! with the rule removed from the registry.

pub mod evaluator;
pub mod monitor;
pub mod registry;
pub mod rule;
pub mod stop;

pub use evaluator::{AlertEvaluator, CycleReport, RunExit};
pub use monitor::{Monitor, MonitorHandle};
pub use registry::{AlertRegistry, RETIRED_HISTORY};
pub use rule::{AlertError, AlertEvent, AlertRule, AlertState};
pub use stop::StopToken;
