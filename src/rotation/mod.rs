//! Modem IP rotation core
//!
//! - [`resolver`] / [`filter`]: turn an identifier and filter tokens into targets
//! - [`workflow`]: trigger, settle, poll, fall back, for one proxy
//! - [`batch`]: bounded fan-out over several proxies
//! - [`backoff`], [`clock`], [`transport`], [`status`]: plumbing for the above

pub mod backoff;
pub mod batch;
pub mod clock;
pub mod filter;
pub mod resolver;
pub mod status;
pub mod transport;
pub mod workflow;

pub use backoff::{with_backoff, BackoffPolicy, Transient};
pub use batch::{rotate_all, BatchSummary, NoopSink, ResultSink};
pub use clock::{Clock, TokioClock};
pub use filter::{apply_filter, parse_filters, ProxyFilter};
pub use resolver::{resolve, resolve_targets, ResolutionOutcome};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use workflow::{transition, RotationEngine, WorkflowEvent, WorkflowPlan, WorkflowState};
