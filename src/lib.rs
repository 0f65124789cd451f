//! Binary data objects (`ArrayBuffer`, typed arrays, `DataView`) for a
//! JavaScript object model, with a budgeted memory estimator.

pub mod error;
pub mod runtime;
pub mod types;

pub use error::{JsError, JsResult};
pub use runtime::memusage::{MemUsage, MemUsageBudget, MemUsageError, estimate_memory};
pub use runtime::{ArrayBuffer, PropertyDescriptor, Runtime, TypedArrayKind};
pub use types::{JsObject, JsValue};
