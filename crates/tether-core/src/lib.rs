pub mod errors;
pub mod ids;
pub mod marshal;
pub mod native;
pub mod security;
pub mod value;

pub use errors::{ClientError, FailureCause, PushError, Result};
pub use ids::{NativeToken, SubscriptionId};
pub use marshal::{marshal, unmarshal, WireArgs};
pub use native::{FunctionKind, FunctionResult, NativeError, NativeLayer, NativeSession, Push, PushSink};
pub use security::Credential;
pub use value::{args_from_json, Args, Value};
