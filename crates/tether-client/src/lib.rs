//! Client core for a reactive backend.
//!
//! A [`SessionRegistry`] opens one [`Session`] against a deployment. The
//! session dispatches one-shot queries, mutations and actions and multiplexes
//! live query subscriptions over the native layer.

pub mod config;
pub mod dispatcher;
pub mod mock;
pub mod session;
pub mod subscription;
pub mod telemetry;

pub use config::{load_config, load_config_from_path, ClientConfig, ConfigError, LoggingConfig};
pub use dispatcher::Dispatcher;
pub use session::{global, install_global, Session, SessionRegistry};
pub use subscription::{
    CallbackSubscriber, Multiplexer, QuerySubscriber, SubscriptionHandle, SubscriptionState, SubscriptionStream,
    CHANNEL_CLOSED,
};
pub use telemetry::init_logging;

pub use tether_core::{
    args_from_json, Args, ClientError, Credential, FailureCause, FunctionKind, PushError, Result, SubscriptionId,
    Value,
};
