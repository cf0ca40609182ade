pub mod builtins;
pub mod executor;
pub mod registry;
pub mod validator;

pub use builtins::{TravelApis, TravelLookups};
pub use executor::{ToolExecutor, ToolOutcome, FUNCTION_NOT_AVAILABLE};
pub use registry::{FunctionDescriptor, FunctionKind, ParamSpec, ParamType};
pub use validator::{validate, CallArgs};
