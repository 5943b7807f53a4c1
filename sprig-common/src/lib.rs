//! sprig Common Types
//!
//! Shared types used by the sprig library and the runner binary.

pub mod method;

pub use method::{Method, MethodSet, ParseMethodError};

use std::collections::HashMap;

/// Flat string-to-string mapping used for request parameters and
/// named placeholder captures.
pub type Params = HashMap<String, String>;
