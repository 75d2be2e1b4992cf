//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod guidelines;
pub mod request;
pub mod services;
pub mod validators;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::{IoResultExt, JsonResultExt};
pub use guidelines::{Guideline, GuidelineExample, GuidelineTable};
pub use request::{ExpansionRequest, RejectionKind, RetryFeedback};
pub use validators::{
    judge_prompt, ForbiddenTextValidator, NodeContext, Rejection, SemanticValidator,
    StructureValidator, Validator, ValidatorSet, Verdict,
};
