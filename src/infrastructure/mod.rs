//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod di;
pub mod error;
pub mod traits;

pub use error::{InfraError, InfraResult, ProducerError};
pub use traits::{
    CommandJudge, CommandProducer, CommandRunner, ContentProducer, FileSystem, Judgement,
    RealCommandRunner, RealFileSystem, ScriptedProducer, SemanticJudge,
};
