// Core data models for Audino
// These structs represent the domain entities and their write payloads

pub mod storage;
pub mod project;
pub mod task;
pub mod label;
pub mod job;
pub mod annotation;
pub mod data;

pub use storage::*;
pub use project::*;
pub use task::*;
pub use label::*;
pub use job::*;
pub use annotation::*;
pub use data::*;
