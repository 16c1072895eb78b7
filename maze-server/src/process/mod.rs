//! External maze generator: invocation and concurrency limits.

mod pool;
mod spawn;

pub use pool::{JobPermit, JobPool, SessionSlots};
pub use spawn::{invoke, GeneratorOptions, DEFAULT_GENERATOR};
