//! Application use cases

pub mod compose;
pub mod publish_all;

pub use compose::{ComposeError, ComposeUseCase};
pub use publish_all::PublishAll;
