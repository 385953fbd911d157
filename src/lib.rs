//! Run R code blocks from documentation against one serialized R session.
//!
//! [`queue::ExecutionQueue`] owns an [`session::InterpreterSession`] and runs
//! submissions one at a time, returning each turn's
//! [`execution::OutputCollector`].

pub mod config;
pub mod execution;
pub mod handlers;
pub mod printer;
pub mod queue;
pub mod session;
pub mod snippets;
pub mod utils;
