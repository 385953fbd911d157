//! R source that binds and evaluates inside a queue-owned environment.

use std::fmt;

use serde::Serialize;

use crate::utils::r_quote;

/// Handle to an R environment created through the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EnvironmentId(pub(crate) u32);

impl EnvironmentId {
    pub fn get(self) -> u32 {
        self.0
    }

    /// The R variable the environment is bound to in the global environment.
    pub fn symbol(self) -> String {
        format!(".rsnip_env_{}", self.0)
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "env#{}", self.0)
    }
}

pub fn bind_line(env: EnvironmentId) -> String {
    format!("{} <- new.env(parent = globalenv())", env.symbol())
}

/// Evaluate `code` with `env` as its scope, autoprinting each top-level
/// value the way the console would.
pub fn scoped_line(code: &str, env: EnvironmentId) -> String {
    format!(
        "source(exprs = parse(text = {}, keep.source = FALSE), local = {}, echo = FALSE, print.eval = TRUE)",
        r_quote(code),
        env.symbol()
    )
}
