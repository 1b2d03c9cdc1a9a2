//! Ordered strategy runner

use crate::error::{ArcadeError, ArcadeResult, ErrorKind};

type Step<'f, T> = Box<dyn FnOnce() -> ArcadeResult<T> + 'f>;

/// Tries strategies in order until one succeeds.
///
/// By default only a `QueryParsing` failure moves on to the next strategy;
/// any other error is returned as is. The last strategy's error is returned
/// unchanged when every strategy fails.
pub struct FallbackChain<'f, T> {
    name: &'static str,
    steps: Vec<(&'static str, Step<'f, T>)>,
    falls_through: fn(&ArcadeError) -> bool,
}

fn on_parsing_error(err: &ArcadeError) -> bool {
    err.kind() == ErrorKind::QueryParsing
}

fn on_any_error(_: &ArcadeError) -> bool {
    true
}

impl<'f, T> FallbackChain<'f, T> {
    /// Chain that falls through on parser rejections only
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
            falls_through: on_parsing_error,
        }
    }

    /// Chain that falls through on every error
    pub fn on_any_error(name: &'static str) -> Self {
        Self {
            falls_through: on_any_error,
            ..Self::new(name)
        }
    }

    pub fn then<F>(mut self, label: &'static str, step: F) -> Self
    where
        F: FnOnce() -> ArcadeResult<T> + 'f,
    {
        self.steps.push((label, Box::new(step)));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn run(self) -> ArcadeResult<T> {
        let total = self.steps.len();
        let mut steps = self.steps.into_iter().enumerate().peekable();

        while let Some((index, (label, step))) = steps.next() {
            match step() {
                Ok(value) => {
                    if index > 0 {
                        tracing::debug!(chain = self.name, step = label, "fallback step succeeded");
                    }
                    return Ok(value);
                }
                Err(err) if steps.peek().is_some() && (self.falls_through)(&err) => {
                    tracing::debug!(
                        chain = self.name,
                        step = label,
                        remaining = total - index - 1,
                        error = %err,
                        "strategy failed, falling back"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(ArcadeError::validation(format!(
            "Fallback chain {} has no strategies",
            self.name
        )))
    }
}
