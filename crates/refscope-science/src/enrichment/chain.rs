use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::{Result, ScienceError};

/// Outcome of a single strategy.
#[derive(Debug)]
pub enum Attempt<T> {
    Found(T),
    Absent,
    Failed(ScienceError),
}

impl<T> From<Result<T>> for Attempt<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Found(value),
            Err(ScienceError::NotFound(_)) => Self::Absent,
            Err(e) => Self::Failed(e),
        }
    }
}

type Strategy<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Attempt<T>> + Send + 'a>;

/// Ordered strategies; the first one that finds a value wins.
///
/// Strategies are started lazily, one at a time. Misses and failures are
/// logged and skipped.
pub struct FallbackChain<'a, T> {
    label: &'static str,
    strategies: Vec<(&'static str, Strategy<'a, T>)>,
}

impl<'a, T: Send + 'a> FallbackChain<'a, T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            strategies: Vec::new(),
        }
    }

    pub fn then<F, Fut>(mut self, name: &'static str, strategy: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        self.strategies
            .push((name, Box::new(move || strategy().map(Attempt::from).boxed())));
        self
    }

    pub async fn run(self) -> Option<T> {
        let Self { label, strategies } = self;
        for (name, strategy) in strategies {
            match strategy().await {
                Attempt::Found(value) => {
                    debug!(chain = label, strategy = name, "found");
                    return Some(value);
                }
                Attempt::Absent => debug!(chain = label, strategy = name, "absent"),
                Attempt::Failed(e) => debug!(chain = label, strategy = name, error = %e, "failed"),
            }
        }
        debug!(chain = label, "exhausted");
        None
    }
}
