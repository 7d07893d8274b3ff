//! Execution strategy for per-object copy actions.
//!
//! A strategy applies one action to every item of a batch and returns every
//! error the action produced. Neither variant stops early: the caller always
//! sees the full failure set for a batch.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::future::Future;
use std::str::FromStr;

use futures::future::join_all;
use futures::stream::{self, StreamExt};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// One item at a time, in input order.
    #[default]
    Serial,
    /// One concurrent unit of work per item. With `max_in_flight` set, at most
    /// that many actions run at once; with `None` there is no cap.
    Parallel { max_in_flight: Option<usize> },
}

impl ExecutionStrategy {
    pub fn parallel() -> Self {
        ExecutionStrategy::Parallel {
            max_in_flight: None,
        }
    }

    pub fn bounded(max_in_flight: usize) -> Self {
        ExecutionStrategy::Parallel {
            max_in_flight: Some(max_in_flight),
        }
    }

    /// Apply an in-flight cap to a parallel strategy. Serial is unaffected.
    pub fn with_max_in_flight(self, max_in_flight: Option<usize>) -> Self {
        match self {
            ExecutionStrategy::Serial => ExecutionStrategy::Serial,
            ExecutionStrategy::Parallel { .. } => ExecutionStrategy::Parallel { max_in_flight },
        }
    }

    /// Run `action` for every item and collect the errors.
    ///
    /// For the parallel variants the order of the returned errors does not
    /// follow the order of `items`.
    pub async fn run<F, Fut, E>(&self, items: &[String], action: F) -> Vec<E>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        match *self {
            ExecutionStrategy::Serial => {
                let mut errors = Vec::new();
                for item in items {
                    if let Err(e) = action(item.clone()).await {
                        errors.push(e);
                    }
                }
                errors
            }
            ExecutionStrategy::Parallel {
                max_in_flight: None,
            } => join_all(items.iter().cloned().map(&action))
                .await
                .into_iter()
                .filter_map(Result::err)
                .collect(),
            ExecutionStrategy::Parallel {
                max_in_flight: Some(limit),
            } => {
                stream::iter(items.iter().cloned().map(&action))
                    .buffer_unordered(limit.max(1))
                    .filter_map(|result| async move { result.err() })
                    .collect()
                    .await
            }
        }
    }
}

impl FromStr for ExecutionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serial" => Ok(ExecutionStrategy::Serial),
            "parallel" => Ok(ExecutionStrategy::parallel()),
            _ => Err(ConfigError::InvalidExecutionStrategy(s.to_string())),
        }
    }
}

impl Display for ExecutionStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExecutionStrategy::Serial => write!(f, "serial"),
            ExecutionStrategy::Parallel {
                max_in_flight: None,
            } => write!(f, "parallel"),
            ExecutionStrategy::Parallel {
                max_in_flight: Some(limit),
            } => write!(f, "parallel(max_in_flight={})", limit),
        }
    }
}
