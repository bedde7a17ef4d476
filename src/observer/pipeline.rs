// Observer pipeline with explicit registration
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::time::timeout;

use crate::database::Document;
use crate::observer::context::ObserverContext;
use crate::observer::error::{ObserverError, ObserverWarning};
use crate::observer::implementations;
use crate::observer::traits::{Observer, ObserverRing};

/// Executes observers in ring order with per-observer timeouts
pub struct ObserverPipeline {
    observers: BTreeMap<ObserverRing, Vec<Box<dyn Observer>>>,
}

impl ObserverPipeline {
    pub fn new() -> Self {
        Self {
            observers: BTreeMap::new(),
        }
    }

    /// Pipeline with every built-in observer registered
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        implementations::register_all(&mut pipeline);
        pipeline
    }

    pub fn register_observer(&mut self, observer: Box<dyn Observer>) {
        let ring = observer.ring();
        let name = observer.name();
        let slot = self.observers.entry(ring).or_default();
        slot.push(observer);
        slot.sort_by_key(|o| o.priority());

        tracing::debug!("Registered observer '{}' for ring {:?}", name, ring);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.values().map(Vec::len).sum()
    }

    /// Run the write through every ring; returns the written (or deleted) document.
    pub async fn execute(&self, mut ctx: ObserverContext) -> Result<Document, ObserverError> {
        tracing::debug!(
            operation = ctx.operation.as_str(),
            company_id = %ctx.company_id,
            collection = %ctx.collection,
            record_id = %ctx.record_id,
            "observer pipeline starting"
        );

        for ring in ObserverRing::ALL {
            ctx.current_ring = Some(ring);
            self.execute_ring(ring, &mut ctx).await;

            if ring.is_blocking() && ctx.has_errors() {
                tracing::debug!("Observer pipeline stopped at ring {:?} due to errors", ring);
                let errors = std::mem::take(&mut ctx.errors);
                return Err(ObserverError::merge(errors)
                    .unwrap_or_else(|| ObserverError::validation("observer pipeline failed")));
            }
        }

        for warning in &ctx.warnings {
            tracing::warn!(
                observer = %warning.observer,
                ring = warning.ring,
                "{}",
                warning.message
            );
        }

        tracing::debug!("Observer pipeline finished in {:?}", ctx.execution_time());

        ctx.result
            .ok_or_else(|| ObserverError::validation("no document written"))
    }

    async fn execute_ring(&self, ring: ObserverRing, ctx: &mut ObserverContext) {
        let Some(observers) = self.observers.get(&ring) else {
            return;
        };

        for observer in observers {
            if !observer.applies_to_operation(ctx.operation) {
                continue;
            }
            if !observer.applies_to_collection(&ctx.collection) {
                continue;
            }

            let observer_start = Instant::now();
            let outcome = timeout(observer.timeout(), observer.execute(ctx)).await;
            let elapsed = observer_start.elapsed();

            let error = match outcome {
                Ok(Ok(())) => {
                    tracing::trace!("Observer: {} completed in {:?}", observer.name(), elapsed);
                    continue;
                }
                Ok(Err(error)) => error,
                Err(_) => {
                    tracing::error!("Observer: {} timed out after {:?}", observer.name(), observer.timeout());
                    ObserverError::TimeoutError(format!(
                        "Observer {} timed out after {:?}",
                        observer.name(),
                        observer.timeout()
                    ))
                }
            };

            if ring.is_blocking() {
                tracing::debug!("Observer: {} rejected write: {}", observer.name(), error);
                ctx.errors.push(error);
            } else {
                ctx.add_warning(ObserverWarning::new(observer.name(), ring as u8, error.to_string()));
            }
        }
    }
}

impl Default for ObserverPipeline {
    fn default() -> Self {
        Self::new()
    }
}
