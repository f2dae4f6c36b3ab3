//! Autoscaler — periodic decision cycles for one managed pool.
//!
//! Each cycle asks every forecaster for a prediction, runs the
//! [`DecisionPipeline`], rounds the result up to whole compute units and,
//! when it differs from the pool's desired size, hands it to the resize
//! callback.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use capgrid_core::{Forecast, ForecasterId, PoolSize};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::DecisionResult;
use crate::forecaster::{Forecaster, PoolSizeSource};
use crate::pipeline::DecisionPipeline;

/// The outcome of one decision cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Resize the pool to the specified number of compute units.
    ScaleTo(u32),
    /// No change needed.
    NoChange,
}

impl ScaleDecision {
    /// Round a pipeline decision up to whole compute units.
    pub fn from_decision(decision: Option<f64>, pool: Option<PoolSize>) -> Self {
        let Some(decision) = decision else {
            debug!("no decision this cycle");
            return Self::NoChange;
        };
        let target = decision.ceil().clamp(0.0, f64::from(u32::MAX)) as u32;
        match pool {
            Some(pool) if pool.desired == target => Self::NoChange,
            _ => Self::ScaleTo(target),
        }
    }
}

/// Callback type for performing the resize.
///
/// The autoscaler calls this with the new desired pool size.
pub type ScaleCallback = Box<dyn Fn(u32) -> BoxFuture + Send + Sync>;

type BoxFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
>;

/// Drives a [`DecisionPipeline`] for one pool.
pub struct Autoscaler {
    pipeline: Arc<DecisionPipeline>,
    forecasters: Vec<Box<dyn Forecaster>>,
    pool: Arc<dyn PoolSizeSource>,
    clock: Arc<dyn Clock>,
    /// Callback to perform the resize.
    scale_fn: Option<ScaleCallback>,
}

impl Autoscaler {
    /// Create a new autoscaler with no forecasters.
    pub fn new(pipeline: Arc<DecisionPipeline>, pool: Arc<dyn PoolSizeSource>) -> Self {
        Self {
            pipeline,
            forecasters: Vec::new(),
            pool,
            clock: Arc::new(SystemClock),
            scale_fn: None,
        }
    }

    /// Add a forecaster. Its id must be unique.
    pub fn with_forecaster(mut self, forecaster: impl Forecaster + 'static) -> Self {
        self.forecasters.push(Box::new(forecaster));
        self
    }

    /// Set the callback used to perform the resize.
    pub fn with_scale_fn(mut self, f: ScaleCallback) -> Self {
        self.scale_fn = Some(f);
        self
    }

    /// Clock used to stamp decision times in [`run`](Self::run). The same
    /// time reaches the forecasters and the scaling policies.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pipeline(&self) -> &DecisionPipeline {
        &self.pipeline
    }

    /// Gather one forecast per forecaster. A failing forecaster counts as
    /// having no forecast.
    fn gather(
        &self,
        pool: Option<PoolSize>,
        now: DateTime<Utc>,
    ) -> BTreeMap<ForecasterId, Option<Forecast>> {
        let mut forecasts = BTreeMap::new();
        for forecaster in &self.forecasters {
            let forecast = match forecaster.predict(pool, now) {
                Ok(forecast) => forecast,
                Err(e) => {
                    warn!(forecaster = %forecaster.id(), error = %e, "prediction failed");
                    None
                }
            };
            if forecasts
                .insert(forecaster.id().to_string(), forecast)
                .is_some()
            {
                warn!(forecaster = %forecaster.id(), "duplicate forecaster id, keeping the last");
            }
        }
        forecasts
    }

    /// Run one decision cycle at `now`.
    ///
    /// A failing resize callback is logged; the decision is still returned.
    pub async fn evaluate_cycle(&self, now: DateTime<Utc>) -> DecisionResult<ScaleDecision> {
        let pool = self.pool.pool_size();
        let forecasts = self.gather(pool, now);
        let decision = self.pipeline.decide(&forecasts, pool, now)?;
        let decision = ScaleDecision::from_decision(decision, pool);

        if let ScaleDecision::ScaleTo(target) = decision {
            info!(
                from = pool.map(|p| p.desired),
                to = target,
                "resizing pool"
            );
            if let Some(ref scale_fn) = self.scale_fn
                && let Err(e) = scale_fn(target).await
            {
                warn!(target, error = %e, "resize failed");
            }
        }

        Ok(decision)
    }

    /// Run the autoscaler loop.
    pub async fn run(
        &self,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(
            interval_ms = interval.as_millis() as u64,
            forecasters = self.forecasters.len(),
            "autoscaler started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.evaluate_cycle(self.clock.now()).await {
                        warn!(error = %e, "decision cycle skipped");
                    }
                }
                _ = shutdown.changed() => {
                    info!("autoscaler shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{DecisionError, ForecastError};
    use crate::forecaster::{SharedPoolSize, StaticForecaster};
    use capgrid_aggregate::AggregatorError;
    use capgrid_core::{AggregatorConfig, CapacityMappingEntry, CapgridConfig, ScalingPoliciesConfig};

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn pipeline(expression: &str) -> Arc<DecisionPipeline> {
        let config = CapgridConfig {
            aggregator: AggregatorConfig::new(expression),
            capacity: vec![CapacityMappingEntry::new("rps", 100.0)],
            scaling_policies: ScalingPoliciesConfig::default(),
        };
        Arc::new(DecisionPipeline::from_config(config).unwrap())
    }

    fn recorder() -> (ScaleCallback, Arc<Mutex<Vec<u32>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let callback: ScaleCallback = Box::new(move |target| -> BoxFuture {
            sink.lock().unwrap().push(target);
            Box::pin(async { Ok::<(), anyhow::Error>(()) })
        });
        (callback, calls)
    }

    struct FailingForecaster;

    impl Forecaster for FailingForecaster {
        fn id(&self) -> &str {
            "flaky"
        }

        fn predict(
            &self,
            _pool: Option<PoolSize>,
            _decision_time: DateTime<Utc>,
        ) -> Result<Option<Forecast>, ForecastError> {
            Err(ForecastError::new("flaky", "model not loaded"))
        }
    }

    #[test]
    fn decision_is_rounded_up() {
        assert_eq!(ScaleDecision::from_decision(Some(2.1), None), ScaleDecision::ScaleTo(3));
        assert_eq!(
            ScaleDecision::from_decision(Some(4.0), Some(PoolSize::new(2, 2))),
            ScaleDecision::ScaleTo(4)
        );
        assert_eq!(
            ScaleDecision::from_decision(Some(3.2), Some(PoolSize::new(4, 4))),
            ScaleDecision::NoChange
        );
        assert_eq!(ScaleDecision::from_decision(Some(-1.0), None), ScaleDecision::ScaleTo(0));
        assert_eq!(ScaleDecision::from_decision(None, None), ScaleDecision::NoChange);
    }

    #[tokio::test]
    async fn cycle_invokes_scale_fn() {
        let (callback, calls) = recorder();
        let pool = Arc::new(SharedPoolSize::new(Some(PoolSize::new(2, 2))));
        let scaler = Autoscaler::new(pipeline("max(predictions)"), pool)
            .with_forecaster(StaticForecaster::metric("reactive", "rps", 450.0))
            .with_forecaster(StaticForecaster::compute_units("floor", 1.0))
            .with_scale_fn(callback);

        assert_eq!(
            scaler.evaluate_cycle(now()).await.unwrap(),
            ScaleDecision::ScaleTo(5)
        );
        assert_eq!(*calls.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn no_change_when_already_at_size() {
        let (callback, calls) = recorder();
        let pool = Arc::new(SharedPoolSize::new(Some(PoolSize::new(5, 5))));
        let scaler = Autoscaler::new(pipeline("max(predictions)"), pool)
            .with_forecaster(StaticForecaster::metric("reactive", "rps", 450.0))
            .with_scale_fn(callback);

        assert_eq!(
            scaler.evaluate_cycle(now()).await.unwrap(),
            ScaleDecision::NoChange
        );
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_forecaster_means_no_change() {
        let (callback, calls) = recorder();
        let pool = Arc::new(SharedPoolSize::new(Some(PoolSize::new(2, 2))));
        let scaler = Autoscaler::new(pipeline("max(predictions)"), pool)
            .with_forecaster(StaticForecaster::metric("reactive", "rps", 450.0))
            .with_forecaster(FailingForecaster)
            .with_scale_fn(callback);

        assert_eq!(
            scaler.evaluate_cycle(now()).await.unwrap(),
            ScaleDecision::NoChange
        );
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn aggregation_error_is_returned() {
        let pool = Arc::new(SharedPoolSize::default());
        let scaler = Autoscaler::new(pipeline("'many'"), pool)
            .with_forecaster(StaticForecaster::compute_units("floor", 1.0));

        assert!(matches!(
            scaler.evaluate_cycle(now()).await,
            Err(DecisionError::Aggregation(AggregatorError::Evaluation { .. }))
        ));
    }

    #[tokio::test]
    async fn resize_failure_still_returns_decision() {
        let pool = Arc::new(SharedPoolSize::default());
        let scaler = Autoscaler::new(pipeline("sum(predictions)"), pool)
            .with_forecaster(StaticForecaster::compute_units("floor", 2.0))
            .with_scale_fn(Box::new(|_| -> BoxFuture {
                Box::pin(async { Err::<(), _>(anyhow::anyhow!("pool api unavailable")) })
            }));

        assert_eq!(
            scaler.evaluate_cycle(now()).await.unwrap(),
            ScaleDecision::ScaleTo(2)
        );
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (callback, calls) = recorder();
        let pool = Arc::new(SharedPoolSize::new(Some(PoolSize::new(1, 1))));
        let scaler = Arc::new(
            Autoscaler::new(pipeline("sum(predictions)"), pool)
                .with_forecaster(StaticForecaster::compute_units("floor", 3.0))
                .with_scale_fn(callback),
        );

        let (tx, rx) = tokio::sync::watch::channel(false);
        let runner = scaler.clone();
        let handle =
            tokio::spawn(async move { runner.run(Duration::from_millis(10), rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let calls = calls.lock().unwrap();
        assert!(!calls.is_empty());
        assert!(calls.iter().all(|&target| target == 3));
    }

    /// Records the decision time it is asked about.
    struct TimeRecorder(Arc<Mutex<Vec<DateTime<Utc>>>>);

    impl Forecaster for TimeRecorder {
        fn id(&self) -> &str {
            "recorder"
        }

        fn predict(
            &self,
            _pool: Option<PoolSize>,
            decision_time: DateTime<Utc>,
        ) -> Result<Option<Forecast>, ForecastError> {
            self.0.lock().unwrap().push(decision_time);
            Ok(Some(Forecast::compute_units("", 1.0, decision_time)))
        }
    }

    #[tokio::test]
    async fn run_stamps_cycles_with_the_clock() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let clock = Arc::new(ManualClock::new(now()));
        let pool = Arc::new(SharedPoolSize::new(Some(PoolSize::new(1, 1))));
        let scaler = Arc::new(
            Autoscaler::new(pipeline("sum(predictions)"), pool)
                .with_forecaster(TimeRecorder(seen.clone()))
                .with_clock(clock),
        );

        let (tx, rx) = tokio::sync::watch::channel(false);
        let runner = scaler.clone();
        let handle =
            tokio::spawn(async move { runner.run(Duration::from_millis(10), rx).await });

        tokio::time::sleep(Duration::from_millis(60)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&t| t == now()));
    }

    #[tokio::test]
    async fn grace_period_runs_on_cycle_time() {
        let config = CapgridConfig {
            aggregator: AggregatorConfig::new("sum(predictions)"),
            capacity: vec![CapacityMappingEntry::new("rps", 10.0)],
            scaling_policies: ScalingPoliciesConfig {
                machine_delta_tolerance: 0.0,
                overprovisioning_grace_period: Duration::from_secs(600),
            },
        };
        let pool = Arc::new(SharedPoolSize::new(Some(PoolSize::new(10, 10))));
        let scaler = Autoscaler::new(Arc::new(DecisionPipeline::from_config(config).unwrap()), pool)
            .with_forecaster(StaticForecaster::metric("reactive", "rps", 80.0));

        let at = |secs| now() + chrono::TimeDelta::seconds(secs);
        assert_eq!(scaler.evaluate_cycle(at(0)).await.unwrap(), ScaleDecision::NoChange);
        assert_eq!(scaler.evaluate_cycle(at(400)).await.unwrap(), ScaleDecision::NoChange);
        assert_eq!(scaler.evaluate_cycle(at(700)).await.unwrap(), ScaleDecision::ScaleTo(8));
    }
}
