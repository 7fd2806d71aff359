use std::sync::Arc;

use crate::config::Config;
use crate::jobs::JobDispatcher;
use crate::observability::Metrics;
use crate::offerings::OfferingRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<OfferingRegistry>,
    pub dispatcher: JobDispatcher,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Registry and metrics are shared with the dispatcher's controller
    pub fn new(config: Config, dispatcher: JobDispatcher) -> Self {
        let controller = dispatcher.controller();
        Self {
            config: Arc::new(config),
            registry: Arc::clone(controller.registry()),
            metrics: Arc::clone(controller.metrics()),
            dispatcher,
        }
    }
}
