use std::sync::Arc;

use chrono::FixedOffset;

use crate::config::Config;
use crate::pipeline::normalize::{Normalizer, NormalizerConfig};
use crate::pipeline::power_curve::PowerCurveCalculator;
use crate::remote::RemoteClient;
use crate::store::ActivityStore;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: ActivityStore,
    normalizer: Arc<Normalizer>,
    power_curve: Arc<PowerCurveCalculator>,
    remote: Option<RemoteClient>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let normalizer = Normalizer::new(NormalizerConfig {
            min_moving_kph: config.min_moving_kph,
            ..NormalizerConfig::default()
        });

        Self {
            store: ActivityStore::new(config.data_dir.clone()),
            remote: RemoteClient::from_config(&config),
            normalizer: Arc::new(normalizer),
            power_curve: Arc::new(PowerCurveCalculator::default()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ActivityStore {
        &self.store
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn power_curve(&self) -> &PowerCurveCalculator {
        &self.power_curve
    }

    pub fn remote(&self) -> Option<&RemoteClient> {
        self.remote.as_ref()
    }

    pub fn local_offset(&self) -> FixedOffset {
        self.config.local_offset()
    }
}
