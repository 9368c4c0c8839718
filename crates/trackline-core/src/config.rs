use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_speed() -> f64 {
    1.0
}

fn default_speed_options() -> Vec<f64> {
    vec![1.0, 2.0, 5.0, 10.0]
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_bus_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Wall-clock period between playback ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Speed restored on every new load.
    #[serde(default = "default_speed")]
    pub default_speed: f64,
    #[serde(default = "default_speed_options")]
    pub speed_options: Vec<f64>,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            default_speed: default_speed(),
            speed_options: default_speed_options(),
            search_debounce_ms: default_search_debounce_ms(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(anyhow!("tick_interval_ms must be greater than zero"));
        }
        if self.bus_capacity == 0 {
            return Err(anyhow!("bus_capacity must be greater than zero"));
        }
        if let Some(bad) = self
            .speed_options
            .iter()
            .chain(std::iter::once(&self.default_speed))
            .find(|s| !s.is_finite() || **s <= 0.0)
        {
            return Err(anyhow!("speeds must be positive, got {bad}"));
        }
        if !self.speed_options.is_empty() && !self.speed_options.contains(&self.default_speed) {
            return Err(anyhow!(
                "default_speed {} is not one of speed_options {:?}",
                self.default_speed,
                self.speed_options
            ));
        }
        Ok(())
    }

    /// The option after `current`, wrapping. Unknown speeds restart the cycle.
    pub fn next_speed(&self, current: f64) -> f64 {
        let Some(first) = self.speed_options.first().copied() else {
            return current;
        };
        match self.speed_options.iter().position(|s| *s == current) {
            Some(idx) => self
                .speed_options
                .get(idx + 1)
                .copied()
                .unwrap_or(first),
            None => first,
        }
    }
}
