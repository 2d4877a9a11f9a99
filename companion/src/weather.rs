use rand::seq::IndexedRandom;

/// Describes current conditions for a finished trip.
pub trait WeatherSource: Send + Sync {
    fn current_conditions(&self) -> String;
}

const STUB_CONDITIONS: [&str; 4] = ["Sunny, 18°C", "Partly cloudy, 15°C", "Clear, 20°C", "Cloudy, 14°C"];

/// Picks a plausible condition at random. Stands in until a real forecast provider exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubWeather;

impl WeatherSource for StubWeather {
    fn current_conditions(&self) -> String {
        STUB_CONDITIONS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(STUB_CONDITIONS[0])
            .to_string()
    }
}

#[derive(Debug, Clone)]
pub struct FixedWeather(String);

impl FixedWeather {
    pub fn new(conditions: impl Into<String>) -> Self {
        Self(conditions.into())
    }
}

impl WeatherSource for FixedWeather {
    fn current_conditions(&self) -> String {
        self.0.clone()
    }
}
