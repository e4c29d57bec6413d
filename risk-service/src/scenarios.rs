//! Canned prediction requests replayed against a running service.
//!
//! Three suites: typical weather situations in different cities, every
//! governorate name served by `/api/governorates` under the same weather,
//! and out-of-range readings (including a request that names only a city).

use std::fmt;

use crate::client::{ApiClient, PredictOutcome};
use crate::engine::PredictRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    Weather,
    Governorates,
    Extremes,
}

impl Suite {
    pub fn as_str(self) -> &'static str {
        match self {
            Suite::Weather => "weather",
            Suite::Governorates => "governorates",
            Suite::Extremes => "extremes",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub suite: Suite,
    pub name: String,
    pub request: PredictRequest,
}

fn weather(
    suite: Suite,
    name: &str,
    city: &str,
    temp_max: Option<f64>,
    temp_min: Option<f64>,
    humidity_percent: Option<f64>,
    wind_speed_kmh: Option<f64>,
) -> Scenario {
    Scenario {
        suite,
        name: name.to_string(),
        request: PredictRequest {
            city: city.to_string(),
            date: None,
            temp_max,
            temp_min,
            humidity_percent,
            wind_speed_kmh,
        },
    }
}

pub fn weather_scenarios() -> Vec<Scenario> {
    let s = Suite::Weather;
    vec![
        weather(s, "Normal day", "Tunis", Some(25.0), Some(18.0), Some(60.0), Some(15.0)),
        weather(s, "Hot and humid", "Sfax", Some(38.0), Some(24.0), Some(85.0), Some(20.0)),
        weather(s, "Storm conditions", "Bizerte", Some(28.0), Some(20.0), Some(95.0), Some(45.0)),
        weather(s, "Cold front", "Kasserine", Some(12.0), Some(5.0), Some(70.0), Some(30.0)),
        weather(s, "Desert heat", "Tozeur", Some(42.0), Some(28.0), Some(20.0), Some(25.0)),
    ]
}

/// One request per name, all with the same warm, humid day.
pub fn governorate_sweep<S: AsRef<str>>(names: &[S]) -> Vec<Scenario> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            weather(
                Suite::Governorates,
                name,
                name,
                Some(32.0),
                Some(22.0),
                Some(70.0),
                Some(20.0),
            )
        })
        .collect()
}

/// `temp_min` is left out on purpose; the last case sends only the city.
pub fn extreme_scenarios() -> Vec<Scenario> {
    let s = Suite::Extremes;
    vec![
        weather(s, "Very hot", "Tunis", Some(50.0), None, Some(10.0), Some(5.0)),
        weather(s, "Very cold", "Tunis", Some(-5.0), None, Some(90.0), Some(10.0)),
        weather(s, "Hurricane", "Tunis", Some(25.0), None, Some(100.0), Some(120.0)),
        weather(s, "Drought", "Tunis", Some(40.0), None, Some(5.0), Some(15.0)),
        weather(s, "Missing data", "Tunis", None, None, None, None),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub outcome: PredictOutcome,
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Scenario { suite, name, .. } = &self.scenario;
        match &self.outcome {
            PredictOutcome::Assessed(a) => write!(
                f,
                "[{}] {name:<18} {:<10} p={:.3} city_encoded={}",
                suite.as_str(),
                a.risk_level.as_str(),
                a.probability,
                a.details.city_encoded
            ),
            PredictOutcome::Rejected { status, detail } => {
                write!(f, "[{}] {name:<18} error {status}: {detail}", suite.as_str())
            }
        }
    }
}

/// Run all three suites in order. The governorate list is fetched from the
/// service itself.
pub async fn run_scenarios(client: &ApiClient) -> Result<Vec<ScenarioResult>, reqwest::Error> {
    let governorates = client.governorates().await?;
    let mut scenarios = weather_scenarios();
    scenarios.extend(governorate_sweep(&governorates));
    scenarios.extend(extreme_scenarios());

    let mut results = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let outcome = client.predict(&scenario.request).await?;
        tracing::debug!(suite = scenario.suite.as_str(), name = %scenario.name, "scenario done");
        results.push(ScenarioResult { scenario, outcome });
    }
    Ok(results)
}
