//! View model for the results area: banners, per-model cards, feature
//! cards, the rain chart and the map.
//!
//! [`present`] is a pure function of the orchestrator state so any front-end
//! can redraw from the latest watch value.

use laundry_weather::{FeatureSnapshot, PredictionResult, ResultSnapshot};
use serde::Serialize;

use crate::services::OrchestratorState;

pub const ADVICE_BANNER: &str =
    "Laundry Tip: Check tomorrow's rain forecast before drying clothes outside!";
pub const SAFE_TIP: &str = "Good weather ahead! Safe to dry clothes outside.";
pub const RAIN_TIP: &str = "Rain expected — plan indoor drying!";
pub const LOADING_MESSAGE: &str = "Loading predictions…";

const SAFE_VERDICT: &str = "Safe to dry clothes outside tomorrow.";
const UNSAFE_VERDICT: &str = "Not safe to dry clothes outside tomorrow (rain expected).";
const MISSING: &str = "—";
const MAP_SPAN_DEGREES: f64 = 0.2;
const MAP_ZOOM: u8 = 12;
const CHART_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    NotSafe,
    Unavailable,
}

impl Verdict {
    fn from_flag(safe: Option<bool>) -> Self {
        match safe {
            Some(true) => Verdict::Safe,
            Some(false) => Verdict::NotSafe,
            None => Verdict::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelCard {
    pub title: &'static str,
    pub verdict: Verdict,
    pub verdict_text: String,
    /// Pretty-printed response payload
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCard {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub model: &'static str,
    pub rain_mm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub embed_url: String,
    pub link_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub advice: &'static str,
    pub loading: bool,
    pub error: Option<String>,
    pub city: Option<String>,
    pub tip: Option<&'static str>,
    pub cards: Vec<ModelCard>,
    pub features: Vec<FeatureCard>,
    pub chart: Vec<ChartPoint>,
    pub map: Option<MapView>,
}

impl ResultView {
    fn empty(loading: bool) -> Self {
        Self {
            advice: ADVICE_BANNER,
            loading,
            error: None,
            city: None,
            tip: None,
            cards: Vec::new(),
            features: Vec::new(),
            chart: Vec::new(),
            map: None,
        }
    }
}

/// Build the results view. While a run is loading only the loading line is
/// shown; a run error is shown whether or not an older snapshot exists.
pub fn present(state: &OrchestratorState) -> ResultView {
    if state.loading {
        return ResultView::empty(true);
    }

    let mut view = ResultView::empty(false);
    view.error = state
        .error
        .as_ref()
        .map(|failure| format!("{} ({})", failure.hint, failure.message));

    let Some(snapshot) = state.snapshot.as_deref() else {
        return view;
    };

    view.city = Some(snapshot.city.clone());
    view.tip = Some(if snapshot.rule.safe_to_dry_outside {
        SAFE_TIP
    } else {
        RAIN_TIP
    });
    view.cards = model_cards(snapshot);
    view.chart = chart_points(snapshot);

    if let Some(features) = state.features.as_deref() {
        view.features = feature_cards(features);
        view.map = map_view(features);
    }

    view
}

fn model_cards(snapshot: &ResultSnapshot) -> Vec<ModelCard> {
    vec![
        card(
            "Rule-based",
            Some(snapshot.rule.safe_to_dry_outside),
            pretty(&snapshot.rule),
        ),
        slot_card("Prophet", &snapshot.prophet),
        slot_card("XGBoost", &snapshot.xgb),
    ]
}

fn slot_card(title: &'static str, slot: &PredictionResult) -> ModelCard {
    card(title, slot.safe_to_dry_outside(), pretty(slot))
}

fn card(title: &'static str, safe: Option<bool>, raw: String) -> ModelCard {
    let verdict = Verdict::from_flag(safe);
    let verdict_text = match verdict {
        Verdict::Safe => SAFE_VERDICT.to_string(),
        Verdict::NotSafe => UNSAFE_VERDICT.to_string(),
        Verdict::Unavailable => format!("{title} prediction not available"),
    };
    ModelCard {
        title,
        verdict,
        verdict_text,
        raw,
    }
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn chart_points(snapshot: &ResultSnapshot) -> Vec<ChartPoint> {
    [
        ("Rule", snapshot.rule.tomorrow_rain_mm),
        ("Prophet", snapshot.prophet.predicted_rain_mm()),
        ("XGBoost", snapshot.xgb.predicted_rain_mm()),
    ]
    .into_iter()
    .filter_map(|(model, rain)| rain.map(|rain_mm| ChartPoint { model, rain_mm }))
    .collect()
}

fn feature_cards(snapshot: &FeatureSnapshot) -> Vec<FeatureCard> {
    let header = match snapshot.country.as_deref().filter(|c| !c.is_empty()) {
        Some(country) => format!("{}, {}", snapshot.city, country),
        None => snapshot.city.clone(),
    };
    let features = &snapshot.features;

    vec![
        FeatureCard {
            label: header,
            value: format!(
                "Lat: {} | Lon: {}",
                or_missing(snapshot.lat, |v| v.to_string()),
                or_missing(snapshot.lon, |v| v.to_string())
            ),
        },
        FeatureCard {
            label: "Temp (tomorrow mean)".into(),
            value: or_missing(features.temp_mean_tomorrow, |v| format!("{v:.2} °C")),
        },
        FeatureCard {
            label: "Humidity (tomorrow mean)".into(),
            value: or_missing(features.humidity_mean_tomorrow, |v| format!("{v:.2}%")),
        },
        FeatureCard {
            label: "Wind (tomorrow mean)".into(),
            value: or_missing(features.wind_speed_mean_tomorrow, |v| format!("{v:.2} m/s")),
        },
        FeatureCard {
            label: "Rain lag-1 (today)".into(),
            value: or_missing(features.rain_lag_1, |v| format!("{v:.2} mm")),
        },
        FeatureCard {
            label: "Day of year (tomorrow)".into(),
            value: or_missing(features.dayofyear_tomorrow, |v| v.to_string()),
        },
    ]
}

fn or_missing(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| MISSING.to_string())
}

/// OpenStreetMap embed and "view larger map" link centred on the city.
pub fn map_view(features: &FeatureSnapshot) -> Option<MapView> {
    let coordinates = features.coordinates()?;
    let (lat, lon) = (coordinates.lat, coordinates.lon);

    let embed_url = format!(
        "https://www.openstreetmap.org/export/embed.html?bbox={}%2C{}%2C{}%2C{}&layer=mapnik&marker={}%2C{}",
        lon - MAP_SPAN_DEGREES,
        lat - MAP_SPAN_DEGREES,
        lon + MAP_SPAN_DEGREES,
        lat + MAP_SPAN_DEGREES,
        lat,
        lon
    );
    let link_url = format!("https://www.openstreetmap.org/#map={MAP_ZOOM}/{lat}/{lon}");

    Some(MapView {
        embed_url,
        link_url,
    })
}

/// Plain-text rendering for the terminal front-end.
pub fn render_text(view: &ResultView) -> String {
    let mut lines = vec![view.advice.to_string()];

    if view.loading {
        lines.push(LOADING_MESSAGE.to_string());
        return lines.join("\n");
    }

    if let Some(error) = &view.error {
        lines.push(format!("Error: {error}"));
    }

    if let Some(city) = &view.city {
        lines.push(String::new());
        lines.push(format!("== {city} =="));
    }
    if let Some(tip) = view.tip {
        lines.push(tip.to_string());
    }

    if !view.features.is_empty() {
        lines.push(String::new());
        for feature in &view.features {
            lines.push(format!("  {}: {}", feature.label, feature.value));
        }
    }

    for card in &view.cards {
        let marker = match card.verdict {
            Verdict::Safe => "[ok]",
            Verdict::NotSafe => "[!!]",
            Verdict::Unavailable => "[--]",
        };
        lines.push(String::new());
        lines.push(format!("{} {}", card.title, marker));
        lines.push(format!("  {}", card.verdict_text));
        lines.extend(card.raw.lines().map(|l| format!("    {l}")));
    }

    if !view.chart.is_empty() {
        lines.push(String::new());
        lines.push("Predicted rain (mm)".to_string());
        let max = view
            .chart
            .iter()
            .map(|p| p.rain_mm)
            .fold(0.0_f64, f64::max);
        for point in &view.chart {
            let width = if max > 0.0 {
                ((point.rain_mm.max(0.0) / max) * CHART_WIDTH as f64).round() as usize
            } else {
                0
            };
            lines.push(format!(
                "  {:<8} {:>6.2} {}",
                point.model,
                point.rain_mm,
                "#".repeat(width)
            ));
        }
    }

    if let Some(map) = &view.map {
        lines.push(String::new());
        lines.push(format!("Map: {}", map.embed_url));
        lines.push(format!("View larger map: {}", map.link_url));
    }

    lines.join("\n")
}
