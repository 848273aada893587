use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;

pub const TOPICS: &[&str] = &[
    "72-hour blackout checklist",
    "wildfire evacuation plan",
    "winter storm essentials",
    "go-bag for two adults",
    "water storage basics",
    "NOAA weather radio—why it matters",
    "first-aid for cuts and bleeding",
    "safe lighting during outages",
    "phone power when the grid is down",
    "storm prep 24 hours out",
];

/// Second footage query when the topic query yields nothing.
pub const GENERIC_QUERY: &str = "survival emergency preparedness";

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let label = TOPICS.choose(rng).copied().unwrap_or(TOPICS[0]);
        Self::new(label)
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    /// Footage search text: the topic up to the first `:` or `—`.
    pub fn footage_query(&self) -> String {
        let head = self.0.split(':').next().unwrap_or("");
        let head = head.split('—').next().unwrap_or("");
        head.trim().to_string()
    }

    pub fn slug(&self) -> String {
        slugify(&self.0)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn slugify(s: &str) -> String {
    let lower = s.to_lowercase();
    NON_ALNUM.replace_all(&lower, "-").trim_matches('-').to_string()
}
