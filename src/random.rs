use std::time::Duration;

use rand::{seq::SliceRandom, thread_rng, Rng};
use serde::Deserialize;

/// Inclusive range of seconds, as written in the config file.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Range {
    pub from: f64,
    pub to: f64,
}

impl Range {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }
}

pub fn random_number(range: Range) -> f64 {
    if range.to <= range.from {
        return range.from;
    }

    thread_rng().gen_range(range.from..=range.to)
}

pub fn random_delay(range: Range) -> Duration {
    Duration::from_secs_f64(random_number(range).max(0.0))
}

pub fn random_element<T: Clone>(items: &[T]) -> Option<T> {
    items.choose(&mut thread_rng()).cloned()
}

pub fn shuffled<T>(mut items: Vec<T>) -> Vec<T> {
    items.shuffle(&mut thread_rng());
    items
}
