//! Query templating.
//!
//! Two independent passes turn a raw template into the query that is actually sent:
//! named terms first (only when enabled), then every [`RAND_INT_PLACEHOLDER`] is replaced by its
//! own random draw.
use graphbench_core::{RandomIntRange, RAND_INT_PLACEHOLDER};
use rand::Rng;
use std::collections::HashMap;

pub type TermMap = HashMap<String, String>;

/// Named placeholder substitutions, one map per request position.
///
/// Request `p` uses map `p % len`. A disabled set is kept around but never applied.
#[derive(Clone, Debug, Default)]
pub struct NamedTerms {
    enabled: bool,
    maps: Vec<TermMap>,
}

impl NamedTerms {
    pub fn new(maps: Vec<TermMap>) -> Self {
        Self {
            enabled: true,
            maps,
        }
    }

    /// Declared but inert: templates keep their named placeholders.
    pub fn disabled(maps: Vec<TermMap>) -> Self {
        Self {
            enabled: false,
            maps,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn for_position(&self, position: u64) -> Option<&TermMap> {
        if self.maps.is_empty() {
            return None;
        }
        let idx = (position % self.maps.len() as u64) as usize;
        self.maps.get(idx)
    }
}

/// Per-run templating inputs, shared read-only by every worker.
#[derive(Clone, Debug, Default)]
pub struct Templater {
    range: RandomIntRange,
    terms: NamedTerms,
}

impl Templater {
    pub fn new(range: RandomIntRange, terms: NamedTerms) -> Self {
        Self { range, terms }
    }

    pub fn instantiate<R: Rng + ?Sized>(&self, template: &str, position: u64, rng: &mut R) -> String {
        instantiate(
            template,
            self.range,
            self.terms.for_position(position),
            self.terms.is_enabled(),
            rng,
        )
    }
}

/// Expands `template` into a concrete query.
pub fn instantiate<R: Rng + ?Sized>(
    template: &str,
    range: RandomIntRange,
    terms: Option<&TermMap>,
    terms_enabled: bool,
    rng: &mut R,
) -> String {
    let mut query = template.to_string();

    if terms_enabled {
        if let Some(terms) = terms {
            for (placeholder, term) in terms {
                if !placeholder.is_empty() {
                    query = query.replace(placeholder.as_str(), term);
                }
            }
        }
    }

    if !query.contains(RAND_INT_PLACEHOLDER) {
        return query;
    }

    let mut parts = query.split(RAND_INT_PLACEHOLDER);
    let mut out = String::with_capacity(query.len());
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    for part in parts {
        out.push_str(&random_int(range, rng).to_string());
        out.push_str(part);
    }
    out
}

fn random_int<R: Rng + ?Sized>(range: RandomIntRange, rng: &mut R) -> i64 {
    range
        .offset
        .saturating_add(rng.gen_range(0..range.width.max(1)))
}
