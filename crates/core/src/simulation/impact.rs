//! Classification of impact sources
//!
//! Hosts report impacts by the name of whatever caused them (a spell, a
//! projectile, an explosion). Pattern lists decide whether a name heats the
//! ground, cools it, or is ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImpactKind {
    Fire,
    Cold,
    Water,
    Unknown,
}

/// Parse a pattern file: one pattern per line, blank lines and `#` comments
/// skipped, surrounding whitespace trimmed, stored lowercase.
pub fn parse_pattern_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

/// Substring patterns per impact kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactClassifier {
    fire: Vec<String>,
    cold: Vec<String>,
    water: Vec<String>,
}

impl ImpactClassifier {
    #[must_use]
    pub fn new(fire: &[&str], cold: &[&str], water: &[&str]) -> Self {
        let lower = |patterns: &[&str]| -> Vec<String> {
            patterns
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect()
        };
        Self {
            fire: lower(fire),
            cold: lower(cold),
            water: lower(water),
        }
    }

    /// Build from the text of three pattern files.
    #[must_use]
    pub fn from_pattern_text(fire: &str, cold: &str, water: &str) -> Self {
        Self {
            fire: parse_pattern_lines(fire),
            cold: parse_pattern_lines(cold),
            water: parse_pattern_lines(water),
        }
    }

    /// Append more patterns of one kind. `Unknown` is ignored.
    pub fn extend(&mut self, kind: ImpactKind, text: &str) {
        let patterns = match kind {
            ImpactKind::Fire => &mut self.fire,
            ImpactKind::Cold => &mut self.cold,
            ImpactKind::Water => &mut self.water,
            ImpactKind::Unknown => return,
        };
        patterns.extend(parse_pattern_lines(text));
    }

    /// Number of patterns of each kind, as `(fire, cold, water)`.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.fire.len(), self.cold.len(), self.water.len())
    }

    /// Kind of the first list (fire, then cold, then water) with a pattern
    /// contained in `source`, compared case-insensitively.
    pub fn classify(&self, source: &str) -> ImpactKind {
        let source = source.to_lowercase();
        let matches = |patterns: &[String]| patterns.iter().any(|p| source.contains(p.as_str()));

        if matches(&self.fire) {
            ImpactKind::Fire
        } else if matches(&self.cold) {
            ImpactKind::Cold
        } else if matches(&self.water) {
            ImpactKind::Water
        } else {
            ImpactKind::Unknown
        }
    }
}

/// Signed event magnitude for an impact of `kind`.
///
/// Fire heats; cold and water cool; unknown sources do nothing.
#[inline]
pub fn signed_damage(kind: ImpactKind, magnitude: f32) -> f32 {
    let magnitude = magnitude.abs();
    match kind {
        ImpactKind::Fire => magnitude,
        ImpactKind::Cold | ImpactKind::Water => -magnitude,
        ImpactKind::Unknown => 0.0,
    }
}
