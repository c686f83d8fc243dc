use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::model::metric::SimilarityMetric;

/// Per-candidate metric values; `combined` is the ranking key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTriple {
    pub t1c: f64,
    pub flair: f64,
    pub combined: f64,
}

impl ScoreTriple {
    pub fn new(t1c: f64, flair: f64) -> Self {
        Self {
            t1c,
            flair,
            combined: t1c + flair,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMatch {
    pub best_score: ScoreTriple,
    pub partner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate candidate id: {0}")]
pub struct DuplicateId(pub String);

/// Candidate ID → scores, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    entries: Vec<(String, ScoreTriple)>,
    index: HashMap<String, usize>,
}

impl ScoreTable {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
            index: HashMap::with_capacity(n),
        }
    }

    pub fn insert(&mut self, id: String, scores: ScoreTriple) -> Result<(), DuplicateId> {
        if self.index.contains_key(&id) {
            return Err(DuplicateId(id));
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push((id, scores));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ScoreTriple> {
        self.index.get(id).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScoreTriple)> {
        self.entries.iter().map(|(id, s)| (id.as_str(), s))
    }

    /// Extremal combined score in the metric's direction; first occurrence wins ties.
    pub fn best(&self, metric: SimilarityMetric) -> Option<BestMatch> {
        let mut best: Option<&(String, ScoreTriple)> = None;
        for entry in &self.entries {
            match best {
                None => best = Some(entry),
                Some((_, incumbent)) => {
                    if metric.is_better(entry.1.combined, incumbent.combined) {
                        best = Some(entry);
                    }
                }
            }
        }
        best.map(|(id, scores)| BestMatch {
            best_score: *scores,
            partner: id.clone(),
        })
    }

    /// Entries ordered best-first; equal scores keep table order.
    pub fn ranked(&self, metric: SimilarityMetric) -> Vec<(&str, &ScoreTriple)> {
        let mut out: Vec<(&str, &ScoreTriple)> = self.iter().collect();
        out.sort_by(|a, b| metric.rank_cmp(a.1.combined, b.1.combined));
        out
    }

    /// 0-based rank of `id` in [`ScoreTable::ranked`] order.
    pub fn rank_of(&self, id: &str, metric: SimilarityMetric) -> Option<usize> {
        self.ranked(metric).iter().position(|(other, _)| *other == id)
    }
}

impl Serialize for ScoreTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, scores) in &self.entries {
            map.serialize_entry(id, scores)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScoreTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = ScoreTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of candidate id to {t1c, flair, combined}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ScoreTable, A::Error> {
                let mut table = ScoreTable::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, scores)) = access.next_entry::<String, ScoreTriple>()? {
                    table.insert(id, scores).map_err(serde::de::Error::custom)?;
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/scores.rs"]
mod tests;
