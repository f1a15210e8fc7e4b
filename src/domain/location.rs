use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Administrative levels of the reference hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationLevel {
    Country,
    Province,
    District,
    Zone,
}

impl LocationLevel {
    pub fn from_depth(depth: u8) -> Option<Self> {
        match depth {
            0 => Some(LocationLevel::Country),
            1 => Some(LocationLevel::Province),
            2 => Some(LocationLevel::District),
            3 => Some(LocationLevel::Zone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationLevel::Country => "country",
            LocationLevel::Province => "province",
            LocationLevel::District => "district",
            LocationLevel::Zone => "zone",
        }
    }
}

impl std::str::FromStr for LocationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "country" => Ok(LocationLevel::Country),
            "province" => Ok(LocationLevel::Province),
            "district" => Ok(LocationLevel::District),
            "zone" => Ok(LocationLevel::Zone),
            other => Err(format!("unknown location level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub code: String,
    pub name: String,
    pub level: LocationLevel,
    #[serde(default)]
    pub parent: Option<String>,
}

/// Read-only geographic reference tree, keyed by location code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Location>", into = "Vec<Location>")]
pub struct LocationTree {
    locations: HashMap<String, Location>,
}

impl LocationTree {
    pub fn new(locations: impl IntoIterator<Item = Location>) -> Self {
        Self {
            locations: locations
                .into_iter()
                .map(|l| (l.code.clone(), l))
                .collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Location> {
        self.locations.get(code)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Reports may only be scoped to district-level locations or below.
    pub fn is_leaf_level(&self, code: &str) -> bool {
        self.get(code)
            .map(|l| l.level >= LocationLevel::District)
            .unwrap_or(false)
    }

    /// Walks from `code` up to the country, nearest first.
    pub fn ancestors(&self, code: &str) -> Vec<&Location> {
        let mut chain = Vec::new();
        let mut current = self.get(code).and_then(|l| l.parent.as_deref());
        while let Some(parent_code) = current {
            match self.get(parent_code) {
                Some(parent) if chain.len() < self.locations.len() => {
                    chain.push(parent);
                    current = parent.parent.as_deref();
                }
                _ => break,
            }
        }
        chain
    }
}

impl From<Vec<Location>> for LocationTree {
    fn from(locations: Vec<Location>) -> Self {
        LocationTree::new(locations)
    }
}

impl From<LocationTree> for Vec<Location> {
    fn from(tree: LocationTree) -> Self {
        let mut locations: Vec<Location> = tree.locations.into_values().collect();
        locations.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.code.cmp(&b.code)));
        locations
    }
}
