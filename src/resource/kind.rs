//! Resource kinds served by the WASH API

use serde::{Deserialize, Serialize};
use std::fmt;

/// One resource collection exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    DumpSites,
    Gutters,
    SoakAways,
    ToiletFacilities,
    OpenDefecation,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        Self::DumpSites,
        Self::Gutters,
        Self::SoakAways,
        Self::ToiletFacilities,
        Self::OpenDefecation,
    ];

    /// Registry key (also accepted on the command line)
    pub fn key(self) -> &'static str {
        match self {
            Self::DumpSites => "dump-sites",
            Self::Gutters => "gutters",
            Self::SoakAways => "soak-aways",
            Self::ToiletFacilities => "toilet-facilities",
            Self::OpenDefecation => "open-defecation",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    /// Next kind in display order (wraps)
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Previous kind in display order (wraps)
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_roundtrip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(ResourceKind::from_key(" Gutters "), Some(ResourceKind::Gutters));
        assert_eq!(ResourceKind::from_key("latrines"), None);
    }

    #[test]
    fn test_cycling_wraps() {
        assert_eq!(ResourceKind::OpenDefecation.next(), ResourceKind::DumpSites);
        assert_eq!(ResourceKind::DumpSites.prev(), ResourceKind::OpenDefecation);
    }
}
