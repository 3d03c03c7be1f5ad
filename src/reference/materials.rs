//! Material groups - density and cutting coefficients per material family

use serde::{Deserialize, Serialize};

/// Threading difficulty, keys the thread pass-count table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadCategory {
    Easy,
    Medium,
    Hard,
}

impl std::fmt::Display for ThreadCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadCategory::Easy => write!(f, "easy"),
            ThreadCategory::Medium => write!(f, "medium"),
            ThreadCategory::Hard => write!(f, "hard"),
        }
    }
}

/// Material family as the reference administration maintains it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialGroup {
    pub id: String,
    pub name: String,
    /// kg/dm³
    pub density: f64,
    /// Multiplies the base cutting speed
    pub speed_coefficient: f64,
    /// Multiplies the base feed
    pub feed_coefficient: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_category: Option<ThreadCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MaterialGroup {
    /// Mass in kg of a volume given in mm³
    pub fn mass_kg(&self, volume_mm3: f64) -> f64 {
        volume_mm3 / 1_000_000.0 * self.density
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_from_volume() {
        let steel = MaterialGroup {
            id: "C45".to_string(),
            name: "Carbon steel C45".to_string(),
            density: 7.85,
            speed_coefficient: 1.0,
            feed_coefficient: 1.0,
            thread_category: Some(ThreadCategory::Medium),
            description: None,
        };

        // 1 dm³ of steel
        assert!((steel.mass_kg(1_000_000.0) - 7.85).abs() < 1e-12);
        // Ø50 x 100 bar
        assert!((steel.mass_kg(196_349.54) - 1.5413).abs() < 1e-4);
    }

    #[test]
    fn test_thread_category_ordering() {
        assert!(ThreadCategory::Easy < ThreadCategory::Hard);
        let parsed: ThreadCategory = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(parsed, ThreadCategory::Hard);
    }
}
