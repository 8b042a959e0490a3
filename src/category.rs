//! Climb difficulty categories.
//!
//! A closed climb is scored as `elevation_gain_m * avg_gradient_pct` and
//! mapped to a category by walking [`CATEGORY_RULES`] top to bottom. The
//! first rule whose predicate holds wins. The last rule always matches, so
//! every climb gets exactly one category.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ClimbError, Result};

/// Difficulty category, hardest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum Category {
    /// Hors catégorie
    #[serde(rename = "HC")]
    Hc,
    #[serde(rename = "1")]
    Cat1,
    #[serde(rename = "2")]
    Cat2,
    #[serde(rename = "3")]
    Cat3,
    #[serde(rename = "4")]
    Cat4,
    Uncategorized,
}

impl Category {
    /// Categories shown in legends, in display order.
    pub const LEGEND_ORDER: [Category; 5] = [
        Category::Hc,
        Category::Cat1,
        Category::Cat2,
        Category::Cat3,
        Category::Cat4,
    ];

    /// Label used in tables and exports: `HC`, `1`..`4`, `Uncategorized`.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Hc => "HC",
            Category::Cat1 => "1",
            Category::Cat2 => "2",
            Category::Cat3 => "3",
            Category::Cat4 => "4",
            Category::Uncategorized => "Uncategorized",
        }
    }

    /// Presentation colour as `#RRGGBB`.
    pub fn color_hex(&self) -> &'static str {
        match self {
            Category::Hc => "#E63946",
            Category::Cat1 => "#F77F00",
            Category::Cat2 => "#FCBF49",
            Category::Cat3 => "#06A77D",
            Category::Cat4 => "#457B9D",
            Category::Uncategorized => "#A8A8A8",
        }
    }

    /// Presentation colour as an RGB triple.
    pub fn color_rgb(&self) -> (u8, u8, u8) {
        match self {
            Category::Hc => (0xE6, 0x39, 0x46),
            Category::Cat1 => (0xF7, 0x7F, 0x00),
            Category::Cat2 => (0xFC, 0xBF, 0x49),
            Category::Cat3 => (0x06, 0xA7, 0x7D),
            Category::Cat4 => (0x45, 0x7B, 0x9D),
            Category::Uncategorized => (0xA8, 0xA8, 0xA8),
        }
    }

    /// Whether the category gets a label on the profile.
    pub fn is_categorized(&self) -> bool {
        !matches!(self, Category::Uncategorized)
    }

    /// Short marker text, e.g. `Cat 2`.
    pub fn marker_label(&self) -> String {
        format!("Cat {}", self.label())
    }

    /// Legend text, e.g. `Category HC`.
    pub fn legend_label(&self) -> String {
        format!("Category {}", self.label())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ClimbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "HC" | "hc" => Ok(Category::Hc),
            "1" => Ok(Category::Cat1),
            "2" => Ok(Category::Cat2),
            "3" => Ok(Category::Cat3),
            "4" => Ok(Category::Cat4),
            "Uncategorized" | "uncategorized" => Ok(Category::Uncategorized),
            other => Err(ClimbError::Internal {
                message: format!("unknown climb category '{}'", other),
            }),
        }
    }
}

/// Inputs to the category rules for one closed climb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimbScore {
    pub elevation_gain_m: f64,
    pub avg_gradient_pct: f64,
    /// The run's minimum elevation gain threshold
    pub min_elevation_gain_m: f64,
}

impl ClimbScore {
    /// Difficulty score: gain × average gradient.
    #[inline]
    pub fn difficulty(&self) -> f64 {
        self.elevation_gain_m * self.avg_gradient_pct
    }
}

/// One row of the category table.
#[derive(Clone, Copy)]
pub struct CategoryRule {
    pub category: Category,
    pub applies: fn(&ClimbScore) -> bool,
}

impl fmt::Debug for CategoryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryRule")
            .field("category", &self.category)
            .finish()
    }
}

/// Ordered category table. Evaluated top to bottom, first match wins.
pub const CATEGORY_RULES: [CategoryRule; 6] = [
    CategoryRule {
        category: Category::Hc,
        applies: |s| s.difficulty() > 8000.0 || s.elevation_gain_m > 1200.0,
    },
    CategoryRule {
        category: Category::Cat1,
        applies: |s| s.difficulty() > 5000.0 || s.elevation_gain_m > 800.0,
    },
    CategoryRule {
        category: Category::Cat2,
        applies: |s| s.difficulty() > 3000.0 || s.elevation_gain_m > 500.0,
    },
    CategoryRule {
        category: Category::Cat3,
        applies: |s| s.difficulty() > 1500.0 || s.elevation_gain_m > 300.0,
    },
    CategoryRule {
        category: Category::Cat4,
        applies: |s| s.elevation_gain_m >= s.min_elevation_gain_m,
    },
    CategoryRule {
        category: Category::Uncategorized,
        applies: |_| true,
    },
];

/// Categorise a climb from its gain, average gradient and the run's gain threshold.
///
/// # Example
/// ```
/// use climb_detector::{classify_climb, Category};
///
/// // Long, shallow climbs still reach HC on gain alone
/// assert_eq!(classify_climb(1300.0, 1.0, 20.0), Category::Hc);
/// assert_eq!(classify_climb(100.0, 5.0, 20.0), Category::Cat4);
/// ```
pub fn classify_climb(
    elevation_gain_m: f64,
    avg_gradient_pct: f64,
    min_elevation_gain_m: f64,
) -> Category {
    let score = ClimbScore {
        elevation_gain_m,
        avg_gradient_pct,
        min_elevation_gain_m,
    };
    CATEGORY_RULES
        .iter()
        .find(|rule| (rule.applies)(&score))
        .map(|rule| rule.category)
        .unwrap_or(Category::Uncategorized)
}
