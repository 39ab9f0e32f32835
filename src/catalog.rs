//! Discrete cross-section catalogs.
//!
//! Analyses and design checks read section data through the
//! [`SectionCatalog`] trait, so a catalog is passed in explicitly rather than
//! reached through global state. Implementations must be [`Sync`] so the sizing
//! optimizer can share one catalog across worker threads.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;

/// Density of structural steel in kg/m³.
pub const STEEL_DENSITY: f64 = 7850.0;

/// Standard circular hollow sections as `(outer diameter, wall thickness)` in millimetres.
const CHS_SERIES: [(f64, f64); 14] = [
    (26.9, 2.3),
    (33.7, 2.6),
    (42.4, 2.6),
    (48.3, 3.2),
    (60.3, 3.2),
    (76.1, 3.2),
    (88.9, 4.0),
    (114.3, 4.0),
    (139.7, 5.0),
    (168.3, 5.0),
    (193.7, 6.3),
    (219.1, 6.3),
    (273.0, 8.0),
    (323.9, 10.0),
];

/// Properties of one catalog section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionProperties {
    /// Catalog designation, for example `CHS 48.3x3.2`.
    pub designation: String,
    /// Cross-sectional area in m².
    pub area: f64,
    /// Least radius of gyration in m.
    pub radius_of_gyration: f64,
    /// Mass per unit length in kg/m.
    pub unit_weight: f64,
}

impl SectionProperties {
    /// Section with explicit properties.
    pub fn new(
        designation: impl Into<String>,
        area: f64,
        radius_of_gyration: f64,
        unit_weight: f64,
    ) -> Self {
        Self {
            designation: designation.into(),
            area,
            radius_of_gyration,
            unit_weight,
        }
    }

    /// Circular hollow section of material with `density` (kg/m³).
    ///
    /// Dimensions are in metres.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidSection`] when the wall is not thinner than
    /// half the diameter or any dimension is not positive.
    ///
    /// # Examples
    /// ```
    /// use spacetruss::SectionProperties;
    ///
    /// let pipe = SectionProperties::circular_hollow("CHS 100x5", 0.1, 0.005, 7850.0)
    ///     .expect("valid dimensions");
    /// assert!((pipe.area - 1.492e-3).abs() < 1.0e-6);
    /// ```
    pub fn circular_hollow(
        designation: impl Into<String>,
        outer_diameter: f64,
        thickness: f64,
        density: f64,
    ) -> Result<Self, CatalogError> {
        let designation = designation.into();
        if !(outer_diameter > 0.0 && thickness > 0.0 && 2.0 * thickness <= outer_diameter) {
            return Err(CatalogError::InvalidSection {
                designation,
                reason: format!(
                    "wall thickness {thickness} does not fit diameter {outer_diameter}"
                ),
            });
        }
        let inner_diameter = outer_diameter - 2.0 * thickness;
        let area = PI / 4.0 * (outer_diameter.powi(2) - inner_diameter.powi(2));
        let radius_of_gyration = (outer_diameter.powi(2) + inner_diameter.powi(2)).sqrt() / 4.0;
        let section = Self::new(designation, area, radius_of_gyration, area * density);
        section.validate()?;
        Ok(section)
    }

    /// Solid round bar of material with `density` (kg/m³).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidSection`] when the diameter is not positive.
    pub fn solid_round(
        designation: impl Into<String>,
        diameter: f64,
        density: f64,
    ) -> Result<Self, CatalogError> {
        let area = PI / 4.0 * diameter.powi(2);
        let section = Self::new(designation, area, diameter / 4.0, area * density);
        section.validate()?;
        Ok(section)
    }

    /// Check that every property is finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidSection`] naming the first bad property.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (name, value) in [
            ("area", self.area),
            ("radius_of_gyration", self.radius_of_gyration),
            ("unit_weight", self.unit_weight),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(CatalogError::InvalidSection {
                    designation: self.designation.clone(),
                    reason: format!("{name} must be positive (received {value})"),
                });
            }
        }
        Ok(())
    }
}

/// Read-only source of section properties addressed by index.
pub trait SectionCatalog: Sync {
    /// Number of sections.
    fn len(&self) -> usize;

    /// Properties of section `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::IndexOutOfRange`] when `index >= len()`.
    fn lookup(&self, index: usize) -> Result<&SectionProperties, CatalogError>;

    /// True when the catalog holds no sections.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map a continuous design variable onto a valid section index.
    ///
    /// The gene is rounded to the nearest integer and clamped into
    /// `0..len()`; non-finite genes map to the first section.
    fn index_for_gene(&self, gene: f64) -> usize {
        let last = self.len().saturating_sub(1);
        if !gene.is_finite() || gene <= 0.0 {
            return 0;
        }
        let rounded = gene.round();
        if rounded >= last as f64 {
            last
        } else {
            rounded as usize
        }
    }
}

/// Catalog backed by an in-memory table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SectionProperties>", into = "Vec<SectionProperties>")]
pub struct TableCatalog {
    /// Sections in index order.
    sections: Vec<SectionProperties>,
}

impl TableCatalog {
    /// Build a catalog from `sections`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EmptyCatalog`] for an empty table and
    /// [`CatalogError::InvalidSection`] for a non-physical entry.
    pub fn new(sections: Vec<SectionProperties>) -> Result<Self, CatalogError> {
        if sections.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        for section in &sections {
            section.validate()?;
        }
        Ok(Self { sections })
    }

    /// Standard steel circular hollow sections, from CHS 26.9x2.3 to CHS 323.9x10.
    ///
    /// Sections are ordered by increasing area.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in table; the signature mirrors [`TableCatalog::new`].
    pub fn steel_tubes() -> Result<Self, CatalogError> {
        let sections = CHS_SERIES
            .iter()
            .map(|(diameter, thickness)| {
                SectionProperties::circular_hollow(
                    format!("CHS {diameter}x{thickness}"),
                    diameter / 1000.0,
                    thickness / 1000.0,
                    STEEL_DENSITY,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(sections)
    }

    /// All sections in index order.
    #[must_use]
    pub fn sections(&self) -> &[SectionProperties] {
        &self.sections
    }

    /// Index of the section with `designation`, if present.
    #[must_use]
    pub fn position(&self, designation: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.designation == designation)
    }
}

impl TryFrom<Vec<SectionProperties>> for TableCatalog {
    type Error = CatalogError;

    fn try_from(sections: Vec<SectionProperties>) -> Result<Self, Self::Error> {
        Self::new(sections)
    }
}

impl From<TableCatalog> for Vec<SectionProperties> {
    fn from(catalog: TableCatalog) -> Self {
        catalog.sections
    }
}

impl SectionCatalog for TableCatalog {
    fn len(&self) -> usize {
        self.sections.len()
    }

    fn lookup(&self, index: usize) -> Result<&SectionProperties, CatalogError> {
        self.sections.get(index).ok_or(CatalogError::IndexOutOfRange {
            index,
            size: self.sections.len(),
        })
    }
}
