use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A catalogue entry. The lens JSON carries many presentation fields; only
/// the ones the price pipeline needs are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lens {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
}

impl Lens {
    /// Query string sent to the storefronts: `"{brand} {name}"`, or just the
    /// name when no brand is set or the name already starts with it.
    #[must_use]
    pub fn search_name(&self) -> String {
        match self.brand.as_deref().map(str::trim) {
            Some(brand)
                if !brand.is_empty()
                    && !self
                        .name
                        .to_lowercase()
                        .starts_with(&brand.to_lowercase()) =>
            {
                format!("{brand} {}", self.name.trim())
            }
            _ => self.name.trim().to_string(),
        }
    }
}

/// The lens catalogue, in file order.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    lenses: Vec<Lens>,
}

impl Catalogue {
    /// Builds a catalogue after validating ids and names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] on blank or duplicate ids, or blank names.
    pub fn new(lenses: Vec<Lens>) -> Result<Self, ConfigError> {
        validate_lenses(&lenses)?;
        Ok(Self { lenses })
    }

    #[must_use]
    pub fn find(&self, lens_id: &str) -> Option<&Lens> {
        self.lenses.iter().find(|l| l.id == lens_id)
    }

    #[must_use]
    pub fn lenses(&self) -> &[Lens] {
        &self.lenses
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lenses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lenses.is_empty()
    }
}

/// Load and validate the lens catalogue from a JSON array file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalogue(path: &Path) -> Result<Catalogue, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogueIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalogue(&content)
}

fn parse_catalogue(content: &str) -> Result<Catalogue, ConfigError> {
    let lenses: Vec<Lens> = serde_json::from_str(content).map_err(ConfigError::CatalogueParse)?;
    Catalogue::new(lenses)
}

fn validate_lenses(lenses: &[Lens]) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for lens in lenses {
        if lens.id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "lens '{}' has an empty id",
                lens.name
            )));
        }

        if lens.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "lens '{}' has an empty name",
                lens.id
            )));
        }

        if !seen_ids.insert(lens.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate lens id: '{}'",
                lens.id
            )));
        }
    }

    Ok(())
}
