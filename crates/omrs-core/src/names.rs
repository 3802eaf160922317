//! Display-name assembly shared by every person-shaped projection.
//!
//! OpenMRS stores a person name as up to eight independent parts. The bridge
//! renders them in a fixed order, joined by single spaces, skipping the parts
//! that are missing or blank.

use serde::{Deserialize, Serialize};

/// The name parts of a `person_name` row, in display order.
///
/// `degree` is only ever populated for providers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameParts {
    pub prefix: Option<String>,
    pub given: Option<String>,
    pub middle: Option<String>,
    pub family_prefix: Option<String>,
    pub family: Option<String>,
    pub family2: Option<String>,
    pub family_suffix: Option<String>,
    pub degree: Option<String>,
}

impl NameParts {
    /// Returns the parts in display order.
    pub fn ordered(&self) -> [Option<&str>; 8] {
        [
            self.prefix.as_deref(),
            self.given.as_deref(),
            self.middle.as_deref(),
            self.family_prefix.as_deref(),
            self.family.as_deref(),
            self.family2.as_deref(),
            self.family_suffix.as_deref(),
            self.degree.as_deref(),
        ]
    }

    /// Returns `true` when no part carries any text.
    pub fn is_empty(&self) -> bool {
        self.ordered().iter().flatten().all(|p| p.trim().is_empty())
    }

    /// Assembles the display name. See [`assemble_name`].
    pub fn assemble(&self) -> Option<String> {
        assemble_name(self.ordered())
    }
}

/// Joins the present parts with single spaces.
///
/// Blank parts count as missing, so the result never has leading, trailing or
/// doubled separators. Returns `None` (never an empty string) when nothing is
/// left.
pub fn assemble_name<'a, I>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let joined = parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if joined.is_empty() { None } else { Some(joined) }
}
