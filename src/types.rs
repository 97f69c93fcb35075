//! Movie records and metadata entities.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::filename::MovieMetadata;

/// Database row ID of a movie.
pub type MovieId = i64;

/// Database row ID of an entity.
pub type EntityId = i64;

/// Kinds of metadata entities that get their own link directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Actor,
    Category,
    Series,
    Studio,
}

/// A named actor, category, series or studio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: AttributeKind,
    pub name: String,
    /// Derived from the name with [`crate::sort_key`].
    pub sort_key: String,
}

/// A tracked movie file and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieRecord {
    pub id: MovieId,
    /// Current filename inside the library root.
    pub filename: String,
    /// Display name.
    pub name: Option<String>,
    pub studio: Option<Entity>,
    pub series: Option<Entity>,
    pub series_number: Option<u32>,
    /// Sorted by name.
    pub actors: Vec<Entity>,
    /// Sorted by name.
    pub categories: Vec<Entity>,
    pub processed: bool,
}

/// Values for a movie update.
///
/// Every field replaces the current value, so `None` clears it.
/// Studio and series are referenced by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MovieUpdate {
    pub name: Option<String>,
    pub studio: Option<String>,
    pub series: Option<String>,
    pub series_number: Option<u32>,
}

impl AttributeKind {
    /// All kinds in link directory order.
    pub const ALL: [Self; 4] = [Self::Actor, Self::Category, Self::Series, Self::Studio];

    /// Name of the database table holding entities of this kind.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Actor => "actors",
            Self::Category => "categories",
            Self::Series => "series",
            Self::Studio => "studios",
        }
    }

    /// Whether a movie can have at most one entity of this kind.
    #[must_use]
    pub const fn is_single(self) -> bool {
        matches!(self, Self::Series | Self::Studio)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Actor => "actor",
            Self::Category => "category",
            Self::Series => "series",
            Self::Studio => "studio",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => write!(f, "{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => Ok(()),
        }
    }
}

impl FromStr for AttributeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "actor" | "actors" => Ok(Self::Actor),
            "category" | "categories" => Ok(Self::Category),
            "series" => Ok(Self::Series),
            "studio" | "studios" => Ok(Self::Studio),
            _ => Err(format!("Unknown attribute kind: {s}")),
        }
    }
}

impl MovieRecord {
    /// Metadata rendered into the canonical filename.
    #[must_use]
    pub fn metadata(&self) -> MovieMetadata {
        MovieMetadata {
            studio: self.studio.as_ref().map(|e| e.name.clone()),
            series: self.series.as_ref().map(|e| e.name.clone()),
            series_number: self.series_number,
            name: self.name.clone(),
            actors: self.actors.iter().map(|e| e.name.clone()).collect(),
        }
    }

    /// Entities of the given kind associated with this movie.
    #[must_use]
    pub fn entities(&self, kind: AttributeKind) -> Vec<&Entity> {
        match kind {
            AttributeKind::Actor => self.actors.iter().collect(),
            AttributeKind::Category => self.categories.iter().collect(),
            AttributeKind::Series => self.series.iter().collect(),
            AttributeKind::Studio => self.studio.iter().collect(),
        }
    }

    /// Names of the entities of the given kind associated with this movie.
    #[must_use]
    pub fn entity_names(&self, kind: AttributeKind) -> Vec<&str> {
        self.entities(kind).into_iter().map(|e| e.name.as_str()).collect()
    }

    /// Add an entity, keeping multi-valued kinds sorted and replacing single-valued ones.
    pub fn insert_entity(&mut self, entity: Entity) {
        match entity.kind {
            AttributeKind::Actor => insert_sorted(&mut self.actors, entity),
            AttributeKind::Category => insert_sorted(&mut self.categories, entity),
            AttributeKind::Series => self.series = Some(entity),
            AttributeKind::Studio => self.studio = Some(entity),
        }
    }

    /// Swap in a renamed entity with the same ID, keeping the series number.
    pub fn replace_entity(&mut self, entity: Entity) {
        match entity.kind {
            AttributeKind::Actor => {
                self.actors.retain(|e| e.id != entity.id);
                insert_sorted(&mut self.actors, entity);
            }
            AttributeKind::Category => {
                self.categories.retain(|e| e.id != entity.id);
                insert_sorted(&mut self.categories, entity);
            }
            AttributeKind::Series => {
                if self.series.as_ref().is_some_and(|e| e.id == entity.id) {
                    self.series = Some(entity);
                }
            }
            AttributeKind::Studio => {
                if self.studio.as_ref().is_some_and(|e| e.id == entity.id) {
                    self.studio = Some(entity);
                }
            }
        }
    }

    /// Remove an entity by ID. Removing the series also clears the series number.
    pub fn remove_entity(&mut self, kind: AttributeKind, id: EntityId) {
        match kind {
            AttributeKind::Actor => self.actors.retain(|e| e.id != id),
            AttributeKind::Category => self.categories.retain(|e| e.id != id),
            AttributeKind::Series => {
                if self.series.as_ref().is_some_and(|e| e.id == id) {
                    self.series = None;
                    self.series_number = None;
                }
            }
            AttributeKind::Studio => {
                if self.studio.as_ref().is_some_and(|e| e.id == id) {
                    self.studio = None;
                }
            }
        }
    }
}

impl fmt::Display for MovieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}  {}", self.id, self.filename)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn insert_sorted(entities: &mut Vec<Entity>, entity: Entity) {
    if entities.iter().any(|e| e.id == entity.id) {
        return;
    }
    let index = entities.partition_point(|e| e.name < entity.name);
    entities.insert(index, entity);
}
