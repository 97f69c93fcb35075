//! Canonical movie filenames.
//!
//! A canonical filename carries the movie metadata in the following form,
//! where every group is optional:
//!
//! ```text
//! [Studio] {Series Number} Title (Actor1, Actor2, ..., ActorN).ext
//! ```

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Rendered titles must stay below this many characters for the actor list to be included.
pub const MAX_TITLE_LENGTH: usize = 250;

/// Separator between actor names in the actor group.
const ACTOR_SEPARATOR: &str = ", ";

static RE_CANONICAL_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^",
        r"(?:\[(?P<studio>[A-Za-z0-9 .,'-]+)\])?",
        r" ?",
        r"(?:\{(?P<series>[A-Za-z0-9 .,'-]+?)(?: (?P<number>[0-9]+))?\})?",
        r" ?",
        r"(?P<name>[A-Za-z0-9 .,'-]+?)?",
        r" ?",
        r"(?:\((?P<actors>[A-Za-z0-9 .,'-]+)\))?",
        r"$",
    ))
    .expect("Failed to create regex pattern for canonical title")
});

/// Movie metadata that can be stored in a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MovieMetadata {
    pub studio: Option<String>,
    pub series: Option<String>,
    pub series_number: Option<u32>,
    pub name: Option<String>,
    pub actors: Vec<String>,
}

/// Split a filename into stem and extension, keeping the dot with the extension.
///
/// Leading dots are part of the stem, so hidden files without a suffix have no extension.
///
/// ```rust
/// use mv_organizer::filename::split_extension;
///
/// assert_eq!(split_extension("Finale.mp4"), ("Finale", ".mp4"));
/// assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
/// assert_eq!(split_extension(".hidden"), (".hidden", ""));
/// assert_eq!(split_extension("README"), ("README", ""));
/// ```
#[must_use]
pub fn split_extension(filename: &str) -> (&str, &str) {
    let leading_dots = filename.len() - filename.trim_start_matches('.').len();
    match filename.rfind('.') {
        Some(index) if index >= leading_dots && index > 0 => filename.split_at(index),
        _ => (filename, ""),
    }
}

/// Parse metadata from a title, meaning a filename without the extension.
///
/// Never fails: a title that does not follow the canonical grammar is returned
/// as the movie name with every other component empty.
#[must_use]
pub fn decode_title(title: &str) -> MovieMetadata {
    let Some(captures) = RE_CANONICAL_TITLE.captures(title) else {
        return MovieMetadata {
            name: Some(title.to_string()),
            ..MovieMetadata::default()
        };
    };

    let group = |name: &str| captures.name(name).map(|m| m.as_str().to_string());

    // A number too large for the series number stays part of the series name
    let number = captures.name("number").map(|m| m.as_str());
    let series_number: Option<u32> = number.and_then(|n| n.parse().ok());
    let series = match (group("series"), number) {
        (Some(series), Some(number)) if series_number.is_none() => Some(format!("{series} {number}")),
        (series, _) => series,
    };

    MovieMetadata {
        studio: group("studio"),
        series,
        series_number,
        name: group("name"),
        actors: captures
            .name("actors")
            .map(|m| m.as_str().split(ACTOR_SEPARATOR).map(ToString::to_string).collect())
            .unwrap_or_default(),
    }
}

/// Parse metadata from a full filename.
#[must_use]
pub fn decode_filename(filename: &str) -> MovieMetadata {
    let (title, _) = split_extension(filename);
    decode_title(title)
}

/// Render the canonical title for the given metadata, without extension.
///
/// The actor group is only included when the whole title stays under
/// [`MAX_TITLE_LENGTH`] characters. Actors are always rendered in name order.
#[must_use]
pub fn render_title(metadata: &MovieMetadata) -> String {
    let mut title = String::new();

    if let Some(studio) = non_empty(metadata.studio.as_deref()) {
        let _ = write!(title, "[{studio}]");
    }

    if let Some(series) = non_empty(metadata.series.as_deref()) {
        push_separator(&mut title);
        match metadata.series_number {
            Some(number) => {
                let _ = write!(title, "{{{series} {number}}}");
            }
            None => {
                let _ = write!(title, "{{{series}}}");
            }
        }
    }

    if let Some(name) = non_empty(metadata.name.as_deref()) {
        push_separator(&mut title);
        title.push_str(name);
    }

    let mut actors: Vec<&str> = metadata.actors.iter().map(String::as_str).filter(|a| !a.is_empty()).collect();
    if !actors.is_empty() {
        actors.sort_unstable();
        let actor_group = format!("({})", actors.join(ACTOR_SEPARATOR));
        if title.chars().count() + actor_group.chars().count() < MAX_TITLE_LENGTH {
            push_separator(&mut title);
            title.push_str(&actor_group);
        }
    }

    title
}

/// Render the canonical filename for the given metadata.
///
/// The extension is taken from the current filename.
/// Metadata that renders to nothing keeps the current filename unchanged.
#[must_use]
pub fn encode_filename(metadata: &MovieMetadata, current_filename: &str) -> String {
    let (_, extension) = split_extension(current_filename);
    let title = render_title(metadata);
    if title.is_empty() {
        current_filename.to_string()
    } else {
        format!("{title}{extension}")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn push_separator(title: &mut String) {
    if !title.is_empty() {
        title.push(' ');
    }
}
