//! Entity type colours shared by the diagram and the HTML view

/// Colour for types not in the palette
pub const DEFAULT_COLOR: &str = "#E0E0E0";

const PALETTE: &[(&[&str], &str)] = &[
    (&["person", "personen", "people"], "#FFB3BA"),
    (&["ort", "orte", "place", "location"], "#BAE1FF"),
    (&["organisation", "organization", "institution"], "#BAFFC9"),
    (&["werk", "work", "publikation", "publication"], "#FFFFBA"),
    (&["ereignis", "event"], "#FFDFBA"),
    (&["konzept", "concept", "thema", "topic"], "#E0BBE4"),
    (&["datum", "date", "zeit", "time"], "#D5E8D4"),
    (&["objekt", "object", "gegenstand"], "#F8CECC"),
];

/// Colour for an entity type, case-insensitive
///
/// # Examples
///
/// ```
/// use triplex_store::palette::{color_for, DEFAULT_COLOR};
///
/// assert_eq!(color_for(Some("Person")), color_for(Some("person")));
/// assert_eq!(color_for(Some("Raumschiff")), DEFAULT_COLOR);
/// assert_eq!(color_for(None), DEFAULT_COLOR);
/// ```
pub fn color_for(entity_type: Option<&str>) -> &'static str {
    let Some(entity_type) = entity_type else {
        return DEFAULT_COLOR;
    };
    let wanted = entity_type.trim().to_lowercase();

    PALETTE
        .iter()
        .find(|(names, _)| names.contains(&wanted.as_str()))
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}
