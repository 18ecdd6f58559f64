//! PlantUML description of an extraction graph
//!
//! One `rectangle` declaration per declared entity and one `-->` edge per
//! triple. Endpoints that are not declared are referenced by their quoted
//! raw id, which PlantUML creates implicitly.

use crate::palette::color_for;
use triplex_domain::GraphView;

/// Escape a label for use inside a PlantUML double-quoted string
///
/// # Examples
///
/// ```
/// use triplex_store::diagram::escape_label;
///
/// assert_eq!(escape_label("Der \"Titan\""), "Der &#34;Titan&#34;");
/// assert_eq!(escape_label("Zeile 1\nZeile 2"), "Zeile 1\\nZeile 2");
/// ```
pub fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '"' => out.push_str("&#34;"),
            other => out.push(other),
        }
    }
    out
}

fn node_ref(view: &GraphView, id: &str) -> String {
    match view.entity_position(id) {
        Some(idx) => format!("e{}", idx),
        None if id.is_empty() => "\"?\"".to_string(),
        None => format!("\"{}\"", escape_label(id)),
    }
}

/// Render the PlantUML source for a graph
pub fn render(view: &GraphView) -> String {
    let mut lines = vec![
        "@startuml".to_string(),
        "skinparam defaultTextAlignment center".to_string(),
        "skinparam shadowing false".to_string(),
        "left to right direction".to_string(),
        String::new(),
    ];

    for (idx, entity) in view.entities().iter().enumerate() {
        let label = match &entity.entity_type {
            Some(t) => format!("{}\\n<size:10><i>{}</i></size>", escape_label(&entity.label), escape_label(t)),
            None => escape_label(&entity.label),
        };
        lines.push(format!(
            "rectangle \"{}\" as e{} {}",
            label,
            idx,
            color_for(entity.entity_type.as_deref())
        ));
    }

    if !view.triples().is_empty() {
        lines.push(String::new());
    }

    for triple in view.triples() {
        lines.push(format!(
            "{} --> {} : {}",
            node_ref(view, &triple.subject),
            node_ref(view, &triple.object),
            escape_label(view.predicate_label(&triple.predicate))
        ));
    }

    lines.push(String::new());
    lines.push("@enduml".to_string());
    lines.join("\n") + "\n"
}
