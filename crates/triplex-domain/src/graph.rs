//! Lenient typed view over an extraction result document
//!
//! Model output follows a schema supplied through the prompt, and both
//! German and English key spellings occur in practice. The view accepts
//! either and never fails: anything it cannot interpret is skipped or
//! falls back to the raw id.

use crate::ExtractionDocument;
use serde_json::Value;
use std::collections::HashMap;

const ENTITY_KEYS: &[&str] = &["entities", "entitaeten"];
const PREDICATE_KEYS: &[&str] = &["praedikate", "predicates"];
const TRIPLE_KEYS: &[&str] = &["triples"];
const TYPE_KEYS: &[&str] = &["typ", "type"];
const NORMALIZED_KEYS: &[&str] = &["normalisiert_von", "normalized_from"];
const SUBJECT_KEYS: &[&str] = &["subjekt", "subject"];
const PREDICATE_REF_KEYS: &[&str] = &["praedikat", "predicate"];
const OBJECT_KEYS: &[&str] = &["objekt", "object"];

/// An entity as declared in the document's entity mapping
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    /// Document-local id (mapping key)
    pub id: String,
    /// Human-readable label; the id when the model gave none
    pub label: String,
    /// Entity type, if present
    pub entity_type: Option<String>,
}

/// A predicate as declared in the document's predicate mapping
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateView {
    /// Document-local id (mapping key)
    pub id: String,
    /// Canonical label; the id when the model gave none
    pub label: String,
    /// Surface forms the model normalised into this predicate
    pub normalized_from: Vec<String>,
}

/// A subject-predicate-object fact referencing ids from the mappings
#[derive(Debug, Clone, PartialEq)]
pub struct TripleView {
    /// Subject entity id
    pub subject: String,
    /// Predicate id
    pub predicate: String,
    /// Object entity id
    pub object: String,
}

/// Read-only graph interpretation of one extraction document
#[derive(Debug, Clone, Default)]
pub struct GraphView {
    entities: Vec<EntityView>,
    predicates: Vec<PredicateView>,
    triples: Vec<TripleView>,
    entity_index: HashMap<String, usize>,
    predicate_index: HashMap<String, usize>,
}

impl GraphView {
    /// Build a view from a document, in document order
    ///
    /// # Examples
    ///
    /// ```
    /// use triplex_domain::GraphView;
    ///
    /// let doc = serde_json::json!({
    ///     "entities": {"e1": {"label": "Alice", "typ": "Person"}},
    ///     "praedikate": {"p1": {"label": "kennt"}},
    ///     "triples": [{"subjekt": "e1", "praedikat": "p1", "objekt": "e9"}]
    /// });
    /// let view = GraphView::from_document(doc.as_object().unwrap());
    ///
    /// assert_eq!(view.entity_label("e1"), "Alice");
    /// assert_eq!(view.entity_label("e9"), "e9");
    /// assert_eq!(view.predicate_label("p1"), "kennt");
    /// ```
    pub fn from_document(doc: &ExtractionDocument) -> Self {
        let mut view = GraphView::default();

        if let Some(entities) = first_of(doc, ENTITY_KEYS) {
            for (id, value) in entries(entities) {
                let label = label_of(value).unwrap_or_else(|| id.clone());
                let entity_type = value
                    .as_object()
                    .and_then(|o| string_of(o, TYPE_KEYS))
                    .filter(|t| !t.is_empty());
                view.push_entity(EntityView { id, label, entity_type });
            }
        }

        if let Some(predicates) = first_of(doc, PREDICATE_KEYS) {
            for (id, value) in entries(predicates) {
                let label = label_of(value).unwrap_or_else(|| id.clone());
                let normalized_from = value
                    .as_object()
                    .and_then(|o| first_of(o, NORMALIZED_KEYS))
                    .map(string_list)
                    .unwrap_or_default();
                view.push_predicate(PredicateView { id, label, normalized_from });
            }
        }

        if let Some(Value::Array(triples)) = first_of(doc, TRIPLE_KEYS) {
            view.triples = triples.iter().map(triple_of).collect();
        }

        view
    }

    fn push_entity(&mut self, entity: EntityView) {
        // Later duplicates (array form) replace earlier declarations
        if let Some(&idx) = self.entity_index.get(&entity.id) {
            self.entities[idx] = entity;
            return;
        }
        self.entity_index.insert(entity.id.clone(), self.entities.len());
        self.entities.push(entity);
    }

    fn push_predicate(&mut self, predicate: PredicateView) {
        if let Some(&idx) = self.predicate_index.get(&predicate.id) {
            self.predicates[idx] = predicate;
            return;
        }
        self.predicate_index.insert(predicate.id.clone(), self.predicates.len());
        self.predicates.push(predicate);
    }

    /// Declared entities in document order
    pub fn entities(&self) -> &[EntityView] {
        &self.entities
    }

    /// Declared predicates in document order
    pub fn predicates(&self) -> &[PredicateView] {
        &self.predicates
    }

    /// Triples in document order
    pub fn triples(&self) -> &[TripleView] {
        &self.triples
    }

    /// Look up an entity by id
    pub fn entity(&self, id: &str) -> Option<&EntityView> {
        self.entity_index.get(id).map(|&idx| &self.entities[idx])
    }

    /// Position of an entity in [`GraphView::entities`]
    pub fn entity_position(&self, id: &str) -> Option<usize> {
        self.entity_index.get(id).copied()
    }

    /// Look up a predicate by id
    pub fn predicate(&self, id: &str) -> Option<&PredicateView> {
        self.predicate_index.get(id).map(|&idx| &self.predicates[idx])
    }

    /// Entity label, or the raw id when the entity is not declared
    pub fn entity_label<'a>(&'a self, id: &'a str) -> &'a str {
        self.entity(id).map(|e| e.label.as_str()).unwrap_or(id)
    }

    /// Predicate label, or the raw id when the predicate is not declared
    pub fn predicate_label<'a>(&'a self, id: &'a str) -> &'a str {
        self.predicate(id).map(|p| p.label.as_str()).unwrap_or(id)
    }

    /// Triples whose subject, predicate or object is not declared
    pub fn dangling_triples(&self) -> usize {
        self.triples
            .iter()
            .filter(|t| {
                self.entity(&t.subject).is_none()
                    || self.entity(&t.object).is_none()
                    || self.predicate(&t.predicate).is_none()
            })
            .count()
    }
}

fn first_of<'a>(
    obj: &'a serde_json::Map<String, Value>,
    keys: &[&str],
) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn string_of(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_of(obj, keys).and_then(scalar_string)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn label_of(value: &Value) -> Option<String> {
    match value {
        Value::Object(o) => string_of(o, &["label", "name"]).filter(|l| !l.is_empty()),
        other => scalar_string(other),
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}

/// Mapping entries: `{id: {...}}` objects, or `[{"id": ..., ...}]` arrays
fn entries(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let id = item.as_object().and_then(|o| string_of(o, &["id"]))?;
                Some((id, item))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn triple_of(value: &Value) -> TripleView {
    match value {
        Value::Object(o) => TripleView {
            subject: string_of(o, SUBJECT_KEYS).unwrap_or_default(),
            predicate: string_of(o, PREDICATE_REF_KEYS).unwrap_or_default(),
            object: string_of(o, OBJECT_KEYS).unwrap_or_default(),
        },
        Value::Array(parts) => {
            let part = |i: usize| parts.get(i).and_then(scalar_string).unwrap_or_default();
            TripleView {
                subject: part(0),
                predicate: part(1),
                object: part(2),
            }
        }
        _ => TripleView {
            subject: String::new(),
            predicate: String::new(),
            object: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(value: Value) -> GraphView {
        GraphView::from_document(value.as_object().unwrap())
    }

    #[test]
    fn test_german_keys() {
        let v = view(json!({
            "entities": {
                "e1": {"label": "Jean Paul", "typ": "Person"},
                "e2": {"label": "Bayreuth", "typ": "Ort"}
            },
            "praedikate": {
                "p1": {"label": "wohnt in", "normalisiert_von": ["lebt in", "wohnt"]}
            },
            "triples": [{"subjekt": "e1", "praedikat": "p1", "objekt": "e2"}]
        }));

        assert_eq!(v.entities().len(), 2);
        assert_eq!(v.entities()[0].entity_type.as_deref(), Some("Person"));
        assert_eq!(v.predicates()[0].normalized_from, vec!["lebt in", "wohnt"]);
        assert_eq!(v.triples()[0].object, "e2");
        assert_eq!(v.dangling_triples(), 0);
    }

    #[test]
    fn test_english_keys() {
        let v = view(json!({
            "entities": {"a": {"label": "Alice", "type": "Person"}},
            "predicates": {"p": {"label": "knows", "normalized_from": "is acquainted with"}},
            "triples": [{"subject": "a", "predicate": "p", "object": "a"}]
        }));

        assert_eq!(v.entity("a").unwrap().entity_type.as_deref(), Some("Person"));
        assert_eq!(v.predicate("p").unwrap().normalized_from, vec!["is acquainted with"]);
        assert_eq!(v.triples().len(), 1);
    }

    #[test]
    fn test_missing_label_falls_back_to_id() {
        let v = view(json!({
            "entities": {"e1": {"typ": "Konzept"}},
            "triples": [{"subjekt": "e1", "praedikat": "p9", "objekt": "e7"}]
        }));

        assert_eq!(v.entity_label("e1"), "e1");
        assert_eq!(v.entity_label("e7"), "e7");
        assert_eq!(v.predicate_label("p9"), "p9");
        assert_eq!(v.dangling_triples(), 1);
    }

    #[test]
    fn test_array_forms() {
        let v = view(json!({
            "entities": [{"id": "e1", "label": "A"}, {"id": "e2", "label": "B"}],
            "triples": [["e1", "p1", "e2"]]
        }));

        assert_eq!(v.entities().len(), 2);
        assert_eq!(v.entity_position("e2"), Some(1));
        assert_eq!(v.triples()[0].predicate, "p1");
    }

    #[test]
    fn test_garbage_never_panics() {
        let v = view(json!({
            "entities": 5,
            "praedikate": "nope",
            "triples": [null, 3, {"subjekt": 7}]
        }));

        assert!(v.entities().is_empty());
        assert!(v.predicates().is_empty());
        assert_eq!(v.triples().len(), 3);
        assert_eq!(v.triples()[2].subject, "7");
    }

    #[test]
    fn test_document_order_is_kept() {
        let v = view(json!({
            "entities": {"z": {"label": "Z"}, "a": {"label": "A"}, "m": {"label": "M"}}
        }));
        let ids: Vec<_> = v.entities().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }
}
