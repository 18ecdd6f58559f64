//! Self-contained interactive HTML view of an extraction graph
//!
//! The graph is drawn as static SVG so it is readable without scripting.
//! A small inline script adds hover highlighting, node dragging, panning
//! and wheel zoom.

use crate::layout::{ForceLayout, Point};
use crate::palette::color_for;
use std::collections::HashMap;
use std::fmt::Write as _;
use triplex_domain::GraphView;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 720.0;
const MARGIN: f64 = 70.0;
const NODE_RADIUS: f64 = 16.0;
const UNTYPED: &str = "(ohne Typ)";

const STYLE: &str = r#"
body { margin: 0; font-family: sans-serif; background: #fafafa; }
header { padding: 12px 20px; border-bottom: 1px solid #ddd; background: #fff; }
header h1 { font-size: 18px; margin: 0; }
header p { margin: 4px 0 0; color: #666; font-size: 13px; }
#graph { display: block; width: 100%; height: calc(100vh - 64px); cursor: grab; }
.edge line { stroke: #999; stroke-width: 1.5; }
.edge text { font-size: 11px; fill: #555; text-anchor: middle; }
.node circle { stroke: #555; stroke-width: 1; cursor: pointer; }
.node text { font-size: 12px; text-anchor: middle; pointer-events: none; }
.legend text { font-size: 12px; }
svg.focus .edge, svg.focus .node { opacity: 0.15; }
svg.focus .edge.active, svg.focus .node.active { opacity: 1; }
svg.focus .edge.active line { stroke: #d33; stroke-width: 2.5; }
"#;

const SCRIPT: &str = r#"
(function () {
  var svg = document.getElementById('graph');
  var viewport = document.getElementById('viewport');
  var nodes = Array.prototype.slice.call(svg.querySelectorAll('.node'));
  var edges = Array.prototype.slice.call(svg.querySelectorAll('.edge'));
  var pos = nodes.map(function (n) { return { x: +n.dataset.x, y: +n.dataset.y }; });
  var scale = 1, pan = { x: 0, y: 0 }, drag = null, panning = null;

  function apply() {
    viewport.setAttribute('transform', 'translate(' + pan.x + ',' + pan.y + ') scale(' + scale + ')');
  }

  function redraw(i) {
    nodes[i].setAttribute('transform', 'translate(' + pos[i].x + ',' + pos[i].y + ')');
    edges.forEach(function (e) {
      var s = +e.dataset.s, t = +e.dataset.t;
      if (s !== i && t !== i) return;
      var line = e.querySelector('line'), label = e.querySelector('text');
      line.setAttribute('x1', pos[s].x); line.setAttribute('y1', pos[s].y);
      line.setAttribute('x2', pos[t].x); line.setAttribute('y2', pos[t].y);
      label.setAttribute('x', (pos[s].x + pos[t].x) / 2);
      label.setAttribute('y', (pos[s].y + pos[t].y) / 2);
    });
  }

  function toGraph(ev) {
    var pt = svg.createSVGPoint();
    pt.x = ev.clientX; pt.y = ev.clientY;
    return pt.matrixTransform(viewport.getScreenCTM().inverse());
  }

  function clearFocus() {
    svg.classList.remove('focus');
    svg.querySelectorAll('.active').forEach(function (el) { el.classList.remove('active'); });
  }

  nodes.forEach(function (n, i) {
    n.addEventListener('mouseenter', function () {
      svg.classList.add('focus');
      n.classList.add('active');
      edges.forEach(function (e) {
        var s = +e.dataset.s, t = +e.dataset.t;
        if (s === i || t === i) {
          e.classList.add('active');
          nodes[s].classList.add('active');
          nodes[t].classList.add('active');
        }
      });
    });
    n.addEventListener('mouseleave', clearFocus);
    n.addEventListener('pointerdown', function (ev) {
      drag = i;
      ev.stopPropagation();
    });
  });

  svg.addEventListener('pointerdown', function (ev) { panning = { x: ev.clientX, y: ev.clientY }; });
  svg.addEventListener('pointermove', function (ev) {
    if (drag !== null) {
      var p = toGraph(ev);
      pos[drag] = { x: p.x, y: p.y };
      redraw(drag);
    } else if (panning) {
      pan.x += ev.clientX - panning.x;
      pan.y += ev.clientY - panning.y;
      panning = { x: ev.clientX, y: ev.clientY };
      apply();
    }
  });
  window.addEventListener('pointerup', function () { drag = null; panning = null; });
  svg.addEventListener('wheel', function (ev) {
    ev.preventDefault();
    scale *= ev.deltaY < 0 ? 1.1 : 1 / 1.1;
    apply();
  }, { passive: false });
})();
"#;

/// A node of the drawn graph
#[derive(Debug, Clone, PartialEq)]
pub struct VisualNode {
    /// Document-local id
    pub id: String,
    /// Displayed label
    pub label: String,
    /// Entity type, if known
    pub entity_type: Option<String>,
}

/// A directed, labelled edge between node indices
#[derive(Debug, Clone, PartialEq)]
pub struct VisualEdge {
    /// Index of the subject node
    pub source: usize,
    /// Index of the object node
    pub target: usize,
    /// Predicate label
    pub label: String,
}

/// Directed graph built from a [`GraphView`]
///
/// Declared entities come first in document order; endpoints that are not
/// declared become untyped nodes labelled with their raw id.
#[derive(Debug, Clone, Default)]
pub struct VisualGraph {
    /// Nodes
    pub nodes: Vec<VisualNode>,
    /// Edges, one per triple
    pub edges: Vec<VisualEdge>,
}

impl VisualGraph {
    /// Build the graph
    pub fn from_view(view: &GraphView) -> Self {
        let mut graph = VisualGraph::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for entity in view.entities() {
            index.insert(entity.id.clone(), graph.nodes.len());
            graph.nodes.push(VisualNode {
                id: entity.id.clone(),
                label: entity.label.clone(),
                entity_type: entity.entity_type.clone(),
            });
        }

        for triple in view.triples() {
            let source = graph.node_for(&mut index, &triple.subject);
            let target = graph.node_for(&mut index, &triple.object);
            graph.edges.push(VisualEdge {
                source,
                target,
                label: view.predicate_label(&triple.predicate).to_string(),
            });
        }

        graph
    }

    fn node_for(&mut self, index: &mut HashMap<String, usize>, id: &str) -> usize {
        if let Some(&idx) = index.get(id) {
            return idx;
        }
        let idx = self.nodes.len();
        index.insert(id.to_string(), idx);
        self.nodes.push(VisualNode {
            id: id.to_string(),
            label: if id.is_empty() { "?".to_string() } else { id.to_string() },
            entity_type: None,
        });
        idx
    }

    /// Entity types in order of first appearance
    pub fn legend(&self) -> Vec<Option<&str>> {
        let mut seen: Vec<Option<&str>> = Vec::new();
        for node in &self.nodes {
            let t = node.entity_type.as_deref();
            if !seen.contains(&t) {
                seen.push(t);
            }
        }
        seen
    }
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn to_canvas(p: Point) -> Point {
    Point {
        x: MARGIN + p.x * (WIDTH - 2.0 * MARGIN),
        y: MARGIN + p.y * (HEIGHT - 2.0 * MARGIN),
    }
}

/// Render the HTML document
///
/// # Examples
///
/// ```
/// use triplex_domain::GraphView;
/// use triplex_store::html::render;
///
/// let doc = serde_json::json!({
///     "entities": {"a": {"label": "Alice", "type": "Person"}, "b": {"label": "Bob", "type": "Person"}},
///     "triples": [{"subject": "a", "predicate": "knows", "object": "b"}]
/// });
/// let html = render(&GraphView::from_document(doc.as_object().unwrap()), "letter 1", 42);
/// assert!(html.contains("<svg"));
/// assert_eq!(html.matches("class=\"node\"").count(), 2);
/// assert_eq!(html.matches("class=\"edge\"").count(), 1);
/// ```
pub fn render(view: &GraphView, title: &str, seed: u64) -> String {
    let graph = VisualGraph::from_view(view);
    let index_edges: Vec<(usize, usize)> = graph.edges.iter().map(|e| (e.source, e.target)).collect();
    let positions: Vec<Point> = ForceLayout::new(seed)
        .positions(graph.nodes.len(), &index_edges)
        .into_iter()
        .map(to_canvas)
        .collect();

    let title = escape_html(title);
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html lang=\"de\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", title);
    let _ = writeln!(out, "<style>{}</style>\n</head>\n<body>", STYLE);
    let _ = writeln!(
        out,
        "<header><h1>{}</h1><p>{} Entitäten, {} Relationen</p></header>",
        title,
        graph.nodes.len(),
        graph.edges.len()
    );
    let _ = writeln!(
        out,
        "<svg id=\"graph\" viewBox=\"0 0 {} {}\" xmlns=\"http://www.w3.org/2000/svg\">",
        WIDTH, HEIGHT
    );
    let _ = writeln!(
        out,
        "<defs><marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"{}\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"#999\"/></marker></defs>",
        10.0 + NODE_RADIUS * 0.6
    );
    out.push_str("<g id=\"viewport\">\n");

    for edge in &graph.edges {
        let (s, t) = (positions[edge.source], positions[edge.target]);
        let _ = writeln!(
            out,
            "<g class=\"edge\" data-s=\"{}\" data-t=\"{}\"><line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" marker-end=\"url(#arrow)\"/><text x=\"{:.1}\" y=\"{:.1}\">{}</text></g>",
            edge.source,
            edge.target,
            s.x,
            s.y,
            t.x,
            t.y,
            (s.x + t.x) / 2.0,
            (s.y + t.y) / 2.0 - 4.0,
            escape_html(&edge.label)
        );
    }

    for (idx, node) in graph.nodes.iter().enumerate() {
        let p = positions[idx];
        let _ = writeln!(
            out,
            "<g class=\"node\" data-x=\"{x:.1}\" data-y=\"{y:.1}\" transform=\"translate({x:.1},{y:.1})\"><title>{tip}</title><circle r=\"{r}\" fill=\"{color}\"/><text y=\"{dy}\">{label}</text></g>",
            x = p.x,
            y = p.y,
            tip = escape_html(&format!(
                "{} ({})",
                node.id,
                node.entity_type.as_deref().unwrap_or(UNTYPED)
            )),
            r = NODE_RADIUS,
            color = color_for(node.entity_type.as_deref()),
            dy = NODE_RADIUS + 14.0,
            label = escape_html(&node.label)
        );
    }

    out.push_str("</g>\n<g class=\"legend\" transform=\"translate(16,16)\">\n");
    for (row, entity_type) in graph.legend().into_iter().enumerate() {
        let y = row as f64 * 20.0;
        let _ = writeln!(
            out,
            "<rect x=\"0\" y=\"{:.0}\" width=\"12\" height=\"12\" fill=\"{}\" stroke=\"#555\"/><text x=\"18\" y=\"{:.0}\">{}</text>",
            y,
            color_for(entity_type),
            y + 10.0,
            escape_html(entity_type.unwrap_or(UNTYPED))
        );
    }
    out.push_str("</g>\n</svg>\n");

    let _ = writeln!(out, "<script>{}</script>\n</body>\n</html>", SCRIPT);
    out
}
