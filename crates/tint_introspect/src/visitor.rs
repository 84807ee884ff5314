//! Visitors over a traversal pass
//!
//! [`visit`] replays a pass depth first from each root, following only
//! [`LinkStatus::Expanded`] links, so every Leave is entered exactly once.
//! Two visitors ship with the crate:
//! - [`TextPrinter`] renders an indented text tree
//! - [`DiagramBuilder`] collects nodes and edges for JSON or Graphviz output

use crate::diagnostic::Diagnostic;
use crate::leave::{Leave, Link, LinkStatus, Pass};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write;
use tint_core::object::EdgeKind;
use tint_core::{Describe, ObjectId};

/// Callbacks run while a pass is replayed
pub trait Visitor {
    /// A Leave is entered; roots have depth 0
    fn enter(&mut self, _leave: &Leave, _depth: usize) {}

    /// A link of `from` is reached. `target` is `None` for truncated links.
    fn link(&mut self, _from: &Leave, _link: &Link, _target: Option<&Leave>, _depth: usize) {}

    /// All links of a Leave were handled
    fn exit(&mut self, _leave: &Leave, _depth: usize) {}

    /// Called once per diagnostic after every root was visited
    fn diagnostic(&mut self, _diagnostic: &Diagnostic) {}
}

/// Replay `pass` into `visitor`
pub fn visit(pass: &Pass, visitor: &mut dyn Visitor) {
    for root in pass.roots() {
        let Some(leave) = pass.leave(*root) else {
            continue;
        };
        visitor.enter(leave, 0);

        // (leave, next link, depth)
        let mut stack: Vec<(&Leave, usize, usize)> = vec![(leave, 0, 0)];
        while let Some(top) = stack.last_mut() {
            let (current, depth) = (top.0, top.2);
            let Some(link) = current.links().get(top.1) else {
                visitor.exit(current, depth);
                stack.pop();
                continue;
            };
            top.1 += 1;

            let target = pass.leave(link.target);
            visitor.link(current, link, target, depth);
            if link.status == LinkStatus::Expanded {
                if let Some(child) = target {
                    visitor.enter(child, depth + 1);
                    stack.push((child, 0, depth + 1));
                }
            }
        }
    }
    for diagnostic in pass.diagnostics() {
        visitor.diagnostic(diagnostic);
    }
}

// ========== Text ==========

/// Indented text rendering, one line per root and per link:
///
/// ```text
/// FilterGraph[12]
/// - FilterGraph[12] -> FilterNode[13] nodes
/// - - FilterNode[13] -> FilterCore[14] core
/// - - FilterNode[13] -> FilterSocket[17] sockets (weak, cycle)
/// ```
#[derive(Debug, Default)]
pub struct TextPrinter {
    out: String,
}

impl TextPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

fn link_markers(link: &Link) -> String {
    let mut markers = Vec::new();
    match link.edge {
        EdgeKind::Owns => {}
        EdgeKind::Refers => markers.push("weak"),
        EdgeKind::Observes => markers.push("observes"),
    }
    if link.status != LinkStatus::Expanded {
        markers.push(link.status.as_str());
    }
    if markers.is_empty() {
        String::new()
    } else {
        format!(" ({})", markers.join(", "))
    }
}

impl Visitor for TextPrinter {
    fn enter(&mut self, leave: &Leave, depth: usize) {
        if depth == 0 {
            match leave.nick() {
                Some(nick) => writeln!(self.out, "{} \"{}\"", leave.label(), nick).ok(),
                None => writeln!(self.out, "{}", leave.label()).ok(),
            };
        }
    }

    fn link(&mut self, from: &Leave, link: &Link, _target: Option<&Leave>, depth: usize) {
        writeln!(
            self.out,
            "{}{} -> {}[{}] {}{}",
            "- ".repeat(depth + 1),
            from.label(),
            link.target_kind,
            link.target,
            link.label,
            link_markers(link)
        )
        .ok();
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic) {
        writeln!(self.out, "! {}", diagnostic).ok();
    }
}

// ========== Diagram ==========

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramNode {
    pub id: u32,
    pub kind: String,
    pub name: Option<String>,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramEdge {
    pub from: u32,
    pub to: u32,
    pub label: String,
    pub weak: bool,
    pub status: String,
}

/// Node and edge description of a pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    pub diagnostics: Vec<String>,
}

impl Diagram {
    pub fn node(&self, id: ObjectId) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id.raw())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Graphviz rendering; weak edges are dashed, cut edges red
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph tint {\n");
        for node in &self.nodes {
            let label = match &node.name {
                Some(name) => format!("{}[{}]\\n{}", node.kind, node.id, escape(name)),
                None => format!("{}[{}]", node.kind, node.id),
            };
            writeln!(dot, "  n{} [label=\"{}\"];", node.id, label).ok();
        }
        for edge in &self.edges {
            let mut attrs = vec![format!("label=\"{}\"", escape(&edge.label))];
            if edge.weak {
                attrs.push("style=dashed".to_string());
            }
            if edge.status != LinkStatus::Expanded.as_str() && edge.status != LinkStatus::Reused.as_str() {
                attrs.push("color=red".to_string());
            }
            writeln!(dot, "  n{} -> n{} [{}];", edge.from, edge.to, attrs.join(", ")).ok();
        }
        dot.push_str("}\n");
        dot
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Collects a [`Diagram`]
#[derive(Debug, Default)]
pub struct DiagramBuilder {
    diagram: Diagram,
    seen: HashSet<ObjectId>,
}

impl DiagramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn finish(self) -> Diagram {
        self.diagram
    }
}

impl Visitor for DiagramBuilder {
    fn enter(&mut self, leave: &Leave, _depth: usize) {
        if self.seen.insert(leave.id()) {
            self.diagram.nodes.push(DiagramNode {
                id: leave.id().raw(),
                kind: leave.kind().name().to_string(),
                name: leave.nick(),
                description: leave.describe(Describe::Long),
            });
        }
    }

    fn link(&mut self, from: &Leave, link: &Link, target: Option<&Leave>, _depth: usize) {
        if target.is_none() && self.seen.insert(link.target) {
            self.diagram.nodes.push(DiagramNode {
                id: link.target.raw(),
                kind: link.target_kind.name().to_string(),
                name: None,
                description: format!("{}[{}]", link.target_kind, link.target),
            });
        }
        self.diagram.edges.push(DiagramEdge {
            from: from.id().raw(),
            to: link.target.raw(),
            label: link.label.to_string(),
            weak: link.edge.is_weak(),
            status: link.status.as_str().to_string(),
        });
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.diagram.diagnostics.push(diagnostic.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::Introspector;
    use tint_core::object::{Entity, NameType};
    use tint_core::{observer, Blob};

    #[derive(Default)]
    struct Counter {
        entered: usize,
        exited: usize,
        links: usize,
    }

    impl Visitor for Counter {
        fn enter(&mut self, _leave: &Leave, _depth: usize) {
            self.entered += 1;
        }

        fn link(&mut self, _from: &Leave, _link: &Link, _target: Option<&Leave>, _depth: usize) {
            self.links += 1;
        }

        fn exit(&mut self, _leave: &Leave, _depth: usize) {
            self.exited += 1;
        }
    }

    #[test]
    fn test_every_leave_entered_once() {
        let a = Blob::new(vec![], None);
        let b = Blob::new(vec![], None);
        observer::observe(&a, &b, None);
        observer::observe(&b, &a, None);

        let mut counter = Counter::default();
        let report = Introspector::default().walk(&[a.as_dyn()], &mut [&mut counter]);
        assert_eq!(counter.entered, 2);
        assert_eq!(counter.exited, 2);
        assert_eq!(counter.links, 2);
        assert_eq!(report.leaves, 2);
    }

    #[test]
    fn test_text_printer() {
        let a = Blob::new(vec![], None);
        a.object().set_name(NameType::Nick, "input");
        let b = Blob::new(vec![], None);
        observer::observe(&a, &b, None);

        let mut printer = TextPrinter::new();
        Introspector::default().walk(&[a.as_dyn()], &mut [&mut printer]);
        let expected = format!(
            "Blob[{a}] \"input\"\n- Blob[{a}] -> Blob[{b}] observes (observes)\n",
            a = a.id(),
            b = b.id()
        );
        assert_eq!(printer.output(), expected);
    }

    #[test]
    fn test_diagram_dot_marks_cycles() {
        let a = Blob::new(vec![], None);
        let b = Blob::new(vec![], None);
        observer::observe(&a, &b, None);
        observer::observe(&b, &a, None);

        let mut builder = DiagramBuilder::new();
        Introspector::default().walk(&[a.as_dyn()], &mut [&mut builder]);
        let diagram = builder.finish();
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.edges.len(), 2);
        assert_eq!(diagram.diagnostics.len(), 1);

        let dot = diagram.to_dot();
        assert!(dot.starts_with("digraph tint {"));
        assert!(dot.contains(&format!(
            "n{} -> n{} [label=\"observes\", style=dashed, color=red];",
            b.id(),
            a.id()
        )));

        let parsed = Diagram::from_json(&diagram.to_json().unwrap()).unwrap();
        assert_eq!(parsed, diagram);
    }
}
