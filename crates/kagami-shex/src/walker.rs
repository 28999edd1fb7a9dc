//! Generic pre-order walker over shape trees

use crate::model::{NodeConstraint, Shape, ShapeExpr, ShapeOr, TripleConstraint};

/// Handler hooks invoked during a walk; every hook defaults to a no-op so
/// clients implement only the node kinds they care about. All side effects
/// live in the handler.
pub trait ShapeHandler {
    fn on_shape(&mut self, _shape: &Shape) {}
    fn on_triple(&mut self, _constraint: &TripleConstraint) {}
    fn on_node(&mut self, _constraint: &NodeConstraint) {}
    fn on_or(&mut self, _or: &ShapeOr) {}
    fn on_ref(&mut self, _label: &str) {}
}

/// Pre-order traversal: the handler sees each node before its children, and
/// every expression reachable from `expr` is visited exactly once.
///
/// The walker keeps no state of its own; starting a fresh nested walk from
/// inside a handler is safe, which the subset extractor relies on when it
/// evaluates sub-shapes.
pub fn walk<H: ShapeHandler>(expr: &ShapeExpr, handler: &mut H) {
    match expr {
        ShapeExpr::Shape(shape) => {
            handler.on_shape(shape);
            for child in &shape.expressions {
                walk(child, handler);
            }
        }
        ShapeExpr::Triple(constraint) => {
            handler.on_triple(constraint);
            if let Some(value) = &constraint.value {
                walk(value, handler);
            }
        }
        ShapeExpr::Node(constraint) => handler.on_node(constraint),
        ShapeExpr::Or(or) => {
            handler.on_or(or);
            for alternative in &or.alternatives {
                walk(alternative, handler);
            }
        }
        ShapeExpr::Ref(label) => handler.on_ref(label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc(predicate: &str) -> ShapeExpr {
        ShapeExpr::Triple(TripleConstraint {
            predicate: predicate.to_string(),
            value: None,
        })
    }

    #[derive(Default)]
    struct Recorder {
        predicates: Vec<String>,
        shapes: usize,
        nodes: usize,
        refs: Vec<String>,
    }

    impl ShapeHandler for Recorder {
        fn on_shape(&mut self, _shape: &Shape) {
            self.shapes += 1;
        }
        fn on_triple(&mut self, constraint: &TripleConstraint) {
            self.predicates.push(constraint.predicate.clone());
        }
        fn on_node(&mut self, _constraint: &NodeConstraint) {
            self.nodes += 1;
        }
        fn on_ref(&mut self, label: &str) {
            self.refs.push(label.to_string());
        }
    }

    #[test]
    fn test_preorder_visits_every_node_once() {
        let expr = ShapeExpr::Shape(Shape {
            expressions: vec![
                tc("http://w/prop/direct/P1"),
                ShapeExpr::Triple(TripleConstraint {
                    predicate: "http://w/prop/direct/P2".to_string(),
                    value: Some(Box::new(ShapeExpr::Node(NodeConstraint::default()))),
                }),
                ShapeExpr::Or(ShapeOr {
                    alternatives: vec![ShapeExpr::Ref("http://w/#A".to_string()), tc("http://w/prop/direct/P3")],
                }),
            ],
        });
        let mut recorder = Recorder::default();
        walk(&expr, &mut recorder);
        assert_eq!(recorder.shapes, 1);
        assert_eq!(
            recorder.predicates,
            vec![
                "http://w/prop/direct/P1",
                "http://w/prop/direct/P2",
                "http://w/prop/direct/P3"
            ]
        );
        assert_eq!(recorder.nodes, 1);
        assert_eq!(recorder.refs, vec!["http://w/#A"]);
    }

    #[test]
    fn test_nested_walk_from_handler_is_safe() {
        struct Nesting<'a> {
            inner: &'a ShapeExpr,
            seen: Vec<String>,
        }
        impl ShapeHandler for Nesting<'_> {
            fn on_triple(&mut self, constraint: &TripleConstraint) {
                self.seen.push(constraint.predicate.clone());
                if self.seen.len() == 1 {
                    // re-entrant walk with a fresh handler
                    let mut recorder = Recorder::default();
                    walk(self.inner, &mut recorder);
                    assert_eq!(recorder.predicates.len(), 1);
                }
            }
        }
        let inner = tc("http://w/prop/direct/P9");
        let outer = ShapeExpr::Shape(Shape {
            expressions: vec![tc("http://w/prop/direct/P1"), tc("http://w/prop/direct/P2")],
        });
        let mut handler = Nesting {
            inner: &inner,
            seen: Vec::new(),
        };
        walk(&outer, &mut handler);
        assert_eq!(handler.seen.len(), 2);
    }
}
