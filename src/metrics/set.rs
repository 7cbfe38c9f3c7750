//! Cycle-scoped metric container
//!
//! A [`MetricSet`] is built fresh for each collection cycle, filled by the
//! probe runner and handed by value to the exporter. Nothing is carried over
//! between cycles, so a key a probe stops reporting disappears from the next
//! snapshot.

use std::collections::HashMap;

/// Label carrying the node identity on every published point
pub const NODE_LABEL: &str = "node";

/// One gauge reading
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub const_labels: HashMap<String, String>,
}

/// Ordered set of points from one probe run
#[derive(Debug, Clone)]
pub struct MetricSet {
    help: String,
    points: Vec<MetricPoint>,
    index: HashMap<String, usize>,
}

impl MetricSet {
    /// Create an empty set for points produced by `source` (the node role)
    pub fn new(source: &str) -> Self {
        Self {
            help: format!("Metric from {}", source),
            points: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Help text shared by every point in the set
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Insert a point. A point with the same name replaces the earlier one
    /// in place.
    pub fn insert(&mut self, point: MetricPoint) {
        match self.index.get(&point.name) {
            Some(&slot) => self.points[slot] = point,
            None => {
                self.index.insert(point.name.clone(), self.points.len());
                self.points.push(point);
            }
        }
    }

    /// Build and insert a gauge labelled with `node`
    pub fn set_gauge(&mut self, name: String, value: f64, node: &str) {
        let const_labels = HashMap::from([(NODE_LABEL.to_string(), node.to_string())]);
        self.insert(MetricPoint {
            name,
            value,
            const_labels,
        });
    }

    pub fn get(&self, name: &str) -> Option<&MetricPoint> {
        self.index.get(name).map(|&slot| &self.points[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
