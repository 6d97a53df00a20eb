use eframe::egui::{Vec2, vec2};

pub(in crate::app) const QUADTREE_MAX_OBJECTS: usize = 8;
pub(in crate::app) const QUADTREE_MAX_DEPTH: usize = 8;

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct QuadBounds {
    pub(in crate::app) center: Vec2,
    pub(in crate::app) half: Vec2,
}

impl QuadBounds {
    pub(in crate::app) fn from_min_max(min: Vec2, max: Vec2) -> Self {
        let center = (min + max) * 0.5;
        let half = vec2(
            ((max.x - min.x) * 0.5).max(0.5),
            ((max.y - min.y) * 0.5).max(0.5),
        );
        Self { center, half }
    }

    // Midpoint ties land in the left/top quadrant.
    fn quadrant_for(self, point: Vec2) -> usize {
        let right = point.x > self.center.x;
        let lower = point.y > self.center.y;
        match (right, lower) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half * 0.5;
        let offset = match quadrant {
            0 => vec2(-quarter.x, -quarter.y),
            1 => vec2(quarter.x, -quarter.y),
            2 => vec2(-quarter.x, quarter.y),
            _ => vec2(quarter.x, quarter.y),
        };

        Self {
            center: self.center + offset,
            half: quarter,
        }
    }

    fn distance_sq_to_point(self, point: Vec2) -> f32 {
        let dx = ((point.x - self.center.x).abs() - self.half.x).max(0.0);
        let dy = ((point.y - self.center.y).abs() - self.half.y).max(0.0);
        (dx * dx) + (dy * dy)
    }
}

#[derive(Clone, Copy, Debug)]
struct QuadPoint {
    index: usize,
    pos: Vec2,
}

struct QuadNode {
    bounds: QuadBounds,
    depth: usize,
    points: Vec<QuadPoint>,
    children: Option<Box<[QuadNode; 4]>>,
}

pub(in crate::app) struct IndexCell {
    pub center: Vec2,
    pub half: Vec2,
    pub depth: usize,
    pub is_leaf: bool,
}

impl QuadNode {
    fn new(bounds: QuadBounds, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            points: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, point: QuadPoint) {
        if let Some(children) = self.children.as_mut() {
            children[self.bounds.quadrant_for(point.pos)].insert(point);
            return;
        }

        self.points.push(point);
        if self.points.len() > QUADTREE_MAX_OBJECTS && self.depth < QUADTREE_MAX_DEPTH {
            self.subdivide();
        }
    }

    fn subdivide(&mut self) {
        let mut children = Box::new(std::array::from_fn::<_, 4, _>(|quadrant| {
            QuadNode::new(self.bounds.child(quadrant), self.depth + 1)
        }));

        // Once split, a node never holds points directly again.
        for point in self.points.drain(..) {
            children[self.bounds.quadrant_for(point.pos)].insert(point);
        }
        self.children = Some(children);
    }

    fn query_radius(&self, center: Vec2, radius_sq: f32, out: &mut Vec<usize>) {
        if self.bounds.distance_sq_to_point(center) > radius_sq {
            return;
        }

        for point in &self.points {
            if (point.pos - center).length_sq() <= radius_sq {
                out.push(point.index);
            }
        }

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query_radius(center, radius_sq, out);
            }
        }
    }

    fn clear(&mut self) {
        self.points.clear();
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                child.clear();
            }
        }
        self.children = None;
    }

    fn collect_cells(&self, out: &mut Vec<IndexCell>) {
        out.push(IndexCell {
            center: self.bounds.center,
            half: self.bounds.half,
            depth: self.depth,
            is_leaf: self.children.is_none(),
        });

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect_cells(out);
            }
        }
    }
}

pub(in crate::app) struct Quadtree {
    root: QuadNode,
}

impl Quadtree {
    pub(in crate::app) fn new(bounds: QuadBounds) -> Self {
        Self {
            root: QuadNode::new(bounds, 0),
        }
    }

    pub(in crate::app) fn insert(&mut self, index: usize, pos: Vec2) {
        if !pos.x.is_finite() || !pos.y.is_finite() {
            return;
        }
        self.root.insert(QuadPoint { index, pos });
    }

    // Appends every indexed point within `radius` of `center`. Exact: points
    // gathered from intersecting quadrants are distance-checked individually.
    pub(in crate::app) fn query_radius(&self, center: Vec2, radius: f32, out: &mut Vec<usize>) {
        if radius <= 0.0 {
            return;
        }
        self.root.query_radius(center, radius * radius, out);
    }

    pub(in crate::app) fn clear(&mut self) {
        self.root.clear();
    }

    // Only meaningful on an empty (cleared) tree; the bounds must cover every
    // point inserted afterwards or the query short-circuit loses points.
    pub(in crate::app) fn set_bounds(&mut self, bounds: QuadBounds) {
        self.root.bounds = bounds;
    }

    pub(in crate::app) fn collect_cells(&self, out: &mut Vec<IndexCell>) {
        self.root.collect_cells(out);
    }
}
