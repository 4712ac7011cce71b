//! Sentinel Geometry
//!
//! Pure functions deciding whether the sentinel counts as visible. Everything
//! is measured along the scroll axis only, in the same pixel units the
//! presentation layer reports.

/// A one-dimensional extent along the scroll axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    /// Leading edge (top for vertical feeds)
    pub start: i32,
    /// Length of the span; zero for collapsed elements
    pub extent: u32,
}

impl Span {
    pub fn new(start: i32, extent: u32) -> Self {
        Self { start, extent }
    }

    /// Trailing edge, widened so `start + extent` cannot overflow
    pub fn end(&self) -> i64 {
        self.start as i64 + self.extent as i64
    }

    /// Grow the span by `margin` on both sides
    pub fn expand(&self, margin: u32) -> (i64, i64) {
        let margin = margin as i64;
        (self.start as i64 - margin, self.end() + margin)
    }
}

/// Position of the sentinel element relative to the scroll root
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bounds {
    pub element: Span,
    pub root: Span,
}

impl Bounds {
    pub fn new(element: Span, root: Span) -> Self {
        Self { element, root }
    }
}

// ============================================================================
// Core Formulas
// ============================================================================

/// Fraction of `element` inside `root` once the root is grown by `root_margin`
///
/// Collapsed (zero-extent) elements report 1.0 when they sit inside the grown
/// root, edges included, and 0.0 otherwise.
pub fn intersection_ratio(element: Span, root: Span, root_margin: u32) -> f64 {
    let (root_start, root_end) = root.expand(root_margin);

    if element.extent == 0 {
        let at = element.start as i64;
        return if at >= root_start && at <= root_end { 1.0 } else { 0.0 };
    }

    let start = (element.start as i64).max(root_start);
    let end = element.end().min(root_end);
    if end <= start {
        return 0.0;
    }
    (end - start) as f64 / element.extent as f64
}

/// True when the element's intersection ratio reaches `threshold`
pub fn is_visible(bounds: Bounds, root_margin: u32, threshold: f64) -> bool {
    intersection_ratio(bounds.element, bounds.root, root_margin) >= threshold
}

/// Pixels the element still has to travel before it becomes fully visible.
///
/// Zero once the whole element lies inside the grown root. Useful for
/// presentation layers that want to prefetch before the trigger fires.
pub fn distance_to_visible(bounds: Bounds, root_margin: u32) -> u64 {
    let (root_start, root_end) = bounds.root.expand(root_margin);
    let below = bounds.element.end() - root_end;
    let above = root_start - bounds.element.start as i64;
    below.max(above).max(0) as u64
}
