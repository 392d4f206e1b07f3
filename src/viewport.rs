//! Intersection geometry for viewport-driven media.
//!
//! Each media slot knows its rectangle in page-content coordinates and the
//! scroll viewport is expressed in the same space, so "is this element on
//! screen" reduces to rectangle overlap against a grown or inset viewport.

use std::time::Duration;

use iced::Rectangle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow by `margin` on every side. A negative margin insets the rectangle.
    pub fn expand(&self, margin: f32) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            width: (self.width + 2.0 * margin).max(0.0),
            height: (self.height + 2.0 * margin).max(0.0),
        }
    }
}

impl From<Rect> for Rectangle {
    fn from(rect: Rect) -> Self {
        Rectangle {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// One observation boundary: viewport margin plus minimum visible fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub margin: f32,
    pub threshold: f32,
}

impl Trigger {
    /// Fraction of `element` that lies inside `viewport` grown by this trigger's margin.
    pub fn ratio(&self, element: Rect, viewport: Rect) -> f32 {
        let root = Rectangle::from(viewport.expand(self.margin));
        let element = Rectangle::from(element);

        if element.area() <= 0.0 {
            return if root.contains(element.position()) {
                1.0
            } else {
                0.0
            };
        }

        root.intersection(&element)
            .map_or(0.0, |overlap| (overlap.area() / element.area()).clamp(0.0, 1.0))
    }

    pub fn intersects(&self, element: Rect, viewport: Rect) -> bool {
        let ratio = self.ratio(element, viewport);
        ratio > 0.0 && ratio >= self.threshold
    }
}

/// The two boundaries a lazy media element reacts to.
///
/// `load` is looser than `playback`: a source is fetched slightly before the
/// element scrolls into view, while play/pause only flips once the element is
/// well inside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportPolicy {
    pub load: Trigger,
    pub playback: Trigger,
    pub max_jitter_ms: u64,
}

impl Default for ViewportPolicy {
    fn default() -> Self {
        Self {
            load: Trigger {
                margin: 50.0,
                threshold: 0.01,
            },
            playback: Trigger {
                margin: -50.0,
                threshold: 0.1,
            },
            max_jitter_ms: 200,
        }
    }
}

impl ViewportPolicy {
    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 1280.0, 720.0)
    }

    #[test]
    fn load_margin_reaches_below_the_fold() {
        let policy = ViewportPolicy::default();
        // Starts 30px below the bottom edge, inside the +50px load margin.
        let element = Rect::new(0.0, 750.0, 1280.0, 400.0);
        assert!(policy.load.intersects(element, viewport()));
        assert!(!policy.playback.intersects(element, viewport()));
    }

    #[test]
    fn element_far_below_is_not_intersecting() {
        let policy = ViewportPolicy::default();
        let element = Rect::new(0.0, 2000.0, 1280.0, 400.0);
        assert_eq!(policy.load.ratio(element, viewport()), 0.0);
        assert!(!policy.load.intersects(element, viewport()));
    }

    #[test]
    fn playback_needs_ten_percent_inside_inset() {
        let policy = ViewportPolicy::default();
        // Inset viewport ends at 670. 30px of a 400px element is 7.5%.
        let barely = Rect::new(0.0, 640.0, 1280.0, 400.0);
        assert!(!policy.playback.intersects(barely, viewport()));

        // 70px of 400px is 17.5%.
        let enough = Rect::new(0.0, 600.0, 1280.0, 400.0);
        assert!(policy.playback.intersects(enough, viewport()));
    }

    #[test]
    fn fully_visible_element_has_ratio_one() {
        let trigger = Trigger {
            margin: 0.0,
            threshold: 0.5,
        };
        let element = Rect::new(100.0, 100.0, 200.0, 200.0);
        assert_eq!(trigger.ratio(element, viewport()), 1.0);
    }

    #[test]
    fn zero_area_element_uses_its_origin() {
        let trigger = ViewportPolicy::default().load;
        assert!(trigger.intersects(Rect::new(10.0, 10.0, 0.0, 0.0), viewport()));
        assert!(!trigger.intersects(Rect::new(10.0, 900.0, 0.0, 0.0), viewport()));
    }

    #[test]
    fn touching_edges_do_not_count_as_overlap() {
        let trigger = Trigger {
            margin: 0.0,
            threshold: 0.0,
        };
        let element = Rect::new(0.0, 720.0, 1280.0, 400.0);
        assert_eq!(trigger.ratio(element, viewport()), 0.0);
        assert!(!trigger.intersects(element, viewport()));

        let half = Rect::new(0.0, 520.0, 1280.0, 400.0);
        assert_eq!(trigger.ratio(half, viewport()), 0.5);
    }
}
