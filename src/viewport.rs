pub const DEFAULT_SCROLL_THRESHOLD: f64 = 5.0;

/// Scroll geometry of the surface showing a message log.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

pub fn is_at_bottom(metrics: &ViewportMetrics, threshold: f64) -> bool {
    metrics.scroll_top >= metrics.scroll_height - metrics.client_height - threshold
}

/// Remembers, across one log update, whether the viewport was pinned to the bottom.
///
/// `before_update` must be called with the metrics read before the new messages are
/// laid out; `after_update` then tells whether to scroll to the newest message.
#[derive(Debug, Clone)]
pub struct ScrollPolicy {
    threshold: f64,
    stick_to_bottom: bool,
}

impl ScrollPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, stick_to_bottom: false }
    }

    pub fn before_update(&mut self, metrics: Option<ViewportMetrics>) {
        self.stick_to_bottom = metrics
            .map(|m| is_at_bottom(&m, self.threshold))
            .unwrap_or(false);
    }

    pub fn after_update(&mut self) -> bool {
        std::mem::take(&mut self.stick_to_bottom)
    }
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_distance(distance: f64) -> ViewportMetrics {
        ViewportMetrics {
            scroll_top: 1000.0 - 400.0 - distance,
            scroll_height: 1000.0,
            client_height: 400.0,
        }
    }

    #[test]
    fn within_threshold_scrolls() {
        let mut policy = ScrollPolicy::default();
        for distance in [0.0, 2.5, 5.0] {
            policy.before_update(Some(at_distance(distance)));
            assert!(policy.after_update(), "distance {}", distance);
        }
    }

    #[test]
    fn scrolled_up_does_not_yank() {
        let mut policy = ScrollPolicy::default();
        policy.before_update(Some(at_distance(5.5)));
        assert!(!policy.after_update());
        policy.before_update(Some(at_distance(300.0)));
        assert!(!policy.after_update());
    }

    #[test]
    fn decision_is_consumed() {
        let mut policy = ScrollPolicy::new(5.0);
        policy.before_update(Some(at_distance(0.0)));
        assert!(policy.after_update());
        assert!(!policy.after_update());
    }

    #[test]
    fn missing_viewport_is_not_at_bottom() {
        let mut policy = ScrollPolicy::default();
        policy.before_update(None);
        assert!(!policy.after_update());
    }
}
