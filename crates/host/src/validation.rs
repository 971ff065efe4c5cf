//! Viewport validation for the host edge.
//!
//! - Non-finite container width: DROP + LOG
//! - Non-positive container width: DROP + LOG
//! - Width outside the canvas limits: CLAMP

/// Canvas sizing limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportLimits {
    /// Subtracted from the container width before clamping.
    pub horizontal_padding: f64,
    pub min_width: f64,
    pub max_width: f64,
}

impl Default for ViewportLimits {
    fn default() -> Self {
        Self {
            horizontal_padding: 32.0,
            min_width: 360.0,
            max_width: 600.0,
        }
    }
}

impl ViewportLimits {
    /// `clamp(container_width - padding, min, max)`.
    pub fn canvas_width(&self, container_width: f64) -> f64 {
        (container_width - self.horizontal_padding).clamp(self.min_width, self.max_width)
    }
}

/// Result of resize validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeValidation {
    /// Canvas width accepted as is.
    Accepted { width: f64 },
    /// Canvas width clamped into the limits.
    AcceptedWithClamp { width: f64, requested: f64 },
    /// Dropped: NaN or Inf.
    DroppedNonFinite,
    /// Dropped: zero or negative container.
    DroppedNonPositive { container_width: f64 },
}

impl ResizeValidation {
    pub fn width(&self) -> Option<f64> {
        match *self {
            Self::Accepted { width } | Self::AcceptedWithClamp { width, .. } => Some(width),
            Self::DroppedNonFinite | Self::DroppedNonPositive { .. } => None,
        }
    }
}

/// Validate a container width reported by the host page.
pub fn validate_container_width(container_width: f64, limits: &ViewportLimits) -> ResizeValidation {
    if !container_width.is_finite() {
        log::warn!("dropping resize with non-finite container width {container_width}");
        return ResizeValidation::DroppedNonFinite;
    }
    if container_width <= 0.0 {
        log::warn!("dropping resize with container width {container_width}");
        return ResizeValidation::DroppedNonPositive { container_width };
    }

    let requested = container_width - limits.horizontal_padding;
    let width = limits.canvas_width(container_width);
    if width == requested {
        ResizeValidation::Accepted { width }
    } else {
        log::debug!("clamped canvas width {requested} to {width}");
        ResizeValidation::AcceptedWithClamp { width, requested }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(632.0, 600.0)]
    #[case(1920.0, 600.0)]
    #[case(500.0, 468.0)]
    #[case(392.0, 360.0)]
    #[case(100.0, 360.0)]
    fn test_canvas_width_clamped(#[case] container: f64, #[case] expected: f64) {
        assert_eq!(ViewportLimits::default().canvas_width(container), expected);
    }

    #[test]
    fn test_in_range_width_accepted() {
        let result = validate_container_width(500.0, &ViewportLimits::default());
        assert_eq!(result, ResizeValidation::Accepted { width: 468.0 });
    }

    #[test]
    fn test_out_of_range_width_clamped() {
        let result = validate_container_width(200.0, &ViewportLimits::default());
        assert_eq!(
            result,
            ResizeValidation::AcceptedWithClamp {
                width: 360.0,
                requested: 168.0
            }
        );
        assert_eq!(result.width(), Some(360.0));
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(f64::NEG_INFINITY)]
    fn test_non_finite_dropped(#[case] container: f64) {
        let result = validate_container_width(container, &ViewportLimits::default());
        assert_eq!(result, ResizeValidation::DroppedNonFinite);
        assert_eq!(result.width(), None);
    }

    #[test]
    fn test_non_positive_dropped() {
        let limits = ViewportLimits::default();
        assert!(matches!(
            validate_container_width(0.0, &limits),
            ResizeValidation::DroppedNonPositive { .. }
        ));
        assert!(matches!(
            validate_container_width(-40.0, &limits),
            ResizeValidation::DroppedNonPositive { .. }
        ));
    }
}
