//! Read-position tracking for the transcript viewport.
//!
//! The controller is unit-agnostic: positions and the threshold share
//! whatever unit the view measures in (pixels in a browser, rows in a
//! terminal).

/// Distance from the bottom within which the viewport counts as pinned.
pub const DEFAULT_PIN_THRESHOLD: u32 = 20;

/// Unread counts above this render as "99+".
const UNREAD_BADGE_CAP: usize = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    Pinned,
    ScrolledUp,
}

/// Viewport position at the time of a scroll event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPosition {
    pub offset: u32,
    pub max_offset: u32,
}

impl ScrollPosition {
    pub fn distance_from_bottom(self) -> u32 {
        self.max_offset.saturating_sub(self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoscrollDecision {
    /// Move the viewport to the newest message.
    ScrollToBottom,
    /// Leave the viewport alone; the unread counter was bumped.
    Hold { unread: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoscrollController {
    mode: ScrollMode,
    unread: usize,
    threshold: u32,
}

impl Default for AutoscrollController {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_PIN_THRESHOLD)
    }
}

impl AutoscrollController {
    pub fn with_threshold(threshold: u32) -> Self {
        Self {
            mode: ScrollMode::Pinned,
            unread: 0,
            threshold,
        }
    }

    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    pub fn is_pinned(&self) -> bool {
        self.mode == ScrollMode::Pinned
    }

    pub fn unread_count(&self) -> usize {
        self.unread
    }

    /// Badge text for the jump-to-bottom control, if it is shown.
    pub fn unread_badge(&self) -> Option<String> {
        match self.unread {
            0 => None,
            count if count > UNREAD_BADGE_CAP => Some(format!("{UNREAD_BADGE_CAP}+")),
            count => Some(count.to_string()),
        }
    }

    pub fn shows_jump_control(&self) -> bool {
        self.mode == ScrollMode::ScrolledUp
    }

    /// Back to the initial state when a chat is opened or switched.
    pub fn reset(&mut self) {
        self.mode = ScrollMode::Pinned;
        self.unread = 0;
    }

    pub fn on_scroll(&mut self, position: ScrollPosition) {
        let next = if position.distance_from_bottom() > self.threshold {
            ScrollMode::ScrolledUp
        } else {
            ScrollMode::Pinned
        };

        if next != self.mode {
            tracing::trace!(from = ?self.mode, to = ?next, "transcript scroll mode changed");
        }

        if next == ScrollMode::Pinned {
            self.unread = 0;
        }
        self.mode = next;
    }

    pub fn on_new_messages(&mut self, count: usize) -> AutoscrollDecision {
        match self.mode {
            ScrollMode::Pinned => AutoscrollDecision::ScrollToBottom,
            ScrollMode::ScrolledUp => {
                self.unread = self.unread.saturating_add(count);
                AutoscrollDecision::Hold {
                    unread: self.unread,
                }
            }
        }
    }

    /// Explicit "scroll to bottom": pin, clear unread, hide the control.
    pub fn scroll_to_bottom(&mut self) {
        self.mode = ScrollMode::Pinned;
        self.unread = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(offset: u32, max_offset: u32) -> ScrollPosition {
        ScrollPosition { offset, max_offset }
    }

    #[test]
    fn starts_pinned_without_unread() {
        let controller = AutoscrollController::default();

        assert_eq!(controller.mode(), ScrollMode::Pinned);
        assert_eq!(controller.unread_count(), 0);
        assert!(!controller.shows_jump_control());
    }

    #[test]
    fn pin_unpin_round_trip() {
        let mut controller = AutoscrollController::default();

        controller.on_scroll(at(900, 1_000));
        assert_eq!(controller.mode(), ScrollMode::ScrolledUp);

        for _ in 0..3 {
            assert!(matches!(
                controller.on_new_messages(1),
                AutoscrollDecision::Hold { .. }
            ));
        }
        assert_eq!(controller.unread_count(), 3);
        assert!(controller.shows_jump_control());

        controller.scroll_to_bottom();
        assert_eq!(controller.unread_count(), 0);
        assert_eq!(controller.mode(), ScrollMode::Pinned);
        assert!(!controller.shows_jump_control());
    }

    #[test]
    fn threshold_boundary_stays_pinned() {
        let mut controller = AutoscrollController::default();

        controller.on_scroll(at(980, 1_000));
        assert!(controller.is_pinned());

        controller.on_scroll(at(979, 1_000));
        assert!(!controller.is_pinned());
    }

    #[test]
    fn scrolling_back_near_bottom_repins_and_clears_unread() {
        let mut controller = AutoscrollController::default();
        controller.on_scroll(at(0, 500));
        controller.on_new_messages(4);

        controller.on_scroll(at(495, 500));

        assert!(controller.is_pinned());
        assert_eq!(controller.unread_count(), 0);
    }

    #[test]
    fn pinned_arrivals_request_scroll_to_bottom() {
        let mut controller = AutoscrollController::default();

        assert_eq!(
            controller.on_new_messages(2),
            AutoscrollDecision::ScrollToBottom
        );
        assert_eq!(controller.unread_count(), 0);
    }

    #[test]
    fn badge_caps_at_ninety_nine_but_count_is_unbounded() {
        let mut controller = AutoscrollController::default();
        controller.on_scroll(at(0, 500));

        assert_eq!(controller.unread_badge(), None);
        controller.on_new_messages(99);
        assert_eq!(controller.unread_badge().as_deref(), Some("99"));
        controller.on_new_messages(51);
        assert_eq!(controller.unread_badge().as_deref(), Some("99+"));
        assert_eq!(controller.unread_count(), 150);
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut controller = AutoscrollController::with_threshold(2);
        controller.on_scroll(at(0, 10));
        controller.on_new_messages(1);

        controller.reset();

        assert!(controller.is_pinned());
        assert_eq!(controller.unread_count(), 0);
    }
}
