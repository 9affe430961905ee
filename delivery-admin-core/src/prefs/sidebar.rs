//! Responsive sidebar: collapsed on desktop, an overlay drawer on mobile.

/// Widths at or above this are desktop.
pub const DESKTOP_BREAKPOINT: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarState {
    width: u32,
    collapsed: bool,
    mobile_open: bool,
}

impl SidebarState {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            collapsed: false,
            mobile_open: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn is_desktop(&self) -> bool {
        self.width >= DESKTOP_BREAKPOINT
    }

    pub fn collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn mobile_open(&self) -> bool {
        self.mobile_open
    }

    /// Page scrolling is suppressed while the mobile drawer is open.
    pub fn scroll_locked(&self) -> bool {
        self.mobile_open
    }

    pub fn resize(&mut self, width: u32) {
        self.width = width;
        if self.is_desktop() {
            self.mobile_open = false;
        }
    }

    /// Flips `collapsed` on desktop, `mobile_open` on mobile.
    pub fn toggle(&mut self) {
        if self.is_desktop() {
            self.collapsed = !self.collapsed;
        } else {
            self.mobile_open = !self.mobile_open;
        }
    }

    pub fn close_mobile(&mut self) {
        self.mobile_open = false;
    }

    /// Escape closes the drawer. Returns whether the key was consumed.
    pub fn escape(&mut self) -> bool {
        let was_open = self.mobile_open;
        self.close_mobile();
        was_open
    }

    /// A click outside the sidebar closes the drawer.
    pub fn click_outside(&mut self) {
        self.close_mobile();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_on_desktop_flips_collapsed() {
        let mut sidebar = SidebarState::new(1280);
        sidebar.toggle();
        assert!(sidebar.collapsed());
        assert!(!sidebar.mobile_open());

        sidebar.toggle();
        assert!(!sidebar.collapsed());
        assert!(!sidebar.mobile_open());
    }

    #[test]
    fn test_toggle_on_mobile_flips_open() {
        let mut sidebar = SidebarState::new(800);
        sidebar.toggle();
        assert!(sidebar.mobile_open());
        assert!(sidebar.scroll_locked());
        assert!(!sidebar.collapsed());
    }

    #[test]
    fn test_breakpoint_is_desktop() {
        let mut sidebar = SidebarState::new(DESKTOP_BREAKPOINT);
        sidebar.toggle();
        assert!(sidebar.collapsed());
        assert!(!sidebar.mobile_open());

        let mut sidebar = SidebarState::new(DESKTOP_BREAKPOINT - 1);
        sidebar.toggle();
        assert!(!sidebar.collapsed());
        assert!(sidebar.mobile_open());
    }

    #[test]
    fn test_resize_to_desktop_closes_drawer() {
        let mut sidebar = SidebarState::new(600);
        sidebar.toggle();
        sidebar.resize(1440);
        assert!(!sidebar.mobile_open());
        assert!(!sidebar.scroll_locked());
    }

    #[test]
    fn test_escape_and_outside_click_close() {
        let mut sidebar = SidebarState::new(600);
        assert!(!sidebar.escape());

        sidebar.toggle();
        assert!(sidebar.escape());
        assert!(!sidebar.mobile_open());

        sidebar.toggle();
        sidebar.click_outside();
        assert!(!sidebar.mobile_open());
    }

    #[test]
    fn test_collapsed_survives_mobile_round_trip() {
        let mut sidebar = SidebarState::new(1280);
        sidebar.toggle();
        sidebar.resize(700);
        sidebar.toggle();
        assert!(sidebar.collapsed());
        assert!(sidebar.mobile_open());
    }
}
