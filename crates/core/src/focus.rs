/// A surface that can receive keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Menu,
    Submenu,
    Form,
    Confirm,
    Popup,
}

/// Ordered record of focused surfaces. The menu is always at the bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusStack {
    surfaces: Vec<Focus>,
}

impl Default for FocusStack {
    fn default() -> Self {
        Self {
            surfaces: vec![Focus::Menu],
        }
    }
}

impl FocusStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> Focus {
        self.surfaces.last().copied().unwrap_or(Focus::Menu)
    }

    pub fn push(&mut self, focus: Focus) {
        self.surfaces.push(focus);
    }

    /// Returns the surface that regains focus. The root menu is never popped.
    pub fn pop(&mut self) -> Focus {
        if self.surfaces.len() > 1 {
            self.surfaces.pop();
        }
        self.current()
    }

    pub fn reset(&mut self) {
        self.surfaces.truncate(1);
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Focus] {
        &self.surfaces
    }
}
