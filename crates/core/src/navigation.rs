use thiserror::Error;
use tracing::{debug, warn};

use crate::focus::{Focus, FocusStack};
use crate::forms::{Form, FormItem};
use crate::operations::{
    descriptor, Category, Operation, OperationAction, OperationDescriptor, Submission,
};
use crate::popup::{render_message, render_mutation, render_rows, Popup, PopupKind, Severity};
use crate::query_executor::{ExecutorError, QueryExecutor, RecordBackend};

/// Keyboard intent, already stripped of terminal details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavInput {
    Up,
    Down,
    Left,
    Right,
    Next,
    Previous,
    Select,
    Cancel,
    Backspace,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Category(Category),
    Quit,
}

impl MenuEntry {
    pub const ALL: [Self; 4] = [
        Self::Category(Category::Admins),
        Self::Category(Category::Bans),
        Self::Category(Category::Whitelist),
        Self::Quit,
    ];

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Category(category) => category.title(),
            Self::Quit => "Quit",
        }
    }

    #[must_use]
    pub fn shortcut(self) -> char {
        match self {
            Self::Category(category) => category.shortcut(),
            Self::Quit => 'q',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    MenuRoot,
    SubmenuActive(Category),
    FormActive(Category, Operation),
    ConfirmActive(Category, Operation),
    PopupActive(PopupKind, Focus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    No,
    Yes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmModal {
    pub text: &'static str,
    pub selected: ConfirmChoice,
}

impl ConfirmModal {
    fn toggle(&mut self) {
        self.selected = match self.selected {
            ConfirmChoice::No => ConfirmChoice::Yes,
            ConfirmChoice::Yes => ConfirmChoice::No,
        };
    }
}

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error(transparent)]
    Backend(#[from] ExecutorError),
}

/// Owns the three panes, the focus stack, and the executor behind them.
#[derive(Debug)]
pub struct Navigator<B: RecordBackend> {
    executor: QueryExecutor<B>,
    focus: FocusStack,
    menu_cursor: usize,
    category: Option<Category>,
    submenu_cursor: usize,
    active: Option<&'static OperationDescriptor>,
    form: Option<Form>,
    confirm: Option<ConfirmModal>,
    popup: Option<Popup>,
    should_quit: bool,
}

impl<B: RecordBackend> Navigator<B> {
    #[must_use]
    pub fn new(executor: QueryExecutor<B>) -> Self {
        Self {
            executor,
            focus: FocusStack::new(),
            menu_cursor: 0,
            category: None,
            submenu_cursor: 0,
            active: None,
            form: None,
            confirm: None,
            popup: None,
            should_quit: false,
        }
    }

    #[must_use]
    pub fn executor(&self) -> &QueryExecutor<B> {
        &self.executor
    }

    #[must_use]
    pub fn focus(&self) -> Focus {
        self.focus.current()
    }

    #[must_use]
    pub fn menu_cursor(&self) -> usize {
        self.menu_cursor
    }

    #[must_use]
    pub fn category(&self) -> Option<Category> {
        self.category
    }

    #[must_use]
    pub fn submenu_entries(&self) -> &'static [Operation] {
        match self.category {
            Some(category) => category.operations(),
            None => &[],
        }
    }

    #[must_use]
    pub fn submenu_cursor(&self) -> usize {
        self.submenu_cursor
    }

    #[must_use]
    pub fn active_operation(&self) -> Option<(Category, Operation)> {
        self.active
            .map(|descriptor| (descriptor.category, descriptor.operation))
    }

    #[must_use]
    pub fn form(&self) -> Option<&Form> {
        self.form.as_ref()
    }

    #[must_use]
    pub fn confirm(&self) -> Option<&ConfirmModal> {
        self.confirm.as_ref()
    }

    #[must_use]
    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[must_use]
    pub fn state(&self) -> NavState {
        match self.focus.current() {
            Focus::Menu => NavState::MenuRoot,
            Focus::Submenu => self
                .category
                .map_or(NavState::MenuRoot, NavState::SubmenuActive),
            Focus::Form => self.active_operation().map_or(NavState::MenuRoot, |(c, o)| {
                NavState::FormActive(c, o)
            }),
            Focus::Confirm => self.active_operation().map_or(NavState::MenuRoot, |(c, o)| {
                NavState::ConfirmActive(c, o)
            }),
            Focus::Popup => self.popup.as_ref().map_or(NavState::MenuRoot, |popup| {
                NavState::PopupActive(popup.kind, popup.return_to)
            }),
        }
    }

    /// Routes one input to the focused surface.
    ///
    /// Only backend failures escape; validation and declined confirmations are
    /// handled in place.
    pub async fn handle(&mut self, input: NavInput) -> Result<(), NavigationError> {
        if self.should_quit {
            return Ok(());
        }

        match self.focus.current() {
            Focus::Menu => self.handle_menu(input),
            Focus::Submenu => self.handle_submenu(input),
            Focus::Form => self.handle_form(input).await?,
            Focus::Confirm => self.handle_confirm(input).await?,
            Focus::Popup => self.handle_popup(input),
        }
        Ok(())
    }

    fn handle_menu(&mut self, input: NavInput) {
        let entries = MenuEntry::ALL;
        match input {
            NavInput::Up => self.menu_cursor = self.menu_cursor.saturating_sub(1),
            NavInput::Down => {
                self.menu_cursor = (self.menu_cursor + 1).min(entries.len() - 1);
            }
            NavInput::Select => self.activate_menu_entry(entries[self.menu_cursor]),
            NavInput::Char(ch) => {
                if let Some(index) = entries.iter().position(|entry| entry.shortcut() == ch) {
                    self.menu_cursor = index;
                    self.activate_menu_entry(entries[index]);
                }
            }
            _ => {}
        }
    }

    fn activate_menu_entry(&mut self, entry: MenuEntry) {
        match entry {
            MenuEntry::Quit => {
                debug!("quit selected");
                self.should_quit = true;
            }
            MenuEntry::Category(category) => {
                debug!(%category, "submenu populated");
                self.category = Some(category);
                self.submenu_cursor = 0;
                self.focus.reset();
                self.focus.push(Focus::Submenu);
            }
        }
    }

    fn handle_submenu(&mut self, input: NavInput) {
        let entries = self.submenu_entries();
        match input {
            NavInput::Up => self.submenu_cursor = self.submenu_cursor.saturating_sub(1),
            NavInput::Down => {
                self.submenu_cursor = (self.submenu_cursor + 1).min(entries.len().saturating_sub(1));
            }
            NavInput::Select => {
                if let Some(operation) = entries.get(self.submenu_cursor).copied() {
                    self.activate_operation(operation);
                }
            }
            NavInput::Char(ch) => {
                if let Some(index) = entries.iter().position(|entry| entry.shortcut() == ch) {
                    self.submenu_cursor = index;
                    self.activate_operation(entries[index]);
                }
            }
            NavInput::Cancel => {
                self.focus.pop();
            }
            _ => {}
        }
    }

    fn activate_operation(&mut self, operation: Operation) {
        let Some(category) = self.category else {
            return;
        };
        let Some(found) = descriptor(category, operation) else {
            warn!(%category, %operation, "no descriptor for submenu entry");
            return;
        };

        self.active = Some(found);
        if let OperationAction::Stub { notice } = found.action {
            debug!(%category, %operation, "stub operation selected");
            self.form = Some(Form::notice(notice));
            return;
        }

        debug!(%category, %operation, "form populated");
        self.form = Some(Form::build(found.fields, found.button_label));
        self.confirm = None;
        self.focus.push(Focus::Form);
    }

    async fn handle_form(&mut self, input: NavInput) -> Result<(), ExecutorError> {
        let Some(form) = self.form.as_mut() else {
            self.focus.pop();
            return Ok(());
        };

        match input {
            NavInput::Cancel => {
                self.focus.pop();
            }
            NavInput::Next | NavInput::Down => form.focus_next(),
            NavInput::Previous | NavInput::Up => form.focus_previous(),
            NavInput::Left => form.cycle_choice(false),
            NavInput::Right => form.cycle_choice(true),
            NavInput::Backspace => form.backspace(),
            NavInput::Char(ch) => {
                form.insert_char(ch);
            }
            NavInput::Select => match form.focused_item() {
                FormItem::Field(_) => form.focus_next(),
                FormItem::Button => self.submit().await?,
            },
        }
        Ok(())
    }

    async fn submit(&mut self) -> Result<(), ExecutorError> {
        let Some(active) = self.active else {
            return Ok(());
        };

        if let Some(text) = active.confirmation {
            debug!(category = %active.category, operation = %active.operation, "confirmation requested");
            self.confirm = Some(ConfirmModal {
                text,
                selected: ConfirmChoice::No,
            });
            self.focus.push(Focus::Confirm);
            return Ok(());
        }

        self.execute(active).await
    }

    async fn handle_confirm(&mut self, input: NavInput) -> Result<(), ExecutorError> {
        let Some(modal) = self.confirm.as_mut() else {
            self.focus.pop();
            return Ok(());
        };

        match input {
            NavInput::Left | NavInput::Right | NavInput::Next | NavInput::Previous => {
                modal.toggle();
            }
            NavInput::Cancel => self.close_confirm(ConfirmChoice::No),
            NavInput::Select => {
                let choice = modal.selected;
                self.close_confirm(choice);
                if choice == ConfirmChoice::Yes {
                    if let Some(active) = self.active {
                        self.execute(active).await?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close_confirm(&mut self, choice: ConfirmChoice) {
        if choice == ConfirmChoice::No {
            debug!("destructive operation declined");
        }
        self.confirm = None;
        self.focus.pop();
    }

    async fn execute(&mut self, active: &'static OperationDescriptor) -> Result<(), ExecutorError> {
        let Some(form) = self.form.as_ref() else {
            return Ok(());
        };
        let return_to = self.focus.current();

        let popup = match active.plan(&form.values()) {
            Err(error) => {
                debug!(%error, "submission rejected");
                render_message("ERROR", error.to_string(), Severity::Error, return_to)
            }
            Ok(Submission::Mutate(statement)) => {
                let outcome = self.executor.mutate(&statement).await?;
                render_mutation(statement.kind, outcome, return_to)
            }
            Ok(Submission::Search(statement)) => {
                let cursor = self.executor.search(&statement).await?;
                render_rows(cursor, return_to).await?
            }
        };

        self.show_popup(popup);
        Ok(())
    }

    fn show_popup(&mut self, popup: Popup) {
        debug!(kind = ?popup.kind, return_to = ?popup.return_to, "popup shown");
        self.popup = Some(popup);
        self.focus.push(Focus::Popup);
    }

    fn handle_popup(&mut self, input: NavInput) {
        match input {
            NavInput::Up => {
                if let Some(popup) = self.popup.as_mut() {
                    popup.scroll_by(-1);
                }
            }
            NavInput::Down => {
                if let Some(popup) = self.popup.as_mut() {
                    popup.scroll_by(1);
                }
            }
            NavInput::Select | NavInput::Cancel | NavInput::Next | NavInput::Previous => {
                let restored = self.focus.pop();
                if let Some(popup) = self.popup.take() {
                    debug_assert_eq!(popup.return_to, restored);
                }
            }
            _ => {}
        }
    }
}
