//! Application state and event handling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use tasklive_proto::task::{Task, TaskFilter, TaskForm, TaskId, TaskPatch, TaskStatus};
use tasklive_proto::user::{AuthUser, LoginForm, RegisterForm, User};

use crate::net::{NetCommand, NetEvent};
use crate::sync::SharedEngine;

/// Which screen is currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Login form (default when no session exists).
    Login,
    /// Registration form.
    Register,
    /// The task board.
    Board,
    /// Full view of a single task.
    Detail,
}

/// Actions the main loop must carry out on the app's behalf.
#[derive(Debug)]
pub enum AppAction {
    /// Submit the login form.
    Login(LoginForm),
    /// Submit the registration form.
    Register(RegisterForm),
    /// End the session and return to login.
    Logout,
    /// Forward a command to the networking layer.
    Net(NetCommand),
}

/// A single-line text input with cursor editing.
#[derive(Debug, Clone, Default)]
pub struct InputField {
    /// Current text.
    pub value: String,
    /// Cursor position (byte index, always on a char boundary).
    pub cursor: usize,
}

impl InputField {
    /// Insert a character at the cursor position.
    pub fn enter_char(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Delete the character before the cursor.
    pub fn delete_char(&mut self) {
        if self.cursor > 0 {
            let prev = self.value[..self.cursor]
                .chars()
                .next_back()
                .map_or(0, char::len_utf8);
            self.cursor -= prev;
            self.value.remove(self.cursor);
        }
    }

    /// Move cursor left one character.
    pub fn move_cursor_left(&mut self) {
        if self.cursor > 0 {
            let prev = self.value[..self.cursor]
                .chars()
                .next_back()
                .map_or(0, char::len_utf8);
            self.cursor -= prev;
        }
    }

    /// Move cursor right one character.
    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.value.len() {
            let next = self.value[self.cursor..]
                .chars()
                .next()
                .map_or(0, char::len_utf8);
            self.cursor += next;
        }
    }

    /// Clear the field.
    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => self.enter_char(c),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            _ => {}
        }
    }
}

/// Fields of the login/register forms, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Username,
    Email,
    Password,
}

/// State for the login and registration screens.
#[derive(Debug, Default)]
pub struct AuthForm {
    pub username: InputField,
    pub email: InputField,
    pub password: InputField,
    /// Currently focused field.
    pub focus: usize,
}

impl AuthForm {
    /// Fields shown on the current screen. Login has no username.
    fn fields(&mut self, with_username: bool) -> Vec<&mut InputField> {
        if with_username {
            vec![&mut self.username, &mut self.email, &mut self.password]
        } else {
            vec![&mut self.email, &mut self.password]
        }
    }

    fn cycle(&mut self, with_username: bool, backward: bool) {
        let count = if with_username { 3 } else { 2 };
        self.focus = if backward {
            (self.focus + count - 1) % count
        } else {
            (self.focus + 1) % count
        };
    }

    fn handle_key(&mut self, with_username: bool, key: KeyEvent) {
        let focus = self.focus;
        if let Some(field) = self.fields(with_username).into_iter().nth(focus) {
            field.handle_key(key);
        }
    }

    fn clear(&mut self) {
        self.username.clear();
        self.email.clear();
        self.password.clear();
        self.focus = 0;
    }
}

/// Fields of the task editor, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Title,
    Description,
    Tags,
    Status,
}

impl EditorField {
    const ORDER: [Self; 4] = [Self::Title, Self::Description, Self::Tags, Self::Status];
}

/// Modal editor for creating or editing a task.
#[derive(Debug)]
pub struct TaskEditor {
    /// `None` when creating, `Some` when editing an existing task.
    pub target: Option<TaskId>,
    pub title: InputField,
    pub description: InputField,
    /// Input for the next tag to add.
    pub tag_input: InputField,
    /// Tags accumulated so far.
    pub tags: Vec<String>,
    pub status: TaskStatus,
    pub focus: EditorField,
}

impl TaskEditor {
    /// Fresh editor for a new task.
    #[must_use]
    pub fn create() -> Self {
        Self {
            target: None,
            title: InputField::default(),
            description: InputField::default(),
            tag_input: InputField::default(),
            tags: Vec::new(),
            status: TaskStatus::Pending,
            focus: EditorField::Title,
        }
    }

    /// Editor pre-filled from an existing task.
    #[must_use]
    pub fn edit(task: &Task) -> Self {
        Self {
            target: Some(task.id.clone()),
            title: InputField {
                cursor: task.title.len(),
                value: task.title.clone(),
            },
            description: InputField {
                cursor: task.description.len(),
                value: task.description.clone(),
            },
            tag_input: InputField::default(),
            tags: task.tags.clone(),
            status: task.status,
            focus: EditorField::Title,
        }
    }

    fn cycle_focus(&mut self, backward: bool) {
        let idx = EditorField::ORDER
            .iter()
            .position(|f| *f == self.focus)
            .unwrap_or(0);
        let count = EditorField::ORDER.len();
        let next = if backward {
            (idx + count - 1) % count
        } else {
            (idx + 1) % count
        };
        self.focus = EditorField::ORDER[next];
    }

    /// Add the pending tag input to the tag list. Duplicates and blanks
    /// are dropped.
    fn add_tag(&mut self) {
        let tag = self.tag_input.value.trim().to_string();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self.tag_input.clear();
    }

    fn form(&self) -> TaskForm {
        TaskForm {
            title: self.title.value.trim().to_string(),
            description: self.description.value.trim().to_string(),
            status: self.status,
            tags: self.tags.clone(),
        }
    }
}

/// Main application state.
pub struct App {
    /// Which screen is shown.
    pub screen: Screen,
    /// Shared view of the reconciled task set.
    pub engine: SharedEngine,
    /// The signed-in user, once authenticated.
    pub current_user: Option<AuthUser>,
    /// User directory for display.
    pub users: Vec<User>,
    /// Login/register form state.
    pub auth: AuthForm,
    /// Modal task editor, when open.
    pub editor: Option<TaskEditor>,
    /// Task shown on the detail screen.
    pub detail: Option<TaskId>,
    /// Selected row on the board.
    pub selected: usize,
    /// Status column filter, cycled with `f`.
    pub status_filter: Option<TaskStatus>,
    /// Search input, focused with `/`.
    pub search: InputField,
    /// Whether the search input has focus.
    pub search_active: bool,
    /// Whether the push channel is live.
    pub connected: bool,
    /// One-line status/error message shown in the status bar.
    pub status_line: Option<String>,
    /// Chrono format string for displayed timestamps.
    pub timestamp_format: String,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Create the app, starting on the login screen.
    #[must_use]
    pub fn new(engine: SharedEngine, timestamp_format: String) -> Self {
        Self {
            screen: Screen::Login,
            engine,
            current_user: None,
            users: Vec::new(),
            auth: AuthForm::default(),
            editor: None,
            detail: None,
            selected: 0,
            status_filter: None,
            search: InputField::default(),
            search_active: false,
            connected: false,
            status_line: None,
            timestamp_format,
            should_quit: false,
        }
    }

    /// The active board filter.
    #[must_use]
    pub fn filter(&self) -> TaskFilter {
        let search = self.search.value.trim();
        TaskFilter {
            status: self.status_filter,
            search: if search.is_empty() {
                None
            } else {
                Some(search.to_string())
            },
        }
    }

    /// Tasks visible on the board under the current filter.
    #[must_use]
    pub fn visible_tasks(&self) -> Vec<Task> {
        self.engine.read().filtered_view(&self.filter())
    }

    /// Whether the signed-in user created the task. Edit and delete are
    /// only offered to the creator; the server enforces this too.
    #[must_use]
    pub fn owns(&self, task: &Task) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(|user| user.id == task.created_by.id)
    }

    /// The task currently selected on the board, if any.
    #[must_use]
    pub fn selected_task(&self) -> Option<Task> {
        self.visible_tasks().get(self.selected).cloned()
    }

    /// Mark the session as established and show the board.
    pub fn signed_in(&mut self, user: AuthUser) {
        self.current_user = Some(user);
        self.auth.clear();
        self.screen = Screen::Board;
        self.status_line = None;
    }

    /// Drop session state and return to the login screen.
    pub fn signed_out(&mut self, reason: Option<&str>) {
        self.current_user = None;
        self.users.clear();
        self.editor = None;
        self.detail = None;
        self.selected = 0;
        self.screen = Screen::Login;
        self.status_line = reason.map(str::to_string);
    }

    /// Handle a key event. Returns an action for the main loop to run.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<AppAction> {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            self.should_quit = true;
            return None;
        }

        if self.editor.is_some() {
            return self.handle_editor_key(key);
        }

        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Register => self.handle_register_key(key),
            Screen::Board => self.handle_board_key(key),
            Screen::Detail => self.handle_detail_key(key),
        }
    }

    /// Apply an event from the networking layer.
    pub fn apply_net_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::SnapshotChanged => self.clamp_selection(),
            NetEvent::TaskDeleted { id } => {
                // A detail view of the deleted task has nothing to show.
                if self.detail.as_ref() == Some(&id) {
                    self.detail = None;
                    if self.screen == Screen::Detail {
                        self.screen = Screen::Board;
                    }
                    self.status_line = Some("task was deleted".to_string());
                }
                self.clamp_selection();
            }
            NetEvent::UsersLoaded(users) => self.users = users,
            NetEvent::SessionExpired => self.signed_out(Some("session expired, sign in again")),
            NetEvent::ConnectionStatus { connected } => self.connected = connected,
            NetEvent::Error(message) => self.status_line = Some(message),
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_tasks().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Tab | KeyCode::Down => {
                self.auth.cycle(false, false);
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.auth.cycle(false, true);
                None
            }
            KeyCode::Enter => {
                let email = self.auth.email.value.trim().to_string();
                let password = self.auth.password.value.clone();
                if email.is_empty() || password.is_empty() {
                    self.status_line = Some("email and password are required".to_string());
                    return None;
                }
                Some(AppAction::Login(LoginForm { email, password }))
            }
            KeyCode::F(2) => {
                self.auth.clear();
                self.screen = Screen::Register;
                None
            }
            _ => {
                self.auth.handle_key(false, key);
                None
            }
        }
    }

    fn handle_register_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Esc => {
                self.auth.clear();
                self.screen = Screen::Login;
                None
            }
            KeyCode::Tab | KeyCode::Down => {
                self.auth.cycle(true, false);
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.auth.cycle(true, true);
                None
            }
            KeyCode::Enter => {
                let username = self.auth.username.value.trim().to_string();
                let email = self.auth.email.value.trim().to_string();
                let password = self.auth.password.value.clone();
                if username.is_empty() || email.is_empty() || password.is_empty() {
                    self.status_line = Some("all fields are required".to_string());
                    return None;
                }
                Some(AppAction::Register(RegisterForm {
                    username,
                    email,
                    password,
                }))
            }
            _ => {
                self.auth.handle_key(true, key);
                None
            }
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        if self.search_active {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => self.search_active = false,
                _ => {
                    self.search.handle_key(key);
                    self.clamp_selection();
                }
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.visible_tasks().len() {
                    self.selected += 1;
                }
                None
            }
            KeyCode::Enter => {
                if let Some(task) = self.selected_task() {
                    self.detail = Some(task.id);
                    self.screen = Screen::Detail;
                }
                None
            }
            KeyCode::Char('n') => {
                self.editor = Some(TaskEditor::create());
                None
            }
            KeyCode::Char('e') => self.open_editor_for_selected(),
            KeyCode::Char('d') => self.delete_selected(),
            KeyCode::Char('s') => self.cycle_selected_status(),
            KeyCode::Char('/') => {
                self.search_active = true;
                None
            }
            KeyCode::Char('f') => {
                self.status_filter = next_status_filter(self.status_filter);
                self.clamp_selection();
                None
            }
            KeyCode::Char('r') => Some(AppAction::Net(NetCommand::Refresh(self.filter()))),
            KeyCode::Char('L') => Some(AppAction::Logout),
            _ => None,
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        let task = self
            .detail
            .as_ref()
            .and_then(|id| self.engine.read().get(id).cloned());
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.detail = None;
                self.screen = Screen::Board;
                None
            }
            KeyCode::Char('e') => {
                if let Some(task) = task {
                    if self.owns(&task) {
                        self.editor = Some(TaskEditor::edit(&task));
                    } else {
                        self.status_line = Some("only the creator can edit this task".to_string());
                    }
                }
                None
            }
            KeyCode::Char('d') => {
                let task = task?;
                if self.owns(&task) {
                    Some(AppAction::Net(NetCommand::DeleteTask(task.id)))
                } else {
                    self.status_line = Some("only the creator can delete this task".to_string());
                    None
                }
            }
            KeyCode::Char('s') => {
                let task = task?;
                Some(AppAction::Net(NetCommand::UpdateTask {
                    id: task.id,
                    patch: TaskPatch::status(next_status(task.status)),
                }))
            }
            _ => None,
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Esc => {
                self.editor = None;
                None
            }
            KeyCode::Tab => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.cycle_focus(false);
                }
                None
            }
            KeyCode::BackTab => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.cycle_focus(true);
                }
                None
            }
            KeyCode::Enter => self.submit_editor(),
            _ => {
                if let Some(editor) = self.editor.as_mut() {
                    match editor.focus {
                        EditorField::Title => editor.title.handle_key(key),
                        EditorField::Description => editor.description.handle_key(key),
                        EditorField::Tags => {
                            if key.code == KeyCode::Char(' ')
                                && !editor.tag_input.value.trim().is_empty()
                            {
                                editor.add_tag();
                            } else {
                                editor.tag_input.handle_key(key);
                            }
                        }
                        EditorField::Status => match key.code {
                            KeyCode::Left | KeyCode::Char('h') => {
                                editor.status = prev_status(editor.status);
                            }
                            KeyCode::Right | KeyCode::Char('l') => {
                                editor.status = next_status(editor.status);
                            }
                            _ => {}
                        },
                    }
                }
                None
            }
        }
    }

    /// Submit the editor. In the tags field, Enter commits the pending
    /// tag instead, matching the add-one-at-a-time flow.
    fn submit_editor(&mut self) -> Option<AppAction> {
        let editor = self.editor.as_mut()?;
        if editor.focus == EditorField::Tags && !editor.tag_input.value.trim().is_empty() {
            editor.add_tag();
            return None;
        }

        let form = editor.form();
        if let Err(e) = form.validate() {
            self.status_line = Some(e.to_string());
            return None;
        }

        let target = editor.target.clone();
        self.editor = None;
        self.status_line = None;
        match target {
            Some(id) => Some(AppAction::Net(NetCommand::UpdateTask {
                id,
                patch: TaskPatch {
                    title: Some(form.title),
                    description: Some(form.description),
                    status: Some(form.status),
                    tags: Some(form.tags),
                },
            })),
            None => Some(AppAction::Net(NetCommand::CreateTask(form))),
        }
    }

    fn open_editor_for_selected(&mut self) -> Option<AppAction> {
        if let Some(task) = self.selected_task() {
            if self.owns(&task) {
                self.editor = Some(TaskEditor::edit(&task));
            } else {
                self.status_line = Some("only the creator can edit this task".to_string());
            }
        }
        None
    }

    fn delete_selected(&mut self) -> Option<AppAction> {
        let task = self.selected_task()?;
        if self.owns(&task) {
            Some(AppAction::Net(NetCommand::DeleteTask(task.id)))
        } else {
            self.status_line = Some("only the creator can delete this task".to_string());
            None
        }
    }

    /// Anyone may advance a task's status, not just the creator.
    fn cycle_selected_status(&mut self) -> Option<AppAction> {
        let task = self.selected_task()?;
        Some(AppAction::Net(NetCommand::UpdateTask {
            id: task.id,
            patch: TaskPatch::status(next_status(task.status)),
        }))
    }
}

/// Cycle the board filter: all -> pending -> in-progress -> completed -> all.
const fn next_status_filter(current: Option<TaskStatus>) -> Option<TaskStatus> {
    match current {
        None => Some(TaskStatus::Pending),
        Some(TaskStatus::Pending) => Some(TaskStatus::InProgress),
        Some(TaskStatus::InProgress) => Some(TaskStatus::Completed),
        Some(TaskStatus::Completed) => None,
    }
}

/// The next status in the pending -> in-progress -> completed cycle.
const fn next_status(current: TaskStatus) -> TaskStatus {
    match current {
        TaskStatus::Pending => TaskStatus::InProgress,
        TaskStatus::InProgress => TaskStatus::Completed,
        TaskStatus::Completed => TaskStatus::Pending,
    }
}

const fn prev_status(current: TaskStatus) -> TaskStatus {
    match current {
        TaskStatus::Pending => TaskStatus::Completed,
        TaskStatus::InProgress => TaskStatus::Pending,
        TaskStatus::Completed => TaskStatus::InProgress,
    }
}
