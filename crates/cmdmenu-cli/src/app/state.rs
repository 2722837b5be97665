//! Application state for the TUI.

use cmdmenu_core::{Chunk, Config, MenuItem};

use super::output::OutputBuffer;

/// Which pane receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Menu,
    Input,
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    /// Launch a menu entry's command, replacing any running process.
    Run { label: String, command: String },
    /// Forward a line to the running process.
    Send(String),
    Quit,
}

/// TUI application state.
pub struct App {
    pub title: String,
    pub items: Vec<MenuItem>,
    /// Index into `items`; never points at a separator.
    pub selected: Option<usize>,
    pub focus: Focus,
    pub output: OutputBuffer,
    pub input: String,
    /// Byte offset into `input`, always on a char boundary.
    pub cursor_pos: usize,
    pub running: bool,
    pub current_label: Option<String>,
    pub last_exit: Option<i32>,
    /// Manual scroll offset from the bottom (0 = pinned to bottom).
    pub scroll_offset: u16,
    /// Whether the view follows new output.
    pub scroll_pinned: bool,
    /// Height of the output viewport (set each frame by the renderer).
    pub viewport_height: u16,
    /// Total wrapped line count of the output (set each frame by the renderer).
    pub total_lines: u16,
    pub should_quit: bool,
    pub status: String,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let items = config.menu_items.clone();
        let selected = items.iter().position(|item| !item.is_separator());
        Self {
            title: config.menu_title.clone(),
            items,
            selected,
            focus: Focus::Menu,
            output: OutputBuffer::new(config.ui.scrollback_lines),
            input: String::new(),
            cursor_pos: 0,
            running: false,
            current_label: None,
            last_exit: None,
            scroll_offset: 0,
            scroll_pinned: true,
            viewport_height: 0,
            total_lines: 0,
            should_quit: false,
            status: "Ready".to_string(),
        }
    }

    pub fn selected_item(&self) -> Option<&MenuItem> {
        self.selected.and_then(|i| self.items.get(i))
    }

    pub fn select_next(&mut self) {
        let start = self.selected.map_or(0, |i| i + 1);
        if let Some(offset) = self.items[start.min(self.items.len())..]
            .iter()
            .position(|item| !item.is_separator())
        {
            self.selected = Some(start + offset);
        }
    }

    pub fn select_prev(&mut self) {
        let Some(current) = self.selected else {
            return;
        };
        if let Some(index) = self.items[..current]
            .iter()
            .rposition(|item| !item.is_separator())
        {
            self.selected = Some(index);
        }
    }

    /// Turn the highlighted entry into a launch request.
    pub fn activate_selected(&mut self) -> Action {
        let Some(item) = self.selected_item() else {
            return Action::None;
        };
        let label = item.label().unwrap_or_default().to_string();
        match item.command() {
            Some(command) => Action::Run {
                label,
                command: command.to_string(),
            },
            None => {
                self.status = format!("`{label}` has no command");
                Action::None
            }
        }
    }

    /// Record the entry that was launched so the header can show it.
    pub fn begin_run(&mut self, label: &str) {
        self.current_label = Some(label.to_string());
        self.status = format!("Starting {label}...");
    }

    pub fn on_started(&mut self) {
        self.running = true;
        self.last_exit = None;
        self.status = match &self.current_label {
            Some(label) => format!("Running: {label}"),
            None => "Running".to_string(),
        };
    }

    pub fn on_finished(&mut self, exit_code: i32) {
        self.running = false;
        self.last_exit = Some(exit_code);
        self.focus = Focus::Menu;
        self.status = format!("Process exited with code {exit_code}");
    }

    pub fn on_launch_failed(&mut self, message: &str) {
        self.output.append(&format!("{message}\n"), true);
        self.status = "Launch failed".to_string();
    }

    /// Append drained relay chunks to the output pane.
    pub fn ingest(&mut self, chunks: Vec<Chunk>) {
        for chunk in chunks {
            self.output.append(&chunk.text, chunk.is_error);
        }
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
        self.scroll_to_bottom();
    }

    /// Move focus to the input line. Only possible while a process runs.
    pub fn focus_input(&mut self) {
        if self.running {
            self.focus = Focus::Input;
        } else {
            self.status = "No process running".to_string();
        }
    }

    /// Take the input line for sending, echoing it into the output pane.
    pub fn submit_input(&mut self) -> Option<String> {
        if !self.running {
            return None;
        }
        let text = std::mem::take(&mut self.input);
        self.cursor_pos = 0;
        self.output.append(&format!("> {text}\n"), false);
        self.scroll_to_bottom();
        Some(text)
    }

    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some(c) = self.input[..self.cursor_pos].chars().next_back() {
            self.cursor_pos -= c.len_utf8();
            self.input.remove(self.cursor_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.input.remove(self.cursor_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        if let Some(c) = self.input[..self.cursor_pos].chars().next_back() {
            self.cursor_pos -= c.len_utf8();
        }
    }

    pub fn cursor_right(&mut self) {
        if let Some(c) = self.input[self.cursor_pos..].chars().next() {
            self.cursor_pos += c.len_utf8();
        }
    }

    /// Scroll up by `n` lines.
    pub fn scroll_up(&mut self, n: u16) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll_offset = self.scroll_offset.saturating_add(n).min(max_scroll);
        if self.scroll_offset > 0 {
            self.scroll_pinned = false;
        }
    }

    /// Scroll down by `n` lines.
    pub fn scroll_down(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
        if self.scroll_offset == 0 {
            self.scroll_pinned = true;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
        self.scroll_pinned = true;
    }
}
