use std::io::Write;

use chrono::Local;
use tracing::warn;

use crate::{
    markup::{self, Node},
    types::{ModelChoice, ModelOption, Role},
    view::{CharacterPanel, ChatView, ModelSelect, SelectOption},
};

/// Line-oriented rendering for a terminal session.
pub struct TerminalView<W: Write> {
    out: W,
    character_options: Vec<SelectOption>,
    models: ModelSelect,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            character_options: Vec::new(),
            models: ModelSelect::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print_character_options(&mut self) {
        let lines = if self.character_options.is_empty() {
            vec!["(no characters loaded)".to_owned()]
        } else {
            self.character_options
                .iter()
                .map(|option| format!("  {:<16} {}", option.value, option.label))
                .collect()
        };
        self.write_lines(&lines);
    }

    pub fn print_model_options(&mut self) {
        let selected = self.models.current().map(|choice| choice.id);
        let lines = if self.models.options().is_empty() {
            vec!["(no models loaded)".to_owned()]
        } else {
            self.models
                .options()
                .iter()
                .map(|option| {
                    let marker = if selected.as_deref() == Some(option.id.as_str()) {
                        '*'
                    } else {
                        ' '
                    };
                    format!("{marker} {:<36} {} [{}]", option.id, option.name, option.provider)
                })
                .collect()
        };
        self.write_lines(&lines);
    }

    fn write_lines(&mut self, lines: &[String]) {
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(self.out, "{line}"))
            .and_then(|()| self.out.flush());
        if let Err(error) = result {
            warn!(?error, "failed to write to terminal");
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn append_message(&mut self, role: Role, _content: &str, nodes: &[Node]) {
        let time = Local::now().format("%H:%M");
        let text = markup::to_plain_text(nodes);
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default();

        let mut rendered = vec![format!("[{time}] {:>2}: {first}", role.badge())];
        rendered.extend(lines.map(|line| format!("{:>12}{line}", "")));
        self.write_lines(&rendered);
    }

    fn scroll_to_bottom(&mut self) {}

    fn clear_log(&mut self) {
        self.write_lines(&["----".to_owned()]);
    }

    fn clear_input(&mut self) {}

    fn show_character(&mut self, panel: &CharacterPanel) {
        let mut lines = vec![format!("== {} ==", panel.name)];
        if !panel.description.is_empty() {
            lines.push(panel.description.clone());
        }
        lines.push(format!("avatar: {}", panel.avatar));
        self.write_lines(&lines);
    }

    fn set_character_options(&mut self, options: &[SelectOption]) {
        self.character_options = options.to_vec();
    }

    fn set_model_options(&mut self, options: &[ModelOption]) {
        self.models.replace(options);
    }

    fn select_model(&mut self, id: &str) -> bool {
        self.models.select(id)
    }

    fn selected_model(&self) -> Option<ModelChoice> {
        self.models.current()
    }
}
