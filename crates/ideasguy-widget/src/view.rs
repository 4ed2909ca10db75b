use chrono::{DateTime, Utc};

use crate::{
    markup::{self, Node},
    types::{Message, ModelChoice, ModelOption, Role},
};

/// What the character header shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterPanel {
    pub name: String,
    pub description: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Rendering surface driven by [`crate::ChatWidget`].
pub trait ChatView {
    fn append_message(&mut self, role: Role, content: &str, nodes: &[Node]);

    fn scroll_to_bottom(&mut self);

    fn clear_log(&mut self);

    fn clear_input(&mut self);

    fn show_character(&mut self, panel: &CharacterPanel);

    fn set_character_options(&mut self, options: &[SelectOption]);

    fn set_model_options(&mut self, options: &[ModelOption]);

    /// Returns false when no option has that id.
    fn select_model(&mut self, id: &str) -> bool;

    fn selected_model(&self) -> Option<ModelChoice>;
}

/// A model `<select>`: repopulating it resets the selection to the first
/// option, as a browser does.
#[derive(Debug, Clone, Default)]
pub struct ModelSelect {
    options: Vec<ModelOption>,
    selected: Option<usize>,
}

impl ModelSelect {
    pub fn replace(&mut self, options: &[ModelOption]) {
        self.options = options.to_vec();
        self.selected = if self.options.is_empty() { None } else { Some(0) };
    }

    pub fn select(&mut self, id: &str) -> bool {
        match self.options.iter().position(|option| option.id == id) {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<ModelChoice> {
        let option = self.options.get(self.selected?)?;
        Some(ModelChoice {
            id: option.id.clone(),
            provider: option.provider.clone(),
        })
    }

    pub fn options(&self) -> &[ModelOption] {
        &self.options
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub message: Message,
    pub html: String,
    pub rendered_at: DateTime<Utc>,
}

/// In-memory page model: a log of HTML bubbles plus the input field,
/// header and two selection controls.
#[derive(Debug, Default)]
pub struct HtmlView {
    entries: Vec<LogEntry>,
    input: String,
    character: Option<CharacterPanel>,
    character_options: Vec<SelectOption>,
    models: ModelSelect,
    scroll_requests: usize,
}

impl HtmlView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn messages(&self) -> Vec<Message> {
        self.entries.iter().map(|entry| entry.message.clone()).collect()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    pub fn character(&self) -> Option<&CharacterPanel> {
        self.character.as_ref()
    }

    pub fn character_options(&self) -> &[SelectOption] {
        &self.character_options
    }

    pub fn model_options(&self) -> &[ModelOption] {
        self.models.options()
    }

    pub fn scroll_requests(&self) -> usize {
        self.scroll_requests
    }

    /// The log's markup, one `.msg` block per entry.
    pub fn log_html(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                let role = entry.message.role;
                format!(
                    "<div class=\"msg {}\"><div class=\"role\">{}</div><div class=\"bubble\">{}</div></div>",
                    role.as_str(),
                    role.badge(),
                    entry.html
                )
            })
            .collect()
    }

    pub fn character_select_html(&self) -> String {
        self.character_options
            .iter()
            .map(|option| {
                format!(
                    "<option value=\"{}\">{}</option>",
                    markup::escape_html(&option.value),
                    markup::escape_html(&option.label)
                )
            })
            .collect()
    }

    /// Provider is kept on each option so it can be read back at send time.
    pub fn model_select_html(&self) -> String {
        self.models
            .options()
            .iter()
            .map(|option| {
                format!(
                    "<option value=\"{}\" data-provider=\"{}\">{}</option>",
                    markup::escape_html(&option.id),
                    markup::escape_html(&option.provider),
                    markup::escape_html(&option.name)
                )
            })
            .collect()
    }
}

impl ChatView for HtmlView {
    fn append_message(&mut self, role: Role, content: &str, nodes: &[Node]) {
        self.entries.push(LogEntry {
            message: Message {
                role,
                content: content.to_owned(),
            },
            html: markup::to_html(nodes),
            rendered_at: Utc::now(),
        });
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_requests += 1;
    }

    fn clear_log(&mut self) {
        self.entries.clear();
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }

    fn show_character(&mut self, panel: &CharacterPanel) {
        self.character = Some(panel.clone());
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

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::{
        markup,
        types::{ModelOption, Role},
    };

    use super::{ChatView, HtmlView, SelectOption};

    fn model(id: &str, provider: &str) -> ModelOption {
        ModelOption {
            id: id.into(),
            name: id.to_uppercase(),
            provider: provider.into(),
            note: String::new(),
        }
    }

    #[test]
    fn log_html_wraps_each_entry_with_badge() {
        let mut view = HtmlView::new();
        view.append_message(Role::User, "a <b>", &markup::parse("a <b>"));
        view.append_message(Role::Bot, "x\n- y", &markup::parse("x\n- y"));

        assert_eq!(
            view.log_html(),
            "<div class=\"msg user\"><div class=\"role\">U</div><div class=\"bubble\">a &lt;b&gt;</div></div>\
             <div class=\"msg bot\"><div class=\"role\">IG</div><div class=\"bubble\">x<br>• y</div></div>"
        );
    }

    #[test]
    fn entries_are_stamped_in_render_order() {
        let before = Utc::now();
        let mut view = HtmlView::new();
        view.append_message(Role::User, "one", &markup::parse("one"));
        view.append_message(Role::Bot, "two", &markup::parse("two"));
        let after = Utc::now();

        let stamps = view
            .entries()
            .iter()
            .map(|entry| entry.rendered_at)
            .collect::<Vec<_>>();
        assert!(stamps[0] >= before);
        assert!(stamps[0] <= stamps[1]);
        assert!(stamps[1] <= after);
    }

    #[test]
    fn repopulating_models_resets_selection_to_first() {
        let mut view = HtmlView::new();
        assert_eq!(view.selected_model(), None);

        view.set_model_options(&[model("a", "vllm"), model("b", "stub")]);
        assert!(view.select_model("b"));
        assert!(!view.select_model("zzz"));
        assert_eq!(view.selected_model().map(|m| m.provider), Some("stub".into()));

        view.set_model_options(&[model("c", "huggingface"), model("b", "stub")]);
        assert_eq!(view.selected_model().map(|m| m.id), Some("c".into()));

        view.set_model_options(&[]);
        assert_eq!(view.selected_model(), None);
    }

    #[test]
    fn select_markup_is_escaped() {
        let mut view = HtmlView::new();
        view.set_character_options(&[SelectOption {
            value: "a\"b".into(),
            label: "<A>".into(),
        }]);
        view.set_model_options(&[model("m", "vllm")]);

        assert_eq!(
            view.character_select_html(),
            "<option value=\"a&quot;b\">&lt;A&gt;</option>"
        );
        assert_eq!(
            view.model_select_html(),
            "<option value=\"m\" data-provider=\"vllm\">M</option>"
        );
    }
}
