use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    api::{ApiError, ChatApi},
    config::WidgetConfig,
    markup,
    types::{Character, ChatReply, ChatTurnRequest, ModelOption, OutgoingMessage, Role},
    view::{CharacterPanel, ChatView, SelectOption},
};

#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("failed to load characters: {0}")]
    Characters(#[source] ApiError),
    #[error("failed to load character {id}: {source}")]
    Character {
        id: String,
        #[source]
        source: ApiError,
    },
    #[error("failed to load models: {0}")]
    Models(#[source] ApiError),
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

/// Controller state that is not visible in the view.
#[derive(Debug, Default)]
struct WidgetState {
    active_character: Option<Character>,
    /// Last successfully loaded model list; selections outside it are not sent.
    known_models: Vec<ModelOption>,
    next_seq: u64,
    last_rendered_seq: u64,
    /// Bumped on every character switch.
    epoch: u64,
}

/// A submitted turn whose reply has not been rendered yet.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub seq: u64,
    pub epoch: u64,
    pub request: ChatTurnRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied,
    Failed,
    /// A newer turn already rendered, or the character changed meanwhile.
    Discarded,
}

#[derive(Debug)]
pub struct StartupReport {
    pub models: Result<usize, WidgetError>,
    pub characters: Result<usize, WidgetError>,
}

pub struct ChatWidget<V: ChatView> {
    api: Arc<dyn ChatApi>,
    view: V,
    config: WidgetConfig,
    state: WidgetState,
}

impl<V: ChatView> ChatWidget<V> {
    pub fn new(api: Arc<dyn ChatApi>, view: V, config: WidgetConfig) -> Self {
        Self {
            api,
            view,
            config,
            state: WidgetState::default(),
        }
    }

    pub fn api(&self) -> Arc<dyn ChatApi> {
        self.api.clone()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn active_character(&self) -> Option<&Character> {
        self.state.active_character.as_ref()
    }

    pub fn render_message(&mut self, role: Role, text: &str) {
        let nodes = markup::parse(text);
        self.view.append_message(role, text, &nodes);
        self.view.scroll_to_bottom();
    }

    /// Loads models and characters concurrently. Falls back to the starter
    /// line when no character ends up active.
    pub async fn init(&mut self) -> StartupReport {
        let api = self.api.clone();
        let (models, characters) = tokio::join!(api.list_models(), api.list_characters());

        let models = self.apply_models(models);
        let characters = match self.apply_characters(characters) {
            Ok((count, Some(first))) => self.set_character(&first).await.map(|()| count),
            Ok((count, None)) => Ok(count),
            Err(error) => Err(error),
        };

        match &models {
            Ok(count) => info!(count, "models loaded"),
            Err(error) => warn!(%error, "model list unavailable"),
        }
        match &characters {
            Ok(count) => info!(count, "characters loaded"),
            Err(error) => warn!(%error, "characters unavailable"),
        }

        if self.state.active_character.is_none() {
            if let Some(line) = self.config.starter_line.clone() {
                self.render_message(Role::Bot, &line);
            }
        }

        StartupReport { models, characters }
    }

    pub async fn load_models(&mut self) -> Result<usize, WidgetError> {
        let result = self.api.list_models().await;
        self.apply_models(result)
    }

    fn apply_models(
        &mut self,
        result: Result<Vec<ModelOption>, ApiError>,
    ) -> Result<usize, WidgetError> {
        let models = result.map_err(WidgetError::Models)?;
        self.view.set_model_options(&models);
        let count = models.len();
        self.state.known_models = models;
        Ok(count)
    }

    /// Repopulates the character control and activates the first entry.
    pub async fn load_characters(&mut self) -> Result<usize, WidgetError> {
        let result = self.api.list_characters().await;
        let (count, first) = self.apply_characters(result)?;
        if let Some(first) = first {
            self.set_character(&first).await?;
        }
        Ok(count)
    }

    fn apply_characters(
        &mut self,
        result: Result<Vec<Character>, ApiError>,
    ) -> Result<(usize, Option<String>), WidgetError> {
        let characters = result.map_err(WidgetError::Characters)?;
        let options = characters
            .iter()
            .map(|character| SelectOption {
                value: character.id.clone(),
                label: character.name.clone(),
            })
            .collect::<Vec<_>>();
        self.view.set_character_options(&options);
        Ok((
            characters.len(),
            characters.first().map(|character| character.id.clone()),
        ))
    }

    /// Fetches the character, makes it active and restarts the log with its
    /// greeting. Turns still in flight are discarded when they return.
    pub async fn set_character(&mut self, id: &str) -> Result<(), WidgetError> {
        let character =
            self.api
                .get_character(id)
                .await
                .map_err(|source| WidgetError::Character {
                    id: id.to_owned(),
                    source,
                })?;

        debug!(id = %character.id, "switching character");

        self.view.show_character(&CharacterPanel {
            name: character.name.clone(),
            description: character.description.clone().unwrap_or_default(),
            avatar: character
                .avatar
                .clone()
                .unwrap_or_else(|| self.config.default_avatar.clone()),
        });
        self.view.clear_log();
        self.state.epoch += 1;

        let greeting = character.greeting.clone();
        self.state.active_character = Some(character);
        if let Some(greeting) = greeting.filter(|text| !text.is_empty()) {
            self.render_message(Role::Bot, &greeting);
        }
        Ok(())
    }

    pub fn select_model(&mut self, id: &str) -> Result<(), WidgetError> {
        if self.view.select_model(id) {
            Ok(())
        } else {
            Err(WidgetError::UnknownModel(id.to_owned()))
        }
    }

    /// Renders the user's text, clears the input and tags the turn. Returns
    /// `None` for blank input, in which case nothing is rendered.
    pub fn begin_turn(&mut self, text: &str) -> Option<PendingTurn> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.render_message(Role::User, text);
        self.view.clear_input();

        self.state.next_seq += 1;
        Some(PendingTurn {
            seq: self.state.next_seq,
            epoch: self.state.epoch,
            request: self.build_request(text),
        })
    }

    fn build_request(&self, text: &str) -> ChatTurnRequest {
        let model = self.view.selected_model().filter(|choice| {
            let known = self
                .state
                .known_models
                .iter()
                .any(|model| model.id == choice.id && model.provider == choice.provider);
            if !known {
                debug!(model = %choice.id, "selected model is not in the loaded list; not sending it");
            }
            known
        });

        ChatTurnRequest {
            character_id: self
                .state
                .active_character
                .as_ref()
                .map(|character| character.id.clone()),
            model_provider: model.as_ref().map(|choice| choice.provider.clone()),
            model_name: model.map(|choice| choice.id),
            messages: vec![OutgoingMessage {
                role: "user",
                content: text.to_owned(),
            }],
        }
    }

    /// Renders the reply (or the fallback error) for `turn`, unless a newer
    /// turn or a character switch has superseded it.
    pub fn finish_turn(
        &mut self,
        turn: PendingTurn,
        result: Result<ChatReply, ApiError>,
    ) -> TurnOutcome {
        if turn.epoch != self.state.epoch || turn.seq <= self.state.last_rendered_seq {
            debug!(
                seq = turn.seq,
                last_rendered = self.state.last_rendered_seq,
                "dropping stale chat reply"
            );
            return TurnOutcome::Discarded;
        }
        self.state.last_rendered_seq = turn.seq;

        match result {
            Ok(reply) => {
                self.render_message(Role::Bot, &reply.reply);
                TurnOutcome::Replied
            }
            Err(error) => {
                warn!(%error, seq = turn.seq, "chat request failed");
                let fallback = self.config.fallback_error.clone();
                self.render_message(Role::Bot, &fallback);
                TurnOutcome::Failed
            }
        }
    }

    pub async fn submit_turn(&mut self, text: &str) -> Option<TurnOutcome> {
        let turn = self.begin_turn(text)?;
        let result = self.api.chat(&turn.request).await;
        Some(self.finish_turn(turn, result))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use async_trait::async_trait;

    use crate::{
        api::{ApiError, ChatApi},
        config::WidgetConfig,
        types::{Character, ChatReply, ChatTurnRequest, Message, ModelOption, Role},
        view::{ChatView, HtmlView},
    };

    use super::{ChatWidget, TurnOutcome, WidgetError};

    /// Canned backend that records every chat request it receives.
    #[derive(Default)]
    struct FakeApi {
        reply: Option<String>,
        characters: Option<Vec<Character>>,
        models: Option<Vec<ModelOption>>,
        requests: Mutex<Vec<ChatTurnRequest>>,
        /// When set, list endpoints fail regardless of the canned data.
        lists_down: AtomicBool,
    }

    impl FakeApi {
        fn requests(&self) -> Vec<ChatTurnRequest> {
            self.requests.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl ChatApi for FakeApi {
        async fn chat(&self, request: &ChatTurnRequest) -> Result<ChatReply, ApiError> {
            self.requests.lock().expect("lock").push(request.clone());
            match &self.reply {
                Some(reply) => Ok(ChatReply {
                    reply: reply.clone(),
                }),
                None => Err(ApiError::Status { status: 500 }),
            }
        }

        async fn list_characters(&self) -> Result<Vec<Character>, ApiError> {
            if self.lists_down.load(Ordering::SeqCst) {
                return Err(ApiError::Status { status: 503 });
            }
            self.characters
                .clone()
                .ok_or(ApiError::Status { status: 503 })
        }

        async fn get_character(&self, id: &str) -> Result<Character, ApiError> {
            self.characters
                .iter()
                .flatten()
                .find(|character| character.id == id)
                .cloned()
                .ok_or(ApiError::Status { status: 404 })
        }

        async fn list_models(&self) -> Result<Vec<ModelOption>, ApiError> {
            if self.lists_down.load(Ordering::SeqCst) {
                return Err(ApiError::Status { status: 503 });
            }
            self.models.clone().ok_or(ApiError::Status { status: 503 })
        }
    }

    fn character(id: &str, name: &str, greeting: Option<&str>) -> Character {
        Character {
            id: id.into(),
            name: name.into(),
            description: None,
            greeting: greeting.map(str::to_owned),
            avatar: None,
        }
    }

    fn model(id: &str, provider: &str) -> ModelOption {
        ModelOption {
            id: id.into(),
            name: id.into(),
            provider: provider.into(),
            note: String::new(),
        }
    }

    fn msg(role: Role, content: &str) -> Message {
        Message {
            role,
            content: content.into(),
        }
    }

    fn widget(api: FakeApi) -> (ChatWidget<HtmlView>, Arc<FakeApi>) {
        let api = Arc::new(api);
        let widget = ChatWidget::new(api.clone(), HtmlView::new(), WidgetConfig::default());
        (widget, api)
    }

    #[tokio::test]
    async fn reply_follows_user_message() {
        let (mut widget, _) = widget(FakeApi {
            reply: Some("hi".into()),
            ..FakeApi::default()
        });

        let outcome = widget.submit_turn("hello").await;

        assert_eq!(outcome, Some(TurnOutcome::Replied));
        assert_eq!(
            widget.view().messages(),
            vec![msg(Role::User, "hello"), msg(Role::Bot, "hi")]
        );
    }

    #[tokio::test]
    async fn user_message_renders_before_request_resolves() {
        let (mut widget, api) = widget(FakeApi {
            reply: Some("hi".into()),
            ..FakeApi::default()
        });
        widget.view_mut().set_input("  pitch me  ");

        let turn = widget.begin_turn("  pitch me  ").expect("non-blank input");

        assert_eq!(widget.view().messages(), vec![msg(Role::User, "pitch me")]);
        assert_eq!(widget.view().input(), "");
        assert!(api.requests().is_empty());
        assert_eq!(turn.request.messages.len(), 1);
        assert_eq!(turn.request.messages[0].content, "pitch me");
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let (mut widget, api) = widget(FakeApi {
            reply: Some("hi".into()),
            ..FakeApi::default()
        });

        assert_eq!(widget.submit_turn("   \n\t").await, None);
        assert_eq!(widget.submit_turn("").await, None);
        assert!(widget.view().entries().is_empty());
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn failed_request_renders_fallback() {
        let (mut widget, _) = widget(FakeApi::default());

        let outcome = widget.submit_turn("hello").await;

        assert_eq!(outcome, Some(TurnOutcome::Failed));
        let messages = widget.view().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages.last(),
            Some(&msg(Role::Bot, &WidgetConfig::default().fallback_error))
        );
    }

    #[tokio::test]
    async fn loading_characters_activates_first_and_shows_greeting() {
        let (mut widget, _) = widget(FakeApi {
            characters: Some(vec![
                character("a", "A", Some("hey")),
                character("b", "B", None),
            ]),
            ..FakeApi::default()
        });

        assert_eq!(widget.load_characters().await.expect("load"), 2);

        let options = widget
            .view()
            .character_options()
            .iter()
            .map(|option| option.value.as_str())
            .collect::<Vec<_>>();
        assert_eq!(options, vec!["a", "b"]);
        assert_eq!(widget.active_character().map(|c| c.id.as_str()), Some("a"));
        assert_eq!(widget.view().messages(), vec![msg(Role::Bot, "hey")]);

        widget.set_character("b").await.expect("switch");
        assert_eq!(widget.active_character().map(|c| c.id.as_str()), Some("b"));
        assert!(widget.view().entries().is_empty());
        let panel = widget.view().character().expect("panel");
        assert_eq!(panel.name, "B");
        assert_eq!(panel.avatar, WidgetConfig::default().default_avatar);
    }

    #[tokio::test]
    async fn failed_character_fetch_keeps_current_state() {
        let (mut widget, _) = widget(FakeApi {
            characters: Some(vec![character("a", "A", Some("hey"))]),
            ..FakeApi::default()
        });
        widget.load_characters().await.expect("load");

        let error = widget.set_character("ghost").await.err();
        assert!(matches!(error, Some(WidgetError::Character { ref id, .. }) if id == "ghost"));
        assert_eq!(widget.active_character().map(|c| c.id.as_str()), Some("a"));
        assert_eq!(widget.view().messages(), vec![msg(Role::Bot, "hey")]);
    }

    #[tokio::test]
    async fn out_of_order_replies_are_dropped() {
        let (mut widget, _) = widget(FakeApi::default());

        let first = widget.begin_turn("one").expect("turn");
        let second = widget.begin_turn("two").expect("turn");

        let second_outcome = widget.finish_turn(
            second,
            Ok(ChatReply {
                reply: "reply two".into(),
            }),
        );
        let first_outcome = widget.finish_turn(
            first,
            Ok(ChatReply {
                reply: "reply one".into(),
            }),
        );

        assert_eq!(second_outcome, TurnOutcome::Replied);
        assert_eq!(first_outcome, TurnOutcome::Discarded);
        assert_eq!(
            widget.view().messages(),
            vec![
                msg(Role::User, "one"),
                msg(Role::User, "two"),
                msg(Role::Bot, "reply two"),
            ]
        );
    }

    #[tokio::test]
    async fn replies_from_before_a_character_switch_are_dropped() {
        let (mut widget, _) = widget(FakeApi {
            characters: Some(vec![character("a", "A", None), character("b", "B", None)]),
            ..FakeApi::default()
        });
        widget.load_characters().await.expect("load");

        let turn = widget.begin_turn("hello").expect("turn");
        assert_eq!(turn.request.character_id.as_deref(), Some("a"));
        widget.set_character("b").await.expect("switch");

        let outcome = widget.finish_turn(turn, Ok(ChatReply { reply: "late".into() }));
        assert_eq!(outcome, TurnOutcome::Discarded);
        assert!(widget.view().entries().is_empty());
    }

    #[tokio::test]
    async fn request_carries_character_and_selected_model() {
        let (mut widget, api) = widget(FakeApi {
            reply: Some("ok".into()),
            characters: Some(vec![character("ideas_guy", "Ideas Guy", None)]),
            models: Some(vec![model("stub", "stub"), model("distilgpt2", "huggingface")]),
            ..FakeApi::default()
        });

        let report = widget.init().await;
        assert_eq!(report.models.expect("models"), 2);
        assert_eq!(report.characters.expect("characters"), 1);

        widget.select_model("distilgpt2").expect("known model");
        assert!(matches!(
            widget.select_model("gpt-9"),
            Err(WidgetError::UnknownModel(_))
        ));
        widget.submit_turn("hello").await;

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].character_id.as_deref(), Some("ideas_guy"));
        assert_eq!(requests[0].model_provider.as_deref(), Some("huggingface"));
        assert_eq!(requests[0].model_name.as_deref(), Some("distilgpt2"));
    }

    #[tokio::test]
    async fn stale_model_selection_is_not_sent() {
        let (mut widget, api) = widget(FakeApi {
            reply: Some("ok".into()),
            ..FakeApi::default()
        });
        // The control holds a value that never came from a successful load.
        widget.view_mut().set_model_options(&[model("ghost", "vllm")]);

        widget.submit_turn("hello").await;

        let requests = api.requests();
        assert_eq!(requests[0].model_provider, None);
        assert_eq!(requests[0].model_name, None);
    }

    #[tokio::test]
    async fn failed_reloads_leave_controls_as_they_were() {
        let (mut widget, api) = widget(FakeApi {
            reply: Some("ok".into()),
            characters: Some(vec![
                character("ideas_guy", "Ideas Guy", Some("Idea blast!")),
                character("critic", "Critic", None),
            ]),
            models: Some(vec![model("stub", "stub"), model("distilgpt2", "huggingface")]),
            ..FakeApi::default()
        });
        widget.init().await;
        widget.select_model("distilgpt2").expect("known model");

        let models_before = widget.view().model_options().to_vec();
        let characters_before = widget.view().character_options().to_vec();
        let log_before = widget.view().messages();

        api.lists_down.store(true, Ordering::SeqCst);
        assert!(matches!(
            widget.load_models().await,
            Err(WidgetError::Models(_))
        ));
        assert!(matches!(
            widget.load_characters().await,
            Err(WidgetError::Characters(_))
        ));

        assert_eq!(widget.view().model_options(), models_before.as_slice());
        assert_eq!(widget.view().character_options(), characters_before.as_slice());
        assert_eq!(
            widget.active_character().map(|c| c.id.as_str()),
            Some("ideas_guy")
        );
        assert_eq!(widget.view().messages(), log_before);

        widget.submit_turn("hello").await;
        let requests = api.requests();
        assert_eq!(requests[0].model_provider.as_deref(), Some("huggingface"));
        assert_eq!(requests[0].model_name.as_deref(), Some("distilgpt2"));
    }

    #[tokio::test]
    async fn startup_reports_each_half_and_shows_starter_line() {
        let (mut widget, _) = widget(FakeApi {
            models: Some(vec![model("stub", "stub")]),
            ..FakeApi::default()
        });

        let report = widget.init().await;

        assert_eq!(report.models.expect("models"), 1);
        assert!(matches!(report.characters, Err(WidgetError::Characters(_))));
        assert!(widget.active_character().is_none());
        let starter = WidgetConfig::default().starter_line.expect("starter");
        assert_eq!(widget.view().messages(), vec![msg(Role::Bot, &starter)]);
        assert_eq!(widget.view().model_options().len(), 1);
    }

    #[tokio::test]
    async fn every_render_scrolls_to_bottom() {
        let (mut widget, _) = widget(FakeApi {
            reply: Some("a\n\n- b".into()),
            ..FakeApi::default()
        });

        widget.submit_turn("go").await;

        assert_eq!(widget.view().scroll_requests(), 2);
        assert_eq!(widget.view().entries()[1].html, "a<br>• b");
    }
}
