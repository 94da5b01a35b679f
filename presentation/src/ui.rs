use domain::session::ConversationState;
use domain::turn::Turn;
use shared::types::Result;
use shared::utils::html_escape;

/// The display primitives a chat page needs.
pub trait ChatSurface {
    fn title(&mut self, text: &str);
    fn write(&mut self, text: &str);
    /// Render `markup` inside a container tagged with `role`. The markup is
    /// not escaped.
    fn chat_message(&mut self, role: &str, markup: &str);
}

/// Accumulates the page body as HTML.
#[derive(Debug, Default)]
pub struct HtmlSurface {
    body: String,
}

impl HtmlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn into_html(self) -> String {
        self.body
    }
}

impl ChatSurface for HtmlSurface {
    fn title(&mut self, text: &str) {
        self.body.push_str(&format!("<h1>{}</h1>\n", html_escape(text)));
    }

    fn write(&mut self, text: &str) {
        self.body
            .push_str(&format!("<p class=\"subheading\">{}</p>\n", html_escape(text)));
    }

    fn chat_message(&mut self, role: &str, markup: &str) {
        let role = html_escape(role);
        self.body.push_str(&format!(
            "<div class=\"chat-message\" data-role=\"{role}\">\
             <div class=\"avatar\">{role}</div>\
             <div class=\"content\">{markup}</div></div>\n"
        ));
    }
}

pub fn render_turn<S: ChatSurface>(surface: &mut S, turn: &Turn) -> Result<()> {
    let flat = turn.to_flat_record()?;
    surface.chat_message(&flat.role, &flat.content);
    Ok(())
}

/// Turn a submission into a user turn, echoing it right away. Nothing or
/// whitespace yields `None`.
pub fn read_user_input<S: ChatSurface>(surface: &mut S, submitted: Option<&str>) -> Result<Option<Turn>> {
    let content = match submitted {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Ok(None),
    };
    let turn = Turn::user(content);
    render_turn(surface, &turn)?;
    Ok(Some(turn))
}

/// A chat page over one session's history.
pub struct ChatUi<'a, S: ChatSurface> {
    state: &'a ConversationState,
    surface: S,
}

impl<'a, S: ChatSurface> ChatUi<'a, S> {
    /// Renders the title, the subheading, then every stored turn, oldest first.
    pub fn new(title: &str, state: &'a ConversationState, subheading: &str, mut surface: S) -> Result<Self> {
        surface.title(title);
        surface.write(subheading);
        let mut ui = Self { state, surface };
        ui.write_history()?;
        Ok(ui)
    }

    fn write_history(&mut self) -> Result<()> {
        for turn in self.state.history() {
            render_turn(&mut self.surface, turn)?;
        }
        Ok(())
    }

    pub fn render_turn(&mut self, turn: &Turn) -> Result<()> {
        render_turn(&mut self.surface, turn)
    }

    pub fn read_user_input(&mut self, submitted: Option<&str>) -> Result<Option<Turn>> {
        read_user_input(&mut self.surface, submitted)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}
