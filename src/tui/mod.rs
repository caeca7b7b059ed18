//! Interactive full-screen dashboard.
//!
//! Run with no subcommand, the binary drops into this ratatui interface:
//! login/signup forms, the problem list with tabs, search and pagination,
//! a read-only problem detail pane, and the activity heatmap.
//!
//! The loop is draw-then-wait: one [`App`] owns all screen state on the UI
//! task, terminal input arrives through crossterm's [`EventStream`], and
//! background work (auth calls, fetches) reports back through channels that
//! the same `tokio::select!` drains. Nothing blocks the UI task.

mod input;
mod views;

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;

use crate::api::models::{ActivityDay, Credentials, Problem, SignupDetails};
use crate::api::{ApiError, ApiResult, RecallBackend};
use crate::config::DashboardConfig;
use crate::dashboard::heatmap::HeatmapGrid;
use crate::dashboard::{DashboardEvent, DashboardModel, Scope};
use crate::session::{GuardDecision, SessionStatus, SessionStore};
use crate::AppContext;
use input::TextField;

/// Restores the terminal when dropped, error paths included.
struct TerminalGuard {
    terminal: DefaultTerminal,
}

impl TerminalGuard {
    fn enter() -> Self {
        Self {
            terminal: ratatui::init(),
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        ratatui::restore();
    }
}

impl std::ops::Deref for TerminalGuard {
    type Target = DefaultTerminal;
    fn deref(&self) -> &Self::Target {
        &self.terminal
    }
}

impl std::ops::DerefMut for TerminalGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.terminal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    /// Shown until the startup identity check resolves.
    Splash,
    Login,
    Signup,
    Dashboard,
    Detail,
    Heatmap,
}

/// Completion of a background call other than the dashboard fetches.
enum AppEvent {
    SessionChecked,
    AuthDone(Result<(), ApiError>),
    LoggedOut,
    DetailLoaded(ApiResult<Problem>),
    ActivityLoaded(ApiResult<Vec<ActivityDay>>),
}

/// All TUI state. Mutated only from the UI task.
struct App {
    session: Arc<SessionStore>,
    backend: Arc<dyn RecallBackend>,
    events: mpsc::UnboundedSender<AppEvent>,
    heatmap_months: u32,
    screen: Screen,
    dash: DashboardModel,
    // Login / signup form.
    name: TextField,
    email: TextField,
    password: TextField,
    focus: usize,
    // Dashboard.
    selected: usize,
    /// `Some` while the search line is being edited.
    search_input: Option<TextField>,
    // Detail pane.
    detail: Option<Problem>,
    detail_scroll: u16,
    // Heatmap.
    heatmap: Option<HeatmapGrid>,
    /// Failure from a detail or activity fetch, shown on the dashboard.
    notice: Option<String>,
    should_quit: bool,
}

impl App {
    fn new(
        session: Arc<SessionStore>,
        backend: Arc<dyn RecallBackend>,
        config: &DashboardConfig,
        events: mpsc::UnboundedSender<AppEvent>,
        dash_events: mpsc::UnboundedSender<DashboardEvent>,
    ) -> Self {
        Self {
            session,
            dash: DashboardModel::new(backend.clone(), config, dash_events),
            backend,
            events,
            heatmap_months: config.heatmap_months.max(1),
            screen: Screen::Splash,
            name: TextField::new(),
            email: TextField::new(),
            password: TextField::masked(),
            focus: 0,
            selected: 0,
            search_input: None,
            detail: None,
            detail_scroll: 0,
            heatmap: None,
            notice: None,
            should_quit: false,
        }
    }

    /// The one startup identity check. Until it reports back the splash
    /// stays up and no protected screen renders.
    fn check_session(&self) {
        let session = self.session.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            session.refresh_identity().await;
            let _ = events.send(AppEvent::SessionChecked);
        });
    }

    fn enter_dashboard(&mut self) {
        self.screen = Screen::Dashboard;
        self.selected = 0;
        self.dash.refresh();
    }

    fn handle_message(&mut self, event: AppEvent) {
        match event {
            AppEvent::SessionChecked => match self.session.guard() {
                GuardDecision::Admit => self.enter_dashboard(),
                _ => self.screen = Screen::Login,
            },
            AppEvent::AuthDone(Ok(())) => {
                self.password.clear();
                self.enter_dashboard();
            }
            AppEvent::AuthDone(Err(e)) => {
                // The form re-renders with the store's last_error; stay put.
                tracing::debug!(error = %e, "Auth attempt failed");
                self.password.clear();
            }
            AppEvent::LoggedOut => {
                self.password.clear();
                self.focus = 0;
                self.screen = Screen::Login;
            }
            AppEvent::DetailLoaded(Ok(problem)) => {
                self.detail = Some(problem);
                self.detail_scroll = 0;
                self.screen = Screen::Detail;
            }
            AppEvent::DetailLoaded(Err(e)) => self.notice = Some(e.to_string()),
            AppEvent::ActivityLoaded(Ok(days)) => {
                self.heatmap = Some(HeatmapGrid::build(
                    &days,
                    Utc::now().date_naive(),
                    self.heatmap_months,
                ));
                self.screen = Screen::Heatmap;
            }
            AppEvent::ActivityLoaded(Err(e)) => self.notice = Some(e.to_string()),
        }
    }

    /// Dashboard fetch completions, plus keeping the selection inside the
    /// page that actually arrived.
    fn handle_dashboard(&mut self, event: DashboardEvent) {
        self.dash.handle(event);
        let len = self.dash.page().map(|p| p.problems.len()).unwrap_or(0);
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        match self.screen {
            Screen::Splash => {}
            Screen::Login | Screen::Signup => self.handle_auth_key(key),
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::Detail => self.handle_detail_key(key),
            Screen::Heatmap => self.handle_heatmap_key(key),
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('t') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.screen = match self.screen {
                Screen::Signup => Screen::Login,
                _ => Screen::Signup,
            };
            self.focus = 0;
            return;
        }
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1) % self.focus_count(),
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + self.focus_count() - 1) % self.focus_count()
            }
            KeyCode::Enter => self.submit_auth(),
            _ => {
                self.focused_field().handle_key(key);
            }
        }
    }

    fn focus_count(&self) -> usize {
        match self.screen {
            Screen::Signup => 3,
            _ => 2,
        }
    }

    fn focused_field(&mut self) -> &mut TextField {
        match (self.screen, self.focus) {
            (Screen::Signup, 0) => &mut self.name,
            (Screen::Signup, 1) => &mut self.email,
            (Screen::Signup, _) => &mut self.password,
            (_, 0) => &mut self.email,
            (_, _) => &mut self.password,
        }
    }

    /// Submit the login or signup form. Ignored while an attempt is already
    /// in flight or while a required field is empty.
    fn submit_auth(&mut self) {
        if self.session.snapshot().status == SessionStatus::Busy {
            return;
        }
        let email = self.email.value().trim().to_string();
        let password = self.password.value().to_string();
        if email.is_empty() || password.is_empty() {
            return;
        }
        let session = self.session.clone();
        let events = self.events.clone();
        if self.screen == Screen::Signup {
            let name = self.name.value().trim().to_string();
            if name.is_empty() {
                return;
            }
            tokio::spawn(async move {
                let details = SignupDetails {
                    name,
                    email,
                    password,
                };
                let result = session.signup(&details).await;
                let _ = events.send(AppEvent::AuthDone(result));
            });
        } else {
            tokio::spawn(async move {
                let credentials = Credentials { email, password };
                let result = session.login(&credentials).await;
                let _ = events.send(AppEvent::AuthDone(result));
            });
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        // Search editing captures everything except commit and cancel.
        if let Some(field) = self.search_input.as_mut() {
            match key.code {
                KeyCode::Enter => {
                    let text = field.value().trim().to_string();
                    self.search_input = None;
                    self.selected = 0;
                    self.dash.set_search(&text);
                }
                KeyCode::Esc => self.search_input = None,
                _ => {
                    field.handle_key(key);
                }
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('1') => {
                self.selected = 0;
                self.dash.set_scope(Scope::Due);
            }
            KeyCode::Char('2') => {
                self.selected = 0;
                self.dash.set_scope(Scope::All);
            }
            KeyCode::Char('/') if self.dash.query().scope == Scope::All => {
                let mut field = TextField::new();
                field.set_value(&self.dash.query().search);
                self.search_input = Some(field);
            }
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.dash.page().map(|p| p.problems.len()).unwrap_or(0);
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            KeyCode::Left => {
                let page = self.dash.query().page;
                if page > 1 {
                    self.selected = 0;
                    self.dash.set_page(page - 1);
                }
            }
            KeyCode::Right => {
                let page = self.dash.query().page;
                if page < self.total_pages() {
                    self.selected = 0;
                    self.dash.set_page(page + 1);
                }
            }
            KeyCode::Char('e') if self.dash.query().scope == Scope::Due => {
                if let Some(id) = self.selected_problem_id() {
                    self.dash.review(id, true);
                }
            }
            KeyCode::Char('h') if self.dash.query().scope == Scope::Due => {
                if let Some(id) = self.selected_problem_id() {
                    self.dash.review(id, false);
                }
            }
            KeyCode::Enter => {
                if let Some(id) = self.selected_problem_id() {
                    self.open_detail(id);
                }
            }
            KeyCode::Char('g') => self.open_heatmap(),
            KeyCode::Char('r') => {
                self.notice = None;
                self.dash.refresh();
            }
            KeyCode::Char('x') => self.logout(),
            _ => {}
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.screen = Screen::Dashboard;
                self.detail = None;
                self.detail_scroll = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.detail_scroll = self.detail_scroll.saturating_sub(1)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.detail_scroll = self.detail_scroll.saturating_add(1)
            }
            KeyCode::PageUp => self.detail_scroll = self.detail_scroll.saturating_sub(10),
            KeyCode::PageDown => self.detail_scroll = self.detail_scroll.saturating_add(10),
            _ => {}
        }
    }

    fn handle_heatmap_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('g') => {
                self.screen = Screen::Dashboard;
            }
            _ => {}
        }
    }

    fn selected_problem_id(&self) -> Option<i64> {
        self.dash
            .page()
            .and_then(|page| page.problems.get(self.selected))
            .map(|problem| problem.id)
    }

    fn total_pages(&self) -> u32 {
        self.dash
            .page()
            .map(|p| p.meta.total_pages.max(1) as u32)
            .unwrap_or(1)
    }

    fn open_detail(&mut self, id: i64) {
        self.notice = None;
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.get_problem(id).await;
            let _ = events.send(AppEvent::DetailLoaded(result));
        });
    }

    fn open_heatmap(&mut self) {
        self.notice = None;
        let backend = self.backend.clone();
        let events = self.events.clone();
        let months = self.heatmap_months;
        tokio::spawn(async move {
            let result = backend.activity(months).await;
            let _ = events.send(AppEvent::ActivityLoaded(result));
        });
    }

    fn logout(&mut self) {
        let session = self.session.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            session.logout().await;
            let _ = events.send(AppEvent::LoggedOut);
        });
    }
}

/// Run the TUI until the user quits.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let mut terminal = TerminalGuard::enter();
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    let (dash_tx, mut dash_rx) = mpsc::unbounded_channel();
    let mut app = App::new(
        ctx.session.clone(),
        ctx.api.clone(),
        &ctx.config.dashboard,
        msg_tx,
        dash_tx,
    );
    app.check_session();

    let mut keys = EventStream::new();
    while !app.should_quit {
        terminal.draw(|frame| views::draw(frame, &app))?;
        tokio::select! {
            maybe_event = keys.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => {
                    if key.kind != KeyEventKind::Release {
                        app.handle_key(key);
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(event) = msg_rx.recv() => app.handle_message(event),
            Some(event) = dash_rx.recv() => app.handle_dashboard(event),
        }
    }
    Ok(())
}
