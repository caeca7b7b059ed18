//! Screen rendering. Everything here is a pure function of [`App`] state.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Tabs, Wrap};
use ratatui::Frame;

use crate::api::models::Problem;
use crate::dashboard::{page_strip, PageSlot, Scope};
use crate::session::SessionStatus;

use super::{App, Screen};

pub(super) fn draw(frame: &mut Frame, app: &App) {
    match app.screen {
        Screen::Splash => draw_splash(frame),
        Screen::Login | Screen::Signup => draw_auth(frame, app),
        Screen::Dashboard => draw_dashboard(frame, app),
        Screen::Detail => draw_detail(frame, app),
        Screen::Heatmap => draw_heatmap(frame, app),
    }
}

fn draw_splash(frame: &mut Frame) {
    let [_, line, _] = Layout::vertical([
        Constraint::Percentage(45),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(frame.area());
    frame.render_widget(Line::from("Checking session...".dim()).centered(), line);
}

fn draw_auth(frame: &mut Frame, app: &App) {
    let signup = app.screen == Screen::Signup;
    let [header, subtitle, _, form, _, status, _, hint] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(if signup { 3 } else { 2 }),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    frame.render_widget(Line::from("DSA Recall".bold().cyan()), header);
    let caption = if signup { "Create an account" } else { "Sign in" };
    frame.render_widget(Line::from(caption.dim()), subtitle);

    let fields: Vec<(&str, String)> = if signup {
        vec![
            ("Name", app.name.display()),
            ("Email", app.email.display()),
            ("Password", app.password.display()),
        ]
    } else {
        vec![
            ("Email", app.email.display()),
            ("Password", app.password.display()),
        ]
    };
    for (row, (label, value)) in fields.iter().enumerate() {
        let focused = row == app.focus;
        let marker: Span = if focused { "> ".bold().cyan() } else { "  ".into() };
        let line = Line::from(vec![
            marker,
            format!("{:<10}", label).dim(),
            value.clone().into(),
        ]);
        let rect = Rect::new(form.x, form.y + row as u16, form.width, 1);
        frame.render_widget(line, rect);
        if focused {
            let field = match (signup, row) {
                (true, 0) => &app.name,
                (true, 1) | (false, 0) => &app.email,
                _ => &app.password,
            };
            frame.set_cursor_position((form.x + 12 + field.cursor() as u16, rect.y));
        }
    }

    let session = app.session.snapshot();
    let status_line: Line = if session.status == SessionStatus::Busy {
        let text = if signup { "Creating account..." } else { "Signing in..." };
        Line::from(text.dim())
    } else if let Some(error) = &session.last_error {
        Line::from(error.clone().red())
    } else {
        Line::default()
    };
    frame.render_widget(status_line, status);

    let toggle_hint = if signup { " sign in instead  " } else { " create account  " };
    let hint_line = Line::from(vec![
        "Enter".bold(),
        " submit  ".dim(),
        "Tab".bold(),
        " next field  ".dim(),
        "Ctrl+T".bold(),
        toggle_hint.dim(),
        "Esc".bold(),
        " quit".dim(),
    ]);
    frame.render_widget(hint_line, hint);
}

fn draw_dashboard(frame: &mut Frame, app: &App) {
    let [header, tabs, search, status, list, pager, hint] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let session = app.session.snapshot();
    let who: Span = match &session.identity {
        Some(user) => format!("   {}", user.email).dim(),
        None => "".into(),
    };
    frame.render_widget(Line::from(vec!["DSA Recall".bold().cyan(), who]), header);

    let scope = app.dash.query().scope;
    let selected_tab = match scope {
        Scope::Due => 0,
        Scope::All => 1,
    };
    frame.render_widget(
        Tabs::new(vec!["[1] Due Today", "[2] All Problems"])
            .select(selected_tab)
            .style(Style::new().dim())
            .highlight_style(Style::new().not_dim().bold().cyan()),
        tabs,
    );

    draw_search_line(frame, search, app);
    frame.render_widget(status_line(app), status);
    draw_list(frame, list, app);
    frame.render_widget(pager_line(app), pager);
    frame.render_widget(hint_line(app), hint);
}

fn draw_search_line(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(field) = &app.search_input {
        let line = Line::from(vec!["Search: ".bold(), field.display().into()]);
        frame.render_widget(line, area);
        frame.set_cursor_position((area.x + 8 + field.cursor() as u16, area.y));
        return;
    }
    if app.dash.query().scope != Scope::All {
        return;
    }
    let committed = &app.dash.query().search;
    let line = if committed.is_empty() {
        Line::from("Press / to search".dim())
    } else {
        Line::from(vec![
            "Search: ".dim(),
            committed.clone().into(),
            "  (/ to edit)".dim(),
        ])
    };
    frame.render_widget(line, area);
}

fn status_line(app: &App) -> Line<'static> {
    if let Some(error) = app.dash.error() {
        Line::from(error.to_string().red())
    } else if let Some(notice) = &app.notice {
        Line::from(notice.clone().red())
    } else if app.dash.loading() {
        Line::from("Loading...".dim())
    } else {
        Line::default()
    }
}

fn draw_list(frame: &mut Frame, area: Rect, app: &App) {
    let Some(page) = app.dash.page() else {
        return;
    };
    if page.problems.is_empty() {
        let message = match app.dash.query().scope {
            Scope::Due => "Nothing due for review.",
            Scope::All => "No problems found.",
        };
        frame.render_widget(Line::from(message.italic().dim()), area);
        return;
    }

    let columns = Line::from(
        format!(
            "  {:<42}{:<10}{:>6}  {}",
            "TITLE", "LANGUAGE", "STREAK", "NEXT REVIEW"
        )
        .dim(),
    );
    frame.render_widget(columns, Rect::new(area.x, area.y, area.width, 1));

    let capacity = area.height.saturating_sub(1) as usize;
    let start = app.selected.saturating_sub(capacity.saturating_sub(1));
    let visible = &page.problems[start..page.problems.len().min(start + capacity)];

    let mut y = area.y + 1;
    for (idx, problem) in visible.iter().enumerate() {
        let is_selected = start + idx == app.selected;
        let marker: Span = if is_selected { "> ".bold().cyan() } else { "  ".into() };
        let title = format!("{:<42}", truncate(&problem.title, 40));
        let line = Line::from(vec![
            marker,
            if is_selected { title.bold() } else { title.into() },
            format!("{:<10}", truncate(&problem.language, 10)).into(),
            format!("{:>6}", problem.current_streak).into(),
            format!("  {}", next_review(problem)).dim(),
        ]);
        frame.render_widget(line, Rect::new(area.x, y, area.width, 1));
        y = y.saturating_add(1);
    }
}

fn pager_line(app: &App) -> Line<'static> {
    let Some(page) = app.dash.page() else {
        return Line::default();
    };
    let total = page.meta.total_pages.max(1) as u32;
    let current = app.dash.query().page;
    let mut spans: Vec<Span> = vec![format!(
        "Page {} of {}  ({} problems)   ",
        current, total, page.meta.total_records
    )
    .dim()];
    for slot in page_strip(current, total) {
        match slot {
            PageSlot::Num(n) if n == current => spans.push(format!("[{n}]").bold().cyan()),
            PageSlot::Num(n) => spans.push(format!(" {n} ").dim()),
            PageSlot::Gap => spans.push(" … ".dim()),
        }
    }
    Line::from(spans)
}

fn hint_line(app: &App) -> Line<'static> {
    if app.search_input.is_some() {
        return Line::from(vec![
            "Enter".bold(),
            " apply  ".dim(),
            "Esc".bold(),
            " cancel".dim(),
        ]);
    }
    let mut spans: Vec<Span> = Vec::new();
    if app.dash.query().scope == Scope::Due {
        spans.extend([
            "e".bold(),
            " easy  ".dim(),
            "h".bold(),
            " hard  ".dim(),
        ]);
    } else {
        spans.extend(["/".bold(), " search  ".dim()]);
    }
    spans.extend([
        "Enter".bold(),
        " detail  ".dim(),
        "1/2".bold(),
        " tabs  ".dim(),
        "←/→".bold(),
        " page  ".dim(),
        "g".bold(),
        " activity  ".dim(),
        "r".bold(),
        " refresh  ".dim(),
        "x".bold(),
        " logout  ".dim(),
        "q".bold(),
        " quit".dim(),
    ]);
    Line::from(spans)
}

fn draw_detail(frame: &mut Frame, app: &App) {
    let Some(problem) = &app.detail else {
        return;
    };
    let [header, _, meta, _, body, hint] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(4),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let title = format!("Problem {}: {}", problem.id, problem.title);
    frame.render_widget(
        Line::from(truncate(&title, frame.area().width as usize).bold().cyan()),
        header,
    );

    let rows = [
        ("Link", problem.link.clone()),
        ("Language", problem.language.clone()),
        ("Streak", problem.current_streak.to_string()),
        ("Next review", next_review(problem)),
    ];
    for (row, (label, value)) in rows.iter().enumerate() {
        let line = Line::from(vec![format!("{:<13}", label).dim(), value.clone().into()]);
        frame.render_widget(line, Rect::new(meta.x, meta.y + row as u16, meta.width, 1));
    }

    let [approach_area, code_area] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);
    frame.render_widget(
        panel(&problem.approach, "Approach".to_string(), app.detail_scroll),
        approach_area,
    );
    frame.render_widget(
        panel(
            &problem.code,
            format!("Code ({})", problem.language),
            app.detail_scroll,
        ),
        code_area,
    );

    let hint_spans = Line::from(vec![
        "↑/↓".bold(),
        " scroll  ".dim(),
        "Esc".bold(),
        " back".dim(),
    ]);
    frame.render_widget(hint_spans, hint);
}

fn panel(text: &str, title: String, scroll: u16) -> Paragraph<'_> {
    let body: Paragraph = if text.is_empty() {
        Paragraph::new(Line::from("(empty)".italic().dim()))
    } else {
        Paragraph::new(text)
    };
    body.wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(Block::bordered().title(title))
}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn draw_heatmap(frame: &mut Frame, app: &App) {
    let Some(grid) = &app.heatmap else {
        return;
    };
    let [header, _, months, days, _, total, legend, _, hint] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(7),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    frame.render_widget(Line::from("Review Activity".bold().cyan()), header);

    // Month labels sit above the first week column of each month.
    let mut labels = " ".repeat(5);
    for (week, label) in &grid.months {
        let col = 5 + week * 2;
        if col >= labels.len() {
            labels.push_str(&" ".repeat(col - labels.len()));
            labels.push_str(label);
        }
    }
    frame.render_widget(Line::from(labels.dim()), months);

    for row in 0..7 {
        let mut spans: Vec<Span> = vec![format!("{:<4} ", DAY_NAMES[row]).dim()];
        for week in &grid.weeks {
            match week[row] {
                Some(cell) => spans.push("■ ".fg(level_color(cell.level))),
                None => spans.push("  ".into()),
            }
        }
        frame.render_widget(
            Line::from(spans),
            Rect::new(days.x, days.y + row as u16, days.width, 1),
        );
    }

    frame.render_widget(
        Line::from(format!(
            "{} reviews in the last {} months",
            grid.total_reviews(),
            app.heatmap_months
        )),
        total,
    );

    let mut legend_spans: Vec<Span> = vec!["Less ".dim()];
    for level in 0..=4u8 {
        legend_spans.push("■ ".fg(level_color(level)));
    }
    legend_spans.push("More".dim());
    frame.render_widget(Line::from(legend_spans), legend);

    let hint_spans = Line::from(vec!["Esc".bold(), " back".dim()]);
    frame.render_widget(hint_spans, hint);
}

/// The blues from the web dashboard's activity widget, darkest for a day
/// with no reviews.
fn level_color(level: u8) -> Color {
    match level {
        0 => Color::Rgb(30, 41, 59),
        1 => Color::Rgb(59, 90, 134),
        2 => Color::Rgb(76, 118, 176),
        3 => Color::Rgb(93, 145, 218),
        _ => Color::Rgb(110, 172, 244),
    }
}

fn next_review(problem: &Problem) -> String {
    problem
        .next_review_at()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| problem.next_review_date.clone())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tokio::sync::mpsc;

    use crate::api::fakes::{page, problem, ScriptedBackend};
    use crate::api::models::{ActivityDay, Credentials};
    use crate::config::DashboardConfig;
    use crate::dashboard::heatmap::HeatmapGrid;
    use crate::dashboard::DashboardEvent;
    use crate::session::SessionStore;

    fn test_app() -> (App, Arc<ScriptedBackend>) {
        let backend = ScriptedBackend::new();
        let session = Arc::new(SessionStore::new(backend.clone()));
        let config = DashboardConfig {
            due_page_size: 5,
            all_page_size: 5,
            heatmap_months: 6,
        };
        let (msg_tx, _msg_rx) = mpsc::unbounded_channel();
        let (dash_tx, _dash_rx) = mpsc::unbounded_channel();
        (
            App::new(session, backend.clone(), &config, msg_tx, dash_tx),
            backend,
        )
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 24)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let width = buffer.area.width as usize;
        buffer
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect::<Vec<_>>()
            .chunks(width)
            .map(|row| row.concat())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_splash_screen() {
        let (app, _backend) = test_app();
        assert!(render(&app).contains("Checking session..."));
    }

    #[test]
    fn test_login_screen_fields_and_hints() {
        let (mut app, _backend) = test_app();
        app.screen = Screen::Login;
        app.email.set_value("ada@example.com");
        app.password.set_value("hunter2");

        let screen = render(&app);
        assert!(screen.contains("Sign in"));
        assert!(screen.contains("ada@example.com"));
        // The password renders masked.
        assert!(!screen.contains("hunter2"));
        assert!(screen.contains("•••••••"));
        assert!(screen.contains("Ctrl+T"));
    }

    #[tokio::test]
    async fn test_login_screen_surfaces_last_error() {
        let (mut app, backend) = test_app();
        backend.script_login(Err(crate::api::ApiError::AuthRejected(
            "invalid credentials".to_string(),
        )));
        let creds = Credentials {
            email: "e@x.com".to_string(),
            password: "bad".to_string(),
        };
        let _ = app.session.login(&creds).await;
        app.screen = Screen::Login;

        assert!(render(&app).contains("invalid credentials"));
    }

    #[test]
    fn test_dashboard_rows_tabs_and_pager() {
        let (mut app, _backend) = test_app();
        app.screen = Screen::Dashboard;
        app.dash.handle(DashboardEvent::Page {
            seq: 0,
            result: Ok(page(vec![problem(1, "Two Sum")], 1, 5, 12)),
        });

        let screen = render(&app);
        assert!(screen.contains("Due Today"));
        assert!(screen.contains("All Problems"));
        assert!(screen.contains("Two Sum"));
        assert!(screen.contains("Page 1 of 3"));
        assert!(screen.contains("[1]"));
    }

    #[test]
    fn test_dashboard_empty_due_message() {
        let (mut app, _backend) = test_app();
        app.screen = Screen::Dashboard;
        app.dash.handle(DashboardEvent::Page {
            seq: 0,
            result: Ok(page(vec![], 1, 5, 0)),
        });

        assert!(render(&app).contains("Nothing due for review."));
    }

    #[test]
    fn test_detail_screen_panels() {
        let (mut app, _backend) = test_app();
        let mut p = problem(42, "Two Sum");
        p.approach = "Hash map of complements.".to_string();
        p.code = "def two_sum(nums, target): ...".to_string();
        app.detail = Some(p);
        app.screen = Screen::Detail;

        let screen = render(&app);
        assert!(screen.contains("Problem 42: Two Sum"));
        assert!(screen.contains("Approach"));
        assert!(screen.contains("Code (python)"));
        assert!(screen.contains("Hash map of complements."));
    }

    #[test]
    fn test_heatmap_screen_grid_and_total() {
        let (mut app, _backend) = test_app();
        let days = vec![
            ActivityDay {
                date: "2025-09-10T00:00:00Z".to_string(),
                count: 3,
            },
            ActivityDay {
                date: "2025-08-01T00:00:00Z".to_string(),
                count: 1,
            },
        ];
        let today = NaiveDate::from_ymd_opt(2025, 9, 13).unwrap();
        app.heatmap = Some(HeatmapGrid::build(&days, today, 2));
        app.screen = Screen::Heatmap;

        let screen = render(&app);
        assert!(screen.contains("Review Activity"));
        assert!(screen.contains("Aug"));
        assert!(screen.contains("Sun"));
        assert!(screen.contains("4 reviews in the last 6 months"));
        assert!(screen.contains("Less"));
    }
}
