use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, AppState},
    difficulty::Difficulty,
    metrics::format_time,
    session::CharState,
};

const HORIZONTAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Loading => render_loading(self, area, buf),
            AppState::Typing => render_main(self, area, buf),
        }
    }
}

fn render_loading(app: &App, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![Line::from(Span::styled(
        "Loading Typing Master...",
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
    ))];
    if let Some(err) = &app.identity_error {
        lines.push(Line::from(Span::styled(
            format!("still waiting for a player identity ({err})"),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )));
    }
    lines.push(Line::from(Span::styled(
        "(esc)ape to quit",
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    let top = area.height.saturating_sub(lines.len() as u16) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(top), Constraint::Min(0)])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
}

fn render_main(app: &App, area: Rect, buf: &mut Buffer) {
    let leaderboard_height = (app.settings().leaderboard_limit.max(1) as u16).saturating_add(3);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(3),                  // header
            Constraint::Length(3),                  // difficulty
            Constraint::Length(3),                  // live stats
            Constraint::Min(6),                     // typing area
            Constraint::Length(leaderboard_height), // leaderboard
            Constraint::Length(1),                  // legend
        ])
        .split(area);

    render_header(app, chunks[0], buf);
    render_difficulty(app, chunks[1], buf);
    render_stats(app, chunks[2], buf);
    render_typing_area(app, chunks[3], buf);
    render_leaderboard(app, chunks[4], buf);
    render_legend(app, chunks[5], buf);
}

fn render_header(app: &App, area: Rect, buf: &mut Buffer) {
    let name = app
        .identity
        .as_ref()
        .map(|i| i.display_name.as_str())
        .unwrap_or("...");

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(name.width() as u16 + 4),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "Typing Master",
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "  improve your typing speed and accuracy",
            Style::default().fg(Color::Gray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL));
    title.render(chunks[0], buf);

    Paragraph::new(Span::styled(name, Style::default().add_modifier(Modifier::BOLD)))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .render(chunks[1], buf);
}

fn difficulty_color(d: Difficulty) -> Color {
    match d {
        Difficulty::Easy => Color::Green,
        Difficulty::Medium => Color::Yellow,
        Difficulty::Hard => Color::Red,
    }
}

fn render_difficulty(app: &App, area: Rect, buf: &mut Buffer) {
    let titles: Vec<Line> = Difficulty::ALL
        .iter()
        .map(|d| Line::from(Span::styled(d.to_string(), Style::default().fg(difficulty_color(*d)))))
        .collect();
    let selected = Difficulty::ALL
        .iter()
        .position(|d| *d == app.difficulty)
        .unwrap_or(0);

    let title = if app.is_running() {
        format!("Difficulty (locked) - {}", app.difficulty.description())
    } else {
        format!("Difficulty - {}", app.difficulty.description())
    };

    let mut highlight = Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED);
    if app.is_running() {
        highlight = highlight.add_modifier(Modifier::DIM);
    }

    Tabs::new(titles)
        .select(selected)
        .highlight_style(highlight)
        .block(Block::default().borders(Borders::ALL).title(title))
        .render(area, buf);
}

fn render_stats(app: &App, area: Rect, buf: &mut Buffer) {
    let m = &app.metrics;
    let cells = [
        ("WPM", m.wpm.to_string(), Color::Blue),
        ("Accuracy", format!("{}%", m.accuracy), Color::Green),
        ("Time", format_time(m.time_elapsed_seconds), Color::Magenta),
        (
            "Progress",
            format!("{}/{}", m.correct_chars, m.total_chars),
            Color::LightRed,
        ),
    ];

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    for ((label, value, color), chunk) in cells.into_iter().zip(chunks.iter()) {
        Paragraph::new(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(label))
        .render(*chunk, buf);
    }
}

fn render_typing_area(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let correct = bold.fg(Color::Green);
    let incorrect = bold.fg(Color::Red).add_modifier(Modifier::UNDERLINED);
    let cursor = bold.bg(Color::Blue).fg(Color::White);
    let pending = Style::default().add_modifier(Modifier::DIM);

    let states = app.session.char_states();
    // group runs of equal state into one span
    let spans: Vec<Span> = states
        .iter()
        .chunk_by(|(_, state)| *state)
        .into_iter()
        .map(|(state, group)| {
            let text: String = group.map(|(c, _)| *c).collect();
            let style = match state {
                CharState::Correct => correct,
                CharState::Incorrect => incorrect,
                CharState::Cursor => cursor,
                CharState::Pending => pending,
            };
            Span::styled(text, style)
        })
        .collect();

    let mut lines = vec![Line::from(spans), Line::from("")];

    if app.metrics.completed {
        lines.push(Line::from(Span::styled(
            format!(
                "Completed! {} wpm at {}% accuracy in {}",
                app.metrics.wpm,
                app.metrics.accuracy,
                format_time(app.metrics.time_elapsed_seconds)
            ),
            bold.fg(Color::Green),
        )));
    } else if app.session.is_active() {
        lines.push(Line::from(Span::styled(
            "Keep typing! Your stats are updating in real time.",
            Style::default().fg(Color::Blue).add_modifier(Modifier::ITALIC),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Start typing to begin the timer.",
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )));
    }

    if let Some(status) = &app.status {
        lines.push(Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Cyan),
        )));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Start Typing - {}", app.sample.category)),
        )
        .render(area, buf);
}

fn rank_style(rank: usize) -> Style {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match rank {
        1 => bold.fg(Color::Yellow),
        2 => bold.fg(Color::Gray),
        3 => bold.fg(Color::Rgb(205, 127, 50)),
        _ => Style::default().fg(Color::Blue),
    }
}

fn render_leaderboard(app: &App, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Leaderboard - {}", app.difficulty));

    if app.leaderboard.is_empty() {
        Paragraph::new("No scores yet. Be the first to type!")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .block(block)
            .render(area, buf);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Rank"),
        Cell::from("Player"),
        Cell::from("WPM"),
        Cell::from("Accuracy"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = app
        .leaderboard
        .iter()
        .map(|entry| {
            Row::new(vec![
                Cell::from(format!("#{}", entry.rank)).style(rank_style(entry.rank)),
                Cell::from(entry.display_name.clone()),
                Cell::from(entry.wpm.to_string())
                    .style(Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
                Cell::from(format!("{}%", entry.accuracy)),
            ])
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Min(12),
            Constraint::Length(6),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(block)
    .render(area, buf);
}

fn render_legend(app: &App, area: Rect, buf: &mut Buffer) {
    let tiers = Difficulty::ALL.iter().map(|d| d.as_str()).join("/");
    let text = if app.is_running() {
        "(tab) reset / (esc)ape".to_string()
    } else {
        format!("(tab) new text / (←/→) difficulty: {tiers} / (esc)ape")
    };
    Paragraph::new(Span::styled(
        text,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(area, buf);
}
