use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table};

use crate::app::{App, View};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_banner(frame, root[1], app);
    render_table(frame, root[2], app);
    render_footer(frame, root[3], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let line = Line::from(vec![
        Span::styled(" hoggers ", Style::default().fg(Color::Black).bg(ACCENT)),
        Span::raw(" "),
        Span::styled("ctx ", Style::default().fg(MUTED)),
        Span::styled(
            compact_text(app.context(), 32),
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        Span::styled("cluster ", Style::default().fg(MUTED)),
        Span::styled(
            compact_text(app.cluster(), 48),
            Style::default().fg(Color::White),
        ),
    ]);
    frame.render_widget(Paragraph::new(line).style(Style::default().bg(BG)), area);
}

fn render_banner(frame: &mut Frame, area: Rect, app: &App) {
    let title = Paragraph::new(Line::from(Span::styled(
        app.title(),
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::NONE))
    .style(Style::default().bg(BG));

    if matches!(app.view(), View::Report { .. }) {
        frame.render_widget(title, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(3, 4), Constraint::Ratio(1, 4)])
        .split(area);
    frame.render_widget(title, chunks[0]);

    let progress = app.progress();
    let (label, color) = if progress.done() {
        ("Waiting", ACCENT)
    } else {
        ("Refreshing data", WARN)
    };
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(label)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title_style(Style::default().fg(color)),
        )
        .gauge_style(Style::default().fg(color).bg(PANEL))
        .percent(progress.percent());
    frame.render_widget(gauge, chunks[1]);
}

fn render_table(frame: &mut Frame, area: Rect, app: &App) {
    let headers = app.headers();
    let rows = app.rows();

    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(*header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let body = rows.into_iter().map(|columns| {
        Row::new(
            columns
                .into_iter()
                .map(|column| Cell::from(column).style(Style::default().fg(Color::White))),
        )
    });

    let constraints = match app.view() {
        View::Report { .. } => column_constraints(headers.len()),
        View::Top { .. } => vec![
            Constraint::Length(4),
            Constraint::Fill(2),
            Constraint::Fill(4),
            Constraint::Fill(3),
            Constraint::Length(9),
            Constraint::Length(9),
        ],
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MUTED))
        .style(Style::default().bg(PANEL));

    let table = Table::new(body, constraints)
        .header(header_row)
        .block(block)
        .column_spacing(1);
    frame.render_widget(table, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let refreshed = app
        .last_refresh()
        .map(|at| format!("refreshed {at}"))
        .unwrap_or_else(|| "not refreshed yet".to_string());
    let line = Line::from(vec![
        Span::styled(" q quit ", Style::default().fg(Color::Black).bg(MUTED)),
        Span::raw(" "),
        Span::styled(refreshed, Style::default().fg(MUTED)),
        Span::raw("  "),
        Span::styled(
            compact_text(app.status(), area.width.saturating_sub(40).max(16) as usize),
            Style::default().fg(Color::White),
        ),
    ]);
    frame.render_widget(Paragraph::new(line).style(Style::default().bg(BG)), area);
}

fn column_constraints(columns: usize) -> Vec<Constraint> {
    if columns == 0 {
        return vec![Constraint::Percentage(100)];
    }

    let width = (100 / columns as u16).max(1);
    (0..columns)
        .map(|_| Constraint::Percentage(width))
        .collect()
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::{compact_text, render};
    use crate::app::App;
    use crate::model::{NodeAggregate, PodUsageSample};
    use crate::top::{RefreshEvent, TopConfig};
    use chrono::Local;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use tokio::time::Duration;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).expect("test terminal");
        terminal
            .draw(|frame| render(frame, app))
            .expect("draw frame");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn report_screen_shows_percentages() {
        let node = NodeAggregate {
            name: "node-a".to_string(),
            total_pods: 3,
            unrestricted_pods: 1,
            allocatable_cpu_millicores: 4_000,
            allocatable_memory_bytes: 1 << 30,
            reserved_cpu_millicores: 2_000,
            reserved_memory_bytes: 0,
            committed_cpu_millicores: 3_000,
            committed_memory_bytes: 0,
            reserved_cpu_fraction: 0.5,
            reserved_memory_fraction: 0.0,
            committed_cpu_fraction: 0.75,
            committed_memory_fraction: 0.0,
        };
        let app = App::report("dev".to_string(), "https://k8s".to_string(), vec![node]);

        let text = screen(&app);
        assert!(text.contains("Resources reservations and limits by pods for each node"));
        assert!(text.contains("node-a"));
        assert!(text.contains("50.00%"));
        assert!(text.contains("75.00%"));
        assert!(!text.contains("Waiting"));
    }

    #[test]
    fn top_screen_shows_gauge_and_rows() {
        let mut app = App::top(
            "dev".to_string(),
            "https://k8s".to_string(),
            &TopConfig {
                interval: Duration::from_secs(10),
                rows_limit: 20,
                keep_going: false,
            },
        );
        assert!(screen(&app).contains("Refreshing data"));

        let mut pod = PodUsageSample::new("web", "api-0", 1_500, 2_147_483_648);
        pod.node = Some("worker-1".to_string());
        app.update(RefreshEvent::Completed {
            rows: vec![pod],
            refreshed_at: Local::now(),
        });

        let text = screen(&app);
        assert!(text.contains("Waiting"));
        assert!(text.contains("worker-1"));
        assert!(text.contains("1500m"));
        assert!(text.contains("2048Mi"));
    }

    #[test]
    fn compact_text_truncates_with_ellipsis() {
        assert_eq!(compact_text("short", 10), "short");
        assert_eq!(compact_text("abcdefgh", 4), "abc…");
    }
}
