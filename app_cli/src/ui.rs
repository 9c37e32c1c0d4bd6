use crate::app::App;
use crate::canvas::Canvas;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Width of the gain bar in the mix panel
const BAR_WIDTH: usize = 20;

pub fn ui(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(10),   // Canvas and mix
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[1]);

    let title = Paragraph::new(Line::from(vec![
        Span::styled("echofield", Style::default().fg(Color::Cyan)),
        Span::raw(format!(
            "  listener ({:.0}, {:.0})",
            app.listener.x, app.listener.y
        )),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, rows[0]);

    let nodes = app
        .snapshot
        .as_ref()
        .map(|s| s.nodes.as_slice())
        .unwrap_or(&[]);
    let focused = app.snapshot.as_ref().and_then(|s| s.focused.as_ref());
    let canvas = Canvas::new(nodes, app.listener)
        .focused(focused)
        .block(Block::default().title("Canvas").borders(Borders::ALL));
    f.render_widget(canvas, columns[0]);

    f.render_widget(
        Paragraph::new(mix_lines(app)).block(Block::default().title("Mix").borders(Borders::ALL)),
        side[0],
    );

    let events: Vec<Line> = app.events.iter().map(|e| Line::raw(e.as_str())).collect();
    f.render_widget(
        Paragraph::new(Text::from(events))
            .block(Block::default().title("Events").borders(Borders::ALL)),
        side[1],
    );

    let status = Paragraph::new(Span::raw(app.status.as_str()))
        .style(Style::default().fg(Color::White))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, rows[2]);
}

fn mix_lines(app: &App) -> Text<'static> {
    let Some(snapshot) = app.snapshot.as_ref() else {
        return Text::raw("Waiting for the session...");
    };

    let mut lines = vec![Line::raw(format!(
        "blur {:.2}{}{}",
        snapshot.blur,
        if snapshot.muted { "  MUTED" } else { "" },
        if snapshot.reply_unlocked { "  reply ready" } else { "" },
    ))];

    if snapshot.gains.is_empty() {
        lines.push(Line::raw("No voice nodes"));
    }

    for (id, gain) in &snapshot.gains {
        let filled = (gain * BAR_WIDTH as f32).round() as usize;
        let distance = snapshot.distances.get(id).unwrap_or(f32::INFINITY);
        let style = if snapshot.focused.as_ref() == Some(id) {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        lines.push(Line::styled(
            format!(
                "{:<10} {}{} {:>4.0}",
                id.as_str(),
                "#".repeat(filled),
                ".".repeat(BAR_WIDTH.saturating_sub(filled)),
                distance
            ),
            style,
        ));
    }

    Text::from(lines)
}
