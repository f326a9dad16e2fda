use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use typetutor::{clock::TIME_PRESETS_SECS, RenderSnapshot, SessionPhase};
use unicode_width::UnicodeWidthStr;

use crate::{App, Notice, Prompt};

const HORIZONTAL_MARGIN: u16 = 2;
const HISTORY_WORDS: usize = 10;
const RESULTS_WIDTH: u16 = 44;
const RESULTS_HEIGHT: u16 = 8;

/// Whole seconds left as MM:SS, truncating the fraction
pub fn format_clock(remaining_secs: f64) -> String {
    let secs = remaining_secs.max(0.0) as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snapshot = self.session.snapshot(self.now);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        render_header(&snapshot, chunks[0], buf);
        render_words(&snapshot, chunks[1], buf);
        self.render_input(&snapshot, chunks[2], buf);

        Paragraph::new(snapshot.live_stats.to_string())
            .style(Style::default().add_modifier(Modifier::BOLD))
            .render(chunks[3], buf);

        if let Some(notice) = &self.notice {
            let (text, color) = match notice {
                Notice::Info(text) => (text, Color::Green),
                Notice::Warning(text) => (text, Color::Yellow),
                Notice::Error(text) => (text, Color::Red),
            };
            Paragraph::new(text.as_str())
                .style(Style::default().fg(color))
                .render(chunks[4], buf);
        }

        Paragraph::new(self.legend())
            .style(Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM))
            .render(chunks[5], buf);

        if let Some(results) = snapshot.final_stats {
            let popup = centered(area, RESULTS_WIDTH, RESULTS_HEIGHT);
            Clear.render(popup, buf);
            Paragraph::new(results.summary())
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(" Typing Test Results ")
                        .title_alignment(Alignment::Center),
                )
                .alignment(Alignment::Center)
                .render(popup, buf);
        }
    }
}

impl App {
    fn render_input(&self, snapshot: &RenderSnapshot<'_>, area: Rect, buf: &mut Buffer) {
        let (title, text, style) = match &self.prompt {
            Some(Prompt::TimeLimit(text)) => (" Time limit (seconds) ", text.as_str(), Style::default()),
            Some(Prompt::WordFile(text)) => (" Word file path ", text.as_str(), Style::default()),
            None => {
                let style = if snapshot.partial_mismatch {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                (" Type here ", snapshot.current_input, style)
            }
        };

        Paragraph::new(Span::styled(text, style))
            .block(Block::default().borders(Borders::ALL).title(title))
            .render(area, buf);
    }

    fn legend(&self) -> &'static str {
        if self.prompt.is_some() {
            return "(enter) apply / (esc) cancel";
        }
        match self.session.phase() {
            SessionPhase::Idle => {
                "(enter) start / (1-4) preset / (t) custom time / (o) word file / (d) built-in words / (esc) quit"
            }
            SessionPhase::Running { .. } => "(space) next word / (backspace) fix / (esc) reset",
            SessionPhase::Finished { .. } => "(enter) reset / (esc) quit",
        }
    }
}

fn render_header(snapshot: &RenderSnapshot<'_>, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(16)])
        .split(area);

    let mut spans = vec![Span::raw("Time: ")];
    for secs in TIME_PRESETS_SECS {
        let style = if secs == snapshot.time_limit_secs {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!("{secs}s"), style));
        spans.push(Span::raw(" "));
    }
    if !TIME_PRESETS_SECS.contains(&snapshot.time_limit_secs) {
        spans.push(Span::styled(
            format!("custom {}s ", snapshot.time_limit_secs),
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD),
        ));
    }
    spans.push(Span::styled(
        format!("[{}]", snapshot.phase),
        Style::default().fg(Color::Magenta),
    ));

    Paragraph::new(Line::from(spans)).render(chunks[0], buf);
    Paragraph::new(format!("Time left: {}", format_clock(snapshot.remaining_secs)))
        .alignment(Alignment::Right)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .render(chunks[1], buf);
}

fn render_words(snapshot: &RenderSnapshot<'_>, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let current_style = bold.bg(Color::DarkGray).add_modifier(Modifier::UNDERLINED);

    // keep the committed tail to about a third of a line
    let budget = (area.width.saturating_sub(2) / 3) as usize;
    let mut used = 0;
    let tail: Vec<_> = snapshot
        .judgments
        .iter()
        .rev()
        .take(HISTORY_WORDS)
        .take_while(|judgment| {
            used += judgment.expected().width() + 1;
            used <= budget
        })
        .collect();

    let mut spans = Vec::new();
    for judgment in tail.into_iter().rev() {
        let color = if judgment.is_correct() {
            Color::Green
        } else {
            Color::Red
        };
        spans.push(Span::styled(judgment.expected(), bold.fg(color)));
        spans.push(Span::raw(" "));
    }

    if let Some((current, upcoming)) = snapshot.window.split_first() {
        if snapshot.partial_mismatch {
            let typed = snapshot.current_input.chars().count();
            let split = current
                .char_indices()
                .nth(typed)
                .map(|(i, _)| i)
                .unwrap_or(current.len());
            let (wrong, rest) = current.split_at(split);
            spans.push(Span::styled(wrong, current_style.fg(Color::Red)));
            if !rest.is_empty() {
                spans.push(Span::styled(rest, current_style));
            }
        } else {
            spans.push(Span::styled(current.as_str(), current_style));
        }

        if !upcoming.is_empty() {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                upcoming.iter().join(" "),
                Style::default().add_modifier(Modifier::DIM),
            ));
        }
    }

    Paragraph::new(Text::from(Line::from(spans)))
        .block(Block::default().borders(Borders::ALL).title(" Words "))
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
