use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::session::trainer::SessionView;
use crate::session::trial::Outcome;
use crate::ui::theme::Theme;

/// Last response, latency bar against the target, typed history and the
/// current alphabet / selection pool.
pub struct ResponsePanel<'a> {
    view: &'a SessionView,
    theme: &'a Theme,
}

impl<'a> ResponsePanel<'a> {
    pub fn new(view: &'a SessionView, theme: &'a Theme) -> Self {
        Self { view, theme }
    }
}

impl Widget for ResponsePanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let view = self.view;

        let block = Block::bordered()
            .title(" Listen ")
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));

        let label = Style::default().fg(colors.text_pending());
        let mut lines = vec![Line::from(vec![
            Span::styled("  Target:   ", label),
            Span::styled(
                format!("{} ms", view.target_ms),
                Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
            ),
        ])];

        let (result_text, result_color) = match (view.last_symbol, view.last_outcome) {
            (Some(symbol), Some(Outcome::Correct { latency_ms })) => {
                let color = if latency_ms as u64 <= view.target_ms {
                    colors.success()
                } else {
                    colors.warning()
                };
                (format!("{symbol}  {latency_ms} ms"), color)
            }
            (Some(symbol), Some(Outcome::Mistake { typed })) => {
                (format!("{symbol}  (you typed {typed})"), colors.error())
            }
            _ => ("-".to_string(), colors.text_pending()),
        };
        lines.push(Line::from(vec![
            Span::styled("  Last:     ", label),
            Span::styled(result_text, Style::default().fg(result_color)),
        ]));

        let target_cells = (view.target_ms / crate::session::trainer::BAR_UNIT_MS as u64) as usize;
        let bar_cells = view.latency_bar.chars().count();
        let (within, over): (String, String) = (
            view.latency_bar.chars().take(target_cells).collect(),
            view.latency_bar.chars().skip(target_cells).collect(),
        );
        let pad = target_cells.saturating_sub(bar_cells);
        lines.push(Line::from(vec![
            Span::styled("  ", label),
            Span::styled(within, Style::default().fg(colors.bar_filled())),
            Span::styled(over, Style::default().fg(colors.error())),
            Span::styled(" ".repeat(pad), label),
            Span::styled("\u{2502}", Style::default().fg(colors.warning())),
        ]));

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Typed:    ", label),
            Span::styled(view.history.clone(), Style::default().fg(colors.fg())),
        ]));
        lines.push(Line::from(vec![
            Span::styled("  Alphabet: ", label),
            Span::styled(
                view.alphabet.clone(),
                Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD),
            ),
        ]));
        lines.push(Line::from(vec![
            Span::styled("  Pool:     ", label),
            Span::styled(view.pool.clone(), Style::default().fg(colors.fg())),
        ]));
        if let Some(symbol) = view.just_unlocked {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("  New character unlocked: {symbol}"),
                Style::default().fg(colors.success()).add_modifier(Modifier::BOLD),
            )));
        }

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
