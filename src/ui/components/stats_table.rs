use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::audio::morse::Symbol;
use crate::engine::reaction_stats::ReactionSummary;
use crate::ui::theme::Theme;

/// Per-character latency / sample / error table, rows in the given order.
pub struct StatsTable<'a> {
    title: &'a str,
    rows: &'a [(Symbol, ReactionSummary)],
    target_ms: u64,
    theme: &'a Theme,
}

impl<'a> StatsTable<'a> {
    pub fn new(
        title: &'a str,
        rows: &'a [(Symbol, ReactionSummary)],
        target_ms: u64,
        theme: &'a Theme,
    ) -> Self {
        Self {
            title,
            rows,
            target_ms,
            theme,
        }
    }
}

impl Widget for StatsTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(" {} ", self.title))
            .border_style(Style::default().fg(colors.border()));

        let mut lines = vec![Line::from(Span::styled(
            "  chr    avg ms    n    err",
            Style::default()
                .fg(colors.header_fg())
                .add_modifier(Modifier::BOLD),
        ))];

        for (symbol, summary) in self.rows {
            let latency_color = if summary.sample_count == 0 {
                colors.text_pending()
            } else if summary.avg_latency <= self.target_ms as f64 {
                colors.success()
            } else {
                colors.warning()
            };
            let error_color = if summary.error_ratio > 0.05 {
                colors.error()
            } else {
                colors.fg()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<4}", symbol.as_char()), Style::default().fg(colors.accent())),
                Span::styled(
                    format!("{:>8.0}", summary.avg_latency),
                    Style::default().fg(latency_color),
                ),
                Span::styled(
                    format!("{:>6}", summary.sample_count),
                    Style::default().fg(colors.fg()),
                ),
                Span::styled(
                    format!("{:>6.0}%", summary.error_ratio * 100.0),
                    Style::default().fg(error_color),
                ),
            ]));
        }

        Paragraph::new(lines).block(block).render(area, buf);
    }
}
