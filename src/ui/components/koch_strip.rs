use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Widget};

use crate::engine::curriculum::koch_order;
use crate::session::trainer::SessionView;
use crate::ui::theme::Theme;

/// Header strip: the whole Koch order, unlocked characters highlighted and
/// the newest one picked out in the accent colour.
pub struct KochStrip<'a> {
    view: &'a SessionView,
    theme: &'a Theme,
}

impl<'a> KochStrip<'a> {
    pub fn new(view: &'a SessionView, theme: &'a Theme) -> Self {
        Self { view, theme }
    }
}

impl Widget for KochStrip<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let view = self.view;

        let block = Block::bordered()
            .title(format!(
                " Koch progress {}/{} characters ",
                view.unlocked_count, view.total_symbols
            ))
            .title_bottom(format!(
                " overall {:.0} ms over {} answers ",
                view.overall.avg_latency, view.overall.sample_count
            ))
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let order = koch_order();
        let step: u16 = if inner.width as usize >= order.len() * 2 { 2 } else { 1 };
        let newest = view.unlocked_count.checked_sub(1);

        for (i, symbol) in order.iter().enumerate() {
            let x = inner.x + i as u16 * step;
            if x >= inner.x + inner.width {
                break;
            }
            let style = if Some(i) == newest {
                Style::default()
                    .fg(colors.bg())
                    .bg(colors.accent())
                    .add_modifier(Modifier::BOLD)
            } else if i < view.unlocked_count {
                Style::default().fg(colors.bg()).bg(colors.bar_filled())
            } else {
                Style::default().fg(colors.text_pending()).bg(colors.bar_empty())
            };
            buf.set_string(x, inner.y, symbol.to_string(), style);
        }
    }
}
