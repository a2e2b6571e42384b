use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutTier {
    Wide,   // ≥90 cols: response panel + stats sidebar
    Narrow, // <90 cols: stats stacked under the response panel
}

impl LayoutTier {
    pub fn from_area(area: Rect) -> Self {
        if area.width >= 90 {
            LayoutTier::Wide
        } else {
            LayoutTier::Narrow
        }
    }
}

pub struct AppLayout {
    pub header: Rect,
    pub main: Rect,
    pub stats: Rect,
    pub footer: Rect,
    pub tier: LayoutTier,
}

impl AppLayout {
    pub fn new(area: Rect) -> Self {
        let tier = LayoutTier::from_area(area);

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(1),
            ])
            .split(area);

        let direction = match tier {
            LayoutTier::Wide => Direction::Horizontal,
            LayoutTier::Narrow => Direction::Vertical,
        };
        let body = Layout::default()
            .direction(direction)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(vertical[1]);

        Self {
            header: vertical[0],
            main: body[0],
            stats: body[1],
            footer: vertical[2],
            tier,
        }
    }
}
