// Canvas widget
// Draws voice nodes and the listener in a 2D view centred on the listener

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Widget},
};
use room::VoiceNode;
use room_core::{Position, SourceId};

pub struct Canvas<'a> {
    block: Option<Block<'a>>,
    nodes: &'a [VoiceNode],
    listener: Position,
    focused: Option<&'a SourceId>,
    /// Canvas units per terminal column
    scale: f32,
}

impl<'a> Canvas<'a> {
    pub fn new(nodes: &'a [VoiceNode], listener: Position) -> Self {
        Self {
            block: None,
            nodes,
            listener,
            focused: None,
            scale: 10.0,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn focused(mut self, focused: Option<&'a SourceId>) -> Self {
        self.focused = focused;
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Terminal cell for a canvas position, if it falls inside `area`.
    ///
    /// Rows are twice as tall as columns are wide, so y is halved.
    fn cell(&self, area: Rect, at: Position) -> Option<(u16, u16)> {
        let col = (at.x - self.listener.x) / self.scale + f32::from(area.width) / 2.0;
        let row = (at.y - self.listener.y) / (self.scale * 2.0) + f32::from(area.height) / 2.0;
        if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
            return None;
        }

        let (col, row) = (col as u16, row as u16);
        if col >= area.width || row >= area.height {
            return None;
        }
        Some((area.left() + col, area.top() + row))
    }
}

impl<'a> Widget for Canvas<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        if inner_area.width < 3 || inner_area.height < 3 {
            return;
        }

        for node in self.nodes {
            let Some((x, y)) = self.cell(inner_area, Position::new(node.x, node.y)) else {
                continue;
            };

            let style = if Some(&node.id) == self.focused {
                Style::default().fg(Color::Green)
            } else if node.parent.is_some() {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            buf.get_mut(x, y).set_symbol("●").set_style(style);

            // Label to the right when it fits
            let label = format!(" {}", node.id);
            for (i, c) in label.chars().enumerate() {
                let lx = x + 1 + i as u16;
                if lx >= inner_area.right() {
                    break;
                }
                buf.get_mut(lx, y).set_symbol(&c.to_string()).set_style(style);
            }
        }

        if let Some((x, y)) = self.cell(inner_area, self.listener) {
            buf.get_mut(x, y)
                .set_symbol("@")
                .set_style(Style::default().fg(Color::Cyan));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::widgets::Borders;

    fn node(id: &str, x: f32, y: f32) -> VoiceNode {
        VoiceNode::new(SourceId::new(id).unwrap(), x, y, "a.wav")
    }

    #[test]
    fn listener_is_drawn_in_the_middle() {
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        Canvas::new(&[], Position::new(500.0, 500.0)).render(area, &mut buf);
        assert_eq!(buf.get(10, 5).symbol(), "@");
    }

    #[test]
    fn nodes_are_placed_relative_to_listener() {
        let area = Rect::new(0, 0, 40, 12);
        let mut buf = Buffer::empty(area);
        let nodes = [node("n", 50.0, 0.0), node("gone", 5000.0, 0.0)];
        let focused = SourceId::new("n").unwrap();

        Canvas::new(&nodes, Position::new(0.0, 0.0))
            .block(Block::default().borders(Borders::ALL))
            .focused(Some(&focused))
            .scale(10.0)
            .render(area, &mut buf);

        // Inner area starts at (1, 1) and is 38x10; centre column 19, row 5
        assert_eq!(buf.get(1 + 19 + 5, 1 + 5).symbol(), "●");
        assert_eq!(buf.get(1 + 19 + 5, 1 + 5).fg, Color::Green);
        assert_eq!(buf.get(1 + 19 + 7, 1 + 5).symbol(), "n");
        assert_eq!(buf.get(1 + 19, 1 + 5).symbol(), "@");
    }
}
