//! Transactions table for the vector report

use crate::projector::{Cell, Column, FieldFormatter};
use crate::theme::{self, StatusPalette};

use super::canvas::{Align, Canvas, Font, Paint, Point, Size, TextStyle, fit_text};

const FONT_SIZE: f64 = 7.0;
const CELL_PADDING: f64 = 3.0;
pub const HEADER_HEIGHT: f64 = 18.0;
pub const ROW_HEIGHT: f64 = 14.0;

/// Horizontal placement of one column
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub label: String,
    pub x: f64,
    pub width: f64,
    pub align: Align,
    pub status: bool,
}

/// Relative width of a column when the descriptor has none
fn weight(column: &Column) -> f64 {
    if let Some(width) = column.descriptor.width {
        return width;
    }
    match column.formatter {
        FieldFormatter::Text => 16.0,
        FieldFormatter::Currency => 14.0,
        FieldFormatter::Date => 12.0,
        FieldFormatter::Status => 12.0,
        FieldFormatter::Number | FieldFormatter::Percentage => 11.0,
        FieldFormatter::Integer => 9.0,
        FieldFormatter::Boolean => 8.0,
    }
}

/// Column positions spanning the content width
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub columns: Vec<TableColumn>,
}

impl TableLayout {
    /// Split `width` between columns in proportion to their weights
    pub fn plan(columns: &[Column], left: f64, width: f64) -> Self {
        let total: f64 = columns.iter().map(weight).sum();
        let mut x = left;
        let columns = columns
            .iter()
            .map(|column| {
                let share = if total > 0.0 {
                    weight(column) / total * width
                } else {
                    0.0
                };
                let placed = TableColumn {
                    label: column.label.clone(),
                    x,
                    width: share,
                    align: if column.formatter.is_numeric() {
                        Align::Right
                    } else {
                        Align::Left
                    },
                    status: column.formatter == FieldFormatter::Status,
                };
                x += share;
                placed
            })
            .collect();
        Self { columns }
    }

    fn span(&self) -> (f64, f64) {
        let left = self.columns.first().map_or(0.0, |c| c.x);
        let right = self.columns.last().map_or(0.0, |c| c.x + c.width);
        (left, right - left)
    }

    fn anchor(column: &TableColumn) -> f64 {
        match column.align {
            Align::Left => column.x + CELL_PADDING,
            Align::Center => column.x + column.width / 2.0,
            Align::Right => column.x + column.width - CELL_PADDING,
        }
    }

    /// Header row block, `HEADER_HEIGHT` tall
    pub fn header_block(&self) -> Canvas {
        let (left, width) = self.span();
        let mut canvas = Canvas::new();
        canvas.rect(
            Point::new(left, 0.0),
            Size::new(width, HEADER_HEIGHT),
            Paint::fill(theme::PRIMARY),
        );
        let style = TextStyle::new(Font::Bold, FONT_SIZE, theme::WHITE);
        for column in &self.columns {
            let text = fit_text(&column.label, Font::Bold, FONT_SIZE, column.width - 2.0 * CELL_PADDING);
            canvas.text(
                Point::new(Self::anchor(column), HEADER_HEIGHT / 2.0 + FONT_SIZE / 3.0),
                text,
                style.aligned(column.align),
            );
        }
        canvas
    }

    /// Data row block, `ROW_HEIGHT` tall
    ///
    /// Odd rows are banded; status cells use the palette colour in bold.
    pub fn row_block(&self, cells: &[Cell], index: usize, palette: &StatusPalette) -> Canvas {
        let (left, width) = self.span();
        let mut canvas = Canvas::new();
        if index % 2 == 1 {
            canvas.rect(
                Point::new(left, 0.0),
                Size::new(width, ROW_HEIGHT),
                Paint::fill(theme::BAND),
            );
        }
        for (column, cell) in self.columns.iter().zip(cells) {
            let value = cell.as_text();
            let style = if column.status {
                TextStyle::new(Font::Bold, FONT_SIZE, palette.color_for(&value))
            } else {
                TextStyle::new(Font::Regular, FONT_SIZE, theme::TEXT)
            };
            let text = fit_text(&value, style.font, FONT_SIZE, column.width - 2.0 * CELL_PADDING);
            canvas.text(
                Point::new(Self::anchor(column), ROW_HEIGHT / 2.0 + FONT_SIZE / 3.0),
                text,
                style.aligned(column.align),
            );
        }
        canvas.line(
            Point::new(left, ROW_HEIGHT),
            Point::new(left + width, ROW_HEIGHT),
            Paint::stroke(theme::GRID, 0.3),
        );
        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::writers::pdf::canvas::DrawOp;
    use crate::model::FieldCatalog;
    use crate::projector::{FieldProjector, ProjectionStyle};

    fn layout(fields: &[&str]) -> TableLayout {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        let projection = FieldProjector::default().plan(
            &fields,
            &FieldCatalog::transactions(),
            ProjectionStyle::Human,
        );
        TableLayout::plan(projection.columns(), 40.0, 515.0)
    }

    #[test]
    fn test_columns_span_content_width() {
        let table = layout(&["id", "client", "amount", "status"]);
        let last = table.columns.last().unwrap();
        assert_eq!(table.columns[0].x, 40.0);
        assert!((last.x + last.width - 555.0).abs() < 1e-9);
        assert_eq!(table.columns[2].align, Align::Right);
        assert!(table.columns[3].status);
    }

    #[test]
    fn test_status_cell_uses_palette() {
        let table = layout(&["id", "status"]);
        let palette = StatusPalette::default();
        let row = table.row_block(
            &[Cell::Text("TX-1".into()), Cell::Text("error".into())],
            0,
            &palette,
        );
        let status_color = row.ops().iter().find_map(|op| match op {
            DrawOp::Text { text, style, .. } if text == "error" => Some(style.color),
            _ => None,
        });
        assert_eq!(status_color, Some(palette.color_for("error")));
    }

    #[test]
    fn test_odd_rows_are_banded() {
        let table = layout(&["id"]);
        let palette = StatusPalette::default();
        let count_rects = |canvas: &Canvas| {
            canvas
                .ops()
                .iter()
                .filter(|op| matches!(op, DrawOp::Rect { .. }))
                .count()
        };
        let cells = [Cell::Text("x".into())];
        assert_eq!(count_rects(&table.row_block(&cells, 0, &palette)), 0);
        assert_eq!(count_rects(&table.row_block(&cells, 1, &palette)), 1);
    }
}
