//! Drawing surface for the vector report
//!
//! A [`Canvas`] records draw operations in page space with the origin at the
//! top-left corner and `y` growing downwards. Every operation carries its own
//! [`Paint`] or [`TextStyle`]; nothing is inherited from a previous call.
//! [`Canvas::to_content_stream`] turns the operations into PDF content
//! stream bytes, flipping `y` and isolating each operation in its own
//! graphics state (`q ... Q`).

use std::fmt::Write as _;

use crate::theme::Rgb;

/// Bezier control point factor for quarter circles
const KAPPA: f64 = 0.552_284_75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Fill and stroke of a shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub fill: Option<Rgb>,
    pub stroke: Option<Rgb>,
    pub line_width: f64,
}

impl Paint {
    pub const fn fill(color: Rgb) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            line_width: 0.0,
        }
    }

    pub const fn stroke(color: Rgb, line_width: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(color),
            line_width,
        }
    }

    pub const fn fill_and_stroke(fill: Rgb, stroke: Rgb, line_width: f64) -> Self {
        Self {
            fill: Some(fill),
            stroke: Some(stroke),
            line_width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// Resource name in the page's font dictionary
    pub const fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Font, size, colour and anchor of a text run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    pub size: f64,
    pub color: Rgb,
    pub align: Align,
}

impl TextStyle {
    pub const fn new(font: Font, size: f64, color: Rgb) -> Self {
        Self {
            font,
            size,
            color,
            align: Align::Left,
        }
    }

    pub const fn aligned(self, align: Align) -> Self {
        Self { align, ..self }
    }
}

/// One recorded drawing operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        origin: Point,
        size: Size,
        paint: Paint,
    },
    Polygon {
        points: Vec<Point>,
        paint: Paint,
    },
    Line {
        from: Point,
        to: Point,
        paint: Paint,
    },
    Circle {
        center: Point,
        radius: f64,
        paint: Paint,
    },
    /// `at` is the anchor on the text baseline
    Text {
        at: Point,
        text: String,
        style: TextStyle,
    },
}

impl DrawOp {
    fn translated(&self, dx: f64, dy: f64) -> Self {
        match self {
            DrawOp::Rect {
                origin,
                size,
                paint,
            } => DrawOp::Rect {
                origin: origin.offset(dx, dy),
                size: *size,
                paint: *paint,
            },
            DrawOp::Polygon { points, paint } => DrawOp::Polygon {
                points: points.iter().map(|p| p.offset(dx, dy)).collect(),
                paint: *paint,
            },
            DrawOp::Line { from, to, paint } => DrawOp::Line {
                from: from.offset(dx, dy),
                to: to.offset(dx, dy),
                paint: *paint,
            },
            DrawOp::Circle {
                center,
                radius,
                paint,
            } => DrawOp::Circle {
                center: center.offset(dx, dy),
                radius: *radius,
                paint: *paint,
            },
            DrawOp::Text { at, text, style } => DrawOp::Text {
                at: at.offset(dx, dy),
                text: text.clone(),
                style: *style,
            },
        }
    }
}

/// Recorded drawing operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Canvas {
    ops: Vec<DrawOp>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn rect(&mut self, origin: Point, size: Size, paint: Paint) {
        self.ops.push(DrawOp::Rect {
            origin,
            size,
            paint,
        });
    }

    pub fn polygon(&mut self, points: Vec<Point>, paint: Paint) {
        if points.len() >= 3 {
            self.ops.push(DrawOp::Polygon { points, paint });
        }
    }

    pub fn line(&mut self, from: Point, to: Point, paint: Paint) {
        self.ops.push(DrawOp::Line { from, to, paint });
    }

    pub fn circle(&mut self, center: Point, radius: f64, paint: Paint) {
        self.ops.push(DrawOp::Circle {
            center,
            radius,
            paint,
        });
    }

    pub fn text(&mut self, at: Point, text: impl Into<String>, style: TextStyle) {
        self.ops.push(DrawOp::Text {
            at,
            text: text.into(),
            style,
        });
    }

    /// Append all operations of `other`, shifted by `(dx, dy)`
    pub fn append_translated(&mut self, other: &Canvas, dx: f64, dy: f64) {
        self.ops
            .extend(other.ops.iter().map(|op| op.translated(dx, dy)));
    }

    /// Render the operations as a PDF content stream
    ///
    /// # Arguments
    /// * `page_height` - Height used to flip `y` into PDF user space
    pub fn to_content_stream(&self, page_height: f64) -> Vec<u8> {
        let mut out = String::new();
        for op in &self.ops {
            out.push_str("q\n");
            write_op(&mut out, op, page_height);
            out.push_str("Q\n");
        }
        let mut bytes = Vec::with_capacity(out.len());
        // Text runs were already encoded to single bytes as \ddd escapes.
        bytes.extend(out.chars().map(|c| c as u32 as u8));
        bytes
    }
}

fn num(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn set_colors(out: &mut String, paint: &Paint) {
    if let Some(fill) = paint.fill {
        let (r, g, b) = fill.to_unit();
        let _ = writeln!(out, "{} {} {} rg", num(r), num(g), num(b));
    }
    if let Some(stroke) = paint.stroke {
        let (r, g, b) = stroke.to_unit();
        let _ = writeln!(out, "{} {} {} RG", num(r), num(g), num(b));
        let _ = writeln!(out, "{} w", num(paint.line_width));
    }
}

fn paint_operator(paint: &Paint) -> &'static str {
    match (paint.fill.is_some(), paint.stroke.is_some()) {
        (true, true) => "B",
        (true, false) => "f",
        (false, true) => "S",
        (false, false) => "n",
    }
}

fn write_op(out: &mut String, op: &DrawOp, page_height: f64) {
    let flip = |y: f64| page_height - y;
    match op {
        DrawOp::Rect {
            origin,
            size,
            paint,
        } => {
            set_colors(out, paint);
            let _ = writeln!(
                out,
                "{} {} {} {} re {}",
                num(origin.x),
                num(flip(origin.y + size.height)),
                num(size.width),
                num(size.height),
                paint_operator(paint)
            );
        }
        DrawOp::Polygon { points, paint } => {
            set_colors(out, paint);
            for (i, p) in points.iter().enumerate() {
                let op = if i == 0 { "m" } else { "l" };
                let _ = writeln!(out, "{} {} {}", num(p.x), num(flip(p.y)), op);
            }
            let _ = writeln!(out, "h {}", paint_operator(paint));
        }
        DrawOp::Line { from, to, paint } => {
            set_colors(out, paint);
            let _ = writeln!(
                out,
                "{} {} m {} {} l S",
                num(from.x),
                num(flip(from.y)),
                num(to.x),
                num(flip(to.y))
            );
        }
        DrawOp::Circle {
            center,
            radius,
            paint,
        } => {
            set_colors(out, paint);
            let (cx, cy, r) = (center.x, flip(center.y), *radius);
            let k = r * KAPPA;
            let _ = writeln!(out, "{} {} m", num(cx + r), num(cy));
            let quarters = [
                (cx + r, cy + k, cx + k, cy + r, cx, cy + r),
                (cx - k, cy + r, cx - r, cy + k, cx - r, cy),
                (cx - r, cy - k, cx - k, cy - r, cx, cy - r),
                (cx + k, cy - r, cx + r, cy - k, cx + r, cy),
            ];
            for (x1, y1, x2, y2, x3, y3) in quarters {
                let _ = writeln!(
                    out,
                    "{} {} {} {} {} {} c",
                    num(x1),
                    num(y1),
                    num(x2),
                    num(y2),
                    num(x3),
                    num(y3)
                );
            }
            let _ = writeln!(out, "h {}", paint_operator(paint));
        }
        DrawOp::Text { at, text, style } => {
            let width = text_width(text, style.font, style.size);
            let x = match style.align {
                Align::Left => at.x,
                Align::Center => at.x - width / 2.0,
                Align::Right => at.x - width,
            };
            let (r, g, b) = style.color.to_unit();
            let _ = writeln!(out, "BT");
            let _ = writeln!(out, "{} {} {} rg", num(r), num(g), num(b));
            let _ = writeln!(out, "/{} {} Tf", style.font.resource(), num(style.size));
            let _ = writeln!(out, "{} {} Td", num(x), num(flip(at.y)));
            let _ = writeln!(out, "({}) Tj", encode_text(text));
            let _ = writeln!(out, "ET");
        }
    }
}

/// Map a character to its WinAnsi code, if it has one
fn win_ansi(c: char) -> Option<u8> {
    match c {
        ' '..='~' => Some(c as u8),
        '\u{A0}'..='\u{FF}' => Some(c as u32 as u8),
        '€' => Some(0x80),
        '…' => Some(0x85),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '–' => Some(0x96),
        '—' => Some(0x97),
        _ => None,
    }
}

/// Escape text for a PDF literal string in WinAnsi encoding
///
/// Non-ASCII bytes are written as octal escapes so the content stream stays
/// 7-bit; characters outside WinAnsi become `?`.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let byte = win_ansi(c).unwrap_or(b'?');
        match byte {
            b'(' | b')' | b'\\' => {
                out.push('\\');
                out.push(byte as char);
            }
            0x20..=0x7E => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{byte:03o}");
            }
        }
    }
    out
}

/// Approximate advance width of Helvetica glyphs, in 1/1000 em
fn glyph_width(c: char) -> f64 {
    match c {
        ' ' | '.' | ',' | ':' | ';' | '!' | 'i' | 'j' | 'l' | '|' | '\'' => 278.0,
        'f' | 't' | 'I' | '/' | '(' | ')' | '[' | ']' | '-' => 333.0,
        'r' => 333.0,
        '0'..='9' | '$' | '#' | '_' | '?' => 556.0,
        'm' | 'M' => 833.0,
        'w' | '%' => 722.0,
        'W' => 944.0,
        'A'..='Z' => 667.0,
        'a'..='z' => 520.0,
        _ => 556.0,
    }
}

/// Estimated rendered width of `text` in points
pub fn text_width(text: &str, font: Font, size: f64) -> f64 {
    let base: f64 = text.chars().map(glyph_width).sum();
    let factor = match font {
        Font::Regular => 1.0,
        Font::Bold => 1.06,
    };
    base * factor * size / 1000.0
}

/// Shorten `text` with a trailing `...` so it fits in `max_width`
pub fn fit_text(text: &str, font: Font, size: f64, max_width: f64) -> String {
    if text_width(text, font, size) <= max_width {
        return text.to_string();
    }
    let ellipsis = "...";
    let budget = max_width - text_width(ellipsis, font, size);
    let mut out = String::new();
    let mut used = 0.0;
    for c in text.chars() {
        let w = glyph_width(c) * size / 1000.0;
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ellipsis);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    #[test]
    fn test_encode_text_escapes() {
        assert_eq!(encode_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(encode_text("Pérez"), "P\\351rez");
        assert_eq!(encode_text("€5"), "\\2005");
        assert_eq!(encode_text("日本"), "??");
    }

    #[test]
    fn test_rect_flips_y() {
        let mut canvas = Canvas::new();
        canvas.rect(
            Point::new(10.0, 20.0),
            Size::new(100.0, 30.0),
            Paint::fill(theme::PRIMARY),
        );
        let stream = String::from_utf8(canvas.to_content_stream(842.0)).unwrap();
        assert!(stream.contains("10 792 100 30 re f"));
        assert!(stream.starts_with("q\n"));
        assert!(stream.ends_with("Q\n"));
    }

    #[test]
    fn test_each_op_carries_its_paint() {
        let mut canvas = Canvas::new();
        canvas.rect(Point::new(0.0, 0.0), Size::new(1.0, 1.0), Paint::fill(theme::WHITE));
        canvas.line(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Paint::stroke(theme::TEXT, 0.5),
        );
        let stream = String::from_utf8(canvas.to_content_stream(100.0)).unwrap();
        assert_eq!(stream.matches("q\n").count(), 2);
        assert_eq!(stream.matches("Q\n").count(), 2);
        assert!(stream.contains("1 1 1 rg"));
        assert!(stream.contains("0.5 w"));
    }

    #[test]
    fn test_translate_and_polygon_guard() {
        let mut block = Canvas::new();
        block.text(
            Point::new(5.0, 5.0),
            "x",
            TextStyle::new(Font::Regular, 8.0, theme::TEXT),
        );
        block.polygon(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)], Paint::fill(theme::TEXT));
        assert_eq!(block.ops().len(), 1);

        let mut page = Canvas::new();
        page.append_translated(&block, 0.0, 100.0);
        match &page.ops()[0] {
            DrawOp::Text { at, .. } => assert_eq!(*at, Point::new(5.0, 105.0)),
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_fit_text() {
        let long = "Comercializadora Internacional de Divisas";
        let fitted = fit_text(long, Font::Regular, 8.0, 60.0);
        assert!(fitted.ends_with("..."));
        assert!(text_width(&fitted, Font::Regular, 8.0) <= 60.0 + 0.01);
        assert_eq!(fit_text("USD", Font::Regular, 8.0, 60.0), "USD");
    }

    #[test]
    fn test_num_formatting() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(0.126), "0.13");
        assert_eq!(num(2.5), "2.5");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(f64::NAN), "0");
    }
}
