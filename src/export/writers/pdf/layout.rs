//! Page flow for the vector report
//!
//! Content is placed as blocks: a [`Canvas`] drawn with its top edge at
//! `y = 0` plus the height it occupies. The controller keeps a
//! [`PageCursor`] and starts a new page whenever a block would run into the
//! footer area. Footers need the total page count, so they are rendered by
//! [`PageFlowController::finalize`] once every block has been placed.

use tracing::trace;

use crate::config::ReportConfig;

use super::canvas::Canvas;

/// Page dimensions and reserved areas, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub footer_reserve: f64,
}

impl PageGeometry {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            width: config.page_width,
            height: config.page_height,
            margin: config.margin,
            footer_reserve: config.footer_reserve,
        }
    }

    pub fn content_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    /// Lowest `y` content may reach before the footer area
    pub fn content_bottom(&self) -> f64 {
        self.height - self.footer_reserve
    }
}

/// Current page and vertical position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    /// Zero-based page index
    pub page: usize,
    /// Next free `y`, measured from the top edge
    pub y: f64,
    pub page_width: f64,
    pub page_height: f64,
}

/// Column header row repeated on every page a table spans
#[derive(Debug, Clone)]
struct RepeatedHeader {
    block: Canvas,
    height: f64,
}

/// Places content blocks on pages
#[derive(Debug)]
pub struct PageFlowController {
    geometry: PageGeometry,
    cursor: PageCursor,
    pages: Vec<Canvas>,
    table_header: Option<RepeatedHeader>,
    /// Nothing but a repeated header has been placed on the current page
    fresh_page: bool,
    page_breaks: usize,
    header_repeats: usize,
}

impl PageFlowController {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            cursor: PageCursor {
                page: 0,
                y: geometry.margin,
                page_width: geometry.width,
                page_height: geometry.height,
            },
            pages: vec![Canvas::new()],
            table_header: None,
            fresh_page: true,
            page_breaks: 0,
            header_repeats: 0,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn page_breaks(&self) -> usize {
        self.page_breaks
    }

    pub fn header_repeats(&self) -> usize {
        self.header_repeats
    }

    /// Vertical space left above the footer area
    pub fn remaining(&self) -> f64 {
        self.geometry.content_bottom() - self.cursor.y
    }

    /// Make room for a block of `height`
    ///
    /// Starts a new page when the block would cross into the footer area.
    /// A block taller than a whole page is placed on a fresh page and
    /// allowed to overflow, so it never causes more than one break.
    ///
    /// # Returns
    /// * `bool` - Whether a page break happened
    pub fn ensure_space(&mut self, height: f64) -> bool {
        if height <= self.remaining() || self.fresh_page {
            return false;
        }
        self.break_page();
        true
    }

    /// Start a new page, repeating the table header when a table is open
    pub fn break_page(&mut self) {
        self.pages.push(Canvas::new());
        self.cursor.page += 1;
        self.cursor.y = self.geometry.margin;
        self.page_breaks += 1;
        trace!("Page break, now on page {}", self.cursor.page + 1);

        if let Some(header) = self.table_header.clone() {
            self.draw(&header.block, header.height);
            self.header_repeats += 1;
        }
        self.fresh_page = true;
    }

    /// Place a block at the cursor and move below it
    ///
    /// # Arguments
    /// * `block` - Content with its top edge at `y = 0`
    /// * `height` - Space the block occupies
    pub fn place(&mut self, block: &Canvas, height: f64) {
        self.ensure_space(height);
        self.draw(block, height);
        self.fresh_page = false;
    }

    /// Add vertical space; never carries over to the next page
    pub fn advance(&mut self, dy: f64) {
        self.cursor.y = (self.cursor.y + dy).min(self.geometry.content_bottom());
    }

    /// Open a tabular section
    ///
    /// The header is drawn now, together with room for at least
    /// `first_row_height` below it, and redrawn at the top of every page
    /// started before [`end_table`](Self::end_table).
    pub fn begin_table(&mut self, header: Canvas, height: f64, first_row_height: f64) {
        self.ensure_space(height + first_row_height);
        self.draw(&header, height);
        self.fresh_page = false;
        self.table_header = Some(RepeatedHeader {
            block: header,
            height,
        });
    }

    pub fn end_table(&mut self) {
        self.table_header = None;
    }

    fn draw(&mut self, block: &Canvas, height: f64) {
        let page = self.cursor.page;
        if let Some(canvas) = self.pages.get_mut(page) {
            canvas.append_translated(block, 0.0, self.cursor.y);
        }
        self.cursor.y += height;
    }

    /// Render footers and hand out the finished pages
    ///
    /// # Arguments
    /// * `footer` - Called with `(page_number, page_count)`, 1-based; its
    ///   block is drawn at the top of the footer area
    pub fn finalize<F>(self, footer: F) -> Vec<Canvas>
    where
        F: Fn(usize, usize) -> Canvas,
    {
        let total = self.pages.len();
        let top = self.geometry.content_bottom();
        self.pages
            .into_iter()
            .enumerate()
            .map(|(i, mut page)| {
                page.append_translated(&footer(i + 1, total), 0.0, top);
                page
            })
            .collect()
    }
}
