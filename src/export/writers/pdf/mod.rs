//! Paginated report encoder
//!
//! Builds a PDF report from an export job: a header banner, KPI cards,
//! charts over aggregated series and the transactions table. Layout runs in
//! two phases. Blocks are placed on pages by a [`PageFlowController`], then
//! footers are added once the page count is known and the pages are handed
//! to the [`PdfWriter`].

pub mod canvas;
pub mod charts;
pub mod document;
pub mod layout;
pub mod metrics;
pub mod table;

use tracing::{debug, trace, warn};

use crate::config::{FormatConfig, ReportConfig};
use crate::error::Result;
use crate::model::ExportFormat;
use crate::projector::ProjectionStyle;
use crate::projector::format::{NumberStyle, format_currency, format_fixed};
use crate::theme::{self, Rgb, StatusPalette};

use super::{EncodeJob, Encoder};
use canvas::{Align, Canvas, Font, Paint, Point, Size, TextStyle};
use charts::{ChartError, ChartSeriesPoint, ChartStyle, PROGRESS_HEIGHT};
use document::{DocumentInfo, PdfWriter};
use layout::{PageFlowController, PageGeometry};
use metrics::ReportMetrics;
use table::{HEADER_HEIGHT, ROW_HEIGHT, TableLayout};

const BANNER_HEIGHT: f64 = 78.0;
const SECTION_TITLE_HEIGHT: f64 = 26.0;
const SECTION_GAP: f64 = 12.0;
const KPI_HEIGHT: f64 = 54.0;
const KPI_GAP: f64 = 10.0;
const CHART_HEIGHT: f64 = 170.0;
const DONUT_BLOCK_HEIGHT: f64 = 170.0;
/// Baseline of the first status legend row
const LEGEND_TOP: f64 = 30.0;
const LEGEND_ROW: f64 = 16.0;
const LEGEND_PADDING: f64 = 10.0;
const MESSAGE_HEIGHT: f64 = 40.0;
const FOOTER_RULE: f64 = 10.0;
/// Room for the percentage printed right of a progress bar
const PROGRESS_VALUE_WIDTH: f64 = 50.0;

/// Where the report composer is in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportState {
    Header,
    SectionTitle,
    ContentBlock,
}

/// Pages produced by the layout phase, before serialization
#[derive(Debug)]
pub struct ReportLayout {
    pub pages: Vec<Canvas>,
    pub page_breaks: usize,
    pub header_repeats: usize,
}

/// Drives the flow controller through the report states
struct ReportComposer {
    flow: PageFlowController,
    state: ReportState,
}

impl ReportComposer {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            flow: PageFlowController::new(geometry),
            state: ReportState::Header,
        }
    }

    fn transition(&mut self, next: ReportState) {
        trace!("Report state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Section heading, kept on the same page as `first_block` points
    fn section(&mut self, title: &str, first_block: f64) {
        if self.state != ReportState::Header {
            self.flow.advance(SECTION_GAP);
        }
        self.flow.ensure_space(SECTION_TITLE_HEIGHT + first_block);

        let geometry = *self.flow.geometry();
        let mut block = Canvas::new();
        block.text(
            Point::new(geometry.margin, 16.0),
            title,
            TextStyle::new(Font::Bold, 12.0, theme::PRIMARY),
        );
        block.line(
            Point::new(geometry.margin, 21.0),
            Point::new(geometry.margin + geometry.content_width(), 21.0),
            Paint::stroke(theme::PRIMARY, 0.8),
        );
        self.flow.place(&block, SECTION_TITLE_HEIGHT);
        self.transition(ReportState::SectionTitle);
    }

    fn block(&mut self, block: &Canvas, height: f64) {
        self.flow.place(block, height);
        if self.state != ReportState::Header {
            self.transition(ReportState::ContentBlock);
        }
    }

    fn finish(self, organization: &str) -> ReportLayout {
        let geometry = *self.flow.geometry();
        let page_breaks = self.flow.page_breaks();
        let header_repeats = self.flow.header_repeats();
        let footer_style = TextStyle::new(Font::Regular, 7.0, theme::MUTED);

        let pages = self.flow.finalize(|page, total| {
            let mut footer = Canvas::new();
            let right = geometry.margin + geometry.content_width();
            footer.line(
                Point::new(geometry.margin, FOOTER_RULE),
                Point::new(right, FOOTER_RULE),
                Paint::stroke(theme::GRID, 0.5),
            );
            footer.text(
                Point::new(geometry.margin, FOOTER_RULE + 12.0),
                organization,
                footer_style,
            );
            footer.text(
                Point::new(right, FOOTER_RULE + 12.0),
                format!("Page {page} of {total}"),
                footer_style.aligned(Align::Right),
            );
            footer
        });

        ReportLayout {
            pages,
            page_breaks,
            header_repeats,
        }
    }
}

/// Month-over-month figure with one decimal, signed when positive
fn growth_label(growth: f64, numbers: NumberStyle) -> String {
    let value = format_fixed(growth, 1, numbers);
    let nonzero = value.chars().any(|c| c.is_ascii_digit() && c != '0');
    if growth > 0.0 && nonzero {
        format!("+{value}%")
    } else {
        format!("{value}%")
    }
}

/// Height of the status block, grown when the legend outruns the donut
fn status_block_height(legend_rows: usize) -> f64 {
    let legend = LEGEND_TOP + legend_rows.saturating_sub(1) as f64 * LEGEND_ROW + LEGEND_PADDING;
    legend.max(DONUT_BLOCK_HEIGHT)
}

/// Encoder for paginated PDF reports
#[derive(Debug, Clone)]
pub struct PdfEncoder {
    report: ReportConfig,
    geometry: PageGeometry,
    currency_symbol: String,
    date_format: String,
    numbers: NumberStyle,
    palette: StatusPalette,
    style: ChartStyle,
}

impl PdfEncoder {
    /// Create a new report encoder
    ///
    /// # Arguments
    /// * `report` - Page geometry, organization and aggregation bounds
    /// * `format` - Currency symbol, separators and date format
    /// * `palette` - Status colours
    pub fn new(report: &ReportConfig, format: &FormatConfig, palette: StatusPalette) -> Self {
        Self {
            report: report.clone(),
            geometry: PageGeometry::from_config(report),
            currency_symbol: format.currency_symbol.clone(),
            date_format: format.date_format.clone(),
            numbers: NumberStyle {
                thousands: Some(format.thousands_separator),
                decimal: format.decimal_separator,
            },
            palette,
            style: ChartStyle::default(),
        }
    }

    fn money(&self, value: f64) -> String {
        format_currency(value, &self.currency_symbol, self.numbers)
    }

    fn left(&self) -> f64 {
        self.geometry.margin
    }

    fn width(&self) -> f64 {
        self.geometry.content_width()
    }

    /// Lay out the report without serializing it
    pub fn layout(&self, job: &EncodeJob<'_>) -> ReportLayout {
        let metrics = metrics::aggregate(job.records, &self.report, &self.palette);
        let mut composer = ReportComposer::new(self.geometry);

        composer.block(&self.banner(job), BANNER_HEIGHT + SECTION_GAP);

        composer.section("Summary", KPI_HEIGHT);
        composer.block(&self.kpi_cards(&metrics), KPI_HEIGHT);

        let (volume, height) = self.volume_charts(&metrics);
        composer.section("Monthly volume", height);
        composer.block(&volume, height);

        let (status, height) = self.status_chart(&metrics);
        composer.section("Status distribution", height);
        composer.block(&status, height);

        let (collaborators, height) = self.collaborator_bars(&metrics);
        composer.section("Top collaborators", height);
        composer.block(&collaborators, height);

        let (efficiency, height) = self.efficiency_bars(&metrics);
        composer.section("Operational efficiency", height);
        composer.block(&efficiency, height);

        self.transactions(&mut composer, job);

        composer.finish(&self.report.organization)
    }

    fn banner(&self, job: &EncodeJob<'_>) -> Canvas {
        let (left, width) = (self.left(), self.width());
        let mut block = Canvas::new();
        block.rect(
            Point::new(left, 0.0),
            Size::new(width, BANNER_HEIGHT),
            Paint::fill(theme::PRIMARY),
        );

        let white = TextStyle::new(Font::Regular, 8.0, theme::WHITE);
        block.text(
            Point::new(left + 14.0, 18.0),
            self.report.organization.clone(),
            TextStyle::new(Font::Bold, 9.0, theme::BAND),
        );
        block.text(
            Point::new(left + 14.0, 42.0),
            job.config.display_title(),
            TextStyle::new(Font::Bold, 18.0, theme::WHITE),
        );
        let period = job
            .period_label(&self.date_format)
            .map(|p| format!("Period: {p}"))
            .unwrap_or_else(|| "Period: all dates".to_string());
        block.text(Point::new(left + 14.0, 62.0), period, white);
        block.text(
            Point::new(left + width - 14.0, 62.0),
            format!(
                "Generated {}",
                job.generated_at
                    .format(&format!("{} %H:%M UTC", self.date_format))
            ),
            white.aligned(Align::Right),
        );
        block
    }

    fn kpi_cards(&self, metrics: &ReportMetrics) -> Canvas {
        let growth_color = if metrics.growth < 0.0 {
            self.palette.color_for("error")
        } else {
            self.palette.color_for("completed")
        };
        let growth = growth_label(metrics.growth, self.numbers);
        let cards: [(&str, String, Rgb); 4] = [
            ("Total volume", self.money(metrics.total_volume), theme::TEXT),
            (
                "Transactions",
                format_fixed(metrics.transaction_count as f64, 0, self.numbers),
                theme::TEXT,
            ),
            ("Average ticket", self.money(metrics.average_ticket), theme::TEXT),
            (
                "Month-over-month",
                growth,
                growth_color,
            ),
        ];

        let card_width = (self.width() - KPI_GAP * (cards.len() - 1) as f64) / cards.len() as f64;
        let mut block = Canvas::new();
        for (i, (label, value, color)) in cards.into_iter().enumerate() {
            let x = self.left() + i as f64 * (card_width + KPI_GAP);
            block.rect(
                Point::new(x, 0.0),
                Size::new(card_width, KPI_HEIGHT),
                Paint::fill_and_stroke(theme::METADATA, theme::GRID, 0.5),
            );
            block.rect(
                Point::new(x, 0.0),
                Size::new(3.0, KPI_HEIGHT),
                Paint::fill(theme::series_color(i)),
            );
            block.text(
                Point::new(x + 10.0, 18.0),
                label,
                TextStyle::new(Font::Regular, 7.5, theme::MUTED),
            );
            block.text(
                Point::new(x + 10.0, 40.0),
                canvas::fit_text(&value, Font::Bold, 13.0, card_width - 16.0),
                TextStyle::new(Font::Bold, 13.0, color),
            );
        }
        block
    }

    /// Draw a chart into a scratch canvas, falling back to a placeholder
    fn chart<F>(&self, target: &mut Canvas, name: &str, series: &[ChartSeriesPoint], area: (Point, Size), draw: F)
    where
        F: FnOnce(&mut Canvas) -> std::result::Result<(), ChartError>,
    {
        let mut scratch = Canvas::new();
        match draw(&mut scratch) {
            Ok(()) => target.append_translated(&scratch, 0.0, 0.0),
            Err(e) => {
                warn!(chart = name, error = %e, series = ?series, "Chart replaced by placeholder");
                charts::empty_state(target, area.0, area.1, "Chart unavailable", &self.style);
            }
        }
    }

    /// Placeholder block for a section with nothing to draw
    fn message(&self, text: &str) -> (Canvas, f64) {
        let mut block = Canvas::new();
        charts::empty_state(
            &mut block,
            Point::new(self.left(), 0.0),
            Size::new(self.width(), MESSAGE_HEIGHT),
            text,
            &self.style,
        );
        (block, MESSAGE_HEIGHT)
    }

    fn volume_charts(&self, metrics: &ReportMetrics) -> (Canvas, f64) {
        if metrics.monthly.is_empty() {
            return self.message("No dated transactions");
        }
        let mut block = Canvas::new();

        let half = (self.width() - 20.0) / 2.0;
        let bar_area = (Point::new(self.left(), 0.0), Size::new(half, CHART_HEIGHT));
        let trend_area = (
            Point::new(self.left() + half + 20.0, 0.0),
            Size::new(half, CHART_HEIGHT),
        );

        self.chart(&mut block, "monthly_volume", &metrics.monthly, bar_area, |c| {
            charts::bar(c, bar_area.0, bar_area.1, &metrics.monthly, "Volume per month", &self.style)
        });
        self.chart(&mut block, "volume_trend", &metrics.monthly, trend_area, |c| {
            charts::trend_line(c, trend_area.0, trend_area.1, &metrics.monthly, "Trend", &self.style)
        });
        (block, CHART_HEIGHT)
    }

    fn status_chart(&self, metrics: &ReportMetrics) -> (Canvas, f64) {
        if metrics.status.is_empty() {
            return self.message("No transactions");
        }
        let mut block = Canvas::new();
        let height = status_block_height(metrics.status.len());

        let radius = 55.0;
        let center = Point::new(self.left() + 130.0, DONUT_BLOCK_HEIGHT / 2.0 + 8.0);
        let area = (
            Point::new(center.x - radius, center.y - radius),
            Size::new(2.0 * radius, 2.0 * radius),
        );
        self.chart(&mut block, "status_distribution", &metrics.status, area, |c| {
            charts::donut(c, center, radius, &metrics.status, "", &self.style)
        });

        let legend_x = self.left() + self.width() / 2.0 + 20.0;
        let total: f64 = metrics.status.iter().map(|p| p.value).sum();
        for (i, point) in metrics.status.iter().enumerate() {
            let y = LEGEND_TOP + i as f64 * LEGEND_ROW;
            let color = point.color.unwrap_or_else(|| theme::series_color(i));
            block.rect(Point::new(legend_x, y - 7.0), Size::new(8.0, 8.0), Paint::fill(color));
            let share = if total > 0.0 { point.value / total * 100.0 } else { 0.0 };
            block.text(
                Point::new(legend_x + 14.0, y),
                format!("{}: {} ({share:.1}%)", point.label, point.value as u64),
                TextStyle::new(Font::Regular, 8.0, theme::TEXT),
            );
        }
        (block, height)
    }

    fn progress_rows(&self, rows: &[(String, f64, Rgb)], empty_message: &str) -> (Canvas, f64) {
        if rows.is_empty() {
            return self.message(empty_message);
        }
        let mut block = Canvas::new();

        let width = self.width() - PROGRESS_VALUE_WIDTH;
        for (i, (label, pct, color)) in rows.iter().enumerate() {
            let origin = Point::new(self.left(), i as f64 * PROGRESS_HEIGHT);
            let mut scratch = Canvas::new();
            match charts::progress(&mut scratch, origin, width, *pct, label, *color, &self.style) {
                Ok(()) => block.append_translated(&scratch, 0.0, 0.0),
                Err(e) => {
                    warn!(chart = "progress", error = %e, label = %label, value = *pct, "Progress bar replaced by placeholder");
                    charts::empty_state(
                        &mut block,
                        origin,
                        Size::new(width, PROGRESS_HEIGHT),
                        "Chart unavailable",
                        &self.style,
                    );
                }
            }
        }
        (block, rows.len() as f64 * PROGRESS_HEIGHT)
    }

    fn collaborator_bars(&self, metrics: &ReportMetrics) -> (Canvas, f64) {
        let rows: Vec<(String, f64, Rgb)> = metrics
            .collaborators
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let share = if metrics.total_volume != 0.0 {
                    point.value / metrics.total_volume * 100.0
                } else {
                    0.0
                };
                (
                    format!("{} ({})", point.label, self.money(point.value)),
                    share,
                    theme::series_color(i),
                )
            })
            .collect();
        self.progress_rows(&rows, "No collaborator activity")
    }

    fn efficiency_bars(&self, metrics: &ReportMetrics) -> (Canvas, f64) {
        if metrics.transaction_count == 0 {
            return self.progress_rows(&[], "No transactions");
        }
        let rows = [
            (
                "Completed operations".to_string(),
                metrics.completion_rate,
                self.palette.color_for("completed"),
            ),
            (
                "In progress".to_string(),
                metrics.in_progress_rate,
                self.palette.color_for("pending"),
            ),
            (
                "Errors".to_string(),
                metrics.error_rate,
                self.palette.color_for("error"),
            ),
        ];
        self.progress_rows(&rows, "No transactions")
    }

    fn transactions(&self, composer: &mut ReportComposer, job: &EncodeJob<'_>) {
        let projection = job.plan(ProjectionStyle::Human);
        let table = TableLayout::plan(projection.columns(), self.left(), self.width());

        if job.records.is_empty() {
            let (block, height) = self.message("No transactions in this export");
            composer.section("Transactions", height);
            composer.block(&block, height);
            return;
        }

        let header_height = if job.config.include_headers { HEADER_HEIGHT } else { 0.0 };
        composer.section("Transactions", header_height + ROW_HEIGHT);
        if job.config.include_headers {
            composer
                .flow
                .begin_table(table.header_block(), HEADER_HEIGHT, ROW_HEIGHT);
        }
        for (i, record) in job.records.iter().enumerate() {
            let row = table.row_block(&projection.project_row(record), i, &self.palette);
            composer.block(&row, ROW_HEIGHT);
        }
        composer.flow.end_table();
    }
}

impl Encoder for PdfEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Vector
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<Vec<u8>> {
        let layout = self.layout(job);

        let mut writer = PdfWriter::new(self.geometry.width, self.geometry.height);
        for page in &layout.pages {
            writer.add_page(page);
        }
        let pages = writer.page_count();
        let bytes = writer.finish(&DocumentInfo {
            title: job.config.display_title(),
            author: self.report.organization.clone(),
            created_at: job.generated_at,
        });

        debug!(
            "Rendered PDF report: {} records, {} pages, {} header repeats ({} bytes)",
            job.records.len(),
            pages,
            layout.header_repeats,
            bytes.len()
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::writers::tests::{job_for, sample_records};
    use crate::model::{DomainRecord, ExportConfig};
    use canvas::DrawOp;
    use serde_json::json;

    fn encoder() -> PdfEncoder {
        PdfEncoder::new(
            &ReportConfig::default(),
            &FormatConfig::default(),
            StatusPalette::default(),
        )
    }

    fn config() -> ExportConfig {
        ExportConfig::new(
            ExportFormat::Vector,
            ["id", "date", "client", "collaborator", "amount", "status"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
        )
    }

    fn texts(pages: &[Canvas]) -> Vec<String> {
        pages
            .iter()
            .flat_map(|page| page.ops())
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn many_records(count: usize) -> Vec<DomainRecord> {
        let samples = sample_records();
        (0..count)
            .map(|i| {
                let mut record = samples[i % samples.len()].clone();
                record.insert("id".into(), json!(format!("TX-{i:04}")));
                record
            })
            .collect()
    }

    #[test]
    fn test_pdf_header_and_trailer() {
        let records = sample_records();
        let config = config();
        let bytes = encoder().encode(&job_for(&config, &records)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_pdf_is_deterministic() {
        let records = sample_records();
        let config = config();
        let first = encoder().encode(&job_for(&config, &records)).unwrap();
        let second = encoder().encode(&job_for(&config, &records)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_report_sections_and_footer() {
        let records = sample_records();
        let config = config();
        let layout = encoder().layout(&job_for(&config, &records));
        let texts = texts(&layout.pages);
        for expected in [
            "Exchange Back Office",
            "Transactions Report",
            "Summary",
            "Monthly volume",
            "Status distribution",
            "Top collaborators",
            "Operational efficiency",
            "$5,320.50",
            "TX-001",
        ] {
            assert!(texts.iter().any(|t| t == expected), "missing {expected}");
        }
        let total = layout.pages.len();
        assert!(texts.contains(&format!("Page {total} of {total}")));
    }

    #[test]
    fn test_long_table_repeats_header_on_each_new_page() {
        let records = many_records(120);
        let config = config();
        let layout = encoder().layout(&job_for(&config, &records));

        assert!(layout.pages.len() >= 3);
        assert!(layout.header_repeats >= 1);
        let header_count = texts(&layout.pages).iter().filter(|t| *t == "Client").count();
        assert_eq!(header_count, 1 + layout.header_repeats);

        for (i, page) in layout.pages.iter().enumerate() {
            let footer = format!("Page {} of {}", i + 1, layout.pages.len());
            assert!(texts(std::slice::from_ref(page)).contains(&footer));
        }
    }

    #[test]
    fn test_table_without_headers_never_repeats() {
        let records = many_records(120);
        let mut config = config();
        config.include_headers = false;
        let layout = encoder().layout(&job_for(&config, &records));
        assert_eq!(layout.header_repeats, 0);
        assert!(!texts(&layout.pages).contains(&"Client".to_string()));
    }

    #[test]
    fn test_empty_dataset_renders_placeholders() {
        let config = config();
        let layout = encoder().layout(&job_for(&config, &[]));
        assert_eq!(layout.pages.len(), 1);
        let texts = texts(&layout.pages);
        assert!(texts.contains(&"No transactions in this export".to_string()));
        assert!(texts.contains(&"No dated transactions".to_string()));
        assert!(texts.contains(&"Page 1 of 1".to_string()));
    }

    #[test]
    fn test_malformed_series_falls_back_to_placeholder() {
        let records: Vec<DomainRecord> = [json!({
            "id": "TX-9", "date": "2024-03-02", "collaborator": "Lucia",
            "amount": -50.0, "status": "cancelled"
        })]
        .iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();
        let config = config();
        let layout = encoder().layout(&job_for(&config, &records));
        let texts = texts(&layout.pages);
        assert!(texts.contains(&"Chart unavailable".to_string()));
        assert!(texts.contains(&"TX-9".to_string()));
    }

    fn metrics_with_statuses(count: usize) -> ReportMetrics {
        ReportMetrics {
            total_volume: 0.0,
            transaction_count: count,
            average_ticket: 0.0,
            growth: 0.0,
            monthly: Vec::new(),
            status: (0..count)
                .map(|i| ChartSeriesPoint::new(format!("state-{i:02}"), 1.0))
                .collect(),
            collaborators: Vec::new(),
            completion_rate: 0.0,
            in_progress_rate: 0.0,
            error_rate: 0.0,
        }
    }

    #[test]
    fn test_status_legend_stays_inside_block() {
        assert_eq!(status_block_height(3), DONUT_BLOCK_HEIGHT);

        let (block, height) = encoder().status_chart(&metrics_with_statuses(12));
        assert!(height > DONUT_BLOCK_HEIGHT);
        assert_eq!(height, status_block_height(12));
        for op in block.ops() {
            if let DrawOp::Text { at, text, .. } = op {
                assert!(at.y < height, "{text} at {} overflows {height}", at.y);
            }
        }
    }

    #[test]
    fn test_growth_label_keeps_one_decimal() {
        let numbers = NumberStyle::default();
        assert_eq!(growth_label(50.0, numbers), "+50.0%");
        assert_eq!(growth_label(-12.34, numbers), "-12.3%");
        assert_eq!(growth_label(0.0, numbers), "0.0%");
        assert_eq!(growth_label(0.01, numbers), "0.0%");
    }

    #[test]
    fn test_non_finite_progress_draws_placeholder() {
        let rows = vec![
            ("Completed".to_string(), 80.0, theme::PRIMARY),
            ("Broken".to_string(), f64::NAN, theme::PRIMARY),
        ];
        let (block, height) = encoder().progress_rows(&rows, "No data");
        assert_eq!(height, 2.0 * PROGRESS_HEIGHT);
        let texts = texts(std::slice::from_ref(&block));
        assert!(texts.contains(&"Completed".to_string()));
        assert!(texts.contains(&"Chart unavailable".to_string()));
        assert!(!texts.contains(&"Broken".to_string()));
    }
}
