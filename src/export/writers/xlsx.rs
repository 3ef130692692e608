//! Workbook encoder
//!
//! Builds a single styled worksheet with `rust_xlsxwriter`:
//! - optional title banner merged across the used columns
//! - optional metadata block (generated at, row count, period)
//! - header row with its own fill and font
//! - banded data rows with per-type number formats
//! - status cells coloured per status value
//! - column widths, autofilter over header + data, frozen header
//!
//! Row positions come from [`SheetLayout`], a pure plan that can be checked
//! without reading the XLSX back.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_xlsxwriter::{
    Color, DocProperties, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError,
};
use tracing::debug;

use crate::config::WorkbookConfig;
use crate::error::{ExportError, Result};
use crate::model::ExportFormat;
use crate::projector::{Cell, Column, FieldFormatter, ProjectionStyle};
use crate::theme::{self, Rgb, StatusPalette};

use super::{EncodeJob, Encoder};

const TITLE_ROW_HEIGHT: f64 = 26.0;
const HEADER_ROW_HEIGHT: f64 = 20.0;
const DATE_NUM_FORMAT: &str = "dd/mm/yyyy";

/// Row plan of the worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    /// Row of the merged title banner
    pub title_row: Option<u32>,
    /// First row of the metadata block
    pub metadata_row: Option<u32>,
    /// Row of the column headers
    pub header_row: Option<u32>,
    /// First data row
    pub first_data_row: u32,
    /// Number of data rows
    pub data_rows: u32,
    /// Index of the last used column
    pub last_col: u16,
}

/// Number of lines in the metadata block
const METADATA_LINES: u32 = 3;

impl SheetLayout {
    /// Plan rows for a sheet
    ///
    /// # Arguments
    /// * `title` - Whether a title banner is drawn
    /// * `metadata` - Whether the metadata block is drawn
    /// * `headers` - Whether a header row is drawn
    /// * `rows` - Number of data rows
    /// * `columns` - Number of columns (at least one)
    pub fn plan(title: bool, metadata: bool, headers: bool, rows: usize, columns: usize) -> Self {
        let mut next = 0u32;

        let title_row = title.then(|| {
            let row = next;
            next += 1;
            row
        });

        let metadata_row = metadata.then(|| {
            let row = next;
            next += METADATA_LINES + 1; // blank spacer after the block
            row
        });

        if title_row.is_some() && metadata_row.is_none() {
            next += 1;
        }

        let header_row = headers.then(|| {
            let row = next;
            next += 1;
            row
        });

        Self {
            title_row,
            metadata_row,
            header_row,
            first_data_row: next,
            data_rows: rows as u32,
            last_col: columns.saturating_sub(1) as u16,
        }
    }

    /// Last row holding data, if any
    pub fn last_data_row(&self) -> Option<u32> {
        (self.data_rows > 0).then(|| self.first_data_row + self.data_rows - 1)
    }

    /// `(first_row, first_col, last_row, last_col)` of the autofilter
    pub fn autofilter_range(&self) -> Option<(u32, u16, u32, u16)> {
        let header = self.header_row?;
        let last_row = self.last_data_row().unwrap_or(header);
        Some((header, 0, last_row, self.last_col))
    }

    /// `(row, col)` anchor of the frozen panes, just below the header
    pub fn freeze_at(&self) -> Option<(u32, u16)> {
        self.header_row.map(|row| (row + 1, 0))
    }
}

/// Cell formats used by one workbook
struct SheetFormats {
    title: Format,
    meta_label: Format,
    meta_value: Format,
    header: Format,
    currency_symbol: String,
}

impl SheetFormats {
    fn new(currency_symbol: &str) -> Self {
        let primary = Color::RGB(theme::PRIMARY.to_u32());
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(16)
                .set_font_color(Color::White)
                .set_background_color(primary)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            meta_label: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(theme::METADATA.to_u32())),
            meta_value: Format::new().set_background_color(Color::RGB(theme::METADATA.to_u32())),
            header: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(primary)
                .set_border(FormatBorder::Thin)
                .set_border_color(Color::RGB(theme::GRID.to_u32()))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            currency_symbol: currency_symbol.to_string(),
        }
    }

    /// Number format string for a formatter, if it needs one
    fn num_format(&self, formatter: FieldFormatter) -> Option<String> {
        match formatter {
            FieldFormatter::Currency => Some(format!("\"{}\"#,##0.00", self.currency_symbol)),
            FieldFormatter::Percentage => Some("0.00\"%\"".to_string()),
            FieldFormatter::Integer => Some("#,##0".to_string()),
            FieldFormatter::Number => Some("#,##0.####".to_string()),
            FieldFormatter::Date => Some(DATE_NUM_FORMAT.to_string()),
            _ => None,
        }
    }

    /// Look of a data cell on a banded or plain row
    fn cell_style(
        &self,
        formatter: FieldFormatter,
        cell: &Cell,
        banded: bool,
        palette: &StatusPalette,
    ) -> CellStyle {
        let font_color = match (formatter, cell) {
            (FieldFormatter::Status, Cell::Text(status)) => Some(palette.color_for(status)),
            _ => None,
        };
        CellStyle {
            num_format: self.num_format(formatter),
            font_color,
            bold: font_color.is_some(),
            banded,
            align_right: formatter.is_numeric(),
        }
    }
}

/// Resolved look of one data cell, before it becomes a [`Format`]
#[derive(Debug, Clone, PartialEq)]
struct CellStyle {
    num_format: Option<String>,
    font_color: Option<Rgb>,
    bold: bool,
    banded: bool,
    align_right: bool,
}

impl CellStyle {
    fn to_format(&self) -> Format {
        let mut format = Format::new()
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::RGB(theme::GRID.to_u32()));
        if self.banded {
            format = format.set_background_color(Color::RGB(theme::BAND.to_u32()));
        }
        if let Some(num) = &self.num_format {
            format = format.set_num_format(num);
        }
        if self.align_right {
            format = format.set_align(FormatAlign::Right);
        }
        if self.bold {
            format = format.set_bold();
        }
        if let Some(color) = self.font_color {
            format = format.set_font_color(Color::RGB(color.to_u32()));
        }
        format
    }
}

/// Encoder for XLSX workbooks
#[derive(Debug, Clone)]
pub struct XlsxEncoder {
    sheet_name: String,
    default_width: f64,
    widths: BTreeMap<String, f64>,
    currency_symbol: String,
    date_format: String,
    palette: StatusPalette,
}

impl XlsxEncoder {
    /// Create a workbook encoder
    ///
    /// # Arguments
    /// * `options` - Sheet name and column width table
    /// * `currency_symbol` - Symbol used in currency number formats
    /// * `date_format` - chrono format for dates in the metadata block
    /// * `palette` - Status colours
    pub fn new(
        options: &WorkbookConfig,
        currency_symbol: &str,
        date_format: &str,
        palette: StatusPalette,
    ) -> Self {
        Self {
            sheet_name: options.sheet_name.clone(),
            default_width: options.default_column_width,
            widths: options.column_widths.clone(),
            currency_symbol: currency_symbol.to_string(),
            date_format: date_format.to_string(),
            palette,
        }
    }

    /// Width of a column: descriptor override, then width table, then default
    pub fn column_width(&self, column: &Column) -> f64 {
        column
            .descriptor
            .width
            .or_else(|| self.widths.get(&column.key).copied())
            .unwrap_or(self.default_width)
    }

    fn build(&self, job: &EncodeJob<'_>) -> std::result::Result<Vec<u8>, XlsxError> {
        let projection = job.plan(ProjectionStyle::Structured);
        let columns = projection.columns();
        let with_title = job.config.title.is_some() || job.config.include_metadata;
        let layout = SheetLayout::plan(
            with_title,
            job.config.include_metadata,
            job.config.include_headers,
            job.records.len(),
            columns.len(),
        );
        let formats = SheetFormats::new(&self.currency_symbol);

        let mut workbook = Workbook::new();
        let properties = DocProperties::new()
            .set_title(job.config.display_title())
            .set_subject(job.config.data_type.as_str());
        workbook.set_properties(&properties);

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (col, column) in columns.iter().enumerate() {
            worksheet.set_column_width(col as u16, self.column_width(column))?;
        }

        if let Some(row) = layout.title_row {
            let title = job.config.display_title();
            worksheet.set_row_height(row, TITLE_ROW_HEIGHT)?;
            if layout.last_col > 0 {
                worksheet.merge_range(row, 0, row, layout.last_col, &title, &formats.title)?;
            } else {
                worksheet.write_string_with_format(row, 0, &title, &formats.title)?;
            }
        }

        if let Some(row) = layout.metadata_row {
            let period = job
                .period_label(&self.date_format)
                .unwrap_or_else(|| "All dates".to_string());
            let lines = [
                (
                    "Generated at",
                    job.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                ),
                ("Rows", job.records.len().to_string()),
                ("Period", period),
            ];
            for (offset, (label, value)) in lines.iter().enumerate() {
                let r = row + offset as u32;
                worksheet.write_string_with_format(r, 0, *label, &formats.meta_label)?;
                worksheet.write_string_with_format(r, 1, value, &formats.meta_value)?;
            }
        }

        if let Some(row) = layout.header_row {
            worksheet.set_row_height(row, HEADER_ROW_HEIGHT)?;
            for (col, column) in columns.iter().enumerate() {
                worksheet.write_string_with_format(row, col as u16, &column.label, &formats.header)?;
            }
        }

        for (index, record) in job.records.iter().enumerate() {
            let row = layout.first_data_row + index as u32;
            let banded = index % 2 == 1;
            let cells = projection.project_row(record);

            for (col, (column, cell)) in columns.iter().zip(cells.iter()).enumerate() {
                let format = formats
                    .cell_style(column.formatter, cell, banded, &self.palette)
                    .to_format();
                self.write_cell(worksheet, row, col as u16, column.formatter, cell, &format)?;
            }
        }

        if let Some((first_row, first_col, last_row, last_col)) = layout.autofilter_range() {
            worksheet.autofilter(first_row, first_col, last_row, last_col)?;
        }
        if let Some((row, col)) = layout.freeze_at() {
            worksheet.set_freeze_panes(row, col)?;
        }

        workbook.save_to_buffer()
    }

    fn write_cell(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        formatter: FieldFormatter,
        cell: &Cell,
        base: &Format,
    ) -> std::result::Result<(), XlsxError> {
        match (formatter, cell) {
            (FieldFormatter::Date, Cell::Text(text)) => match excel_serial(text) {
                Some(serial) => {
                    worksheet.write_number_with_format(row, col, serial, base)?;
                }
                None => {
                    worksheet.write_string_with_format(row, col, text, base)?;
                }
            },
            (_, Cell::Number(n)) => {
                worksheet.write_number_with_format(row, col, *n, base)?;
            }
            (_, Cell::Bool(b)) => {
                worksheet.write_boolean_with_format(row, col, *b, base)?;
            }
            (_, Cell::Text(text)) => {
                worksheet.write_string_with_format(row, col, text, base)?;
            }
        }
        Ok(())
    }
}

impl Default for XlsxEncoder {
    fn default() -> Self {
        Self::new(&WorkbookConfig::default(), "$", "%d/%m/%Y", StatusPalette::default())
    }
}

/// Excel serial day number of an ISO date (days since 1899-12-30)
fn excel_serial(iso: &str) -> Option<f64> {
    let date = NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()?;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    Some((date - epoch).num_days() as f64)
}

impl Encoder for XlsxEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Workbook
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<Vec<u8>> {
        let bytes = self
            .build(job)
            .map_err(|e| ExportError::encode_failed("xlsx", e))?;
        debug!(
            "Encoded {} rows as workbook ({} bytes)",
            job.records.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::writers::tests::{job_for, sample_records};
    use crate::model::{ExportConfig, FieldCatalog};
    use crate::projector::FieldProjector;

    #[test]
    fn test_layout_full() {
        let layout = SheetLayout::plan(true, true, true, 10, 4);
        assert_eq!(layout.title_row, Some(0));
        assert_eq!(layout.metadata_row, Some(1));
        assert_eq!(layout.header_row, Some(5));
        assert_eq!(layout.first_data_row, 6);
        assert_eq!(layout.last_data_row(), Some(15));
        assert_eq!(layout.autofilter_range(), Some((5, 0, 15, 3)));
        assert_eq!(layout.freeze_at(), Some((6, 0)));
    }

    #[test]
    fn test_layout_bare() {
        let layout = SheetLayout::plan(false, false, true, 3, 2);
        assert_eq!(layout.header_row, Some(0));
        assert_eq!(layout.first_data_row, 1);
        assert_eq!(layout.freeze_at(), Some((1, 0)));
        assert_eq!(layout.autofilter_range(), Some((0, 0, 3, 1)));
    }

    #[test]
    fn test_layout_without_headers_has_no_filter() {
        let layout = SheetLayout::plan(true, false, false, 3, 2);
        assert_eq!(layout.first_data_row, 2);
        assert_eq!(layout.autofilter_range(), None);
        assert_eq!(layout.freeze_at(), None);
    }

    #[test]
    fn test_layout_empty_data_filters_header_only() {
        let layout = SheetLayout::plan(false, false, true, 0, 3);
        assert_eq!(layout.last_data_row(), None);
        assert_eq!(layout.autofilter_range(), Some((0, 0, 0, 2)));
    }

    #[test]
    fn test_column_widths_follow_table() {
        let encoder = XlsxEncoder::default();
        let plan = FieldProjector::default().plan(
            &["client".to_string(), "unknown".to_string()],
            &FieldCatalog::transactions(),
            ProjectionStyle::Structured,
        );
        assert_eq!(encoder.column_width(&plan.columns()[0]), 28.0);
        assert_eq!(encoder.column_width(&plan.columns()[1]), 15.0);
    }

    #[test]
    fn test_status_cells_take_palette_colors() {
        let formats = SheetFormats::new("$");
        let palette = StatusPalette::default();
        let status = |s: &str| {
            formats.cell_style(FieldFormatter::Status, &Cell::Text(s.into()), false, &palette)
        };

        let completed = status("completed");
        let error = status("error");
        assert!(completed.bold);
        assert_eq!(completed.font_color, Some(palette.color_for("completed")));
        assert_eq!(error.font_color, Some(palette.color_for("error")));
        assert_ne!(completed.font_color, error.font_color);

        let text = formats.cell_style(FieldFormatter::Text, &Cell::Text("x".into()), true, &palette);
        assert_eq!(text.font_color, None);
        assert!(!text.bold);
        assert!(text.banded);
    }

    #[test]
    fn test_numeric_cells_take_number_formats() {
        let formats = SheetFormats::new("€");
        let palette = StatusPalette::default();
        let num_format = |formatter| {
            formats
                .cell_style(formatter, &Cell::Number(1234.5), false, &palette)
                .num_format
        };
        assert_eq!(num_format(FieldFormatter::Currency).as_deref(), Some("\"€\"#,##0.00"));
        assert_eq!(num_format(FieldFormatter::Percentage).as_deref(), Some("0.00\"%\""));
        assert_eq!(num_format(FieldFormatter::Integer).as_deref(), Some("#,##0"));
        assert_eq!(num_format(FieldFormatter::Date).as_deref(), Some(DATE_NUM_FORMAT));
        assert_eq!(num_format(FieldFormatter::Text), None);

        let amount = formats.cell_style(FieldFormatter::Currency, &Cell::Number(1.0), false, &palette);
        assert!(amount.align_right);
    }

    #[test]
    fn test_columns_follow_requested_field_order() {
        let records = sample_records();
        let fields: Vec<String> = ["status", "amount", "id", "date"]
            .iter()
            .map(|f| f.to_string())
            .collect();
        let config = ExportConfig::new(ExportFormat::Workbook, fields.clone());
        let job = job_for(&config, &records);
        let projection = job.plan(ProjectionStyle::Structured);
        let keys: Vec<&str> = projection.columns().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, fields);

        let formatters: Vec<FieldFormatter> =
            projection.columns().iter().map(|c| c.formatter).collect();
        assert_eq!(
            formatters,
            vec![
                FieldFormatter::Status,
                FieldFormatter::Currency,
                FieldFormatter::Text,
                FieldFormatter::Date
            ]
        );
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(excel_serial("1900-01-01"), Some(2.0));
        assert_eq!(excel_serial("2024-01-15"), Some(45306.0));
        assert_eq!(excel_serial("not a date"), None);
    }

    #[test]
    fn test_encode_produces_zip() {
        let records = sample_records();
        let mut config = ExportConfig::new(
            ExportFormat::Workbook,
            vec!["id".into(), "date".into(), "amount".into(), "status".into()],
        );
        config.include_metadata = true;
        let bytes = XlsxEncoder::default()
            .encode(&job_for(&config, &records))
            .unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_encode_single_column_title() {
        let mut config = ExportConfig::new(ExportFormat::Workbook, vec!["id".into()]);
        config.title = Some("Daily".into());
        let bytes = XlsxEncoder::default().encode(&job_for(&config, &[])).unwrap();
        assert!(!bytes.is_empty());
    }
}
