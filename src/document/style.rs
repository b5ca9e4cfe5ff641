use super::{CONTENT_WIDTH, Color, Document, Font, MARGIN, PAGE_HEIGHT, metrics};

pub const DEFAULT_FONT_SIZE: f32 = 14.0;

const TABLE_FONT_SIZE: f32 = 12.0;
const CELL_PADDING: f32 = 5.0;

/// Options for one `styled_text` call. Anything left unset falls back to its
/// default, never to whatever an earlier call used.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub bold: bool,
    pub fill_color: Color,
    pub font_size: f32,
    pub move_down: f32,
    pub link: Option<url::Url>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            bold: false,
            fill_color: Color::BLACK,
            font_size: DEFAULT_FONT_SIZE,
            move_down: 0.0,
            link: None,
        }
    }
}

impl TextOptions {
    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn fill_color(mut self, color: Color) -> Self {
        self.fill_color = color;
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn move_down(mut self, lines: f32) -> Self {
        self.move_down = lines;
        self
    }

    pub fn link(mut self, link: url::Url) -> Self {
        self.link = Some(link);
        self
    }
}

pub fn styled_text(doc: &mut Document, text: &str, options: &TextOptions) {
    doc.font(if options.bold { Font::Bold } else { Font::Regular })
        .font_size(options.font_size)
        .fill_color(options.fill_color)
        .text(text, options.link.as_ref());
    if options.move_down > 0.0 {
        doc.move_down(options.move_down);
    }
}

pub fn reset_style(doc: &mut Document) {
    doc.font(Font::Regular)
        .font_size(DEFAULT_FONT_SIZE)
        .fill_color(Color::BLACK);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column<'a> {
    pub label: &'a str,
    pub width: f32,
}

/// Draws a header row and `rows` below the cursor. Rows that fit on a page
/// are kept on a single page; odd rows are shaded and rules separate all rows.
pub fn table<const N: usize>(doc: &mut Document, columns: &[Column<'_>; N], rows: &[[String; N]]) {
    let total_width = columns
        .iter()
        .map(|column| column.width)
        .sum::<f32>()
        .min(CONTENT_WIDTH);
    let labels = columns.map(|column| column.label.to_owned());
    draw_row(doc, columns, &labels, Font::Bold, None, total_width);
    for (index, row) in rows.iter().enumerate() {
        let shade = (index % 2 == 1).then_some(Color::STRIPE);
        draw_row(doc, columns, row, Font::Regular, shade, total_width);
    }
    doc.font(Font::Regular).fill_color(Color::BLACK);
}

/// Draws one row. A row that fits on a page is never split; a row taller
/// than a whole page fills the current page and continues on the next, with
/// its shading repeated on every segment.
fn draw_row<const N: usize>(
    doc: &mut Document,
    columns: &[Column<'_>; N],
    cells: &[String; N],
    font: Font,
    shade: Option<Color>,
    total_width: f32,
) {
    doc.font(font).font_size(TABLE_FONT_SIZE).fill_color(Color::BLACK);
    let line_height = doc.line_height();
    let wrapped = columns
        .iter()
        .zip(cells)
        .map(|(column, cell)| {
            metrics::wrap(
                cell,
                font,
                TABLE_FONT_SIZE,
                (column.width - 2.0 * CELL_PADDING).max(1.0),
            )
        })
        .collect::<Vec<_>>();
    let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let segment_height = |count: usize| count as f32 * line_height + 2.0 * CELL_PADDING;
    let page_capacity =
        (((PAGE_HEIGHT - 2.0 * MARGIN - 2.0 * CELL_PADDING) / line_height).floor() as usize).max(1);

    let mut first = 0;
    while first < lines {
        let remaining = lines - first;
        let count = if remaining <= page_capacity {
            doc.ensure_space(segment_height(remaining));
            remaining
        } else {
            let fits = ((doc.remaining_height() - 2.0 * CELL_PADDING) / line_height).floor();
            if fits < 1.0 {
                doc.add_page();
                continue;
            }
            fits as usize
        };
        draw_segment(doc, columns, &wrapped, first..first + count, shade, total_width);
        first += count;
        if first < lines {
            doc.add_page();
        }
    }
}

fn draw_segment<const N: usize>(
    doc: &mut Document,
    columns: &[Column<'_>; N],
    wrapped: &[Vec<String>],
    range: std::ops::Range<usize>,
    shade: Option<Color>,
    total_width: f32,
) {
    let line_height = doc.line_height();
    let height = range.len() as f32 * line_height + 2.0 * CELL_PADDING;
    let top = doc.cursor_y();
    if let Some(shade) = shade {
        doc.fill_rect(MARGIN, top, total_width, height, shade);
    }
    let mut x = MARGIN;
    for (column, cell_lines) in columns.iter().zip(wrapped) {
        let end = range.end.min(cell_lines.len());
        let visible = cell_lines.get(range.start..end).unwrap_or_default();
        for (offset, line) in visible.iter().enumerate() {
            let line_top = top + CELL_PADDING + offset as f32 * line_height;
            doc.text_at(x + CELL_PADDING, line_top, line);
        }
        x += column.width;
    }
    doc.rule(MARGIN, top + height, total_width, 0.5, Color::RULE);
    doc.advance(height);
}
