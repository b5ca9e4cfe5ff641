//! A single-owner PDF drawing cursor.
//!
//! `Document` keeps the current page, the current text style and a vertical
//! cursor. Every layout helper takes it by `&mut`, and `write_to` consumes it,
//! so a document is closed exactly once and cannot be shared between renders.

use std::path::Path;

use image::GenericImageView as _;
use lopdf::{
    Dictionary, Object, ObjectId, Stream, StringFormat,
    content::{Content, Operation},
    dictionary,
};
use tokio::io::AsyncWriteExt as _;

pub mod metrics;
pub mod style;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 72.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const LINE_HEIGHT: f32 = 1.156;
const ASCENT: f32 = 0.718;
const MAX_IMAGE_EDGE: u32 = 1600;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to decode image: {0}")]
    DecodeImage(image::ImageError),
    #[error("failed to serialize PDF: {0}")]
    Serialize(String),
    #[error("failed to write PDF: {0}")]
    Write(std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0x00, 0x00, 0x00);
    pub const BLUE: Self = Self::rgb(0x00, 0x00, 0xff);
    pub const ACCENT: Self = Self::rgb(0xe8, 0x9b, 0x47);
    pub const RULE: Self = Self::rgb(0x80, 0x80, 0x80);
    /// 5% grey over white.
    pub const STRIPE: Self = Self::rgb(0xf9, 0xf9, 0xf9);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    fn operands(self) -> Vec<Object> {
        vec![self.r.into(), self.g.into(), self.b.into()]
    }
}

/// Style applied to the next text run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextState {
    pub font: Font,
    pub size: f32,
    pub color: Color,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Font::Regular,
            size: style::DEFAULT_FONT_SIZE,
            color: Color::BLACK,
        }
    }
}

#[derive(Default)]
struct Page {
    operations: Vec<Operation>,
    annotations: Vec<ObjectId>,
}

pub struct Document {
    pdf: lopdf::Document,
    title: String,
    pages_id: ObjectId,
    resources_id: ObjectId,
    finished: Vec<Page>,
    page: Page,
    xobjects: Dictionary,
    y: f32,
    state: TextState,
}

/// Latin-1 subset of WinAnsiEncoding; anything else becomes `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u8,
            0x2018 | 0x2019 => b'\'',
            0x201c | 0x201d => b'"',
            0x2013 | 0x2014 => b'-',
            0x09 => b' ',
            _ => b'?',
        })
        .collect()
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        let mut pdf = lopdf::Document::with_version("1.5");
        let pages_id = pdf.new_object_id();
        let resources_id = pdf.new_object_id();
        Self {
            pdf,
            title: title.into(),
            pages_id,
            resources_id,
            finished: Vec::new(),
            page: Page::default(),
            xobjects: Dictionary::new(),
            y: MARGIN,
            state: TextState::default(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.finished.len() + 1
    }

    /// Distance of the cursor from the top edge of the current page.
    pub fn cursor_y(&self) -> f32 {
        self.y
    }

    pub fn text_state(&self) -> TextState {
        self.state
    }

    pub fn font(&mut self, font: Font) -> &mut Self {
        self.state.font = font;
        self
    }

    pub fn font_size(&mut self, size: f32) -> &mut Self {
        self.state.size = size;
        self
    }

    pub fn fill_color(&mut self, color: Color) -> &mut Self {
        self.state.color = color;
        self
    }

    pub fn line_height(&self) -> f32 {
        self.state.size * LINE_HEIGHT
    }

    /// Moves the cursor down by `lines` lines of the current font size.
    pub fn move_down(&mut self, lines: f32) -> &mut Self {
        self.y += lines * self.line_height();
        self
    }

    pub(crate) fn advance(&mut self, height: f32) {
        self.y += height;
    }

    pub fn add_page(&mut self) -> &mut Self {
        let page = std::mem::take(&mut self.page);
        self.finished.push(page);
        self.y = MARGIN;
        self
    }

    /// Space left between the cursor and the bottom margin.
    pub(crate) fn remaining_height(&self) -> f32 {
        PAGE_HEIGHT - MARGIN - self.y
    }

    /// Starts a new page unless `height` still fits below the cursor. A
    /// page that is still empty at the top is never skipped.
    pub(crate) fn ensure_space(&mut self, height: f32) {
        if self.y + height > PAGE_HEIGHT - MARGIN && self.y > MARGIN {
            self.add_page();
        }
    }

    /// Draws wrapped text at the left margin and moves the cursor below it.
    pub fn text(&mut self, text: &str, link: Option<&url::Url>) -> &mut Self {
        let TextState { font, size, .. } = self.state;
        let line_height = self.line_height();
        for line in metrics::wrap(text, font, size, CONTENT_WIDTH) {
            self.ensure_space(line_height);
            self.text_at(MARGIN, self.y, &line);
            if let Some(link) = link {
                let width = metrics::text_width(&line, font, size);
                self.link(MARGIN, self.y, width, line_height, link);
            }
            self.y += line_height;
        }
        self
    }

    /// Draws one line of text with its top edge at `top`. The cursor is left untouched.
    pub fn text_at(&mut self, x: f32, top: f32, line: &str) {
        let TextState { font, size, color } = self.state;
        let baseline = PAGE_HEIGHT - (top + size * ASCENT);
        let ops = &mut self.page.operations;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![font.resource_name().into(), size.into()],
        ));
        ops.push(Operation::new("rg", color.operands()));
        ops.push(Operation::new("Td", vec![x.into(), baseline.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(line), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    pub fn fill_rect(&mut self, x: f32, top: f32, width: f32, height: f32, color: Color) {
        let ops = &mut self.page.operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("rg", color.operands()));
        ops.push(Operation::new(
            "re",
            vec![
                x.into(),
                (PAGE_HEIGHT - top - height).into(),
                width.into(),
                height.into(),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Horizontal rule at distance `top` from the top edge.
    pub fn rule(&mut self, x: f32, top: f32, width: f32, thickness: f32, color: Color) {
        let y = PAGE_HEIGHT - top;
        let ops = &mut self.page.operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("RG", color.operands()));
        ops.push(Operation::new("w", vec![thickness.into()]));
        ops.push(Operation::new("m", vec![x.into(), y.into()]));
        ops.push(Operation::new("l", vec![(x + width).into(), y.into()]));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Adds a clickable URI area. Coordinates are top-left based.
    pub fn link(&mut self, x: f32, top: f32, width: f32, height: f32, target: &url::Url) {
        let action = dictionary! {
            "S" => "URI",
            "URI" => Object::String(target.as_str().as_bytes().to_vec(), StringFormat::Literal),
        };
        let rect: Vec<Object> = vec![
            x.into(),
            (PAGE_HEIGHT - top - height).into(),
            (x + width).into(),
            (PAGE_HEIGHT - top).into(),
        ];
        let annotation = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect,
            "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
            "A" => action,
        };
        let id = self.pdf.add_object(annotation);
        self.page.annotations.push(id);
    }

    /// Draws a raster image `height` points high at the left margin, scaled
    /// down further if it would not fit the content width. Moves the cursor
    /// below the image.
    pub fn image(
        &mut self,
        body: &[u8],
        format: image::ImageFormat,
        height: f32,
        link: Option<&url::Url>,
    ) -> Result<&mut Self, Error> {
        let mut decoded =
            image::load_from_memory_with_format(body, format).map_err(Error::DecodeImage)?;
        let (width_px, height_px) = decoded.dimensions();
        let (width_px, height_px) = (width_px.max(1), height_px.max(1));
        let mut draw_height = height.min(PAGE_HEIGHT - 2.0 * MARGIN);
        let mut draw_width = draw_height * width_px as f32 / height_px as f32;
        if draw_width > CONTENT_WIDTH {
            draw_height *= CONTENT_WIDTH / draw_width;
            draw_width = CONTENT_WIDTH;
        }
        if width_px > MAX_IMAGE_EDGE || height_px > MAX_IMAGE_EDGE {
            decoded = decoded.resize(
                MAX_IMAGE_EDGE,
                MAX_IMAGE_EDGE,
                image::imageops::FilterType::Triangle,
            );
        }

        // Transparent pixels are composited onto white.
        let rgba = decoded.to_rgba8();
        let (embed_width, embed_height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as u16;
            for channel in [r, g, b] {
                rgb.push(((channel as u16 * alpha + 255 * (255 - alpha)) / 255) as u8);
            }
        }
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => embed_width as i64,
                "Height" => embed_height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
            },
            rgb,
        );
        stream
            .compress()
            .map_err(|error| Error::Serialize(error.to_string()))?;
        let image_id = self.pdf.add_object(stream);
        let name = format!("Im{}", self.xobjects.len() + 1);
        self.xobjects.set(name.as_bytes().to_vec(), image_id);

        self.ensure_space(draw_height);
        let bottom = PAGE_HEIGHT - self.y - draw_height;
        let ops = &mut self.page.operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                draw_width.into(),
                0.0f32.into(),
                0.0f32.into(),
                draw_height.into(),
                MARGIN.into(),
                bottom.into(),
            ],
        ));
        ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        ops.push(Operation::new("Q", vec![]));
        if let Some(link) = link {
            self.link(MARGIN, self.y, draw_width, draw_height, link);
        }
        self.y += draw_height;
        Ok(self)
    }

    fn write_page(&mut self, page: Page) -> Result<ObjectId, Error> {
        let content = Content {
            operations: page.operations,
        };
        let body = content
            .encode()
            .map_err(|error| Error::Serialize(error.to_string()))?;
        let content_id = self.pdf.add_object(Stream::new(dictionary! {}, body));
        let media_box: Vec<Object> = vec![
            0.0f32.into(),
            0.0f32.into(),
            PAGE_WIDTH.into(),
            PAGE_HEIGHT.into(),
        ];
        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box,
            "Contents" => content_id,
            "Resources" => self.resources_id,
        };
        if !page.annotations.is_empty() {
            page_dict.set(
                "Annots",
                page.annotations
                    .into_iter()
                    .map(Object::Reference)
                    .collect::<Vec<_>>(),
            );
        }
        Ok(self.pdf.add_object(page_dict))
    }

    /// Closes the last page and serializes the whole document.
    pub fn finish(mut self) -> Result<Vec<u8>, Error> {
        let last = std::mem::take(&mut self.page);
        let pages = std::mem::take(&mut self.finished);
        let mut page_ids = Vec::with_capacity(pages.len() + 1);
        for page in pages.into_iter().chain([last]) {
            page_ids.push(self.write_page(page)?);
        }

        let mut fonts = Dictionary::new();
        for font in [Font::Regular, Font::Bold] {
            let font_id = self.pdf.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }
        let resources = dictionary! {
            "Font" => fonts,
            "XObject" => std::mem::take(&mut self.xobjects),
        };
        self.pdf
            .objects
            .insert(self.resources_id, Object::Dictionary(resources));

        let count = page_ids.len() as i64;
        let kids = page_ids
            .into_iter()
            .map(Object::Reference)
            .collect::<Vec<_>>();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        };
        self.pdf
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.pdf.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.pdf.add_object(dictionary! {
            "Title" => Object::String(encode_text(&self.title), StringFormat::Literal),
            "Producer" => Object::string_literal(concat!("record-pdf ", env!("CARGO_PKG_VERSION"))),
        });
        self.pdf.trailer.set("Root", catalog_id);
        self.pdf.trailer.set("Info", info_id);

        let mut buffer = Vec::new();
        self.pdf
            .save_to(&mut buffer)
            .map_err(|error| Error::Serialize(error.to_string()))?;
        Ok(buffer)
    }

    /// Serializes the document to `path` and resolves only once the file has
    /// been flushed and synced, so the artifact is complete when this returns.
    pub async fn write_to(self, path: &Path) -> Result<u64, Error> {
        let body = self.finish()?;
        let mut file = tokio::fs::File::create(path).await.map_err(Error::Write)?;
        file.write_all(&body).await.map_err(Error::Write)?;
        file.flush().await.map_err(Error::Write)?;
        file.sync_all().await.map_err(Error::Write)?;
        Ok(body.len() as u64)
    }
}
