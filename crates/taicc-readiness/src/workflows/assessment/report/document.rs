use printpdf::image_crate::GenericImageView;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use std::io::BufWriter;
use tracing::warn;

use crate::workflows::assessment::domain::{MaturityLevel, UserProfile};

pub const REPORT_FILE_NAME: &str = "TAICC_AI_Readiness_Report.pdf";
pub const REPORT_TITLE: &str = "TAICC AI Readiness Assessment Report";
pub const REPORT_FOOTER: &str = "Report generated by TAICC AI Readiness Assessment Tool";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const LOGO_WIDTH_MM: f32 = 40.0;
const PT_TO_MM: f32 = 0.3528;
/// Characters per wrapped narrative line at body size on an A4 page.
const BODY_WRAP_COLUMNS: usize = 95;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to build PDF: {0}")]
    Pdf(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Body,
    Footer,
}

impl LineStyle {
    fn font_size(self) -> f32 {
        match self {
            Self::Title => 16.0,
            Self::Body => 12.0,
            Self::Footer => 10.0,
        }
    }

    fn line_height_mm(self) -> f32 {
        match self {
            Self::Title | Self::Footer => 10.0,
            Self::Body => 8.0,
        }
    }

    fn centered(self) -> bool {
        matches!(self, Self::Title | Self::Footer)
    }
}

/// One laid-out element of the report, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportLine {
    Text { style: LineStyle, text: String },
    Gap { height_mm: f32 },
}

/// Contents of the downloadable report.
#[derive(Debug, Clone, Copy)]
pub struct ReportDocument<'a> {
    pub profile: &'a UserProfile,
    pub maturity: MaturityLevel,
    pub narrative: &'a str,
    pub logo: Option<&'a [u8]>,
}

impl<'a> ReportDocument<'a> {
    /// Title, user details, maturity, narrative, footer; all text reduced to Latin-1.
    pub fn lines(&self) -> Vec<ReportLine> {
        let mut lines = vec![
            text(LineStyle::Title, REPORT_TITLE),
            ReportLine::Gap { height_mm: 10.0 },
            text(LineStyle::Body, "User Details:"),
        ];

        for (label, value) in self.profile.contact_fields() {
            lines.push(text(LineStyle::Body, &format!("{label}: {value}")));
        }
        lines.push(text(
            LineStyle::Body,
            &format!("Segment: {}", self.profile.segment),
        ));
        lines.push(text(LineStyle::Body, &format!("Tier: {}", self.profile.tier)));
        lines.push(ReportLine::Gap { height_mm: 5.0 });

        lines.push(text(
            LineStyle::Body,
            &format!("AI Maturity Level: {}", self.maturity.label()),
        ));
        lines.push(ReportLine::Gap { height_mm: 10.0 });

        for wrapped in wrap_text(&sanitize_latin1(self.narrative), BODY_WRAP_COLUMNS) {
            lines.push(ReportLine::Text {
                style: LineStyle::Body,
                text: wrapped,
            });
        }

        lines.push(ReportLine::Gap { height_mm: 10.0 });
        lines.push(text(LineStyle::Footer, REPORT_FOOTER));
        lines
    }

    pub fn render(&self) -> Result<Vec<u8>, ExportError> {
        let (doc, page, layer) = PdfDocument::new(
            REPORT_TITLE,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let fonts = Fonts {
            title: add_font(&doc, BuiltinFont::HelveticaBold)?,
            body: add_font(&doc, BuiltinFont::Helvetica)?,
            footer: add_font(&doc, BuiltinFont::HelveticaOblique)?,
        };

        let mut cursor = PageCursor {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        };

        if let Some(bytes) = self.logo {
            cursor.place_logo(bytes);
        }

        for line in self.lines() {
            match line {
                ReportLine::Gap { height_mm } => cursor.advance(height_mm),
                ReportLine::Text { style, text } => cursor.write(&fonts, style, &text),
            }
        }

        let mut writer = BufWriter::new(Vec::new());
        doc.save(&mut writer)
            .map_err(|err| ExportError::Pdf(err.to_string()))?;
        writer
            .into_inner()
            .map_err(|err| ExportError::Pdf(err.error().to_string()))
    }
}

/// Render the report PDF. Text the PDF fonts cannot encode is substituted, never rejected.
pub fn export(
    profile: &UserProfile,
    maturity: MaturityLevel,
    narrative: &str,
    logo: Option<&[u8]>,
) -> Result<Vec<u8>, ExportError> {
    ReportDocument {
        profile,
        maturity,
        narrative,
        logo,
    }
    .render()
}

fn text(style: LineStyle, value: &str) -> ReportLine {
    ReportLine::Text {
        style,
        text: sanitize_latin1(value),
    }
}

fn add_font(doc: &PdfDocumentReference, font: BuiltinFont) -> Result<IndirectFontRef, ExportError> {
    doc.add_builtin_font(font)
        .map_err(|err| ExportError::Pdf(err.to_string()))
}

struct Fonts {
    title: IndirectFontRef,
    body: IndirectFontRef,
    footer: IndirectFontRef,
}

impl Fonts {
    fn for_style(&self, style: LineStyle) -> &IndirectFontRef {
        match style {
            LineStyle::Title => &self.title,
            LineStyle::Body => &self.body,
            LineStyle::Footer => &self.footer,
        }
    }
}

struct PageCursor<'d> {
    doc: &'d PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageCursor<'_> {
    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT_MM - MARGIN_MM;
    }

    fn advance(&mut self, height_mm: f32) {
        self.y -= height_mm;
        if self.y < MARGIN_MM {
            self.new_page();
        }
    }

    fn write(&mut self, fonts: &Fonts, style: LineStyle, value: &str) {
        let height = style.line_height_mm();
        if self.y - height < MARGIN_MM {
            self.new_page();
        }
        self.y -= height;

        let size = style.font_size();
        let x = if style.centered() {
            let estimated_width = value.chars().count() as f32 * size * 0.5 * PT_TO_MM;
            ((PAGE_WIDTH_MM - estimated_width) / 2.0).max(MARGIN_MM)
        } else {
            MARGIN_MM
        };

        self.layer
            .use_text(value, size, Mm(x), Mm(self.y), fonts.for_style(style));
    }

    fn place_logo(&mut self, bytes: &[u8]) {
        let decoded = match printpdf::image_crate::load_from_memory(bytes) {
            Ok(image) => image,
            Err(err) => {
                warn!(error = %err, "logo could not be decoded; exporting report without it");
                return;
            }
        };

        let width_px = decoded.width().max(1) as f32;
        let height_px = decoded.height().max(1) as f32;
        let dpi = width_px * 25.4 / LOGO_WIDTH_MM;
        let height_mm = height_px * 25.4 / dpi;

        self.y -= height_mm;
        Image::from_dynamic_image(&decoded).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_MM)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.y -= 5.0;
    }
}

/// Replace anything outside printable Latin-1 with `?`, keeping newlines and tabs as spaces.
pub fn sanitize_latin1(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\n' => '\n',
            '\t' | '\r' => ' ',
            c if (' '..='~').contains(&c) => c,
            c if ('\u{a0}'..='\u{ff}').contains(&c) => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap that preserves paragraph breaks and splits overlong words.
pub fn wrap_text(value: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();

    for paragraph in value.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(columns);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let word: String = word.into_iter().collect();
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > columns {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}
