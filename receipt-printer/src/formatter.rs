//! Receipt command formatter
//!
//! Turns state changes and command nodes into ESC/POS bytes, written straight
//! to a sink. Every operation writes synchronously and in a fixed order; a
//! sink error aborts the operation and bytes already written stay written.
//!
//! Node parameters are validated before anything is written, so a node
//! rejected with a [`ConfigurationError`] leaves the sink untouched.

use std::io::Write;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, instrument};

use crate::entities::substitute_entities;
use crate::error::{ConfigurationError, PrintResult};
use crate::escpos::{self, Alignment, Font, Language};
use crate::node::{CommandNode, NodeDocument, Params};
use crate::session::SessionState;

/// Raster header sent ahead of image data: tone, x/y multipliers, colors
const RASTER_HEADER: [u8; 4] = [b'0', 0x01, 0x01, b'1'];

/// Longest payload shown in node logs
const LOG_PREVIEW_CHARS: usize = 40;

/// ESC/POS formatter over a byte sink
///
/// Owns the sink and the [`SessionState`] of the stream written to it.
///
/// ```ignore
/// use receipt_printer::{CommandNode, Formatter};
///
/// let mut fmt = Formatter::new(Vec::new());
/// fmt.init()?;
/// fmt.write_node(&CommandNode::new("text").param("align", "center").payload("Hello&#10;"))?;
/// fmt.write_node(&CommandNode::new("cut").param("type", "feed"))?;
/// let bytes = fmt.into_inner();
/// ```
#[derive(Debug)]
pub struct Formatter<W: Write> {
    sink: W,
    state: SessionState,
}

impl<W: Write> Formatter<W> {
    /// Wrap a sink. Nothing is written until the first operation.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: SessionState::default(),
        }
    }

    /// Current session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Give the sink back to the caller
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn emit(&mut self, bytes: &[u8]) -> PrintResult<()> {
        self.sink.write_all(bytes)?;
        Ok(())
    }

    /// Write raw bytes
    pub fn write_raw(&mut self, bytes: &[u8]) -> PrintResult<()> {
        self.emit(bytes)
    }

    /// Write text as-is (no entity substitution)
    pub fn write_str(&mut self, s: &str) -> PrintResult<()> {
        self.emit(s.as_bytes())
    }

    pub fn flush(&mut self) -> PrintResult<()> {
        self.sink.flush()?;
        Ok(())
    }

    // === Session ===

    /// Reset session state and send `ESC @`
    pub fn init(&mut self) -> PrintResult<()> {
        self.state.reset();
        self.emit(&escpos::init())
    }

    /// Send the end-of-output marker
    pub fn end(&mut self) -> PrintResult<()> {
        self.emit(&escpos::end())
    }

    // === Paper Control ===

    pub fn cut(&mut self) -> PrintResult<()> {
        self.emit(&escpos::cut())
    }

    pub fn cut_partial(&mut self) -> PrintResult<()> {
        self.emit(&escpos::cut_partial())
    }

    pub fn linefeed(&mut self) -> PrintResult<()> {
        self.emit(&[escpos::LF])
    }

    pub fn formfeed(&mut self) -> PrintResult<()> {
        self.formfeed_n(1)
    }

    /// Print and feed `lines` lines
    pub fn formfeed_n(&mut self, lines: u8) -> PrintResult<()> {
        self.emit(&escpos::formfeed(lines))
    }

    // === Cash Drawer ===

    /// Short drawer pulse
    pub fn pulse(&mut self) -> PrintResult<()> {
        self.emit(&escpos::pulse())
    }

    /// Drawer pulse with explicit timing
    pub fn cash(&mut self) -> PrintResult<()> {
        self.emit(&escpos::cash())
    }

    // === Named settings ===

    /// Select font `A`, `B` or `C`
    pub fn set_font(&mut self, name: &str) -> PrintResult<()> {
        let font: Font = name.parse()?;
        self.emit(&escpos::font(font))
    }

    /// Select `left`, `center` or `right` justification
    pub fn set_alignment(&mut self, name: &str) -> PrintResult<()> {
        let alignment: Alignment = name.parse()?;
        self.emit(&escpos::align(alignment))
    }

    /// Select an international character set by language code
    pub fn set_language(&mut self, name: &str) -> PrintResult<()> {
        let language: Language = name.parse()?;
        self.emit(&escpos::language(language))
    }

    // === Toggles ===

    /// Set character scale; each factor must be 1-8
    pub fn set_font_size(&mut self, width: u8, height: u8) -> PrintResult<()> {
        let (width, height) = validate_font_size(width.into(), height.into())?;
        self.apply_font_size(width, height)
    }

    fn apply_font_size(&mut self, width: u8, height: u8) -> PrintResult<()> {
        self.state.font_width = width;
        self.state.font_height = height;
        self.send_font_size()
    }

    pub fn set_underline(&mut self, value: u8) -> PrintResult<()> {
        self.state.underline = value;
        self.send_underline()
    }

    pub fn set_emphasize(&mut self, value: u8) -> PrintResult<()> {
        self.state.emphasize = value;
        self.send_emphasize()
    }

    pub fn set_upsidedown(&mut self, value: u8) -> PrintResult<()> {
        self.state.upsidedown = value;
        self.send_upsidedown()
    }

    pub fn set_rotate(&mut self, value: u8) -> PrintResult<()> {
        self.state.rotate = value;
        self.send_rotate()
    }

    pub fn set_reverse(&mut self, value: u8) -> PrintResult<()> {
        self.state.reverse = value;
        self.send_reverse()
    }

    pub fn set_smooth(&mut self, value: u8) -> PrintResult<()> {
        self.state.smooth = value;
        self.send_smooth()
    }

    fn send_font_size(&mut self) -> PrintResult<()> {
        let (w, h) = (self.state.font_width, self.state.font_height);
        self.emit(&escpos::font_size(w, h))
    }

    fn send_underline(&mut self) -> PrintResult<()> {
        self.emit(&escpos::underline(self.state.underline))
    }

    fn send_emphasize(&mut self) -> PrintResult<()> {
        self.emit(&escpos::emphasize(self.state.emphasize))
    }

    fn send_upsidedown(&mut self) -> PrintResult<()> {
        self.emit(&escpos::upsidedown(self.state.upsidedown))
    }

    fn send_rotate(&mut self) -> PrintResult<()> {
        self.emit(&escpos::rotate(self.state.rotate))
    }

    fn send_reverse(&mut self) -> PrintResult<()> {
        self.emit(&escpos::reverse(self.state.reverse))
    }

    fn send_smooth(&mut self) -> PrintResult<()> {
        self.emit(&escpos::smooth(self.state.smooth))
    }

    // === Positioning ===

    pub fn move_x(&mut self, dots: u16) -> PrintResult<()> {
        self.emit(&escpos::move_x(dots))
    }

    pub fn move_y(&mut self, dots: u16) -> PrintResult<()> {
        self.emit(&escpos::move_y(dots))
    }

    // === Nodes ===

    /// Styled block of text
    #[instrument(skip_all)]
    pub fn text(&mut self, params: &Params, payload: &str) -> PrintResult<()> {
        let plan = TextPlan::parse(params, &self.state)?;

        if let Some(alignment) = plan.align {
            self.emit(&escpos::align(alignment))?;
        }
        if let Some(language) = plan.language {
            self.emit(&escpos::language(language))?;
        }
        if plan.smooth {
            self.set_smooth(1)?;
        }
        if plan.emphasize {
            self.set_emphasize(1)?;
        }
        if plan.underline {
            self.set_underline(1)?;
        }
        if plan.reverse {
            self.set_reverse(1)?;
        }
        if plan.rotate {
            self.set_rotate(1)?;
        }
        if let Some(font) = plan.font {
            self.emit(&escpos::font(font))?;
        }
        for (width, height) in plan.sizes {
            self.apply_font_size(width, height)?;
        }
        if let Some(x) = plan.x {
            self.move_x(x)?;
        }
        if let Some(y) = plan.y {
            self.move_y(y)?;
        }

        let text = substitute_entities(payload);
        if !text.is_empty() {
            self.emit(text.as_bytes())?;
        }
        Ok(())
    }

    /// Feed paper, then return every toggle to its default
    ///
    /// The default state is re-sent in full, underline twice, matching what
    /// existing printers in the field receive.
    #[instrument(skip_all)]
    pub fn feed(&mut self, params: &Params) -> PrintResult<()> {
        let lines = parse_param::<u8>(params, "line")?;
        let unit = parse_param::<u16>(params, "unit")?;

        if let Some(lines) = lines {
            self.formfeed_n(lines)?;
        }
        if let Some(dots) = unit {
            self.move_y(dots)?;
        }
        self.linefeed()?;

        self.state.reset();

        self.send_emphasize()?;
        self.send_rotate()?;
        self.send_smooth()?;
        self.send_reverse()?;
        self.send_underline()?;
        self.send_upsidedown()?;
        self.send_font_size()?;
        self.send_underline()
    }

    /// Cut, with one extra line fed first when `type` is `feed`
    pub fn feed_and_cut(&mut self, params: &Params) -> PrintResult<()> {
        if params.get("type").is_some_and(|t| t == "feed") {
            self.formfeed()?;
        }
        self.cut()
    }

    /// Centered barcode
    ///
    /// Formats above 69 are length-prefixed, formats below 69 are
    /// NUL-terminated and format 69 itself sends no barcode frame. The
    /// barcode text is always written once more after the frame.
    #[instrument(skip(self))]
    pub fn barcode(&mut self, text: &str, format: i32) -> PrintResult<()> {
        if format > 69 && text.len() > u8::MAX as usize {
            return Err(ConfigurationError::PayloadTooLong {
                key: "barcode".to_string(),
                len: text.len(),
            }
            .into());
        }
        let code = escpos::barcode_code(format);

        self.state.reset();
        self.emit(&escpos::align(Alignment::Center))?;

        let mut frame = vec![escpos::GS, b'k'];
        frame.extend(code);
        if format > 69 {
            frame.push(text.len() as u8);
            frame.extend_from_slice(text.as_bytes());
            self.emit(&frame)?;
        } else if format < 69 {
            frame.extend_from_slice(text.as_bytes());
            frame.push(escpos::NUL);
            self.emit(&frame)?;
        }

        self.emit(text.as_bytes())
    }

    /// Raster image from a base64 bitmap
    ///
    /// `width` and `height` are required and must be integers; their values
    /// are only logged. The decoded bitmap follows the
    /// raster header verbatim, so it must already carry whatever layout the
    /// printer expects (see [`crate::raster`]).
    #[instrument(skip_all)]
    pub fn image(&mut self, params: &Params, payload: &str) -> PrintResult<()> {
        let align = parse_named::<Alignment>(params, "align")?;
        let width = require_param::<i64>(params, "width")?;
        let height = require_param::<i64>(params, "height")?;

        let bitmap = STANDARD
            .decode(payload.trim())
            .map_err(|e| ConfigurationError::InvalidBase64 {
                reason: e.to_string(),
            })?;

        info!(len = bitmap.len(), width, height, "image");

        let mut raster = Vec::with_capacity(RASTER_HEADER.len() + bitmap.len());
        raster.extend_from_slice(&RASTER_HEADER);
        raster.extend_from_slice(&bitmap);
        let header = escpos::graphics_header(b'0', b'p', raster.len())?;

        if let Some(alignment) = align {
            self.emit(&escpos::align(alignment))?;
        }
        self.emit(&header)?;
        self.emit(&raster)?;
        self.graphics_send(b'0', b'2', &[])
    }

    fn graphics_send(&mut self, mode: u8, function: u8, payload: &[u8]) -> PrintResult<()> {
        let header = escpos::graphics_header(mode, function, payload.len())?;
        self.emit(&header)?;
        self.emit(payload)
    }

    // === Dispatch ===

    /// Route a node by name
    ///
    /// Recognized: `text`, `feed`, `cut`, `pulse`, `image`. Any other name
    /// is ignored without writing anything.
    pub fn dispatch(&mut self, name: &str, params: &Params, payload: &str) -> PrintResult<()> {
        debug!(node = name, ?params, payload = %preview(payload), "write node");

        match name {
            "text" => self.text(params, payload),
            "feed" => self.feed(params),
            "cut" => self.feed_and_cut(params),
            "pulse" => self.pulse(),
            "image" => self.image(params, payload),
            _ => {
                debug!(node = name, "unknown node ignored");
                Ok(())
            }
        }
    }

    pub fn write_node(&mut self, node: &CommandNode) -> PrintResult<()> {
        self.dispatch(&node.name, &node.params, &node.payload)
    }

    /// Replay a whole document, stopping at the first failing node
    #[instrument(skip_all, fields(document = %document.document, nodes = document.nodes.len()))]
    pub fn write_document(&mut self, document: &NodeDocument) -> PrintResult<()> {
        if document.init {
            self.init()?;
        }
        for node in &document.nodes {
            self.write_node(node)?;
        }
        Ok(())
    }
}

/// Validated form of a text node's parameters
#[derive(Debug, Default)]
struct TextPlan {
    align: Option<Alignment>,
    language: Option<Language>,
    smooth: bool,
    emphasize: bool,
    underline: bool,
    reverse: bool,
    rotate: bool,
    font: Option<Font>,
    /// Font sizes in the order they are applied
    sizes: Vec<(u8, u8)>,
    x: Option<u16>,
    y: Option<u16>,
}

impl TextPlan {
    fn parse(params: &Params, state: &SessionState) -> Result<Self, ConfigurationError> {
        let mut plan = Self {
            align: parse_named(params, "align")?,
            language: parse_named(params, "lang")?,
            smooth: is_truthy(params, "smooth"),
            emphasize: is_truthy(params, "em"),
            underline: is_truthy(params, "ul"),
            reverse: is_truthy(params, "reverse"),
            rotate: is_truthy(params, "rotate"),
            font: params
                .get("font")
                .map(|id| font_from_identifier(id))
                .transpose()?,
            ..Default::default()
        };

        let mut width = i64::from(state.font_width);
        let mut height = i64::from(state.font_height);
        if is_truthy(params, "dw") {
            width = 2;
            plan.sizes.push(validate_font_size(width, height)?);
        }
        if is_truthy(params, "dh") {
            height = 2;
            plan.sizes.push(validate_font_size(width, height)?);
        }
        if let Some(w) = parse_param::<i64>(params, "width")? {
            width = w;
            plan.sizes.push(validate_font_size(width, height)?);
        }
        if let Some(h) = parse_param::<i64>(params, "height")? {
            height = h;
            plan.sizes.push(validate_font_size(width, height)?);
        }

        plan.x = parse_param(params, "x")?;
        plan.y = parse_param(params, "y")?;
        Ok(plan)
    }
}

fn validate_font_size(width: i64, height: i64) -> Result<(u8, u8), ConfigurationError> {
    let range = 1..=8;
    if range.contains(&width) && range.contains(&height) {
        Ok((width as u8, height as u8))
    } else {
        Err(ConfigurationError::InvalidFontSize { width, height })
    }
}

/// Font identifiers look like `font_a`; the sixth character picks the font
fn font_from_identifier(identifier: &str) -> Result<Font, ConfigurationError> {
    match identifier.get(5..6) {
        Some(c) => c.to_uppercase().parse(),
        None => Err(ConfigurationError::InvalidFont {
            value: identifier.to_string(),
        }),
    }
}

fn is_truthy(params: &Params, key: &str) -> bool {
    matches!(params.get(key).map(String::as_str), Some("true" | "1"))
}

fn parse_param<T: FromStr>(params: &Params, key: &str) -> Result<Option<T>, ConfigurationError> {
    params
        .get(key)
        .map(|v| v.parse::<T>().map_err(|_| ConfigurationError::number(key, v)))
        .transpose()
}

fn require_param<T: FromStr>(params: &Params, key: &str) -> Result<T, ConfigurationError> {
    parse_param(params, key)?.ok_or_else(|| ConfigurationError::MissingParameter {
        key: key.to_string(),
    })
}

fn parse_named<T>(params: &Params, key: &str) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr<Err = ConfigurationError>,
{
    params.get(key).map(|v| v.parse()).transpose()
}

fn preview(payload: &str) -> String {
    if payload.chars().count() > LOG_PREVIEW_CHARS {
        let head: String = payload.chars().take(LOG_PREVIEW_CHARS).collect();
        format!("{head} ...")
    } else {
        payload.to_string()
    }
}
