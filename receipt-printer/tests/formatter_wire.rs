use std::io::{self, Write};

use receipt_printer::{
    CaptureSink, CommandNode, ConfigurationError, Formatter, NodeDocument, Params, PrintError,
};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Sink that counts write calls and fails once `budget` bytes are used up
struct LimitedSink {
    budget: usize,
    written: Vec<u8>,
    calls: usize,
}

impl LimitedSink {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            written: Vec::new(),
            calls: 0,
        }
    }
}

impl Write for LimitedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.calls += 1;
        if self.written.len() + buf.len() > self.budget {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "printer gone"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_font_size_all_valid() {
    for width in 1..=8u8 {
        for height in 1..=8u8 {
            let mut f = Formatter::new(Vec::new());
            f.set_font_size(width, height).unwrap();

            assert_eq!(f.state().font_width(), width);
            assert_eq!(f.state().font_height(), height);
            assert_eq!(
                f.into_inner(),
                vec![GS, b'!', ((width - 1) << 4) | (height - 1)]
            );
        }
    }
}

#[test]
fn test_font_size_out_of_range() {
    for (width, height) in [(0, 1), (1, 0), (9, 1), (1, 9), (0, 0), (255, 255)] {
        let mut f = Formatter::new(Vec::new());
        let err = f.set_font_size(width, height).unwrap_err();

        assert_eq!(
            err.as_config(),
            Some(&ConfigurationError::InvalidFontSize {
                width: width.into(),
                height: height.into()
            })
        );
        assert!(f.get_ref().is_empty());
        assert!(f.state().is_default());
    }
}

#[test]
fn test_feed_resends_defaults() {
    let mut f = Formatter::new(Vec::new());
    f.set_font_size(4, 2).unwrap();
    f.set_underline(1).unwrap();
    f.set_reverse(1).unwrap();
    f.get_mut().clear();

    f.feed(&Params::new()).unwrap();

    assert!(f.state().is_default());
    assert_eq!(
        f.into_inner(),
        vec![
            b'\n', //
            ESC, b'G', 0, // emphasize
            ESC, b'R', 0, // rotate
            GS, b'b', 0, // smooth
            GS, b'B', 0, // reverse
            ESC, b'-', 0, // underline
            ESC, b'{', 0, // upside-down
            GS, b'!', 0, // font size
            ESC, b'-', 0, // underline again
        ]
    );
}

#[test]
fn test_cut_sequences() {
    let mut f = Formatter::new(Vec::new());
    f.cut().unwrap();
    assert_eq!(f.into_inner(), vec![GS, b'V', b'A', 0x30]);

    let mut f = Formatter::new(Vec::new());
    f.cut_partial().unwrap();
    assert_eq!(f.into_inner(), vec![GS, b'V', 0x01]);
}

#[test]
fn test_barcode_length_prefixed() {
    let mut f = Formatter::new(Vec::new());
    f.barcode("12345", 70).unwrap();

    let mut expected = vec![ESC, b'a', 1, GS, b'k', 5];
    expected.extend_from_slice(b"12345");
    expected.extend_from_slice(b"12345");
    assert_eq!(f.into_inner(), expected);
}

#[test]
fn test_image_node() {
    let mut f = Formatter::new(Vec::new());
    f.dispatch("image", &params(&[("width", "2"), ("height", "2")]), "AAAAAA==")
        .unwrap();

    assert_eq!(
        f.into_inner(),
        vec![
            ESC, b'(', b'L', 10, 0, b'0', b'p', // frame, len = 8 + 2
            b'0', 0x01, 0x01, b'1', 0, 0, 0, 0, // header + bitmap
            ESC, b'(', b'L', 2, 0, b'0', b'2', // print buffered graphics
        ]
    );
}

#[test]
fn test_unknown_node_never_writes() {
    let mut f = Formatter::new(LimitedSink::new(0));
    f.dispatch("barcode", &params(&[("format", "70")]), "12345")
        .unwrap();
    f.dispatch("", &Params::new(), "").unwrap();
    f.dispatch("TEXT", &Params::new(), "upper case is not text")
        .unwrap();

    assert_eq!(f.get_ref().calls, 0);
}

#[test]
fn test_sink_error_aborts_node() {
    // room for the alignment and nothing else
    let mut f = Formatter::new(LimitedSink::new(3));
    let err = f
        .text(&params(&[("align", "center"), ("em", "1")]), "lost")
        .unwrap_err();

    match err {
        PrintError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(f.get_ref().written, vec![ESC, b'a', 1]);
}

#[test]
fn test_capture_mirrors_document() {
    let doc = NodeDocument::new(vec![
        CommandNode::new("text")
            .param("align", "center")
            .param("dw", "1")
            .payload("YUM YUM&#10;"),
        CommandNode::new("feed").param("line", "2"),
        CommandNode::new("pulse"),
        CommandNode::new("cut").param("type", "feed"),
    ]);

    let mut direct = Formatter::new(Vec::new());
    direct.write_document(&doc).unwrap();

    let mut captured = Formatter::new(CaptureSink::new(Vec::new()));
    captured.write_document(&doc).unwrap();
    let sink = captured.into_inner();

    assert_eq!(sink.captured(), direct.get_ref().as_slice());
    assert_eq!(sink.get_ref(), direct.get_ref());
    assert!(sink.captured().starts_with(&[ESC, b'@', ESC, b'a', 1, GS, b'!', 0x10]));
    assert!(sink.captured().ends_with(&[ESC, b'p', 2, ESC, b'd', 1, GS, b'V', b'A', b'0']));
}

#[test]
fn test_document_stops_at_first_bad_node() {
    let doc = NodeDocument::new(vec![
        CommandNode::new("text").payload("ok"),
        CommandNode::new("text").param("align", "middle").payload("bad"),
        CommandNode::new("cut"),
    ]);

    let mut f = Formatter::new(Vec::new());
    let err = f.write_document(&doc).unwrap_err();

    assert!(matches!(
        err.as_config(),
        Some(ConfigurationError::InvalidAlignment { .. })
    ));
    assert_eq!(f.into_inner(), vec![ESC, b'@', b'o', b'k']);
}
