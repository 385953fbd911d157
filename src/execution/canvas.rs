//! Canvas drawing operations and the surface they are replayed on.

use std::f64::consts::{PI, TAU};
use std::fmt::Write as _;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::debug;

pub const DEFAULT_CANVAS_SIZE: u32 = 1008;

/// Canvas 2-D setters that are accepted but have no effect on the SVG export.
const IGNORED_SETTERS: &[&str] = &[
    "lineCap",
    "lineJoin",
    "miterLimit",
    "lineDashOffset",
    "textAlign",
    "textBaseline",
    "globalCompositeOperation",
    "shadowColor",
    "shadowBlur",
    "shadowOffsetX",
    "shadowOffsetY",
    "imageSmoothingEnabled",
];

/// Canvas 2-D calls that are accepted but not rendered.
const IGNORED_CALLS: &[&str] = &[
    "setLineDash",
    "translate",
    "rotate",
    "scale",
    "transform",
    "setTransform",
    "resetTransform",
    "clip",
    "strokeText",
    "drawImage",
    "putImageData",
];

/// One canvas 2-D drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillStyle(String),
    StrokeStyle(String),
    LineWidth(f64),
    Font(String),
    GlobalAlpha(f64),
    BeginPath,
    ClosePath,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    QuadraticCurveTo { cpx: f64, cpy: f64, x: f64, y: f64 },
    BezierCurveTo { cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64 },
    Rect { x: f64, y: f64, w: f64, h: f64 },
    Arc { x: f64, y: f64, r: f64, start: f64, end: f64, ccw: bool },
    Fill,
    Stroke,
    FillRect { x: f64, y: f64, w: f64, h: f64 },
    StrokeRect { x: f64, y: f64, w: f64, h: f64 },
    ClearRect { x: f64, y: f64, w: f64, h: f64 },
    FillText { text: String, x: f64, y: f64 },
    Save,
    Restore,
    /// A known operation the SVG export does not model, such as transforms.
    Ignored(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DrawOpError {
    #[error("empty drawing operation")]
    Empty,
    #[error("unsupported drawing operation `{0}`")]
    Unknown(String),
    #[error("malformed drawing operation `{0}`")]
    Malformed(String),
    #[error("`{op}` expects {expected} arguments, got {found}")]
    Arity { op: String, expected: String, found: usize },
    #[error("`{op}` argument {index} is not a {expected}")]
    BadArg { op: String, index: usize, expected: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Num(f64),
    Str(String),
    Bool(bool),
}

struct Args<'a> {
    op: &'a str,
    items: Vec<Arg>,
}

impl Args<'_> {
    fn expect_len(&self, min: usize, max: usize) -> Result<(), DrawOpError> {
        let found = self.items.len();
        if found < min || found > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            return Err(DrawOpError::Arity { op: self.op.to_string(), expected, found });
        }
        Ok(())
    }

    fn num(&self, index: usize) -> Result<f64, DrawOpError> {
        match self.items.get(index) {
            Some(Arg::Num(n)) => Ok(*n),
            _ => Err(self.bad(index, "number")),
        }
    }

    fn string(&self, index: usize) -> Result<String, DrawOpError> {
        match self.items.get(index) {
            Some(Arg::Str(s)) => Ok(s.clone()),
            _ => Err(self.bad(index, "string")),
        }
    }

    fn flag(&self, index: usize) -> Result<bool, DrawOpError> {
        match self.items.get(index) {
            None => Ok(false),
            Some(Arg::Bool(b)) => Ok(*b),
            Some(Arg::Num(n)) => Ok(*n != 0.0),
            Some(Arg::Str(_)) => Err(self.bad(index, "boolean")),
        }
    }

    fn bad(&self, index: usize, expected: &'static str) -> DrawOpError {
        DrawOpError::BadArg { op: self.op.to_string(), index, expected }
    }

    fn rect(&self) -> Result<(f64, f64, f64, f64), DrawOpError> {
        self.expect_len(4, 4)?;
        Ok((self.num(0)?, self.num(1)?, self.num(2)?, self.num(3)?))
    }
}

impl FromStr for DrawOp {
    type Err = DrawOpError;

    /// Parse `name(arg, ...)` or `name = value`, as emitted by the canvas
    /// graphics device. A trailing `;` is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_end_matches(';').trim();
        if s.is_empty() {
            return Err(DrawOpError::Empty);
        }

        let paren = s.find('(');
        let eq = s.find('=');
        let setter = match (paren, eq) {
            (Some(p), Some(e)) => e < p,
            (None, Some(_)) => true,
            _ => false,
        };

        if setter {
            let (name, value) = s
                .split_once('=')
                .ok_or_else(|| DrawOpError::Malformed(s.to_string()))?;
            let name = name.trim();
            if IGNORED_SETTERS.contains(&name) {
                return Ok(DrawOp::Ignored(name.to_string()));
            }
            let args = Args { op: name, items: split_args(value)? };
            args.expect_len(1, 1)?;
            return match name {
                "fillStyle" => Ok(DrawOp::FillStyle(args.string(0)?)),
                "strokeStyle" => Ok(DrawOp::StrokeStyle(args.string(0)?)),
                "font" => Ok(DrawOp::Font(args.string(0)?)),
                "lineWidth" => Ok(DrawOp::LineWidth(args.num(0)?)),
                "globalAlpha" => Ok(DrawOp::GlobalAlpha(args.num(0)?)),
                other => Err(DrawOpError::Unknown(other.to_string())),
            };
        }

        let (name, rest) = match paren {
            Some(p) => (&s[..p], &s[p + 1..]),
            None => return Err(DrawOpError::Malformed(s.to_string())),
        };
        let inner = rest
            .strip_suffix(')')
            .ok_or_else(|| DrawOpError::Malformed(s.to_string()))?;
        let name = name.trim();
        if IGNORED_CALLS.contains(&name) {
            return Ok(DrawOp::Ignored(name.to_string()));
        }
        let args = Args { op: name, items: split_args(inner)? };

        let op = match name {
            "beginPath" => {
                args.expect_len(0, 0)?;
                DrawOp::BeginPath
            }
            "closePath" => {
                args.expect_len(0, 0)?;
                DrawOp::ClosePath
            }
            "fill" => DrawOp::Fill,
            "stroke" => DrawOp::Stroke,
            "save" => DrawOp::Save,
            "restore" => DrawOp::Restore,
            "moveTo" | "lineTo" => {
                args.expect_len(2, 2)?;
                let (x, y) = (args.num(0)?, args.num(1)?);
                if name == "moveTo" {
                    DrawOp::MoveTo { x, y }
                } else {
                    DrawOp::LineTo { x, y }
                }
            }
            "quadraticCurveTo" => {
                args.expect_len(4, 4)?;
                DrawOp::QuadraticCurveTo {
                    cpx: args.num(0)?,
                    cpy: args.num(1)?,
                    x: args.num(2)?,
                    y: args.num(3)?,
                }
            }
            "bezierCurveTo" => {
                args.expect_len(6, 6)?;
                DrawOp::BezierCurveTo {
                    cp1x: args.num(0)?,
                    cp1y: args.num(1)?,
                    cp2x: args.num(2)?,
                    cp2y: args.num(3)?,
                    x: args.num(4)?,
                    y: args.num(5)?,
                }
            }
            "rect" => {
                let (x, y, w, h) = args.rect()?;
                DrawOp::Rect { x, y, w, h }
            }
            "fillRect" => {
                let (x, y, w, h) = args.rect()?;
                DrawOp::FillRect { x, y, w, h }
            }
            "strokeRect" => {
                let (x, y, w, h) = args.rect()?;
                DrawOp::StrokeRect { x, y, w, h }
            }
            "clearRect" => {
                let (x, y, w, h) = args.rect()?;
                DrawOp::ClearRect { x, y, w, h }
            }
            "arc" => {
                args.expect_len(5, 6)?;
                DrawOp::Arc {
                    x: args.num(0)?,
                    y: args.num(1)?,
                    r: args.num(2)?,
                    start: args.num(3)?,
                    end: args.num(4)?,
                    ccw: args.flag(5)?,
                }
            }
            "fillText" => {
                args.expect_len(3, 4)?;
                DrawOp::FillText { text: args.string(0)?, x: args.num(1)?, y: args.num(2)? }
            }
            other => return Err(DrawOpError::Unknown(other.to_string())),
        };
        Ok(op)
    }
}

fn split_args(s: &str) -> Result<Vec<Arg>, DrawOpError> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut was_quoted = false;

    for c in s.chars() {
        if let Some(q) = quote {
            if escaped {
                current.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            '"' | '\'' if !was_quoted && current.trim().is_empty() => {
                current.clear();
                quote = Some(c);
                was_quoted = true;
            }
            ',' => {
                items.push(to_arg(&current, was_quoted)?);
                current.clear();
                was_quoted = false;
            }
            c if was_quoted => {
                if !c.is_whitespace() {
                    return Err(DrawOpError::Malformed(s.to_string()));
                }
            }
            c => current.push(c),
        }
    }
    if quote.is_some() {
        return Err(DrawOpError::Malformed(s.to_string()));
    }
    if was_quoted || !current.trim().is_empty() {
        items.push(to_arg(&current, was_quoted)?);
    } else if !items.is_empty() {
        // trailing comma
        return Err(DrawOpError::Malformed(s.to_string()));
    }
    Ok(items)
}

fn to_arg(raw: &str, quoted: bool) -> Result<Arg, DrawOpError> {
    if quoted {
        return Ok(Arg::Str(raw.to_string()));
    }
    let raw = raw.trim();
    match raw {
        "true" => Ok(Arg::Bool(true)),
        "false" => Ok(Arg::Bool(false)),
        _ => raw
            .parse::<f64>()
            .map(Arg::Num)
            .map_err(|_| DrawOpError::Malformed(raw.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DrawState {
    fill: String,
    stroke: String,
    line_width: f64,
    font: String,
    alpha: f64,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            fill: "#000000".into(),
            stroke: "#000000".into(),
            line_width: 1.0,
            font: "10px sans-serif".into(),
            alpha: 1.0,
        }
    }
}

/// Something painted onto the canvas, with styles resolved at paint time.
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Fill { d: String, color: String, alpha: f64 },
    Stroke { d: String, color: String, width: f64, alpha: f64 },
    Clear { x: f64, y: f64, w: f64, h: f64 },
    Text { text: String, x: f64, y: f64, font: String, color: String, alpha: f64 },
}

/// A fixed-size drawing surface that records painted marks.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
    state: DrawState,
    saved: Vec<DrawState>,
    path: String,
    has_point: bool,
    marks: Vec<Mark>,
    ops_applied: usize,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: DrawState::default(),
            saved: Vec::new(),
            path: String::new(),
            has_point: false,
            marks: Vec::new(),
            ops_applied: 0,
        }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Number of operations replayed onto this canvas.
    pub fn ops_applied(&self) -> usize {
        self.ops_applied
    }

    pub fn apply(&mut self, op: DrawOp) {
        self.ops_applied += 1;
        match op {
            DrawOp::FillStyle(c) => self.state.fill = c,
            DrawOp::StrokeStyle(c) => self.state.stroke = c,
            DrawOp::LineWidth(w) => self.state.line_width = w,
            DrawOp::Font(f) => self.state.font = f,
            DrawOp::GlobalAlpha(a) => self.state.alpha = a.clamp(0.0, 1.0),
            DrawOp::Save => self.saved.push(self.state.clone()),
            DrawOp::Restore => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            DrawOp::BeginPath => {
                self.path.clear();
                self.has_point = false;
            }
            DrawOp::ClosePath => {
                if self.has_point {
                    self.path.push_str("Z ");
                }
            }
            DrawOp::MoveTo { x, y } => {
                let _ = write!(self.path, "M {} {} ", num(x), num(y));
                self.has_point = true;
            }
            DrawOp::LineTo { x, y } => {
                let cmd = if self.has_point { "L" } else { "M" };
                let _ = write!(self.path, "{cmd} {} {} ", num(x), num(y));
                self.has_point = true;
            }
            DrawOp::QuadraticCurveTo { cpx, cpy, x, y } => {
                self.ensure_point(cpx, cpy);
                let _ = write!(self.path, "Q {} {} {} {} ", num(cpx), num(cpy), num(x), num(y));
            }
            DrawOp::BezierCurveTo { cp1x, cp1y, cp2x, cp2y, x, y } => {
                self.ensure_point(cp1x, cp1y);
                let _ = write!(
                    self.path,
                    "C {} {} {} {} {} {} ",
                    num(cp1x),
                    num(cp1y),
                    num(cp2x),
                    num(cp2y),
                    num(x),
                    num(y)
                );
            }
            DrawOp::Rect { x, y, w, h } => {
                self.path.push_str(&rect_path(x, y, w, h));
                self.has_point = true;
            }
            DrawOp::Arc { x, y, r, start, end, ccw } => {
                self.arc(x, y, r, start, end, ccw);
            }
            DrawOp::Fill => {
                if !self.path.is_empty() {
                    self.marks.push(Mark::Fill {
                        d: self.path.trim_end().to_string(),
                        color: self.state.fill.clone(),
                        alpha: self.state.alpha,
                    });
                }
            }
            DrawOp::Stroke => {
                if !self.path.is_empty() {
                    let mark = self.stroke_mark(self.path.trim_end().to_string());
                    self.marks.push(mark);
                }
            }
            DrawOp::FillRect { x, y, w, h } => self.marks.push(Mark::Fill {
                d: rect_path(x, y, w, h).trim_end().to_string(),
                color: self.state.fill.clone(),
                alpha: self.state.alpha,
            }),
            DrawOp::StrokeRect { x, y, w, h } => {
                let mark = self.stroke_mark(rect_path(x, y, w, h).trim_end().to_string());
                self.marks.push(mark);
            }
            DrawOp::ClearRect { x, y, w, h } => {
                let covers = x <= 0.0
                    && y <= 0.0
                    && x + w >= f64::from(self.width)
                    && y + h >= f64::from(self.height);
                if covers {
                    self.marks.clear();
                } else {
                    self.marks.push(Mark::Clear { x, y, w, h });
                }
            }
            DrawOp::FillText { text, x, y } => self.marks.push(Mark::Text {
                text,
                x,
                y,
                font: self.state.font.clone(),
                color: self.state.fill.clone(),
                alpha: self.state.alpha,
            }),
            DrawOp::Ignored(name) => debug!(op = %name, "canvas operation not rendered"),
        }
    }

    /// A curve on an empty path starts at its first control point.
    fn ensure_point(&mut self, x: f64, y: f64) {
        if !self.has_point {
            let _ = write!(self.path, "M {} {} ", num(x), num(y));
            self.has_point = true;
        }
    }

    fn stroke_mark(&self, d: String) -> Mark {
        Mark::Stroke {
            d,
            color: self.state.stroke.clone(),
            width: self.state.line_width,
            alpha: self.state.alpha,
        }
    }

    fn arc(&mut self, cx: f64, cy: f64, r: f64, start: f64, end: f64, ccw: bool) {
        let point = |a: f64| (cx + r * a.cos(), cy + r * a.sin());
        let (sx, sy) = point(start);
        let cmd = if self.has_point { "L" } else { "M" };
        let _ = write!(self.path, "{cmd} {} {} ", num(sx), num(sy));
        self.has_point = true;

        let sweep_flag = if ccw { 0 } else { 1 };
        let span = if ccw { start - end } else { end - start };
        if span >= TAU {
            // SVG cannot draw a full circle with one arc command.
            let mid = if ccw { start - PI } else { start + PI };
            let (mx, my) = point(mid);
            let _ = write!(
                self.path,
                "A {r} {r} 0 0 {sweep_flag} {} {} A {r} {r} 0 0 {sweep_flag} {} {} ",
                num(mx),
                num(my),
                num(sx),
                num(sy),
                r = num(r),
            );
            return;
        }
        let span = span.rem_euclid(TAU);
        let large = if span > PI { 1 } else { 0 };
        let (ex, ey) = point(end);
        let _ = write!(
            self.path,
            "A {r} {r} 0 {large} {sweep_flag} {} {} ",
            num(ex),
            num(ey),
            r = num(r),
        );
    }

    /// Render the recorded marks as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = self.width,
            h = self.height
        );
        for mark in &self.marks {
            let _ = match mark {
                Mark::Fill { d, color, alpha } => writeln!(
                    svg,
                    "  <path d=\"{}\" fill=\"{}\" fill-opacity=\"{}\"/>",
                    d,
                    xml_escape(color),
                    num(*alpha)
                ),
                Mark::Stroke { d, color, width, alpha } => writeln!(
                    svg,
                    "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-opacity=\"{}\"/>",
                    d,
                    xml_escape(color),
                    num(*width),
                    num(*alpha)
                ),
                Mark::Clear { x, y, w, h } => writeln!(
                    svg,
                    "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"white\"/>",
                    num(*x),
                    num(*y),
                    num(*w),
                    num(*h)
                ),
                Mark::Text { text, x, y, font, color, alpha } => writeln!(
                    svg,
                    "  <text x=\"{}\" y=\"{}\" style=\"font: {}\" fill=\"{}\" fill-opacity=\"{}\">{}</text>",
                    num(*x),
                    num(*y),
                    xml_escape(font),
                    xml_escape(color),
                    num(*alpha),
                    xml_escape(text)
                ),
            };
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl Serialize for Canvas {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Canvas", 3)?;
        s.serialize_field("width", &self.width)?;
        s.serialize_field("height", &self.height)?;
        s.serialize_field("svg", &self.to_svg())?;
        s.end()
    }
}

fn rect_path(x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        "M {} {} H {} V {} H {} Z ",
        num(x),
        num(y),
        num(x + w),
        num(y + h),
        num(x)
    )
}

fn num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_calls_and_setters() {
        assert_eq!("beginPath()".parse::<DrawOp>(), Ok(DrawOp::BeginPath));
        assert_eq!(
            "moveTo(1.5, -2)".parse::<DrawOp>(),
            Ok(DrawOp::MoveTo { x: 1.5, y: -2.0 })
        );
        assert_eq!(
            "fillStyle = \"rgba(255, 0, 0, 1)\";".parse::<DrawOp>(),
            Ok(DrawOp::FillStyle("rgba(255, 0, 0, 1)".into()))
        );
        assert_eq!("lineWidth = 2.5".parse::<DrawOp>(), Ok(DrawOp::LineWidth(2.5)));
        assert_eq!(
            "fillText('a, b', 10, 20)".parse::<DrawOp>(),
            Ok(DrawOp::FillText { text: "a, b".into(), x: 10.0, y: 20.0 })
        );
        assert_eq!(
            "arc(5, 5, 2, 0, 3.14, true)".parse::<DrawOp>(),
            Ok(DrawOp::Arc { x: 5.0, y: 5.0, r: 2.0, start: 0.0, end: 3.14, ccw: true })
        );
    }

    #[test]
    fn rejects_bad_ops() {
        assert_eq!("".parse::<DrawOp>(), Err(DrawOpError::Empty));
        assert_eq!(
            "drawCircle(1)".parse::<DrawOp>(),
            Err(DrawOpError::Unknown("drawCircle".into()))
        );
        assert!(matches!(
            "fillRect(1, 2)".parse::<DrawOp>(),
            Err(DrawOpError::Arity { found: 2, .. })
        ));
        assert!(matches!(
            "moveTo('a', 2)".parse::<DrawOp>(),
            Err(DrawOpError::BadArg { index: 0, .. })
        ));
        assert!(matches!("fillRect(1, 2".parse::<DrawOp>(), Err(DrawOpError::Malformed(_))));
        assert!(matches!("fillText('abc, 1, 2)".parse::<DrawOp>(), Err(DrawOpError::Malformed(_))));
    }

    #[test]
    fn save_restore_round_trips_state() {
        let mut c = Canvas::square(10);
        c.apply(DrawOp::FillStyle("red".into()));
        c.apply(DrawOp::Save);
        c.apply(DrawOp::FillStyle("blue".into()));
        c.apply(DrawOp::Restore);
        c.apply(DrawOp::FillRect { x: 0.0, y: 0.0, w: 1.0, h: 1.0 });
        match &c.marks()[0] {
            Mark::Fill { color, .. } => assert_eq!(color, "red"),
            other => panic!("unexpected mark {other:?}"),
        }
    }

    #[test]
    fn path_is_painted_with_current_style() {
        let mut c = Canvas::square(100);
        c.apply(DrawOp::BeginPath);
        c.apply(DrawOp::MoveTo { x: 0.0, y: 0.0 });
        c.apply(DrawOp::LineTo { x: 10.0, y: 10.0 });
        c.apply(DrawOp::LineWidth(3.0));
        c.apply(DrawOp::Stroke);
        assert_eq!(
            c.marks(),
            &[Mark::Stroke {
                d: "M 0 0 L 10 10".into(),
                color: "#000000".into(),
                width: 3.0,
                alpha: 1.0,
            }]
        );
    }

    #[test]
    fn full_clear_drops_earlier_marks() {
        let mut c = Canvas::square(100);
        c.apply(DrawOp::FillRect { x: 0.0, y: 0.0, w: 5.0, h: 5.0 });
        c.apply(DrawOp::ClearRect { x: 0.0, y: 0.0, w: 100.0, h: 100.0 });
        assert!(c.marks().is_empty());
        c.apply(DrawOp::ClearRect { x: 0.0, y: 0.0, w: 5.0, h: 5.0 });
        assert_eq!(c.marks().len(), 1);
        assert_eq!(c.ops_applied(), 3);
    }

    #[test]
    fn svg_contains_marks() {
        let mut c = Canvas::square(1008);
        c.apply(DrawOp::FillStyle("#ff0000".into()));
        c.apply(DrawOp::FillRect { x: 1.0, y: 2.0, w: 3.0, h: 4.0 });
        c.apply(DrawOp::FillText { text: "a<b".into(), x: 5.0, y: 6.0 });
        c.apply(DrawOp::BeginPath);
        c.apply(DrawOp::Arc { x: 50.0, y: 50.0, r: 10.0, start: 0.0, end: TAU, ccw: false });
        c.apply(DrawOp::Fill);
        let svg = c.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("width=\"1008\""));
        assert!(svg.contains("M 1 2 H 4 V 6 H 1 Z"));
        assert!(svg.contains("a&lt;b"));
        assert!(svg.contains("A 10 10 0 0 1 40 50"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn arity_errors_report_the_accepted_range() {
        let err = "arc(1, 2, 3, 4, 5, true, 7)".parse::<DrawOp>().unwrap_err();
        assert_eq!(err.to_string(), "`arc` expects 5 to 6 arguments, got 7");
        let err = "fillRect(1, 2)".parse::<DrawOp>().unwrap_err();
        assert_eq!(err.to_string(), "`fillRect` expects 4 arguments, got 2");
    }

    #[test]
    fn unrendered_canvas_calls_are_accepted() {
        for op in [
            "lineCap = \"round\"",
            "lineJoin = 'bevel'",
            "textAlign = \"center\"",
            "setLineDash([5, 3])",
            "translate(10, 10)",
            "rotate(0.5)",
            "clip()",
        ] {
            let parsed = op.parse::<DrawOp>();
            assert!(matches!(parsed, Ok(DrawOp::Ignored(_))), "{op}: {parsed:?}");
        }

        let mut c = Canvas::square(10);
        c.apply(DrawOp::Ignored("translate".into()));
        assert_eq!(c.ops_applied(), 1);
        assert!(c.marks().is_empty());
    }

    #[test]
    fn curves_extend_the_current_path() {
        let mut c = Canvas::square(100);
        for op in [
            "beginPath()",
            "moveTo(0, 0)",
            "quadraticCurveTo(5, 10, 10, 0)",
            "bezierCurveTo(12, 5, 18, 5, 20, 0)",
            "stroke()",
        ] {
            c.apply(op.parse().unwrap());
        }
        match &c.marks()[0] {
            Mark::Stroke { d, .. } => assert_eq!(d, "M 0 0 Q 5 10 10 0 C 12 5 18 5 20 0"),
            other => panic!("unexpected mark {other:?}"),
        }
    }
}
