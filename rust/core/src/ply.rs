// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PLY point cloud decoder
//!
//! The header is tokenized with nom one line at a time; the body is read
//! according to the declared encoding. Only the `vertex` element is kept,
//! every other element (faces, edges, custom records) is skipped.
//!
//! Supported encodings: `ascii`, `binary_little_endian`, `binary_big_endian`.

use memchr::memmem;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{digit1, space0, space1},
    combinator::{map, map_res, rest, value},
    sequence::{preceded, terminated, tuple},
    IResult,
};
use smallvec::SmallVec;

use crate::cloud::PointCloud;
use crate::error::{Error, Result};

/// Body encoding declared by the `format` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

/// PLY scalar types (both the classic and the sized names are accepted)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => ScalarType::I8,
            "uchar" | "uint8" => ScalarType::U8,
            "short" | "int16" => ScalarType::I16,
            "ushort" | "uint16" => ScalarType::U16,
            "int" | "int32" => ScalarType::I32,
            "uint" | "uint32" => ScalarType::U32,
            "float" | "float32" => ScalarType::F32,
            "double" | "float64" => ScalarType::F64,
            _ => return None,
        })
    }

    #[inline]
    pub fn size(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }

    /// Divisor that maps a colour channel of this type into 0..1
    fn colour_scale(self) -> f64 {
        match self {
            ScalarType::I8 => i8::MAX as f64,
            ScalarType::U8 => u8::MAX as f64,
            ScalarType::I16 => i16::MAX as f64,
            ScalarType::U16 => u16::MAX as f64,
            ScalarType::I32 => i32::MAX as f64,
            ScalarType::U32 => u32::MAX as f64,
            ScalarType::F32 | ScalarType::F64 => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDef {
    pub name: String,
    pub count: usize,
    pub properties: SmallVec<[PropertyDef; 8]>,
}

impl ElementDef {
    /// Row size in bytes when the element has no list properties
    fn fixed_row_size(&self) -> Option<usize> {
        self.properties.iter().try_fold(0, |acc, p| match p.kind {
            PropertyKind::Scalar(t) => Some(acc + t.size()),
            PropertyKind::List { .. } => None,
        })
    }

    fn property_index(&self, names: &[&str]) -> Option<usize> {
        self.properties
            .iter()
            .position(|p| names.contains(&p.name.as_str()))
    }
}

/// Parsed PLY header
#[derive(Debug, Clone)]
pub struct Header {
    pub encoding: Encoding,
    pub elements: Vec<ElementDef>,
    /// Byte offset of the first body byte
    pub body_offset: usize,
}

/// One meaningful header line
#[derive(Debug, Clone, PartialEq)]
enum HeaderLine<'a> {
    Format(Encoding),
    Element(&'a str, usize),
    Property(&'a str, PropertyKind),
    Ignored,
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

fn scalar_type(input: &str) -> IResult<&str, ScalarType> {
    map_res(word, |name: &str| ScalarType::from_name(name).ok_or(()))(input)
}

/// `format binary_little_endian 1.0`
fn format_line(input: &str) -> IResult<&str, HeaderLine> {
    map(
        preceded(
            terminated(tag("format"), space1),
            terminated(
                alt((
                    value(Encoding::Ascii, tag("ascii")),
                    value(Encoding::BinaryLittleEndian, tag("binary_little_endian")),
                    value(Encoding::BinaryBigEndian, tag("binary_big_endian")),
                )),
                rest,
            ),
        ),
        HeaderLine::Format,
    )(input)
}

/// `element vertex 1024`
fn element_line(input: &str) -> IResult<&str, HeaderLine> {
    map(
        tuple((
            terminated(tag("element"), space1),
            terminated(word, space1),
            terminated(map_res(digit1, |s: &str| s.parse::<usize>()), space0),
        )),
        |(_, name, count)| HeaderLine::Element(name, count),
    )(input)
}

/// `property float x` or `property list uchar int vertex_indices`
fn property_line(input: &str) -> IResult<&str, HeaderLine> {
    let list = map(
        tuple((
            terminated(tag("list"), space1),
            terminated(scalar_type, space1),
            terminated(scalar_type, space1),
            word,
        )),
        |(_, count, item, name)| HeaderLine::Property(name, PropertyKind::List { count, item }),
    );
    let scalar = map(
        tuple((terminated(scalar_type, space1), word)),
        |(t, name)| HeaderLine::Property(name, PropertyKind::Scalar(t)),
    );
    preceded(terminated(tag("property"), space1), alt((list, scalar)))(input)
}

fn ignored_line(input: &str) -> IResult<&str, HeaderLine> {
    value(
        HeaderLine::Ignored,
        alt((tag("comment"), tag("obj_info"), tag("ply"))),
    )(input)
}

fn header_line(input: &str) -> IResult<&str, HeaderLine> {
    alt((format_line, element_line, property_line, ignored_line))(input)
}

/// Check for the `ply` magic line
pub fn is_ply(bytes: &[u8]) -> bool {
    bytes.starts_with(b"ply\n") || bytes.starts_with(b"ply\r\n")
}

/// Parse the header and locate the body.
pub fn parse_header(bytes: &[u8]) -> Result<Header> {
    if !is_ply(bytes) {
        return Err(Error::header(1, "missing 'ply' magic"));
    }

    let marker = memmem::find(bytes, b"end_header")
        .ok_or_else(|| Error::header(0, "missing end_header"))?;
    let newline = memchr::memchr(b'\n', &bytes[marker..])
        .ok_or_else(|| Error::Truncated("header terminator".into()))?;
    let body_offset = marker + newline + 1;

    let text = std::str::from_utf8(&bytes[..marker])
        .map_err(|_| Error::header(0, "header is not valid UTF-8"))?;

    let mut encoding = None;
    let mut elements: Vec<ElementDef> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let (_, parsed) = header_line(line)
            .map_err(|_| Error::header(line_no, format!("unrecognized line '{}'", line)))?;

        match parsed {
            HeaderLine::Format(e) => encoding = Some(e),
            HeaderLine::Element(name, count) => elements.push(ElementDef {
                name: name.to_string(),
                count,
                properties: SmallVec::new(),
            }),
            HeaderLine::Property(name, kind) => {
                let element = elements.last_mut().ok_or_else(|| {
                    Error::header(line_no, "property declared before any element")
                })?;
                element.properties.push(PropertyDef {
                    name: name.to_string(),
                    kind,
                });
            }
            HeaderLine::Ignored => {}
        }
    }

    let encoding = encoding.ok_or_else(|| Error::header(0, "missing format line"))?;

    Ok(Header {
        encoding,
        elements,
        body_offset,
    })
}

/// Sequential scalar source over either an ASCII or a binary body
trait ValueSource {
    fn next_value(&mut self, ty: ScalarType) -> Result<f64>;

    /// Unread body bytes, an upper bound on the values still available
    fn remaining_len(&self) -> usize;

    /// Fail early when the body cannot hold `element.count` rows.
    fn ensure_rows(&self, _element: &ElementDef) -> Result<()> {
        Ok(())
    }

    /// Skip every row of an element. Binary sources jump over fixed-size rows.
    fn skip_element(&mut self, element: &ElementDef) -> Result<()> {
        for _ in 0..element.count {
            for prop in &element.properties {
                self.skip_property(prop.kind)?;
            }
        }
        Ok(())
    }

    fn skip_property(&mut self, kind: PropertyKind) -> Result<()> {
        match kind {
            PropertyKind::Scalar(t) => {
                self.next_value(t)?;
            }
            PropertyKind::List { count, item } => {
                let n = list_len(self.next_value(count)?)?;
                for _ in 0..n {
                    self.next_value(item)?;
                }
            }
        }
        Ok(())
    }
}

fn list_len(raw: f64) -> Result<usize> {
    if raw < 0.0 || raw.fract() != 0.0 {
        return Err(Error::invalid(format!("invalid list length {}", raw)));
    }
    Ok(raw as usize)
}

struct AsciiSource<'a> {
    len: usize,
    tokens: std::iter::Filter<std::slice::Split<'a, u8, fn(&u8) -> bool>, fn(&&'a [u8]) -> bool>,
}

impl<'a> AsciiSource<'a> {
    fn new(body: &'a [u8]) -> Self {
        fn is_sep(b: &u8) -> bool {
            b.is_ascii_whitespace()
        }
        fn non_empty(t: &&[u8]) -> bool {
            !t.is_empty()
        }
        Self {
            len: body.len(),
            tokens: body
                .split(is_sep as fn(&u8) -> bool)
                .filter(non_empty as fn(&&'a [u8]) -> bool),
        }
    }
}

impl ValueSource for AsciiSource<'_> {
    fn next_value(&mut self, _ty: ScalarType) -> Result<f64> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| Error::Truncated("ascii body".into()))?;
        lexical_core::parse::<f64>(token).map_err(|_| {
            Error::invalid(format!(
                "cannot parse '{}' as a number",
                String::from_utf8_lossy(token)
            ))
        })
    }

    fn remaining_len(&self) -> usize {
        self.len
    }
}

struct BinarySource<'a> {
    bytes: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> BinarySource<'a> {
    /// Body offset just past `element.count` rows of `row` bytes each
    fn fixed_rows_end(&self, element: &ElementDef, row: usize) -> Result<usize> {
        row.checked_mul(element.count)
            .and_then(|len| self.pos.checked_add(len))
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::Truncated(format!("element '{}'", element.name)))
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| Error::Truncated("binary body".into()))?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        if self.big_endian {
            buf.reverse();
        }
        self.pos = end;
        Ok(buf)
    }
}

impl ValueSource for BinarySource<'_> {
    fn next_value(&mut self, ty: ScalarType) -> Result<f64> {
        Ok(match ty {
            ScalarType::I8 => i8::from_le_bytes(self.take::<1>()?) as f64,
            ScalarType::U8 => u8::from_le_bytes(self.take::<1>()?) as f64,
            ScalarType::I16 => i16::from_le_bytes(self.take::<2>()?) as f64,
            ScalarType::U16 => u16::from_le_bytes(self.take::<2>()?) as f64,
            ScalarType::I32 => i32::from_le_bytes(self.take::<4>()?) as f64,
            ScalarType::U32 => u32::from_le_bytes(self.take::<4>()?) as f64,
            ScalarType::F32 => f32::from_le_bytes(self.take::<4>()?) as f64,
            ScalarType::F64 => f64::from_le_bytes(self.take::<8>()?),
        })
    }

    fn remaining_len(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn ensure_rows(&self, element: &ElementDef) -> Result<()> {
        match element.fixed_row_size() {
            Some(row) => self.fixed_rows_end(element, row).map(|_| ()),
            None => Ok(()),
        }
    }

    fn skip_element(&mut self, element: &ElementDef) -> Result<()> {
        match element.fixed_row_size() {
            Some(row) => {
                self.pos = self.fixed_rows_end(element, row)?;
                Ok(())
            }
            None => {
                for _ in 0..element.count {
                    for prop in &element.properties {
                        self.skip_property(prop.kind)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Where the vertex attributes sit inside a vertex row
struct VertexLayout {
    xyz: [usize; 3],
    rgb: Option<[usize; 3]>,
    rgb_types: [ScalarType; 3],
}

impl VertexLayout {
    fn resolve(element: &ElementDef) -> Result<Self> {
        let find = |names: &[&str]| element.property_index(names);
        let (Some(x), Some(y), Some(z)) = (find(&["x"]), find(&["y"]), find(&["z"])) else {
            return Err(Error::MissingPositions(
                "vertex element has no x/y/z properties".into(),
            ));
        };

        let rgb = match (
            find(&["red", "r", "diffuse_red"]),
            find(&["green", "g", "diffuse_green"]),
            find(&["blue", "b", "diffuse_blue"]),
        ) {
            (Some(r), Some(g), Some(b)) => Some([r, g, b]),
            _ => None,
        };

        let scalar = |i: usize| match element.properties[i].kind {
            PropertyKind::Scalar(t) => Ok(t),
            PropertyKind::List { .. } => Err(Error::invalid(format!(
                "vertex property '{}' must be a scalar",
                element.properties[i].name
            ))),
        };
        for i in [x, y, z] {
            scalar(i)?;
        }
        let rgb_types = match rgb {
            Some([r, g, b]) => [scalar(r)?, scalar(g)?, scalar(b)?],
            None => [ScalarType::U8; 3],
        };

        Ok(Self {
            xyz: [x, y, z],
            rgb,
            rgb_types,
        })
    }
}

/// Decode a complete PLY buffer into a point cloud.
pub fn parse_ply(bytes: &[u8]) -> Result<PointCloud> {
    let header = parse_header(bytes)?;
    let body = &bytes[header.body_offset..];

    match header.encoding {
        Encoding::Ascii => read_body(&header, &mut AsciiSource::new(body)),
        Encoding::BinaryLittleEndian | Encoding::BinaryBigEndian => read_body(
            &header,
            &mut BinarySource {
                bytes: body,
                pos: 0,
                big_endian: header.encoding == Encoding::BinaryBigEndian,
            },
        ),
    }
}

fn read_body(header: &Header, source: &mut impl ValueSource) -> Result<PointCloud> {
    let vertex_index = header
        .elements
        .iter()
        .position(|e| e.name == "vertex")
        .ok_or_else(|| Error::MissingPositions("no vertex element".into()))?;

    for element in &header.elements[..vertex_index] {
        source.skip_element(element)?;
    }

    let vertex = &header.elements[vertex_index];
    if vertex.count == 0 {
        return Err(Error::MissingPositions("vertex element is empty".into()));
    }
    let layout = VertexLayout::resolve(vertex)?;
    source.ensure_rows(vertex)?;

    // Each value takes at least one body byte, so the body bounds the row count
    let rows = vertex
        .count
        .min(source.remaining_len() / vertex.properties.len().max(1));
    let mut positions = Vec::with_capacity(rows * 3);
    let mut colors = layout.rgb.map(|_| Vec::with_capacity(rows * 3));
    let mut row: SmallVec<[f64; 16]> = SmallVec::with_capacity(vertex.properties.len());

    for _ in 0..vertex.count {
        row.clear();
        for prop in &vertex.properties {
            match prop.kind {
                PropertyKind::Scalar(t) => row.push(source.next_value(t)?),
                PropertyKind::List { .. } => {
                    source.skip_property(prop.kind)?;
                    row.push(0.0);
                }
            }
        }

        for &i in &layout.xyz {
            let v = row[i];
            if !v.is_finite() {
                return Err(Error::invalid(format!("non-finite coordinate {}", v)));
            }
            positions.push(v as f32);
        }

        if let (Some(colors), Some(rgb)) = (colors.as_mut(), layout.rgb) {
            for (&i, ty) in rgb.iter().zip(layout.rgb_types) {
                colors.push((row[i] / ty.colour_scale()).clamp(0.0, 1.0) as f32);
            }
        }
    }

    // Trailing elements (faces etc.) are not needed
    Ok(PointCloud::new(positions, colors))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_PLY: &str = "ply
format ascii 1.0
comment exported by a scanner
element vertex 3
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
element face 1
property list uchar int vertex_indices
end_header
0 0 0 255 0 0
1.5 2 -0.5 0 255 0
3 4 5 0 0 255
3 0 1 2
";

    #[test]
    fn test_header_lines() {
        assert_eq!(
            header_line("format binary_big_endian 1.0").unwrap().1,
            HeaderLine::Format(Encoding::BinaryBigEndian)
        );
        assert_eq!(
            header_line("element vertex 12").unwrap().1,
            HeaderLine::Element("vertex", 12)
        );
        assert_eq!(
            header_line("property list uchar uint vertex_indices").unwrap().1,
            HeaderLine::Property(
                "vertex_indices",
                PropertyKind::List {
                    count: ScalarType::U8,
                    item: ScalarType::U32
                }
            )
        );
        assert!(header_line("property quaternion q").is_err());
    }

    #[test]
    fn test_ascii_with_colour() {
        let cloud = parse_ply(ASCII_PLY.as_bytes()).unwrap();
        assert_eq!(cloud.count, 3);
        assert_eq!(cloud.positions[3..6], [1.5, 2.0, -0.5]);
        let colors = cloud.colors.unwrap();
        assert_eq!(colors[0..3], [1.0, 0.0, 0.0]);
        assert_eq!(colors[6..9], [0.0, 0.0, 1.0]);
        assert_eq!(cloud.bounds.min, [0.0, 0.0, -0.5]);
        assert_eq!(cloud.bounds.max, [3.0, 4.0, 5.0]);
    }

    fn binary_ply(big_endian: bool) -> Vec<u8> {
        let format = if big_endian {
            "binary_big_endian"
        } else {
            "binary_little_endian"
        };
        let mut bytes = format!(
            "ply\nformat {} 1.0\nelement vertex 2\nproperty double x\nproperty double y\nproperty double z\nproperty ushort intensity\nend_header\n",
            format
        )
        .into_bytes();
        for (x, y, z, i) in [(1.0f64, 2.0f64, 3.0f64, 7u16), (-1.0, 0.5, 10.0, 9)] {
            for v in [x, y, z] {
                if big_endian {
                    bytes.extend_from_slice(&v.to_be_bytes());
                } else {
                    bytes.extend_from_slice(&v.to_le_bytes());
                }
            }
            if big_endian {
                bytes.extend_from_slice(&i.to_be_bytes());
            } else {
                bytes.extend_from_slice(&i.to_le_bytes());
            }
        }
        bytes
    }

    #[test]
    fn test_binary_both_endians() {
        for big_endian in [false, true] {
            let cloud = parse_ply(&binary_ply(big_endian)).unwrap();
            assert_eq!(cloud.count, 2);
            assert!(cloud.colors.is_none());
            assert_eq!(cloud.positions, vec![1.0, 2.0, 3.0, -1.0, 0.5, 10.0]);
        }
    }

    #[test]
    fn test_truncated_binary_body() {
        let mut bytes = binary_ply(false);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(parse_ply(&bytes), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_missing_xyz() {
        let ply = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float u\nproperty float v\nend_header\n1 2\n";
        assert!(matches!(
            parse_ply(ply.as_bytes()),
            Err(Error::MissingPositions(_))
        ));
    }

    #[test]
    fn test_skips_leading_elements() {
        let ply = "ply\nformat ascii 1.0\nelement camera 1\nproperty float fov\nproperty list uchar float k\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n60 2 0.1 0.2\n4 5 6\n";
        let cloud = parse_ply(ply.as_bytes()).unwrap();
        assert_eq!(cloud.positions, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_oversized_vertex_count() {
        for count in ["9000000000000000000", "100000000000"] {
            let mut bytes = format!(
                "ply\nformat binary_little_endian 1.0\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\nend_header\n",
                count
            )
            .into_bytes();
            bytes.extend_from_slice(&[0u8; 24]);
            assert!(matches!(parse_ply(&bytes), Err(Error::Truncated(_))), "{}", count);
        }

        let ascii = "ply\nformat ascii 1.0\nelement vertex 100000000000\nproperty float x\nproperty float y\nproperty float z\nend_header\n1 2 3\n";
        assert!(matches!(parse_ply(ascii.as_bytes()), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_oversized_leading_element() {
        let mut bytes = b"ply\nformat binary_big_endian 1.0\nelement camera 9000000000000000000\nproperty double fov\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n".to_vec();
        bytes.extend_from_slice(&[0u8; 12]);
        assert!(matches!(parse_ply(&bytes), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_binary_wide_colour_channels() {
        let mut bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nproperty ushort red\nproperty ushort green\nproperty ushort blue\nend_header\n".to_vec();
        for (p, c) in [([0.0f32, 0.0, 0.0], [65535u16, 0, 32768]), ([1.0, 1.0, 1.0], [0, 65535, 0])] {
            for v in p {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            for v in c {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        let colors = parse_ply(&bytes).unwrap().colors.unwrap();
        assert_eq!(colors[0], 1.0);
        assert_eq!(colors[1], 0.0);
        assert!((colors[2] - 32768.0 / 65535.0).abs() < 1e-6);
        assert_eq!(colors[3..6], [0.0, 1.0, 0.0]);

        let mut bytes = b"ply\nformat binary_big_endian 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nproperty float diffuse_red\nproperty float diffuse_green\nproperty float diffuse_blue\nend_header\n".to_vec();
        for v in [2.0f32, 3.0, 4.0, 0.25, 1.5, -0.5] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        let cloud = parse_ply(&bytes).unwrap();
        assert_eq!(cloud.positions, vec![2.0, 3.0, 4.0]);
        // Float channels are already unit range and clamped into it
        assert_eq!(cloud.colors.unwrap(), vec![0.25, 1.0, 0.0]);
    }
}
