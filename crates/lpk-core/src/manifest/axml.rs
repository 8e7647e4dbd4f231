//! Android binary XML (AXML) decoder.
//!
//! Manifests inside built APKs are stored in a chunked binary format rather
//! than text. The decoder walks the chunks, resolves names through the string
//! pool and rebuilds the same [`XmlElement`] tree the text reader produces.
//! Typed attribute values are rendered the way `aapt dump xmltree` shows them
//! (`@0x7f0b0001` for references, decimal for ints).

use super::xml::{XmlAttribute, XmlElement, attach};

const RES_XML_TYPE: u16 = 0x0003;
const RES_STRING_POOL_TYPE: u16 = 0x0001;
const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;
const RES_XML_END_ELEMENT_TYPE: u16 = 0x0103;
const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;

const UTF8_FLAG: u32 = 1 << 8;
const NO_INDEX: u32 = 0xFFFF_FFFF;

const TYPE_REFERENCE: u8 = 0x01;
const TYPE_STRING: u8 = 0x03;
const TYPE_INT_DEC: u8 = 0x10;
const TYPE_INT_HEX: u8 = 0x11;
const TYPE_INT_BOOLEAN: u8 = 0x12;

/// Framework resource ids of attributes, used when a stripped APK leaves the
/// attribute name empty in the string pool.
const KNOWN_ATTRIBUTES: &[(u32, &str)] = &[
    (0x0101_0001, "label"),
    (0x0101_0003, "name"),
    (0x0101_0010, "exported"),
];

/// Magic bytes at the start of every binary XML document.
pub const AXML_MAGIC: [u8; 4] = [0x03, 0x00, 0x08, 0x00];

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AxmlError {
    #[error("binary XML truncated at offset {0}")]
    Truncated(usize),

    #[error("not a binary XML document")]
    BadMagic,

    #[error("invalid chunk at offset {offset}: {reason}")]
    BadChunk { offset: usize, reason: &'static str },

    #[error("string index {0} out of range")]
    BadString(u32),

    #[error("document has no root element")]
    Empty,
}

/// Whether `data` starts like a binary XML document.
pub fn is_binary_xml(data: &[u8]) -> bool {
    data.starts_with(&AXML_MAGIC)
}

struct Cursor<'a> {
    data: &'a [u8],
}

impl Cursor<'_> {
    fn u8(&self, at: usize) -> Result<u8, AxmlError> {
        self.data.get(at).copied().ok_or(AxmlError::Truncated(at))
    }

    fn u16(&self, at: usize) -> Result<u16, AxmlError> {
        let bytes = self.data.get(at..at + 2).ok_or(AxmlError::Truncated(at))?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&self, at: usize) -> Result<u32, AxmlError> {
        let bytes = self.data.get(at..at + 4).ok_or(AxmlError::Truncated(at))?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn slice(&self, at: usize, len: usize) -> Result<&[u8], AxmlError> {
        self.data.get(at..at + len).ok_or(AxmlError::Truncated(at))
    }
}

struct ChunkHeader {
    kind: u16,
    header_size: usize,
    size: usize,
}

fn chunk_header(cur: &Cursor<'_>, at: usize) -> Result<ChunkHeader, AxmlError> {
    let header = ChunkHeader {
        kind: cur.u16(at)?,
        header_size: cur.u16(at + 2)? as usize,
        size: cur.u32(at + 4)? as usize,
    };
    if header.header_size < 8 || header.size < header.header_size {
        return Err(AxmlError::BadChunk {
            offset: at,
            reason: "inconsistent chunk sizes",
        });
    }
    if at + header.size > cur.data.len() {
        return Err(AxmlError::Truncated(at));
    }
    Ok(header)
}

/// Length prefix of a UTF-8 pool string: one byte, or two if the high bit is set.
fn utf8_len(cur: &Cursor<'_>, at: usize) -> Result<(usize, usize), AxmlError> {
    let first = cur.u8(at)? as usize;
    if first & 0x80 == 0 {
        Ok((first, 1))
    } else {
        Ok((((first & 0x7f) << 8) | cur.u8(at + 1)? as usize, 2))
    }
}

fn read_string_pool(cur: &Cursor<'_>, at: usize) -> Result<Vec<String>, AxmlError> {
    let header = chunk_header(cur, at)?;
    let count = cur.u32(at + 8)? as usize;
    let flags = cur.u32(at + 16)?;
    let strings_start = at + cur.u32(at + 20)? as usize;
    let offsets_start = at + header.header_size;

    // One u32 offset per string must fit in the chunk body.
    if count > (header.size - header.header_size) / 4 {
        return Err(AxmlError::BadChunk {
            offset: at,
            reason: "string count exceeds pool size",
        });
    }

    let mut pool = Vec::with_capacity(count);
    for i in 0..count {
        let offset = strings_start + cur.u32(offsets_start + i * 4)? as usize;
        let value = if flags & UTF8_FLAG != 0 {
            let (_chars, skip_chars) = utf8_len(cur, offset)?;
            let (bytes, skip_bytes) = utf8_len(cur, offset + skip_chars)?;
            let start = offset + skip_chars + skip_bytes;
            String::from_utf8_lossy(cur.slice(start, bytes)?).into_owned()
        } else {
            let mut len = cur.u16(offset)? as usize;
            let mut start = offset + 2;
            if len & 0x8000 != 0 {
                len = ((len & 0x7fff) << 16) | cur.u16(offset + 2)? as usize;
                start += 2;
            }
            let units: Vec<u16> = cur
                .slice(start, len * 2)?
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        };
        pool.push(value);
    }
    Ok(pool)
}

fn pool_string(pool: &[String], index: u32) -> Result<Option<&str>, AxmlError> {
    if index == NO_INDEX {
        return Ok(None);
    }
    pool.get(index as usize)
        .map(|s| Some(s.as_str()))
        .ok_or(AxmlError::BadString(index))
}

fn typed_value(pool: &[String], data_type: u8, data: u32) -> Result<String, AxmlError> {
    Ok(match data_type {
        TYPE_STRING => pool_string(pool, data)?.unwrap_or_default().to_string(),
        TYPE_REFERENCE => format!("@0x{data:08x}"),
        TYPE_INT_DEC => (data as i32).to_string(),
        TYPE_INT_HEX => format!("0x{data:08x}"),
        TYPE_INT_BOOLEAN => (data != 0).to_string(),
        _ => data.to_string(),
    })
}

fn read_start_element(
    cur: &Cursor<'_>,
    at: usize,
    header_size: usize,
    pool: &[String],
    resource_ids: &[u32],
) -> Result<XmlElement, AxmlError> {
    let ext = at + header_size;
    let name = pool_string(pool, cur.u32(ext + 4)?)?.unwrap_or_default();
    let attribute_start = cur.u16(ext + 8)? as usize;
    let attribute_size = cur.u16(ext + 10)? as usize;
    let attribute_count = cur.u16(ext + 12)? as usize;
    if attribute_size < 20 {
        return Err(AxmlError::BadChunk {
            offset: at,
            reason: "attribute record too small",
        });
    }

    let mut element = XmlElement::new(name);
    for i in 0..attribute_count {
        let a = ext + attribute_start + i * attribute_size;
        let ns = pool_string(pool, cur.u32(a)?)?;
        let name_index = cur.u32(a + 4)?;
        let mut attr_name = pool_string(pool, name_index)?.unwrap_or_default().to_string();
        if attr_name.is_empty() {
            let resource = resource_ids.get(name_index as usize).copied();
            if let Some((_, known)) = KNOWN_ATTRIBUTES.iter().find(|(id, _)| Some(*id) == resource) {
                attr_name = (*known).to_string();
            }
        }

        let raw_value = cur.u32(a + 8)?;
        let data_type = cur.u8(a + 15)?;
        let data = cur.u32(a + 16)?;
        let value = match pool_string(pool, raw_value)? {
            Some(raw) => raw.to_string(),
            None => typed_value(pool, data_type, data)?,
        };

        element.attributes.push(XmlAttribute {
            namespace: ns.filter(|n| !n.is_empty()).map(str::to_string),
            name: attr_name,
            value,
        });
    }
    Ok(element)
}

/// Decode a binary XML document into its root element.
///
/// # Errors
///
/// Fails on a bad magic number, truncated or inconsistent chunks, or string
/// references outside the pool.
pub fn parse_binary_xml(data: &[u8]) -> Result<XmlElement, AxmlError> {
    let cur = Cursor { data };
    if cur.u16(0)? != RES_XML_TYPE {
        return Err(AxmlError::BadMagic);
    }
    let root_header = chunk_header(&cur, 0)?;

    let mut pool: Vec<String> = Vec::new();
    let mut resource_ids: Vec<u32> = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    let mut at = root_header.header_size;
    while at + 8 <= root_header.size {
        let header = chunk_header(&cur, at)?;
        match header.kind {
            RES_STRING_POOL_TYPE => pool = read_string_pool(&cur, at)?,
            RES_XML_RESOURCE_MAP_TYPE => {
                let count = (header.size - header.header_size) / 4;
                resource_ids = (0..count)
                    .map(|i| cur.u32(at + header.header_size + i * 4))
                    .collect::<Result<_, _>>()?;
            }
            RES_XML_START_ELEMENT_TYPE => {
                stack.push(read_start_element(
                    &cur,
                    at,
                    header.header_size,
                    &pool,
                    &resource_ids,
                )?);
            }
            RES_XML_END_ELEMENT_TYPE => {
                let element = stack.pop().ok_or(AxmlError::BadChunk {
                    offset: at,
                    reason: "unbalanced end element",
                })?;
                attach(&mut stack, &mut root, element);
            }
            // Namespaces, CDATA and unknown chunks carry nothing we need.
            _ => {}
        }
        at += header.size;
    }

    root.ok_or(AxmlError::Empty)
}


#[cfg(test)]
mod tests {
    use super::encode::{Node, Value, encode};
    use super::*;

    fn sample() -> Node {
        Node::new("manifest")
            .plain("package", "com.example.unit")
            .child(
                Node::new("application")
                    .android("label", Value::Str("Example".to_string()))
                    .child(
                        Node::new("activity")
                            .android("name", Value::Str("MainActivity".to_string()))
                            .android("exported", Value::Bool(true)),
                    ),
            )
    }

    #[test]
    fn test_decode_utf8_and_utf16_pools() {
        for utf8 in [true, false] {
            let data = encode(&sample(), utf8);
            assert!(is_binary_xml(&data));

            let root = parse_binary_xml(&data).unwrap();
            assert_eq!(root.name, "manifest");
            assert_eq!(root.attr("package"), Some("com.example.unit"));

            let app = &root.children[0];
            assert_eq!(app.android_attr("label"), Some("Example"));
            let activity = &app.children[0];
            assert_eq!(activity.android_attr("name"), Some("MainActivity"));
            assert_eq!(activity.android_attr("exported"), Some("true"));
        }
    }

    #[test]
    fn test_reference_values_are_rendered() {
        let node = Node::new("manifest").child(
            Node::new("application").android("label", Value::Ref(0x7f0b_0001)),
        );
        let root = parse_binary_xml(&encode(&node, true)).unwrap();
        assert_eq!(
            root.children[0].android_attr("label"),
            Some("@0x7f0b0001")
        );
    }

    #[test]
    fn test_rejects_text_and_truncation() {
        assert_eq!(
            parse_binary_xml(b"<manifest/>").unwrap_err(),
            AxmlError::BadMagic
        );

        let data = encode(&sample(), true);
        assert!(parse_binary_xml(&data[..data.len() - 10]).is_err());
    }

    #[test]
    fn test_rejects_string_count_larger_than_pool() {
        let mut data = Vec::new();
        // XML chunk wrapping a 28-byte string pool that claims u32::MAX strings.
        for v in [RES_XML_TYPE, 8] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&36u32.to_le_bytes());
        for v in [RES_STRING_POOL_TYPE, 28] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        for v in [28u32, u32::MAX, 0, 0, 0, 0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(data.len(), 36);

        assert!(matches!(
            parse_binary_xml(&data).unwrap_err(),
            AxmlError::BadChunk { offset: 8, .. }
        ));
    }
}
