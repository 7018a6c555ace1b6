//! Flat XML envelope used by the v2 API.
//!
//! Requests, responses and notifications all share one shape:
//!
//! ```xml
//! <xml>
//!   <appid><![CDATA[wx7065330377b79c60]]></appid>
//!   <total_fee>1</total_fee>
//! </xml>
//! ```
//!
//! Only one level of children is allowed below `<xml>`.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;

/// Name of the root element.
pub const ROOT: &str = "xml";

/// Errors produced while decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("malformed xml: {0}")]
    Malformed(#[from] quick_xml::Error),
    #[error("invalid utf-8 in xml: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("missing <xml> root element")]
    MissingRoot,
    #[error("unexpected nested element <{0}>")]
    Nested(String),
    #[error("unexpected end of document")]
    UnexpectedEof,
}

/// Decode an envelope into a field map.
///
/// Values may be CDATA sections or escaped text. Repeated fields keep the
/// last value.
pub fn decode(xml: &str) -> Result<BTreeMap<String, String>, XmlError> {
    // No trimming: values are signed byte for byte. Whitespace between
    // elements arrives as text outside any field and is dropped below.
    let mut reader = Reader::from_str(xml);

    let mut fields = BTreeMap::new();
    let mut in_root = false;
    let mut field: Option<String> = None;
    let mut value = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = std::str::from_utf8(e.name().as_ref())?.to_owned();
                if !in_root {
                    if name != ROOT {
                        return Err(XmlError::MissingRoot);
                    }
                    in_root = true;
                } else if field.is_some() {
                    return Err(XmlError::Nested(name));
                } else {
                    value.clear();
                    field = Some(name);
                }
            }
            Event::Empty(e) => {
                let name = std::str::from_utf8(e.name().as_ref())?.to_owned();
                match (in_root, field.is_some()) {
                    (false, _) if name == ROOT => return Ok(fields),
                    (false, _) => return Err(XmlError::MissingRoot),
                    (true, false) => {
                        fields.insert(name, String::new());
                    }
                    (true, true) => return Err(XmlError::Nested(name)),
                }
            }
            Event::Text(t) if field.is_some() => value.push_str(&t.unescape()?),
            Event::CData(c) if field.is_some() => value.push_str(std::str::from_utf8(&c)?),
            Event::End(_) => match field.take() {
                Some(name) => {
                    fields.insert(name, std::mem::take(&mut value));
                }
                None => return Ok(fields),
            },
            Event::Eof if in_root => return Err(XmlError::UnexpectedEof),
            Event::Eof => return Err(XmlError::MissingRoot),
            _ => {}
        }
    }
}

/// Encode a field map as an envelope.
///
/// Numeric values are written bare and everything else inside CDATA, the
/// way the provider itself formats its messages.
pub fn encode(fields: &BTreeMap<String, String>) -> String {
    let mut out = String::from("<xml>");
    for (name, value) in fields {
        out.push('<');
        out.push_str(name);
        out.push('>');
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            out.push_str(value);
        } else if value.contains("]]>") {
            out.push_str(&quick_xml::escape::escape(value.as_str()));
        } else {
            out.push_str("<![CDATA[");
            out.push_str(value);
            out.push_str("]]>");
        }
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
    out.push_str("</xml>");
    out
}
