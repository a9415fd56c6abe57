//! Open Sound Control 1.0 packet codec.
//!
//! ## Layout
//!
//! ```text
//! message: [address, NUL-padded to 4] [",tags", NUL-padded to 4] [args...]
//! bundle:  ["#bundle\0"] [u64 time tag] ([i32 size] [element])*
//! ```
//!
//! All numeric fields are big-endian. Strings and blobs are padded to a
//! multiple of four bytes.

use thiserror::Error;

const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// Time tag meaning "process immediately".
pub const IMMEDIATELY: u64 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OscError {
    #[error("packet ended after {0} bytes")]
    Truncated(usize),

    #[error("packet size {0} is not a multiple of 4")]
    Misaligned(usize),

    #[error("string at byte {0} is unterminated or not UTF-8")]
    BadString(usize),

    #[error("invalid address pattern '{0}'")]
    BadAddress(String),

    #[error("type tag string must start with ','")]
    BadTypeTags,

    #[error("unsupported argument type '{0}'")]
    UnsupportedType(char),

    #[error("bundle element size {0} is invalid")]
    BadElementSize(i32),

    #[error("bundles nested deeper than {0} levels")]
    TooDeep(usize),
}

/// One message argument.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    String(String),
    Blob(Vec<u8>),
    Long(i64),
    Double(f64),
    Bool(bool),
    Nil,
    Inf,
}

impl OscArg {
    fn type_tag(&self) -> char {
        match self {
            Self::Int(_) => 'i',
            Self::Float(_) => 'f',
            Self::String(_) => 's',
            Self::Blob(_) => 'b',
            Self::Long(_) => 'h',
            Self::Double(_) => 'd',
            Self::Bool(true) => 'T',
            Self::Bool(false) => 'F',
            Self::Nil => 'N',
            Self::Inf => 'I',
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OscBundle {
    pub time_tag: u64,
    pub content: Vec<OscPacket>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OscPacket {
    Message(OscMessage),
    Bundle(OscBundle),
}

impl OscPacket {
    /// Every message in the packet, with bundles flattened in order.
    pub fn into_messages(self) -> Vec<OscMessage> {
        match self {
            Self::Message(message) => vec![message],
            Self::Bundle(bundle) => bundle.content.into_iter().flat_map(Self::into_messages).collect(),
        }
    }
}

impl From<OscMessage> for OscPacket {
    fn from(message: OscMessage) -> Self {
        Self::Message(message)
    }
}

pub fn encode(packet: &OscPacket) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(packet, &mut out);
    out
}

fn encode_into(packet: &OscPacket, out: &mut Vec<u8>) {
    match packet {
        OscPacket::Message(message) => encode_message(message, out),
        OscPacket::Bundle(bundle) => {
            out.extend_from_slice(BUNDLE_TAG);
            out.extend_from_slice(&bundle.time_tag.to_be_bytes());
            for element in &bundle.content {
                let start = out.len();
                out.extend_from_slice(&[0; 4]);
                encode_into(element, out);
                let size = (out.len() - start - 4) as u32;
                out[start..start + 4].copy_from_slice(&size.to_be_bytes());
            }
        }
    }
}

fn encode_message(message: &OscMessage, out: &mut Vec<u8>) {
    write_padded(out, message.address.as_bytes());

    let mut tags = String::with_capacity(message.args.len() + 1);
    tags.push(',');
    tags.extend(message.args.iter().map(OscArg::type_tag));
    write_padded(out, tags.as_bytes());

    for arg in &message.args {
        match arg {
            OscArg::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscArg::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscArg::String(s) => write_padded(out, s.as_bytes()),
            OscArg::Blob(data) => {
                out.extend_from_slice(&(data.len() as i32).to_be_bytes());
                out.extend_from_slice(data);
                out.resize(out.len() + pad_len(data.len()), 0);
            }
            OscArg::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscArg::Double(v) => out.extend_from_slice(&v.to_be_bytes()),
            OscArg::Bool(_) | OscArg::Nil | OscArg::Inf => {}
        }
    }
}

/// Write `bytes` plus a NUL terminator, padded to a multiple of four.
fn write_padded(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes);
    let terminated = bytes.len() + 1;
    out.resize(out.len() + 1 + pad_len(terminated), 0);
}

fn pad_len(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Deepest bundle nesting accepted by [`decode`].
pub const MAX_BUNDLE_DEPTH: usize = 8;

pub fn decode(bytes: &[u8]) -> Result<OscPacket, OscError> {
    decode_at(bytes, 0)
}

fn decode_at(bytes: &[u8], depth: usize) -> Result<OscPacket, OscError> {
    if bytes.is_empty() {
        return Err(OscError::Truncated(0));
    }
    if bytes.len() % 4 != 0 {
        return Err(OscError::Misaligned(bytes.len()));
    }
    let mut reader = Reader::new(bytes);
    if bytes.starts_with(BUNDLE_TAG) {
        if depth >= MAX_BUNDLE_DEPTH {
            return Err(OscError::TooDeep(MAX_BUNDLE_DEPTH));
        }
        decode_bundle(&mut reader, depth + 1)
    } else {
        decode_message(&mut reader).map(OscPacket::Message)
    }
}

fn decode_bundle(reader: &mut Reader<'_>, depth: usize) -> Result<OscPacket, OscError> {
    reader.take(BUNDLE_TAG.len())?;
    let time_tag = u64::from_be_bytes(reader.array()?);

    let mut content = Vec::new();
    while !reader.is_empty() {
        let size = i32::from_be_bytes(reader.array()?);
        if size < 0 || size % 4 != 0 {
            return Err(OscError::BadElementSize(size));
        }
        let element = reader.take(size as usize)?;
        content.push(decode_at(element, depth)?);
    }
    Ok(OscPacket::Bundle(OscBundle { time_tag, content }))
}

fn decode_message(reader: &mut Reader<'_>) -> Result<OscMessage, OscError> {
    let address = reader.string()?;
    if !address.starts_with('/') {
        return Err(OscError::BadAddress(address));
    }

    // Type tags are optional in very old senders; treat as no arguments.
    if reader.is_empty() {
        return Ok(OscMessage::new(address, Vec::new()));
    }
    let tags = reader.string()?;
    let Some(tags) = tags.strip_prefix(',') else {
        return Err(OscError::BadTypeTags);
    };

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let arg = match tag {
            'i' => OscArg::Int(i32::from_be_bytes(reader.array()?)),
            'f' => OscArg::Float(f32::from_be_bytes(reader.array()?)),
            's' => OscArg::String(reader.string()?),
            'b' => OscArg::Blob(reader.blob()?),
            'h' => OscArg::Long(i64::from_be_bytes(reader.array()?)),
            'd' => OscArg::Double(f64::from_be_bytes(reader.array()?)),
            'T' => OscArg::Bool(true),
            'F' => OscArg::Bool(false),
            'N' => OscArg::Nil,
            'I' => OscArg::Inf,
            other => return Err(OscError::UnsupportedType(other)),
        };
        args.push(arg);
    }
    Ok(OscMessage::new(address, args))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], OscError> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(OscError::Truncated(self.bytes.len()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], OscError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn string(&mut self) -> Result<String, OscError> {
        let start = self.pos;
        let rest = &self.bytes[start..];
        let len = rest.iter().position(|&b| b == 0).ok_or(OscError::BadString(start))?;
        let text = std::str::from_utf8(&rest[..len])
            .map_err(|_| OscError::BadString(start))?
            .to_string();
        self.take(len + 1 + pad_len(len + 1))?;
        Ok(text)
    }

    fn blob(&mut self) -> Result<Vec<u8>, OscError> {
        let size = i32::from_be_bytes(self.array()?);
        if size < 0 {
            return Err(OscError::BadElementSize(size));
        }
        let size = size as usize;
        let data = self.take(size)?.to_vec();
        self.take(pad_len(size))?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_argument_message_layout() {
        let bytes = encode(&OscMessage::new("/start_recording", Vec::new()).into());
        // 16 address bytes + NUL padded to 20, then ",\0\0\0".
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..16], b"/start_recording");
        assert_eq!(&bytes[16..20], &[0, 0, 0, 0]);
        assert_eq!(&bytes[20..], b",\0\0\0");
    }

    #[test]
    fn status_message_layout() {
        let message = OscMessage::new("/recorder_status", vec![OscArg::String("idle".into())]);
        let bytes = encode(&message.clone().into());
        assert_eq!(&bytes[20..24], b",s\0\0");
        assert_eq!(&bytes[24..], b"idle\0\0\0\0");
        assert_eq!(decode(&bytes).unwrap(), OscPacket::Message(message));
    }

    #[test]
    fn decodes_mixed_arguments() {
        let message = OscMessage::new(
            "/mix",
            vec![
                OscArg::Int(-7),
                OscArg::Float(0.5),
                OscArg::Blob(vec![1, 2, 3, 4, 5]),
                OscArg::Long(1 << 40),
                OscArg::Double(2.25),
                OscArg::Bool(true),
                OscArg::Bool(false),
                OscArg::Nil,
                OscArg::Inf,
                OscArg::String("recording".into()),
            ],
        );
        let bytes = encode(&message.clone().into());
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(decode(&bytes).unwrap(), OscPacket::Message(message));
    }

    #[test]
    fn bundles_flatten_in_order() {
        let packet = OscPacket::Bundle(OscBundle {
            time_tag: IMMEDIATELY,
            content: vec![
                OscMessage::new("/start_recording", Vec::new()).into(),
                OscPacket::Bundle(OscBundle {
                    time_tag: IMMEDIATELY,
                    content: vec![OscMessage::new("/stop_recording", Vec::new()).into()],
                }),
            ],
        });
        let bytes = encode(&packet);
        assert_eq!(&bytes[..8], b"#bundle\0");

        let addresses: Vec<String> = decode(&bytes)
            .unwrap()
            .into_messages()
            .into_iter()
            .map(|m| m.address)
            .collect();
        assert_eq!(addresses, vec!["/start_recording", "/stop_recording"]);
    }

    #[test]
    fn message_without_type_tags_has_no_args() {
        let decoded = decode(b"/stop_recording\0").unwrap();
        assert_eq!(decoded, OscPacket::Message(OscMessage::new("/stop_recording", Vec::new())));
    }

    #[test]
    fn rejects_malformed_packets() {
        assert_eq!(decode(b""), Err(OscError::Truncated(0)));
        assert_eq!(decode(b"/abc\0"), Err(OscError::Misaligned(5)));
        assert_eq!(decode(b"/abc"), Err(OscError::BadString(0)));
        assert!(matches!(decode(b"abc\0"), Err(OscError::BadAddress(_))));
        assert_eq!(decode(b"/ab\0xi\0\0"), Err(OscError::BadTypeTags));
        assert_eq!(decode(b"/ab\0,i\0\0"), Err(OscError::Truncated(8)));
        assert_eq!(decode(b"/ab\0,q\0\0"), Err(OscError::UnsupportedType('q')));
    }

    #[test]
    fn rejects_oversized_bundle_element() {
        let mut bytes = BUNDLE_TAG.to_vec();
        bytes.extend_from_slice(&IMMEDIATELY.to_be_bytes());
        bytes.extend_from_slice(&64i32.to_be_bytes());
        bytes.extend_from_slice(b"/a\0\0");
        assert_eq!(decode(&bytes), Err(OscError::Truncated(24)));
    }

    fn nested(levels: usize) -> OscPacket {
        let mut packet: OscPacket = OscMessage::new("/stop_recording", Vec::new()).into();
        for _ in 0..levels {
            packet = OscPacket::Bundle(OscBundle {
                time_tag: IMMEDIATELY,
                content: vec![packet],
            });
        }
        packet
    }

    #[test]
    fn bundle_nesting_is_bounded() {
        let deepest = nested(MAX_BUNDLE_DEPTH);
        assert_eq!(decode(&encode(&deepest)).unwrap(), deepest);

        let too_deep = encode(&nested(MAX_BUNDLE_DEPTH + 1));
        assert_eq!(decode(&too_deep), Err(OscError::TooDeep(MAX_BUNDLE_DEPTH)));

        let mut hostile = encode(&OscMessage::new("/stop_recording", Vec::new()).into());
        for _ in 0..1000 {
            let mut outer = BUNDLE_TAG.to_vec();
            outer.extend_from_slice(&IMMEDIATELY.to_be_bytes());
            outer.extend_from_slice(&(hostile.len() as i32).to_be_bytes());
            outer.extend_from_slice(&hostile);
            hostile = outer;
        }
        assert_eq!(decode(&hostile), Err(OscError::TooDeep(MAX_BUNDLE_DEPTH)));
    }
}
