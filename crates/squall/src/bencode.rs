use bytes::Bytes;
use std::collections::BTreeMap;
use thiserror::Error;

/// Maximum nesting depth the decoder accepts before giving up on the input.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BencodeError {
    #[error("malformed integer at offset {0}")]
    MalformedInteger(usize),
    #[error("malformed string length at offset {0}")]
    MalformedLength(usize),
    #[error("input truncated at offset {0}")]
    TruncatedInput(usize),
    #[error("nesting too deep")]
    DepthExceeded,
    #[error("duplicate dictionary key {0:?}")]
    DuplicateKey(Bytes),
    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },
    #[error("trailing data after offset {0}")]
    TrailingData(usize),
}

/// A decoded bencode value: integer, byte string, list, or dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Bytes(Bytes),
    List(Vec<Value>),
    Dict(BTreeMap<Bytes, Value>),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The value as a UTF-8 string, if it is a byte string holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Bytes, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` if this value is a dictionary.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?.get(key)
    }
}

/// Half-open `[start, end)` byte offsets of one encoded value in the
/// original buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSpan {
    pub start: usize,
    pub end: usize,
}

impl RawSpan {
    pub fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A fully decoded document: the value tree plus the raw span of the
/// captured top-level dictionary entry, if one was requested and present.
#[derive(Debug)]
pub struct Document {
    pub value: Value,
    pub captured: Option<RawSpan>,
}

/// Cursor-based bencode decoder.
///
/// Lenient by default: non-canonical integers such as `i-0e` or `i007e` are
/// accepted; `strict()` rejects them. `capture(key)` records the exact byte
/// span of the value bound to `key` in the top-level dictionary, covering
/// the input as received, unknown keys included.
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    strict: bool,
    capture_key: Option<&'a [u8]>,
    captured: Option<RawSpan>,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Decoder {
            input,
            pos: 0,
            strict: false,
            capture_key: None,
            captured: None,
        }
    }

    /// Rejects non-canonical integer encodings (`-0`, leading zeros).
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Records the raw span of the value bound to `key` in the top-level
    /// dictionary. Nested occurrences of `key` are not considered.
    pub fn capture(mut self, key: &'a [u8]) -> Self {
        self.capture_key = Some(key);
        self
    }

    /// Decodes exactly one value covering the whole input.
    pub fn decode_document(mut self) -> Result<Document, BencodeError> {
        let value = self.value(0)?;
        if self.pos != self.input.len() {
            return Err(BencodeError::TrailingData(self.pos));
        }
        Ok(Document {
            value,
            captured: self.captured,
        })
    }

    /// Decodes one value and reports how many bytes it consumed; trailing
    /// bytes are left for the caller.
    pub fn decode_prefix(mut self) -> Result<(Value, usize), BencodeError> {
        let value = self.value(0)?;
        Ok((value, self.pos))
    }

    fn peek(&self) -> Result<u8, BencodeError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(BencodeError::TruncatedInput(self.pos))
    }

    fn value(&mut self, depth: usize) -> Result<Value, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::DepthExceeded);
        }
        match self.peek()? {
            b'i' => self.integer(),
            b'l' => self.list(depth),
            b'd' => self.dict(depth),
            b'0'..=b'9' => {
                let raw = self.byte_string()?;
                Ok(Value::Bytes(Bytes::copy_from_slice(raw)))
            }
            byte => Err(BencodeError::UnexpectedByte {
                byte,
                offset: self.pos,
            }),
        }
    }

    fn integer(&mut self) -> Result<Value, BencodeError> {
        let start = self.pos;
        self.pos += 1;
        let digits_start = self.pos;
        while self.peek()? != b'e' {
            self.pos += 1;
        }
        let text = &self.input[digits_start..self.pos];
        let digits = text.strip_prefix(b"-").unwrap_or(text);
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(BencodeError::MalformedInteger(start));
        }
        if self.strict && (text == b"-0" || (digits.len() > 1 && digits[0] == b'0')) {
            return Err(BencodeError::MalformedInteger(start));
        }
        let text = std::str::from_utf8(text)
            .map_err(|_| BencodeError::MalformedInteger(start))?;
        let n: i64 = text
            .parse()
            .map_err(|_| BencodeError::MalformedInteger(start))?;
        self.pos += 1;
        Ok(Value::Integer(n))
    }

    /// `<length>:<raw bytes>`. The length must be a plain non-negative
    /// decimal with no leading zero, in both modes.
    fn byte_string(&mut self) -> Result<&'a [u8], BencodeError> {
        let start = self.pos;
        while self.peek()? != b':' {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        if digits.is_empty()
            || !digits.iter().all(u8::is_ascii_digit)
            || (digits.len() > 1 && digits[0] == b'0')
        {
            return Err(BencodeError::MalformedLength(start));
        }
        let mut len: usize = 0;
        for &b in digits {
            len = len
                .checked_mul(10)
                .and_then(|n| n.checked_add((b - b'0') as usize))
                .ok_or(BencodeError::MalformedLength(start))?;
        }
        self.pos += 1;
        let data_start = self.pos;
        let data_end = data_start
            .checked_add(len)
            .ok_or(BencodeError::MalformedLength(start))?;
        if data_end > self.input.len() {
            return Err(BencodeError::TruncatedInput(self.input.len()));
        }
        self.pos = data_end;
        Ok(&self.input[data_start..data_end])
    }

    fn list(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut items = Vec::new();
        while self.peek()? != b'e' {
            items.push(self.value(depth + 1)?);
        }
        self.pos += 1;
        Ok(Value::List(items))
    }

    fn dict(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut map = BTreeMap::new();
        loop {
            match self.peek()? {
                b'e' => {
                    self.pos += 1;
                    break;
                }
                b'0'..=b'9' => {}
                byte => {
                    return Err(BencodeError::UnexpectedByte {
                        byte,
                        offset: self.pos,
                    })
                }
            }
            let key = Bytes::copy_from_slice(self.byte_string()?);
            let value_start = self.pos;
            let value = self.value(depth + 1)?;
            if depth == 0 && self.capture_key == Some(key.as_ref()) {
                self.captured = Some(RawSpan {
                    start: value_start,
                    end: self.pos,
                });
            }
            if map.contains_key(key.as_ref()) {
                return Err(BencodeError::DuplicateKey(key));
            }
            map.insert(key, value);
        }
        Ok(Value::Dict(map))
    }
}

/// Decodes a complete buffer into a single value.
pub fn decode(input: &[u8]) -> Result<Value, BencodeError> {
    Decoder::new(input).decode_document().map(|doc| doc.value)
}

/// Encodes a value in canonical form: `i<n>e`, `<len>:<bytes>`, `l...e`,
/// `d...e` with dictionary keys in ascending byte order.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_value(value, &mut out);
    out
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Integer(n) => {
            out.push(b'i');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(b) => {
            out.extend_from_slice(b.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(b);
        }
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                encode_value(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(map) => {
            out.push(b'd');
            for (key, val) in map {
                out.extend_from_slice(key.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(key);
                encode_value(val, out);
            }
            out.push(b'e');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_integers() {
        assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
        assert_eq!(decode(b"i-42e").unwrap(), Value::Integer(-42));
        assert_eq!(decode(b"i0e").unwrap(), Value::Integer(0));
    }

    #[test]
    fn rejects_malformed_integers() {
        assert_eq!(decode(b"ie"), Err(BencodeError::MalformedInteger(0)));
        assert_eq!(decode(b"i-e"), Err(BencodeError::MalformedInteger(0)));
        assert_eq!(decode(b"i12x4e"), Err(BencodeError::MalformedInteger(0)));
        assert_eq!(decode(b"i+5e"), Err(BencodeError::MalformedInteger(0)));
    }

    #[test]
    fn rejects_integers_beyond_i64() {
        assert_eq!(
            decode(b"i92233720368547758080e"),
            Err(BencodeError::MalformedInteger(0))
        );
    }

    #[test]
    fn lenient_mode_accepts_non_canonical_integers() {
        assert_eq!(decode(b"i-0e").unwrap(), Value::Integer(0));
        assert_eq!(decode(b"i007e").unwrap(), Value::Integer(7));
    }

    #[test]
    fn strict_mode_rejects_non_canonical_integers() {
        let err = Decoder::new(b"i-0e").strict().decode_document().unwrap_err();
        assert_eq!(err, BencodeError::MalformedInteger(0));
        let err = Decoder::new(b"i03e").strict().decode_document().unwrap_err();
        assert_eq!(err, BencodeError::MalformedInteger(0));
        let doc = Decoder::new(b"i-31e").strict().decode_document().unwrap();
        assert_eq!(doc.value, Value::Integer(-31));
    }

    #[test]
    fn decodes_byte_strings() {
        assert_eq!(
            decode(b"4:spam").unwrap(),
            Value::Bytes(Bytes::from_static(b"spam"))
        );
        assert_eq!(decode(b"0:").unwrap(), Value::Bytes(Bytes::from_static(b"")));
    }

    #[test]
    fn rejects_leading_zero_string_lengths() {
        assert_eq!(decode(b"04:spam"), Err(BencodeError::MalformedLength(0)));
    }

    #[test]
    fn truncated_byte_string_fails() {
        assert_eq!(decode(b"10:short"), Err(BencodeError::TruncatedInput(8)));
    }

    #[test]
    fn byte_string_without_colon_fails() {
        assert_eq!(decode(b"4spam"), Err(BencodeError::TruncatedInput(5)));
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(decode(b""), Err(BencodeError::TruncatedInput(0)));
    }

    #[test]
    fn unexpected_leading_byte_fails() {
        assert_eq!(
            decode(b"x"),
            Err(BencodeError::UnexpectedByte { byte: b'x', offset: 0 })
        );
    }

    #[test]
    fn decodes_lists_in_order() {
        assert_eq!(
            decode(b"l4:spami42ee").unwrap(),
            Value::List(vec![
                Value::Bytes(Bytes::from_static(b"spam")),
                Value::Integer(42),
            ])
        );
    }

    #[test]
    fn unterminated_list_fails() {
        assert_eq!(decode(b"l4:spam"), Err(BencodeError::TruncatedInput(7)));
    }

    #[test]
    fn decodes_dictionaries() {
        let value = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
        assert_eq!(value.get(b"cow").and_then(Value::as_str), Some("moo"));
        assert_eq!(value.get(b"spam").and_then(Value::as_str), Some("eggs"));
    }

    #[test]
    fn rejects_duplicate_keys() {
        assert_eq!(
            decode(b"d3:cow3:moo3:cowi1ee"),
            Err(BencodeError::DuplicateKey(Bytes::from_static(b"cow")))
        );
    }

    #[test]
    fn rejects_non_string_dictionary_keys() {
        assert_eq!(
            decode(b"di1e3:mooe"),
            Err(BencodeError::UnexpectedByte { byte: b'i', offset: 1 })
        );
    }

    #[test]
    fn depth_limit_stops_adversarial_nesting() {
        let input = vec![b'l'; 10_000];
        assert_eq!(decode(&input), Err(BencodeError::DepthExceeded));
    }

    #[test]
    fn nesting_within_the_limit_is_accepted() {
        let mut input = vec![b'l'; MAX_DEPTH];
        input.extend_from_slice(&vec![b'e'; MAX_DEPTH]);
        assert!(decode(&input).is_ok());
    }

    #[test]
    fn document_rejects_trailing_data() {
        assert_eq!(decode(b"i42eextra"), Err(BencodeError::TrailingData(4)));
    }

    #[test]
    fn prefix_reports_consumed_bytes() {
        let (value, consumed) = Decoder::new(b"i42eextra").decode_prefix().unwrap();
        assert_eq!(value, Value::Integer(42));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn canonical_values_round_trip() {
        for input in [
            b"i42e".as_slice(),
            b"i-7e",
            b"i0e",
            b"4:spam",
            b"0:",
            b"le",
            b"de",
            b"l4:spami42ee",
            b"d8:announce15:http://test.com4:infod4:name4:test12:piece lengthi16384eee",
        ] {
            let value = decode(input).unwrap();
            assert_eq!(encode(&value), input);
        }
    }

    #[test]
    fn captures_span_of_named_top_level_value() {
        let input = b"d3:fooi1e4:infod4:name1:x7:unknowni9ee3:zzzi2ee";
        let doc = Decoder::new(input)
            .capture(b"info")
            .decode_document()
            .unwrap();
        let span = doc.captured.unwrap();
        assert_eq!(span.slice(input), b"d4:name1:x7:unknowni9ee");
    }

    #[test]
    fn capture_ignores_nested_occurrences_of_the_key() {
        let input = b"d5:outerd4:infoi1eee";
        let doc = Decoder::new(input)
            .capture(b"info")
            .decode_document()
            .unwrap();
        assert!(doc.captured.is_none());
    }

    #[test]
    fn capture_is_absent_when_the_key_is_missing() {
        let doc = Decoder::new(b"d3:fooi1ee")
            .capture(b"info")
            .decode_document()
            .unwrap();
        assert!(doc.captured.is_none());
    }

    #[test]
    fn value_accessors() {
        assert_eq!(Value::Integer(7).as_integer(), Some(7));
        assert_eq!(Value::Integer(7).as_str(), None);
        let bytes = Value::Bytes(Bytes::from_static(b"hi"));
        assert_eq!(bytes.as_str(), Some("hi"));
        assert!(bytes.as_dict().is_none());
        let list = decode(b"li1ee").unwrap();
        assert_eq!(list.as_list().map(|items| items.len()), Some(1));
    }
}
