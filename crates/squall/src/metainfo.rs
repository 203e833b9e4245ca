use crate::bencode::{BencodeError, Decoder, RawSpan, Value};
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

/// SHA-1 digest size; `pieces` is a concatenation of digests of this width.
pub const PIECE_HASH_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetainfoError {
    #[error(transparent)]
    Bencode(#[from] BencodeError),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("piece length must be positive, got {0}")]
    InvalidPieceLength(i64),
    #[error("length must be non-negative, got {0}")]
    InvalidLength(i64),
    #[error("pieces string of length {0} is not a multiple of 20")]
    MalformedPieces(usize),
}

/// A decoded single-file torrent description.
///
/// `info_hash` is the SHA-1 digest of the raw bytes of the `info` value
/// exactly as they appeared in the source buffer, unknown keys included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFile {
    pub announce: String,
    pub info_hash: [u8; 20],
    pub piece_hashes: Vec<[u8; 20]>,
    pub piece_length: i64,
    pub length: i64,
    pub name: String,
}

impl TorrentFile {
    /// Lowercase hex form of the info-hash, as used for object naming.
    pub fn info_hash_hex(&self) -> String {
        hex::encode(self.info_hash)
    }

    pub fn piece_count(&self) -> usize {
        self.piece_hashes.len()
    }
}

/// Decodes one complete metainfo buffer into a [`TorrentFile`].
///
/// The first structural or semantic error aborts the parse; there is no
/// partial result.
pub fn parse(data: &[u8]) -> Result<TorrentFile, MetainfoError> {
    let doc = Decoder::new(data).capture(b"info").decode_document()?;
    let torrent = extract(&doc.value, doc.captured, data)?;
    debug!(
        name = %torrent.name,
        pieces = torrent.piece_hashes.len(),
        "parsed torrent metainfo"
    );
    Ok(torrent)
}

fn extract(
    root: &Value,
    info_span: Option<RawSpan>,
    data: &[u8],
) -> Result<TorrentFile, MetainfoError> {
    if root.as_dict().is_none() {
        return Err(MetainfoError::WrongType {
            field: "metainfo",
            expected: "dictionary",
        });
    }
    let announce = required_str(root, "announce")?;
    let info = root
        .get(b"info")
        .ok_or(MetainfoError::MissingField("info"))?;
    if info.as_dict().is_none() {
        return Err(MetainfoError::WrongType {
            field: "info",
            expected: "dictionary",
        });
    }

    let pieces = required_bytes(info, "pieces")?;
    let piece_length = required_integer(info, "piece length")?;
    if piece_length <= 0 {
        return Err(MetainfoError::InvalidPieceLength(piece_length));
    }
    let length = required_integer(info, "length")?;
    if length < 0 {
        return Err(MetainfoError::InvalidLength(length));
    }
    let name = required_str(info, "name")?;

    // The decoder records the span whenever the top-level dictionary binds
    // an `info` key, so a span is present exactly when `info` is.
    let span = info_span.ok_or(MetainfoError::MissingField("info"))?;

    Ok(TorrentFile {
        announce,
        info_hash: sha1_span(data, span),
        piece_hashes: split_piece_hashes(pieces)?,
        piece_length,
        length,
        name,
    })
}

fn required<'a>(dict: &'a Value, field: &'static str) -> Result<&'a Value, MetainfoError> {
    dict.get(field.as_bytes())
        .ok_or(MetainfoError::MissingField(field))
}

fn required_str(dict: &Value, field: &'static str) -> Result<String, MetainfoError> {
    required(dict, field)?
        .as_str()
        .map(str::to_owned)
        .ok_or(MetainfoError::WrongType {
            field,
            expected: "utf-8 string",
        })
}

fn required_bytes<'a>(dict: &'a Value, field: &'static str) -> Result<&'a Bytes, MetainfoError> {
    required(dict, field)?
        .as_bytes()
        .ok_or(MetainfoError::WrongType {
            field,
            expected: "byte string",
        })
}

fn required_integer(dict: &Value, field: &'static str) -> Result<i64, MetainfoError> {
    required(dict, field)?
        .as_integer()
        .ok_or(MetainfoError::WrongType {
            field,
            expected: "integer",
        })
}

/// Digest over the original bytes of the `info` value. The hash input is
/// always the source span, never a re-encoding: a re-encoding need not
/// reproduce unknown keys, key order, or numeric formatting byte-for-byte.
fn sha1_span(data: &[u8], span: RawSpan) -> [u8; 20] {
    let mut hasher = sha1_smol::Sha1::new();
    hasher.update(span.slice(data));
    hasher.digest().bytes()
}

fn split_piece_hashes(pieces: &Bytes) -> Result<Vec<[u8; 20]>, MetainfoError> {
    if pieces.len() % PIECE_HASH_LEN != 0 {
        return Err(MetainfoError::MalformedPieces(pieces.len()));
    }
    Ok(pieces
        .chunks_exact(PIECE_HASH_LEN)
        .map(|chunk| {
            let mut hash = [0u8; PIECE_HASH_LEN];
            hash.copy_from_slice(chunk);
            hash
        })
        .collect())
}
