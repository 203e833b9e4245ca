//! Torrent metainfo decoding: a bencode codec with raw-span capture, the
//! metainfo extractor built on it, and the info-hash and piece-table
//! derivation that gives downloaded content its identity.

pub mod bencode;
pub mod fetch;
pub mod metainfo;
pub mod storage;

pub use metainfo::{parse, MetainfoError, TorrentFile};
