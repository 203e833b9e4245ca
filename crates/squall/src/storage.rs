//! Object-storage naming. The storage client itself lives outside this
//! crate; only the addressing scheme is defined here, keyed by the
//! hex-encoded info-hash.

use crate::metainfo::TorrentFile;

/// Object key for the assembled content of a torrent.
pub fn data_key(torrent: &TorrentFile) -> String {
    torrent.info_hash_hex()
}

/// Object key for one verified piece of a torrent.
pub fn piece_key(torrent: &TorrentFile, index: usize) -> String {
    format!("{}/{}", torrent.info_hash_hex(), index)
}

/// Joins a configured bucket sub-path with an object key.
pub fn object_path(sub_path: &str, key: &str) -> String {
    let prefix = sub_path.trim_end_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}
