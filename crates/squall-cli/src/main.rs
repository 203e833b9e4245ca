mod config;

use anyhow::Context;
use squall::{fetch, storage, TorrentFile};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let source = std::env::args()
        .nth(1)
        .context("no torrent url or path given")?;
    let config_path = std::env::args().nth(2);

    let torrent = if source.starts_with("http://") || source.starts_with("https://") {
        fetch::from_url(&source).await?
    } else {
        fetch::from_file(&source)?
    };

    println!("announce:     {}", torrent.announce);
    println!("name:         {}", torrent.name);
    println!("length:       {}", torrent.length);
    println!("piece length: {}", torrent.piece_length);
    println!("pieces:       {}", torrent.piece_count());
    println!("info hash:    {}", torrent.info_hash_hex());

    if let Some(path) = config_path {
        let config = config::load(&path)?;
        print_storage_plan(&config, &torrent);
    }

    Ok(())
}

/// Shows where the data and piece objects would land, resolved against the
/// configured endpoints. `config::load` has already verified the endpoint
/// references.
fn print_storage_plan(config: &config::Config, torrent: &TorrentFile) {
    if let Some(endpoint) = config.endpoint(&config.data.endpoint) {
        println!(
            "data object:  {}/{}/{}",
            endpoint.url,
            config.data.bucket,
            storage::object_path(&config.data.sub_path, &storage::data_key(torrent)),
        );
    }
    if let Some(endpoint) = config.endpoint(&config.pieces.endpoint) {
        println!(
            "piece objects: {}/{}/{} .. {} ({} pieces)",
            endpoint.url,
            config.pieces.bucket,
            storage::object_path(&config.pieces.sub_path, &storage::piece_key(torrent, 0)),
            torrent.piece_count().saturating_sub(1),
            torrent.piece_count(),
        );
    }
}
