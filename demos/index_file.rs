//! Build a sparse index for a file ahead of time

use std::path::Path;

use linecache_index::{file::index_path, index::IndexBuilder, Config};

fn main() -> linecache_index::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./testfiles/simple".to_owned());

    // Only record every 16th line. The index gets 16 times smaller while each access scans up to
    // 15 lines forward
    let config = Config::default().with_sampling_ratio(16);
    let header = IndexBuilder::new(config).build_file(Path::new(&path), &index_path(&path))?;

    println!(
        "indexed {} lines into {} entries ({} bytes)",
        header.line_count(),
        header.entries(),
        header.len_bytes()
    );

    // The index carries the files modification time, so opening won't rebuild it and uses the
    // stored parameters
    let file = linecache_index::File::open(&path)?;
    assert!(!file.rebuilt());
    assert_eq!(file.config(), config);

    Ok(())
}
