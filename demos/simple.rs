//! Index a text file and read some of its lines directly

use linecache_index::{Indexable, ReadByLine, Selector};

fn main() -> linecache_index::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./testfiles/simple".to_owned());

    // Open the file, building `<path>.idx` on first use
    let mut file = linecache_index::File::open(&path)?;

    // Get line count without reading the entire file
    let line_count = file.total_lines();
    println!("{} lines", line_count);

    // Read the last line
    print!("{}", file.get_line(-1)?);

    // Every second line of the first ten
    for line in file.get_range(None, Some(10), Some(2))? {
        print!("{}", line);
    }

    // Selectors can be parsed from python slice notation
    let selector: Selector = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "-3:".to_owned())
        .parse()?;
    for line in file.get(selector)? {
        print!("{}", line);
    }

    print!("{}", file.random_line()?);

    file.close()?;
    Ok(())
}
