//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};

fn is_gz<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz"))
}

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if is_gz(&path) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let file = File::open(path)?;
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Transparently open a file with gzip encoder.
pub fn open_write_maybe_gz<P>(path: P) -> Result<Box<dyn Write>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if is_gz(&path) {
        tracing::trace!("Opening {:?} as gzip for writing", path.as_ref());
        let file = File::create(path)?;
        let bufwriter = BufWriter::new(file);
        let encoder = GzEncoder::new(bufwriter, Compression::default());
        Ok(Box::new(encoder))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path.as_ref());
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};

    #[rstest::rstest]
    #[case("test.txt")]
    #[case("test.txt.gz")]
    fn write_then_read_maybe_gz(#[case] filename: &str) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();

        {
            let mut f = super::open_write_maybe_gz(tmp_dir.join(filename))?;
            f.write_all(b"chr\tpos\nchr1\t100\n")?;
            f.flush()?;
        }

        let mut raw = Vec::new();
        std::fs::File::open(tmp_dir.join(filename))?.read_to_end(&mut raw)?;
        // gzip magic bytes
        assert_eq!(filename.ends_with(".gz"), raw.starts_with(&[0x1f, 0x8b]));

        let mut buf = String::new();
        super::open_read_maybe_gz(tmp_dir.join(filename))?.read_to_string(&mut buf)?;
        assert_eq!(buf, "chr\tpos\nchr1\t100\n");

        Ok(())
    }
}
