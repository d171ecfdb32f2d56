//! ファイルI/Oユーティリティ（gzip対応）
//!
//! 入力は拡張子 `.gz` または gzip マジックバイトで自動判別する。`-` は標準入出力。

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const READER_BUF_CAP: usize = 128 * 1024; // 128 KiB
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn has_gz_extension(p: &Path) -> bool {
    p.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

pub fn is_stdio(p: &Path) -> bool {
    p.as_os_str() == "-"
}

/// 平文または gzip のファイルを読み込み用に開く
pub fn open_reader<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead>> {
    let p = path.as_ref();
    if is_stdio(p) {
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, io::stdin())));
    }
    let mut reader = BufReader::with_capacity(READER_BUF_CAP, File::open(p)?);
    let gz = has_gz_extension(p) || reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if gz {
        let dec = flate2::bufread::MultiGzDecoder::new(reader);
        return Ok(Box::new(BufReader::with_capacity(READER_BUF_CAP, dec)));
    }
    Ok(Box::new(reader))
}

/// Writer wrapper to propagate finish/close errors for compressed outputs.
#[must_use = "call .close() to propagate compression/IO errors"]
pub enum Writer {
    Plain(BufWriter<File>),
    Stdout(io::Stdout),
    Gz(flate2::write::GzEncoder<BufWriter<File>>),
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Writer::Plain(f) => f.write(buf),
            Writer::Stdout(s) => s.write(buf),
            Writer::Gz(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Writer::Plain(f) => f.flush(),
            Writer::Stdout(s) => s.flush(),
            Writer::Gz(e) => e.flush(),
        }
    }
}

impl Writer {
    /// Finalize the stream and flush underlying file/stdout.
    pub fn close(self) -> io::Result<()> {
        match self {
            Writer::Plain(mut f) => f.flush(),
            Writer::Stdout(mut s) => s.flush(),
            Writer::Gz(e) => e.finish()?.flush(),
        }
    }
}

/// 出力先を開く。`.gz` で終わるパスは gzip 圧縮する。
pub fn open_writer<P: AsRef<Path>>(path: P) -> io::Result<Writer> {
    let p = path.as_ref();
    if is_stdio(p) {
        return Ok(Writer::Stdout(io::stdout()));
    }
    let f = BufWriter::new(File::create(p)?);
    if has_gz_extension(p) {
        return Ok(Writer::Gz(flate2::write::GzEncoder::new(f, flate2::Compression::default())));
    }
    Ok(Writer::Plain(f))
}
