use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Stdout, Write, stdin, stdout};
use std::path::Path;
use std::time::Instant;

fn is_gz(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("gz")
}

/// Open a file for buffered reading; `-` reads stdin.
pub fn xopen(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    if path.to_str() == Some("-") {
        return Ok(Box::new(BufReader::new(stdin())));
    }
    let file = OpenOptions::new().read(true).open(path)?;
    Ok(Box::new(BufReader::new(file)))
}

/// Like [`xopen`], transparently decompressing `.gz` files.
pub fn xzopen(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    if is_gz(path) {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        xopen(path)
    }
}

/// Output sink opened by [`xzcreate`].
///
/// Gzip output is only complete once [`OutputWriter::finish`] has written the
/// trailer; dropping the writer instead loses any error from that last write.
pub enum OutputWriter {
    Stdout(BufWriter<Stdout>),
    Plain(BufWriter<File>),
    Gzip(GzEncoder<Box<dyn Write + Send>>),
}

impl OutputWriter {
    /// Flush everything, writing the gzip trailer for compressed output.
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputWriter::Stdout(mut w) => w.flush(),
            OutputWriter::Plain(mut w) => w.flush(),
            OutputWriter::Gzip(enc) => enc.finish()?.flush(),
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Stdout(w) => w.write(buf),
            OutputWriter::Plain(w) => w.write(buf),
            OutputWriter::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Stdout(w) => w.flush(),
            OutputWriter::Plain(w) => w.flush(),
            OutputWriter::Gzip(w) => w.flush(),
        }
    }
}

/// Open an output sink: stdout for `None` or `-`, gzip for `.gz` paths.
pub fn xzcreate(path: Option<&Path>) -> io::Result<OutputWriter> {
    match path {
        None => Ok(OutputWriter::Stdout(BufWriter::new(stdout()))),
        Some(p) if p.to_str() == Some("-") => Ok(OutputWriter::Stdout(BufWriter::new(stdout()))),
        Some(p) if is_gz(p) => {
            let file: Box<dyn Write + Send> = Box::new(BufWriter::new(File::create(p)?));
            Ok(OutputWriter::Gzip(GzEncoder::new(file, Compression::default())))
        }
        Some(p) => Ok(OutputWriter::Plain(BufWriter::new(File::create(p)?))),
    }
}

/// Wall-clock stopwatch for the per-stage timing log lines.
pub struct Stopwatch {
    started: Instant,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Seconds since start, restarting the clock.
    pub fn lap(&mut self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        self.started = Instant::now();
        elapsed
    }
}
