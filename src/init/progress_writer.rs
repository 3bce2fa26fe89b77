use indicatif::MultiProgress;
use std::io::Write;
use tracing_subscriber::fmt::MakeWriter;

/// Log sink that hides the progress bars while a line is written, so log
/// output and bar redraws never interleave on the terminal.
#[derive(Clone)]
pub struct ProgressAwareStderr {
    mpb: MultiProgress,
}

impl ProgressAwareStderr {
    pub fn new(mpb: MultiProgress) -> Self {
        Self { mpb }
    }
}

pub struct SuspendedWriter<'a> {
    mpb: &'a MultiProgress,
}

impl Write for SuspendedWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.mpb.suspend(|| std::io::stderr().write(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.mpb.suspend(|| std::io::stderr().flush())
    }
}

impl<'a> MakeWriter<'a> for ProgressAwareStderr {
    type Writer = SuspendedWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedWriter { mpb: &self.mpb }
    }
}
