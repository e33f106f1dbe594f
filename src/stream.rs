use std::{
    io::{self, SeekFrom},
    path::PathBuf,
    pin::Pin,
    task::{Context, Poll},
};

use log::{info, warn};
use rocket::tokio::{
    fs::File,
    io::{AsyncRead, AsyncSeek, ReadBuf},
};

/// A file being streamed to a client. `R` is the open file; anything
/// readable can stand in for it.
///
/// Counts the bytes handed to the server and logs how the transfer ended.
/// Once headers are out the status can no longer change, so a failed read
/// only shows up here.
#[derive(Debug)]
pub struct LoggedFile<R = File> {
    inner: R,
    path: PathBuf,
    expected: u64,
    written: u64,
    done: bool,
}

impl<R> LoggedFile<R> {
    pub fn new(inner: R, path: PathBuf, expected: u64) -> Self {
        Self {
            inner,
            path,
            expected,
            written: 0,
            done: false,
        }
    }

    /// Bytes read out of the file so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn complete(&mut self) {
        if !self.done {
            self.done = true;
            info!("wrote {} bytes of {}", self.written, self.path.display());
        }
    }

    fn fail(&mut self, e: &io::Error) {
        self.done = true;
        warn!(
            "error writing {}, {} bytes written: {e}",
            self.path.display(),
            self.written
        );
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for LoggedFile<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let before = buf.filled().len();

        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let read = (buf.filled().len() - before) as u64;
                this.written += read;
                if read == 0 || this.written >= this.expected {
                    this.complete();
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => {
                this.fail(&e);
                Poll::Ready(Err(e))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<R: AsyncSeek + Unpin> AsyncSeek for LoggedFile<R> {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.inner).start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.inner).poll_complete(cx)
    }
}

impl<R> Drop for LoggedFile<R> {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        if self.written >= self.expected {
            self.complete();
        } else {
            warn!(
                "stream of {} ended after {} of {} bytes",
                self.path.display(),
                self.written,
                self.expected
            );
        }
    }
}
