//! The thread pool that persists frame images in the background.

use crate::common::*;
use std::panic::{self, AssertUnwindSafe};

#[derive(Debug)]
struct ImageJob {
    image: RgbImage,
    path: PathBuf,
}

impl ImageJob {
    fn write(self) -> Result<()> {
        let Self { image, path } = self;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        image
            .save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("failed to write image file {}", path.display()))?;
        Ok(())
    }
}

/// Encodes and writes PNG images on a fixed number of worker threads.
#[derive(Debug)]
pub struct ImageWriter {
    job_tx: Option<flume::Sender<ImageJob>>,
    done_rx: flume::Receiver<Result<()>>,
    workers: Vec<JoinHandle<()>>,
    pending: usize,
}

impl ImageWriter {
    pub fn new(num_threads: usize) -> Result<Self> {
        ensure!(num_threads > 0, "num_threads must be positive");

        let (job_tx, job_rx) = flume::unbounded::<ImageJob>();
        let (done_tx, done_rx) = flume::unbounded();

        let workers: Vec<_> = (0..num_threads)
            .map(|index| {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();

                thread::Builder::new()
                    .name(format!("image-writer-{}", index))
                    .spawn(move || work(job_rx, done_tx, ImageJob::write))
            })
            .try_collect()?;

        Ok(Self {
            job_tx: Some(job_tx),
            done_rx,
            workers,
            pending: 0,
        })
    }

    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    /// Queue an image to be written to `path`.
    pub fn submit(&mut self, image: RgbImage, path: PathBuf) -> Result<()> {
        let job_tx = self
            .job_tx
            .as_ref()
            .ok_or_else(|| format_err!("image writer is closed"))?;
        job_tx
            .send(ImageJob { image, path })
            .map_err(|_| format_err!("image writer workers have stopped"))?;
        self.pending += 1;
        Ok(())
    }

    /// Block until every queued image is written.
    ///
    /// It returns the first failure among the finished jobs.
    pub fn wait(&mut self) -> Result<()> {
        let mut first_error = None;

        while self.pending > 0 {
            let result = self
                .done_rx
                .recv()
                .map_err(|_| format_err!("image writer workers have stopped"))?;
            self.pending -= 1;

            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Runs jobs until the queue closes, reporting one result per job.
fn work<J, F>(job_rx: flume::Receiver<J>, done_tx: flume::Sender<Result<()>>, run: F)
where
    F: Fn(J) -> Result<()>,
{
    for job in job_rx.iter() {
        // a panicking job still reports so that wait() returns
        let result = panic::catch_unwind(AssertUnwindSafe(|| run(job)))
            .unwrap_or_else(|_| Err(format_err!("an image writer job panicked")));
        if done_tx.send(result).is_err() {
            break;
        }
    }
}

impl Drop for ImageWriter {
    fn drop(&mut self) {
        self.job_tx = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("an image writer thread panicked");
            }
        }
    }
}
