//! Batch rendering on a fixed pool of worker threads.
//!
//! ```text
//! caller                      worker 0          worker N
//!   |--[job, reply tx]---------->|                 |
//!   |--[job, reply tx]----------------------------->|
//!   |                         render             render
//!   |<-----------[result]--------|                 |
//!   |<-----------[result]---------------------------|
//! ```
//!
//! Every worker owns its own [`Sound`] (engine, generators and buffer), so
//! nothing is shared while rendering. Each job carries a one-slot reply
//! channel; the caller blocks on exactly the job it wants.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::dsp::renderer::ExportFormat;
use crate::error::SfxrError;
use crate::params::Parameters;
use crate::preset::SoundKind;
use crate::sound::{DEFAULT_SOUND_VOLUME, Sound, SoundQuickInfo};

/// What to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SoundRequest {
    /// Explicit parameters at the default sound volume.
    Parameters(Parameters),
    /// A serialized parameter block in the pool's configured layout.
    Encoded(Vec<u8>),
    /// A preset drawn from a seeded generator.
    Preset { kind: SoundKind, seed: u64 },
}

/// A finished job: the parameters actually rendered and the exported bytes.
#[derive(Debug, Clone)]
pub struct RenderedSound {
    pub params: Parameters,
    pub info: SoundQuickInfo,
    pub data: Vec<u8>,
}

type JobResult = Result<RenderedSound, SfxrError>;

struct Job {
    id: u64,
    request: SoundRequest,
    reply: Sender<JobResult>,
}

/// Receives the result of one submitted job.
pub struct JobHandle {
    id: u64,
    reply: Receiver<JobResult>,
}

impl JobHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the job finishes.
    pub fn wait(self) -> JobResult {
        self.reply.recv().map_err(|_| SfxrError::WorkerGone)?
    }
}

struct Worker {
    id: usize,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(
        id: usize,
        jobs: Receiver<Job>,
        config: RenderConfig,
        format: ExportFormat,
    ) -> Result<Worker, SfxrError> {
        let sound = Sound::new(config)?;
        let thread = thread::Builder::new()
            .name(format!("sfxr-worker-{id}"))
            .spawn(move || Worker::run(id, jobs, sound, format))?;
        Ok(Worker {
            id,
            thread: Some(thread),
        })
    }

    fn run(id: usize, jobs: Receiver<Job>, mut sound: Sound, format: ExportFormat) {
        // Ends when the pool drops its sender.
        for job in jobs.iter() {
            let result = render_request(&mut sound, job.request, format);
            match &result {
                Ok(done) => log::debug!(
                    "Worker {id} rendered job {} ({} samples)",
                    job.id,
                    done.info.total_samples
                ),
                Err(e) => log::warn!("Worker {id} failed job {}: {e}", job.id),
            }
            // The caller may have dropped its handle; that is not an error.
            let _ = job.reply.send(result);
        }
    }
}

fn render_request(sound: &mut Sound, request: SoundRequest, format: ExportFormat) -> JobResult {
    match request {
        SoundRequest::Parameters(params) => {
            sound.set_params(params);
            sound.set_sound_volume(DEFAULT_SOUND_VOLUME);
        }
        SoundRequest::Encoded(bytes) => sound.load(&mut bytes.as_slice())?,
        SoundRequest::Preset { kind, seed } => {
            sound.set_sound_volume(DEFAULT_SOUND_VOLUME);
            sound.seed(seed);
            sound.create_preset(kind);
        }
    }
    let data = sound.export_bytes(format)?;
    Ok(RenderedSound {
        params: *sound.params(),
        info: sound.quick_info(),
        data,
    })
}

/// Fixed-size pool that renders [`SoundRequest`]s in parallel.
pub struct BatchRenderer {
    workers: Vec<Worker>,
    jobs: Option<Sender<Job>>,
    next_id: AtomicU64,
}

impl BatchRenderer {
    /// Spawn `workers` threads (at least one), each rendering with `config`
    /// and exporting in `format`.
    pub fn new(workers: usize, config: RenderConfig, format: ExportFormat) -> Result<Self, SfxrError> {
        config.validate()?;
        let (job_tx, job_rx) = unbounded();
        let count = workers.max(1);
        let mut pool = Vec::with_capacity(count);
        for id in 0..count {
            pool.push(Worker::spawn(id, job_rx.clone(), config.clone(), format)?);
        }
        Ok(BatchRenderer {
            workers: pool,
            jobs: Some(job_tx),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue a request and return a handle to its result.
    pub fn submit(&self, request: SoundRequest) -> Result<JobHandle, SfxrError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = bounded(1);
        let jobs = self.jobs.as_ref().ok_or(SfxrError::WorkerGone)?;
        log::trace!("Dispatching job {id}");
        jobs.send(Job {
            id,
            request,
            reply: reply_tx,
        })
        .map_err(|_| SfxrError::WorkerGone)?;
        Ok(JobHandle { id, reply: reply_rx })
    }

    /// Submit every request, then collect the results in request order.
    pub fn render_all<I>(&self, requests: I) -> Vec<JobResult>
    where
        I: IntoIterator<Item = SoundRequest>,
    {
        let handles: Vec<Result<JobHandle, SfxrError>> =
            requests.into_iter().map(|r| self.submit(r)).collect();
        handles
            .into_iter()
            .map(|h| h.and_then(JobHandle::wait))
            .collect()
    }
}

impl Drop for BatchRenderer {
    fn drop(&mut self) {
        self.jobs.take();
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::warn!("Worker {} panicked", worker.id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::params::{BlockFormat, ParameterBlock};

    fn reference(kind: SoundKind, seed: u64) -> Vec<u8> {
        let mut sound = Sound::default();
        sound.seed(seed);
        sound.create_preset(kind);
        sound.export_bytes(ExportFormat::WavePcm).unwrap()
    }

    #[test]
    fn results_match_single_threaded_render() {
        let pool = BatchRenderer::new(3, RenderConfig::default(), ExportFormat::WavePcm).unwrap();
        assert_eq!(pool.worker_count(), 3);
        let requests: Vec<SoundRequest> = SoundKind::ALL
            .into_iter()
            .enumerate()
            .map(|(i, kind)| SoundRequest::Preset { kind, seed: i as u64 })
            .collect();
        let results = pool.render_all(requests);
        assert_eq!(results.len(), SoundKind::ALL.len());
        for (i, (kind, result)) in SoundKind::ALL.into_iter().zip(results).enumerate() {
            let done = result.unwrap();
            assert_eq!(done.data, reference(kind, i as u64), "{kind} differs from direct render");
        }
    }

    #[test]
    fn parameters_and_encoded_requests() {
        let pool = BatchRenderer::new(2, RenderConfig::default(), ExportFormat::Float).unwrap();

        let mut params = Parameters::new();
        params.env_decay = 0.2;
        let mut encoded = Vec::new();
        ParameterBlock { params, sound_volume: DEFAULT_SOUND_VOLUME }
            .write_to(BlockFormat::Plain, &mut encoded)
            .unwrap();

        let a = pool.submit(SoundRequest::Parameters(params)).unwrap();
        let b = pool.submit(SoundRequest::Encoded(encoded)).unwrap();
        assert_ne!(a.id(), b.id());
        let (a, b) = (a.wait().unwrap(), b.wait().unwrap());
        assert_eq!(a.params, params);
        assert_eq!(a.data, b.data);
        assert_eq!(a.data.len(), a.info.total_samples * 4);
    }

    #[test]
    fn bad_request_reports_error() {
        let pool = BatchRenderer::new(1, RenderConfig::default(), ExportFormat::WavePcm).unwrap();
        let result = pool.submit(SoundRequest::Encoded(vec![1, 2, 3])).unwrap().wait();
        assert!(matches!(
            result,
            Err(SfxrError::Load(LoadError::Truncated { expected: 136, found: 3 }))
        ));
        // The worker survives a failed job.
        assert!(pool.submit(SoundRequest::Parameters(Parameters::new())).unwrap().wait().is_ok());
    }

    #[test]
    fn invalid_config_rejected() {
        let config = RenderConfig { bit_depth: 11, ..Default::default() };
        assert!(matches!(
            BatchRenderer::new(2, config, ExportFormat::WavePcm),
            Err(SfxrError::Config(_))
        ));
    }

    #[test]
    fn zero_workers_still_renders() {
        let pool = BatchRenderer::new(0, RenderConfig::default(), ExportFormat::Pcm8).unwrap();
        assert_eq!(pool.worker_count(), 1);
        assert!(pool.submit(SoundRequest::Parameters(Parameters::new())).unwrap().wait().is_ok());
    }

    #[test]
    fn handles_outlive_dropped_pool() {
        let pool = BatchRenderer::new(2, RenderConfig::default(), ExportFormat::Float).unwrap();
        let handles: Vec<JobHandle> = (0..4)
            .map(|seed| pool.submit(SoundRequest::Preset { kind: SoundKind::BlipSelect, seed }).unwrap())
            .collect();
        drop(pool);
        for h in handles {
            assert!(h.wait().is_ok(), "Queued jobs finish before the workers exit");
        }
    }
}
