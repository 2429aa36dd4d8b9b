//! The parallel render driver: the image is pre-partitioned into shuffled
//! blocks, worker threads pull blocks from a shared queue, and the driver
//! polls and joins them.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bumpalo::Bump;
use log::debug;
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::sampler::{Sample, Sampler};
use crate::scene::Scene;

// ─── Block queue ────────────────────────────────────────────────────────────

/// The shared queue of image blocks, each represented by the sub-sampler
/// covering its rectangle. Blocks are shuffled at construction so the
/// workers spread over the image instead of marching down it in stripes.
///
/// `next` costs one atomic fetch-add; the per-slot locks are only ever taken
/// by the slot's unique claimant.
pub struct BlockQueue {
    blocks: Vec<Mutex<Option<Box<dyn Sampler>>>>,
    next_block: AtomicUsize,
}

impl BlockQueue {
    /// Partitions the scene sampler into blocks of `block_w × block_h`
    /// pixels.
    pub fn new(scene: &Scene, block_w: usize, block_h: usize) -> Self {
        let mut samplers = scene.sampler().get_subsamplers(block_w, block_h);
        samplers.shuffle(&mut thread_rng());
        debug!("partitioned image into {} blocks", samplers.len());
        Self {
            blocks: samplers
                .into_iter()
                .map(|s| Mutex::new(Some(s)))
                .collect(),
            next_block: AtomicUsize::new(0),
        }
    }

    /// Claims the next unrendered block, or `None` once the queue is drained.
    pub fn next(&self) -> Option<Box<dyn Sampler>> {
        let idx = self.next_block.fetch_add(1, Ordering::AcqRel);
        self.blocks
            .get(idx)
            .and_then(|slot| slot.lock().expect("block slot poisoned").take())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

// ─── Worker ─────────────────────────────────────────────────────────────────

/// Worker lifecycle states. The legal transitions are
/// NotStarted → Working → {Done | Cancelled} → Joined.
mod status {
    pub const NOT_STARTED: u8 = 0;
    pub const WORKING: u8 = 1;
    pub const DONE: u8 = 2;
    pub const CANCELLED: u8 = 3;
    pub const JOINED: u8 = 4;
}

/// How many pixels a worker renders between cancellation checks.
const CANCEL_CHECK_INTERVAL: u32 = 32;

struct Worker {
    handle: Option<JoinHandle<()>>,
    status: Arc<AtomicU8>,
}

/// The per-thread render loop: pull a block, render every pixel batch in it,
/// splat the results, reset the arena, repeat until the queue runs dry or
/// the driver cancels.
fn worker_loop(scene: Arc<Scene>, queue: Arc<BlockQueue>, status: Arc<AtomicU8>) {
    // A cancel that lands before the thread gets going wins outright
    if status
        .compare_exchange(
            status::NOT_STARTED,
            status::WORKING,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .is_err()
    {
        status.store(status::DONE, Ordering::Release);
        return;
    }
    let mut arena = Bump::new();
    let mut samples: Vec<Sample> = Vec::new();
    let mut rays = Vec::new();
    let mut colors = Vec::new();
    let mut pixels_since_check = 0u32;

    'blocks: while let Some(mut sampler) = queue.next() {
        // Differentials model a one-pixel footprint; with many samples per
        // pixel each one covers proportionally less
        let diff_scale = 1.0 / (sampler.max_spp() as f32).sqrt();
        loop {
            sampler.get_samples(&mut samples);
            if samples.is_empty() {
                break;
            }
            rays.clear();
            colors.clear();
            for sample in &samples {
                let mut ray = scene.camera.generate_ray_differential(sample);
                ray.scale_differentials(diff_scale);
                let color = scene
                    .renderer
                    .illumination(&mut ray, &scene, sampler.as_mut(), &arena);
                scene
                    .render_target
                    .write_pixel(sample.img[0], sample.img[1], color);
                if ray.t_max.is_finite() {
                    scene
                        .render_target
                        .write_depth(sample.img[0], sample.img[1], ray.t_max);
                }
                rays.push(ray);
                colors.push(color);
            }
            // Adaptive samplers may reject the batch and re-shoot the pixel
            // at a higher rate
            sampler.report_results(&samples, &rays, &colors);
            arena.reset();

            pixels_since_check += 1;
            if pixels_since_check >= CANCEL_CHECK_INTERVAL {
                pixels_since_check = 0;
                if status.load(Ordering::Acquire) == status::CANCELLED {
                    break 'blocks;
                }
            }
        }
    }
    // Either finished or acknowledged cancellation
    status.store(status::DONE, Ordering::Release);
}

// ─── Driver ─────────────────────────────────────────────────────────────────

/// Owns the worker threads for one render. Construction partitions the
/// image; `render` launches the workers; `done` polls and joins; `cancel`
/// (also run on drop) stops a render early without leaving threads dangling.
pub struct Driver {
    scene: Arc<Scene>,
    queue: Arc<BlockQueue>,
    workers: Vec<Worker>,
    n_workers: usize,
}

impl Driver {
    pub fn new(scene: Arc<Scene>, n_workers: usize, block_w: usize, block_h: usize) -> Self {
        let queue = Arc::new(BlockQueue::new(&scene, block_w, block_h));
        Self {
            scene,
            queue,
            workers: Vec::new(),
            n_workers: n_workers.max(1),
        }
    }

    /// Launches the worker threads.
    pub fn render(&mut self) {
        for i in 0..self.n_workers {
            let status = Arc::new(AtomicU8::new(status::NOT_STARTED));
            let scene = Arc::clone(&self.scene);
            let queue = Arc::clone(&self.queue);
            let thread_status = Arc::clone(&status);
            let handle = std::thread::Builder::new()
                .name(format!("render-worker-{i}"))
                .spawn(move || worker_loop(scene, queue, thread_status))
                .expect("failed to spawn render worker");
            self.workers.push(Worker {
                handle: Some(handle),
                status,
            });
        }
    }

    /// Joins any workers that have finished; true once every worker is done
    /// and joined. The join forms the release-acquire edge that makes all
    /// pixel writes visible to the reader.
    pub fn done(&mut self) -> bool {
        let mut all_done = true;
        for worker in &mut self.workers {
            match worker.status.load(Ordering::Acquire) {
                status::DONE => {
                    if let Some(handle) = worker.handle.take() {
                        let _ = handle.join();
                    }
                    worker.status.store(status::JOINED, Ordering::Release);
                }
                status::JOINED => {}
                _ => all_done = false,
            }
        }
        all_done && !self.workers.is_empty()
    }

    /// Requests cooperative cancellation and joins every worker.
    pub fn cancel(&mut self) {
        for worker in &mut self.workers {
            let _ = worker.status.compare_exchange(
                status::NOT_STARTED,
                status::CANCELLED,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            let _ = worker.status.compare_exchange(
                status::WORKING,
                status::CANCELLED,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
            worker.status.store(status::JOINED, Ordering::Release);
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::UniformSampler;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    // BlockQueue only needs the sampler from the scene; build queues
    // directly from sub-samplers to keep these tests scene-free.
    fn queue_of(w: usize, h: usize, bw: usize, bh: usize) -> BlockQueue {
        let sampler = UniformSampler::new(0, w, 0, h);
        let mut samplers = sampler.get_subsamplers(bw, bh);
        samplers.shuffle(&mut thread_rng());
        BlockQueue {
            blocks: samplers.into_iter().map(|s| Mutex::new(Some(s))).collect(),
            next_block: AtomicUsize::new(0),
        }
    }

    #[test]
    fn queue_hands_out_each_block_once() {
        let queue = queue_of(64, 64, 16, 16);
        assert_eq!(queue.len(), 16);
        let mut seen = HashSet::new();
        while let Some(sampler) = queue.next() {
            // Identify the block by its dimensions signature plus a fresh
            // probe sample
            let mut s = sampler;
            let mut batch = Vec::new();
            s.get_samples(&mut batch);
            let key = (batch[0].img[0] as i64, batch[0].img[1] as i64);
            assert!(seen.insert(key), "block {key:?} handed out twice");
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn exhausted_queue_returns_none_forever() {
        let queue = queue_of(8, 8, 8, 8);
        assert!(queue.next().is_some());
        assert!(queue.next().is_none());
        assert!(queue.next().is_none());
    }

    #[test]
    fn concurrent_workers_drain_queue_without_overlap() {
        let queue = Arc::new(queue_of(64, 64, 8, 8));
        let claimed = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let claimed = Arc::clone(&claimed);
                std::thread::spawn(move || {
                    while queue.next().is_some() {
                        claimed.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(claimed.load(Ordering::Relaxed), 64);
    }
}
