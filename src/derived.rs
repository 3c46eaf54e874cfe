//! Per-image derived view: an upright source plus crop/rotation state, with
//! the cropped+rotated result recomputed in the background.
//!
//! ## Concurrency
//!
//! Each view owns one shared block:
//!
//! ```text
//! pending   Mutex   committed state + generation, "worker running" flag
//! rendered  RwLock  (generation, bitmap) of the last finished recompute
//! published Condvar signalled every time `rendered` is replaced
//! ```
//!
//! [`DerivedView::set_state`] commits under `pending` and bumps the
//! generation. At most one worker per view runs on the shared `tych-render`
//! pool, whose size is bounded no matter how many views exist. The worker
//! loops until the bitmap it finished matches the committed generation, so
//! results of superseded states are dropped and never published.
//!
//! [`DerivedView::current_result`] compares the published generation against
//! the committed one. When they match, readers share the `RwLock` read guard
//! and never contend; otherwise the caller waits on `published`.
//!
//! Locks are always taken `pending` first, then `rendered`.

use crate::geometry::{Dimensions, Rect};
use crate::imaging::DecodedImage;
use crate::imaging::operations::{
    bake_orientation, crop, downscale_to_fit, rotate, rotated_dimensions,
};
use crate::orientation::OrientationTag;
use image::RgbaImage;
use parking_lot::{Condvar, Mutex, RwLock};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use tracing::{debug, trace, warn};

/// Crop rectangle and rotation, always stored normalized.
///
/// `crop` is in the coordinate space of the *rotated* upright bitmap and is
/// guaranteed to lie inside it. `rotation` is one of `0`, `90`, `180`, `-90`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropRotateState {
    pub crop: Option<Rect>,
    pub rotation: i32,
}

impl CropRotateState {
    pub fn is_identity(&self) -> bool {
        self.crop.is_none() && self.rotation == 0
    }
}

/// Normalize degrees into `(-180, 180]`, floored to a multiple of 90.
///
/// ```
/// # use tych::derived::normalize_rotation;
/// assert_eq!(normalize_rotation(450), 90);
/// assert_eq!(normalize_rotation(-270), 90);
/// assert_eq!(normalize_rotation(-450), -90);
/// assert_eq!(normalize_rotation(100), 90);
/// assert_eq!(normalize_rotation(270), -90);
/// ```
pub fn normalize_rotation(degrees: i32) -> i32 {
    let mut turned = degrees.rem_euclid(360);
    turned -= turned % 90;
    if turned > 180 {
        turned - 360
    } else {
        turned
    }
}

/// Clamp a requested crop against `bounds`.
///
/// A request larger than the bounds on both axes means "no crop". A request
/// too wide keeps its `y`/height and spans the full width; a request too tall
/// keeps its `x`/width and spans the full height. Whatever remains is then
/// intersected with the bounds, so the result is always contained.
pub fn clamp_crop(requested: Rect, bounds: Dimensions) -> Option<Rect> {
    let too_wide = requested.width > bounds.width;
    let too_tall = requested.height > bounds.height;
    let rect = match (too_wide, too_tall) {
        (true, true) => return None,
        (true, false) => Rect::new(0, requested.y, bounds.width, requested.height),
        (false, true) => Rect::new(requested.x, 0, requested.width, bounds.height),
        (false, false) => requested,
    };
    Some(bounds.bounds().intersection(rect))
}

struct Pending {
    state: CropRotateState,
    generation: u64,
    rendering: bool,
    failed: bool,
}

struct Rendered {
    generation: u64,
    image: Arc<RgbaImage>,
}

struct Shared {
    upright: Arc<RgbaImage>,
    pending: Mutex<Pending>,
    rendered: RwLock<Rendered>,
    published: Condvar,
    /// Mirror of `pending.generation` readable without the mutex.
    committed: AtomicU64,
    renders: AtomicU64,
}

/// One image of a collage.
///
/// The upright bitmap is immutable for the life of the view; only the
/// crop/rotation state changes.
pub struct DerivedView {
    shared: Arc<Shared>,
}

impl DerivedView {
    /// Bake `orientation` into `source` and start with no crop or rotation.
    pub fn new(source: RgbaImage, orientation: OrientationTag) -> Self {
        Self::from_upright(bake_orientation(source, orientation))
    }

    /// Build a view from backend output, first shrinking the raw bitmap so its
    /// longer edge fits `max_size` when one is given.
    pub fn from_decoded(decoded: DecodedImage, max_size: Option<u32>) -> Self {
        let DecodedImage {
            pixels,
            orientation,
        } = decoded;
        let pixels = match max_size.and_then(|max| downscale_to_fit(&pixels, max)) {
            Some(smaller) => smaller,
            None => pixels,
        };
        Self::new(pixels, orientation)
    }

    /// Wrap a bitmap that is already upright.
    pub fn from_upright(upright: RgbaImage) -> Self {
        let upright = Arc::new(upright);
        Self {
            shared: Arc::new(Shared {
                upright: Arc::clone(&upright),
                pending: Mutex::new(Pending {
                    state: CropRotateState::default(),
                    generation: 0,
                    rendering: false,
                    failed: false,
                }),
                rendered: RwLock::new(Rendered {
                    generation: 0,
                    image: upright,
                }),
                published: Condvar::new(),
                committed: AtomicU64::new(0),
                renders: AtomicU64::new(0),
            }),
        }
    }

    /// Commit a new crop/rotation and schedule a recompute.
    ///
    /// The request is normalized first: rotation via [`normalize_rotation`],
    /// crop via [`clamp_crop`] against the rotated bounds. Returns `false`
    /// without side effects when the normalized state equals the committed one.
    pub fn set_state(&self, crop: Option<Rect>, rotation_degrees: i32) -> bool {
        let rotation = normalize_rotation(rotation_degrees);
        let bounds = rotated_dimensions(self.upright_dimensions(), rotation);
        let state = CropRotateState {
            crop: crop.and_then(|rect| clamp_crop(rect, bounds)),
            rotation,
        };

        let mut pending = self.shared.pending.lock();
        if pending.state == state {
            return false;
        }
        pending.state = state;
        pending.generation += 1;
        pending.failed = false;
        self.shared
            .committed
            .store(pending.generation, Ordering::Release);
        trace!(
            generation = pending.generation,
            rotation,
            crop = ?state.crop,
            "committed view state"
        );

        if pending.rendering {
            // The running worker picks the new state up when it finishes.
            return true;
        }
        pending.rendering = true;
        drop(pending);
        self.spawn_worker();
        true
    }

    fn spawn_worker(&self) {
        match render_pool() {
            Some(pool) => {
                let shared = Arc::clone(&self.shared);
                pool.spawn(move || run_worker(&shared));
            }
            None => run_worker(&self.shared),
        }
    }

    /// The bitmap for the committed state.
    ///
    /// Blocks while a recompute is in flight; never returns a stale or
    /// intermediate result.
    ///
    /// # Panics
    ///
    /// If the recompute for the committed state panicked.
    pub fn current_result(&self) -> Arc<RgbaImage> {
        let committed = self.shared.committed.load(Ordering::Acquire);
        {
            let rendered = self.shared.rendered.read();
            if rendered.generation == committed {
                return Arc::clone(&rendered.image);
            }
        }

        let mut pending = self.shared.pending.lock();
        loop {
            {
                let rendered = self.shared.rendered.read();
                if rendered.generation == pending.generation {
                    return Arc::clone(&rendered.image);
                }
            }
            if pending.failed {
                panic!(
                    "derived view recompute for generation {} panicked",
                    pending.generation
                );
            }
            self.shared.published.wait(&mut pending);
        }
    }

    /// Width of the result for the committed state. Never blocks on a recompute.
    pub fn width(&self) -> u32 {
        self.dimensions().width
    }

    /// Height of the result for the committed state. Never blocks on a recompute.
    pub fn height(&self) -> u32 {
        self.dimensions().height
    }

    pub fn dimensions(&self) -> Dimensions {
        let state = self.state();
        match state.crop {
            Some(rect) => rect.dimensions(),
            None => rotated_dimensions(self.upright_dimensions(), state.rotation),
        }
    }

    pub fn state(&self) -> CropRotateState {
        self.shared.pending.lock().state
    }

    /// Number of committed state changes so far.
    pub fn generation(&self) -> u64 {
        self.shared.committed.load(Ordering::Acquire)
    }

    /// Number of recomputes that ran to completion, including superseded ones.
    pub fn render_count(&self) -> u64 {
        self.shared.renders.load(Ordering::Acquire)
    }

    /// The orientation-corrected source bitmap.
    pub fn upright(&self) -> &RgbaImage {
        &self.shared.upright
    }

    pub fn upright_dimensions(&self) -> Dimensions {
        Dimensions::new(self.shared.upright.width(), self.shared.upright.height())
    }

    /// A new view over a downscaled copy of the source whose longer edge fits
    /// `max_edge`, carrying over rotation and a proportionally scaled crop.
    ///
    /// `None` when the source already fits.
    pub fn downscaled(&self, max_edge: u32) -> Option<DerivedView> {
        let upright = self.upright();
        let scaled = downscale_to_fit(upright, max_edge)?;
        let factor = scaled.width() as f64 / upright.width() as f64;
        let state = self.state();

        let view = DerivedView::from_upright(scaled);
        view.set_state(state.crop.map(|rect| rect.scaled(factor)), state.rotation);
        Some(view)
    }
}

impl fmt::Debug for DerivedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedView")
            .field("upright", &self.upright_dimensions())
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Dedicated pool for recomputes, separate from rayon's global pool.
///
/// Readers may block in [`DerivedView::current_result`] from global pool
/// workers; recomputes never block, so they always make progress here.
static RENDER_POOL: LazyLock<Option<ThreadPool>> = LazyLock::new(|| {
    let threads = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(2, RENDER_THREADS_MAX);
    match ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("tych-render-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(error = %e, "cannot start render threads, rendering inline");
            None
        }
    }
});

const RENDER_THREADS_MAX: usize = 8;

fn render_pool() -> Option<&'static ThreadPool> {
    RENDER_POOL.as_ref()
}

/// Recompute until the finished bitmap matches the committed generation.
fn run_worker(shared: &Shared) {
    loop {
        let (state, generation) = {
            let pending = shared.pending.lock();
            (pending.state, pending.generation)
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| render(&shared.upright, state)));
        shared.renders.fetch_add(1, Ordering::AcqRel);

        let mut pending = shared.pending.lock();
        match outcome {
            Ok(image) if pending.generation == generation => {
                *shared.rendered.write() = Rendered { generation, image };
                pending.rendering = false;
                debug!(generation, "published derived view");
                shared.published.notify_all();
                return;
            }
            Ok(_) => {
                debug!(
                    generation,
                    latest = pending.generation,
                    "discarding superseded recompute"
                );
            }
            Err(_) => {
                pending.rendering = false;
                pending.failed = true;
                shared.published.notify_all();
                return;
            }
        }
    }
}

/// Rotate, then crop in the rotated coordinate space.
fn render(upright: &Arc<RgbaImage>, state: CropRotateState) -> Arc<RgbaImage> {
    if state.is_identity() {
        return Arc::clone(upright);
    }

    let rotated: Cow<'_, RgbaImage> = if state.rotation == 0 {
        Cow::Borrowed(&**upright)
    } else {
        Cow::Owned(rotate(upright, state.rotation))
    };

    match state.crop {
        Some(rect) => {
            let bounds = Dimensions::new(rotated.width(), rotated.height()).bounds();
            assert!(
                bounds.contains(rect),
                "crop {rect:?} escaped bounds {bounds:?}"
            );
            Arc::new(crop(&rotated, rect))
        }
        None => Arc::new(rotated.into_owned()),
    }
}
