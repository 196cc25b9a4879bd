//! The animation manager: owns the surface, the background list, the live
//! reveal squares and the three timed activities (frame render, random
//! spawner, background rotator).
//!
//! Everything runs on the host's loop thread. The host pumps [`AnimationManager::update`],
//! forwards pointer moves, and calls [`AnimationManager::render_frame`] once
//! per display refresh, then presents [`AnimationManager::surface`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::AnimationConfig;
use crate::error::Error;
use crate::loader::MediaLoader;
use crate::media::{BackgroundMedia, BackgroundSource};
use crate::schedule::{FrameRequest, IntervalTimer};
use crate::surface::Surface;
use crate::types::Rect;

/// A transient window onto the background that was active when it spawned.
#[derive(Clone, Debug, PartialEq)]
pub struct RevealSquare {
    pub x: f32,                // top-left corner on the surface
    pub y: f32,
    pub size: usize,
    pub created_at: Instant,
    pub media: usize,          // index into the background list, fixed at spawn
}

impl RevealSquare {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    pub fn is_expired(&self, now: Instant, lifetime: Duration) -> bool {
        self.age(now) >= lifetime
    }
}

/// Load state of one background. Slots are never removed, so a square's
/// media index stays valid for the manager's lifetime.
#[derive(Debug)]
enum MediaSlot {
    Loading,
    Ready(BackgroundMedia),
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Idle,      // waiting for the first background
    Running,
    Destroyed, // terminal
}

pub struct AnimationManager<S: Surface> {
    surface: S,
    config: AnimationConfig,

    media: Vec<MediaSlot>,
    loader: Option<MediaLoader>,
    active: usize,

    squares: VecDeque<RevealSquare>,
    last_pointer: Option<(f32, f32)>,

    frame: Option<FrameRequest>,
    spawn_timer: Option<IntervalTimer>,
    rotation_timer: Option<IntervalTimer>,
    listening: bool,
    lifecycle: Lifecycle,

    rng: StdRng,
}

impl<S: Surface> AnimationManager<S> {
    /// Start decoding `sources` in the background. The animation begins on the
    /// first [`update`](Self::update) after the first source is ready.
    pub fn new(surface: S, sources: &[BackgroundSource], config: AnimationConfig) -> Result<Self, Error> {
        if sources.is_empty() {
            return Err(Error::NoBackgrounds);
        }
        let media = sources.iter().map(|_| MediaSlot::Loading).collect();
        let loader = MediaLoader::spawn(sources, (surface.width(), surface.height()));
        Ok(Self::from_slots(surface, media, Some(loader), config))
    }

    /// Use backgrounds that are already decoded. The first `update` starts
    /// the animation.
    pub fn with_media(surface: S, media: Vec<BackgroundMedia>, config: AnimationConfig) -> Result<Self, Error> {
        if media.is_empty() {
            return Err(Error::NoBackgrounds);
        }
        let media = media.into_iter().map(MediaSlot::Ready).collect();
        Ok(Self::from_slots(surface, media, None, config))
    }

    /// Replace the random source used for spawn positions.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    fn from_slots(surface: S, media: Vec<MediaSlot>, loader: Option<MediaLoader>, config: AnimationConfig) -> Self {
        Self {
            surface,
            config,
            media,
            loader,
            active: 0,
            squares: VecDeque::new(),
            last_pointer: None,
            frame: None,
            spawn_timer: None,
            rotation_timer: None,
            listening: false,
            lifecycle: Lifecycle::Idle,
            rng: StdRng::from_entropy(),
        }
    }

    /* ------------------------------ lifecycle ------------------------------ */

    /// Register the pointer listener, schedule the first frame and start the
    /// spawner and rotator. Does nothing if already running or destroyed.
    pub fn start(&mut self, now: Instant) {
        match self.lifecycle {
            Lifecycle::Running => {
                debug!("start() while already running; ignored");
                return;
            }
            Lifecycle::Destroyed => {
                debug!("start() after destroy(); ignored");
                return;
            }
            Lifecycle::Idle => {}
        }

        self.listening = true;
        self.frame = Some(FrameRequest::first());
        self.spawn_timer = Some(IntervalTimer::start(self.config.random_square_interval(), now));
        self.rotation_timer = Some(IntervalTimer::start(self.config.image_rotation_interval(), now));
        self.lifecycle = Lifecycle::Running;

        info!(
            "Animation started: {} background(s) on a {}x{} surface",
            self.media.len(),
            self.surface.width(),
            self.surface.height()
        );
    }

    /// Cancel the pending frame, both timers and the pointer listener.
    /// Safe at any point, including before `start` and more than once.
    pub fn destroy(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        self.frame = None;
        self.spawn_timer = None;
        self.rotation_timer = None;
        self.listening = false;
        // Late loads are dropped on the floor; a destroyed manager never starts.
        self.loader = None;
        self.lifecycle = Lifecycle::Destroyed;
        info!("Animation destroyed");
    }

    /// Host pump: collect finished loads, start once the first background is
    /// ready, then fire every timer tick due by `now`.
    pub fn update(&mut self, now: Instant) {
        self.poll_media();
        if self.lifecycle == Lifecycle::Idle && matches!(self.media[0], MediaSlot::Ready(_)) {
            self.start(now);
        }
        self.run_timers(now);
    }

    fn poll_media(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        let results = loader.try_recv_all();
        if loader.pending() == 0 {
            self.loader = None;
        }

        for (index, result) in results {
            match result {
                Ok(media) => {
                    debug!("Background {index} ready");
                    self.media[index] = MediaSlot::Ready(media);
                }
                Err(e) => {
                    warn!("Background {index} unavailable: {e}");
                    if index == 0 {
                        warn!("First background failed; the animation will stay idle");
                    }
                    self.media[index] = MediaSlot::Failed;
                }
            }
        }
    }

    /// Fire each timer at most once, however late the host is; missed ticks
    /// coalesce. When both are due the earlier one runs first, and equal
    /// times run the spawner first, the order the timers were registered in.
    fn run_timers(&mut self, now: Instant) {
        let spawn_at = self.spawn_timer.as_mut().and_then(|t| t.poll(now));
        let rotate_at = self.rotation_timer.as_mut().and_then(|t| t.poll(now));

        match (spawn_at, rotate_at) {
            (Some(s), Some(r)) if r < s => {
                self.rotate_background();
                self.spawn_random_square(s);
            }
            (s, r) => {
                if let Some(at) = s {
                    self.spawn_random_square(at);
                }
                if r.is_some() {
                    self.rotate_background();
                }
            }
        }
    }

    /* ------------------------------ operations ----------------------------- */

    /// Pointer moved to (x, y) in surface coordinates. Adds a square when this
    /// is the first recorded position or the pointer travelled at least
    /// `min_distance` since the last recorded one.
    pub fn on_pointer_move(&mut self, x: f32, y: f32, now: Instant) {
        if !self.listening {
            return;
        }
        let far_enough = match self.last_pointer {
            None => true,
            Some((lx, ly)) => (x - lx).hypot(y - ly) >= self.config.min_distance,
        };
        if !far_enough {
            return;
        }
        self.last_pointer = Some((x, y));
        self.push_square(x, y, now);
    }

    /// Add a square at a uniformly random spot where it fits on the surface.
    /// A surface smaller than the square pins that axis to 0.
    pub fn spawn_random_square(&mut self, now: Instant) {
        let size = self.config.square_size;
        let max_x = self.surface.width().saturating_sub(size) as f32;
        let max_y = self.surface.height().saturating_sub(size) as f32;
        let x = self.rng.r#gen::<f32>() * max_x;
        let y = self.rng.r#gen::<f32>() * max_y;
        self.push_square(x, y, now);
    }

    /// Point new squares at the next background, wrapping to the first.
    pub fn rotate_background(&mut self) {
        self.active = (self.active + 1) % self.media.len();
        trace!("Active background -> {}", self.active);
    }

    fn push_square(&mut self, x: f32, y: f32, now: Instant) {
        trace!("Square at ({x:.1}, {y:.1}) showing background {}", self.active);
        self.squares.push_back(RevealSquare {
            x,
            y,
            size: self.config.square_size,
            created_at: now,
            media: self.active,
        });
    }

    /// Draw one frame if one is scheduled, then schedule the next.
    /// Returns false once the manager is idle or destroyed.
    pub fn render_frame(&mut self, now: Instant) -> bool {
        let Some(request) = self.frame else {
            return false;
        };
        self.draw(now);
        self.frame = Some(request.next());
        true
    }

    fn draw(&mut self, now: Instant) {
        self.surface.clear();
        self.surface.fill(self.config.fill_color.0);

        let lifetime = self.config.square_lifetime();
        self.squares.retain(|sq| !sq.is_expired(now, lifetime));

        for sq in &self.squares {
            // Backgrounds still loading (or broken) draw nothing.
            if let MediaSlot::Ready(media) = &self.media[sq.media] {
                let region = Rect::square_at(sq.x, sq.y, sq.size);
                self.surface.blit(media.drawable(now), region, region);
            }
        }
    }

    /* ------------------------------ accessors ------------------------------ */

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Live squares, oldest first.
    pub fn squares(&self) -> impl ExactSizeIterator<Item = &RevealSquare> {
        self.squares.iter()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn media_count(&self) -> usize {
        self.media.len()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn has_active_timers(&self) -> bool {
        self.spawn_timer.is_some() || self.rotation_timer.is_some()
    }

    pub fn frame_pending(&self) -> Option<FrameRequest> {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameBuffer;

    const WHITE: u32 = 0x00FF_FFFF;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// Solid-colored backgrounds: background `i` is color `0x100 + i`.
    fn manager(w: usize, h: usize, backgrounds: usize) -> AnimationManager<FrameBuffer> {
        let media = (0..backgrounds)
            .map(|i| BackgroundMedia::Image(FrameBuffer::filled(w, h, 0x100 + i as u32)))
            .collect();
        AnimationManager::with_media(FrameBuffer::filled(w, h, 0), media, AnimationConfig::default())
            .unwrap()
            .with_rng(StdRng::seed_from_u64(7))
    }

    fn running(w: usize, h: usize, backgrounds: usize) -> (AnimationManager<FrameBuffer>, Instant) {
        let mut m = manager(w, h, backgrounds);
        let t0 = Instant::now();
        m.update(t0);
        assert!(m.is_running());
        (m, t0)
    }

    #[test]
    fn empty_background_list_is_rejected() {
        let r = AnimationManager::with_media(FrameBuffer::filled(1, 1, 0), Vec::new(), AnimationConfig::default());
        assert!(matches!(r, Err(Error::NoBackgrounds)));
        let r = AnimationManager::new(FrameBuffer::filled(1, 1, 0), &[], AnimationConfig::default());
        assert!(matches!(r, Err(Error::NoBackgrounds)));
    }

    #[test]
    fn pointer_distance_gating_scenario() {
        let (mut m, t0) = running(1024, 768, 1);

        m.on_pointer_move(0.0, 0.0, t0);
        assert_eq!(m.squares().len(), 1, "first position always spawns");

        m.on_pointer_move(10.0, 10.0, t0 + ms(16));
        assert_eq!(m.squares().len(), 1, "~14.1 px is below the threshold");

        // Measured from (0,0), not (10,10): the short move was not recorded.
        m.on_pointer_move(60.0, 10.0, t0 + ms(32));
        assert_eq!(m.squares().len(), 2);
        let sq = m.squares().last().unwrap();
        assert_eq!((sq.x, sq.y, sq.size), (60.0, 10.0, 200));
    }

    #[test]
    fn square_added_iff_far_enough_from_last_recorded() {
        let (mut m, t0) = running(1024, 768, 1);
        let mut rng = StdRng::seed_from_u64(99);
        let mut last: Option<(f32, f32)> = None;
        let mut expected = 0;

        for i in 0..500u64 {
            let (x, y) = (rng.gen_range(0.0..1024.0f32), rng.gen_range(0.0..768.0f32));
            let qualifies = match last {
                None => true,
                Some((lx, ly)) => (x - lx).hypot(y - ly) >= 50.0,
            };
            if qualifies {
                last = Some((x, y));
                expected += 1;
            }
            m.on_pointer_move(x, y, t0 + ms(i));
            assert_eq!(m.squares().len(), expected);
        }
    }

    #[test]
    fn exactly_min_distance_counts() {
        let (mut m, t0) = running(1024, 768, 1);
        m.on_pointer_move(100.0, 100.0, t0);
        m.on_pointer_move(130.0, 140.0, t0); // 3-4-5 triangle, exactly 50
        assert_eq!(m.squares().len(), 2);
    }

    #[test]
    fn pointer_is_ignored_until_started() {
        let mut m = manager(1024, 768, 1);
        m.on_pointer_move(5.0, 5.0, Instant::now());
        assert_eq!(m.squares().len(), 0);
        assert!(!m.is_listening());
    }

    #[test]
    fn spawned_square_lives_exactly_the_lifetime() {
        let (mut m, t0) = running(1024, 768, 1);

        m.update(t0 + ms(600));
        assert_eq!(m.squares().len(), 1);
        assert_eq!(m.squares().next().unwrap().created_at, t0 + ms(600));

        assert!(m.render_frame(t0 + ms(3599)));
        assert_eq!(m.squares().len(), 1);

        assert!(m.render_frame(t0 + ms(3600)));
        assert_eq!(m.squares().len(), 0);
    }

    #[test]
    fn draw_pass_keeps_only_fresh_squares() {
        let (mut m, t0) = running(1024, 768, 1);
        // Same order as the host loop: timers first, then the pointer event.
        for i in 0..40u64 {
            let t = t0 + ms(i * 100);
            m.update(t);
            m.on_pointer_move((i * 60 % 900) as f32, (i * 37 % 600) as f32, t);
        }
        let now = t0 + ms(5000);
        m.update(now);
        m.render_frame(now);

        assert!(m.squares().len() > 0);
        for sq in m.squares() {
            assert!(now.duration_since(sq.created_at) < ms(3000));
        }
        let ages: Vec<_> = m.squares().map(|s| s.created_at).collect();
        assert!(ages.windows(2).all(|w| w[0] <= w[1]), "oldest first");
    }

    #[test]
    fn rotation_is_circular() {
        let (mut m, _) = running(64, 64, 3);
        assert_eq!(m.active_index(), 0);
        m.rotate_background();
        m.rotate_background();
        assert_eq!(m.active_index(), 2);
        m.rotate_background();
        assert_eq!(m.active_index(), 0);
    }

    #[test]
    fn rotation_timer_ties_fire_spawner_first() {
        let (mut m, t0) = running(1024, 768, 2);
        for i in 1..=5u64 {
            m.update(t0 + ms(600 * i));
        }
        // Spawns at 600..=3000, rotation at 3000 after the last spawn.
        assert_eq!(m.active_index(), 1);
        assert_eq!(m.squares().len(), 5);
        assert!(m.squares().all(|s| s.media == 0));

        m.update(t0 + ms(3600));
        assert_eq!(m.squares().last().unwrap().media, 1);
    }

    #[test]
    fn late_update_spawns_and_rotates_once() {
        let (mut m, t0) = running(1024, 768, 3);

        // The host stalled for a minute: 100 spawn ticks and 20 rotations missed.
        let now = t0 + Duration::from_secs(60);
        m.update(now);
        assert_eq!(m.squares().len(), 1);
        assert_eq!(m.squares().next().unwrap().created_at, now);
        assert_eq!(m.active_index(), 1);

        // Back on the regular grid afterwards.
        m.update(now + ms(600));
        assert_eq!(m.squares().len(), 2);
    }

    #[test]
    fn existing_squares_keep_their_background() {
        let (mut m, t0) = running(1024, 768, 2);

        m.on_pointer_move(0.0, 0.0, t0);
        m.rotate_background();
        m.on_pointer_move(600.0, 400.0, t0);

        let media: Vec<_> = m.squares().map(|s| s.media).collect();
        assert_eq!(media, vec![0, 1]);

        m.render_frame(t0 + ms(10));
        let fb = m.surface();
        assert_eq!(fb.get(10, 10), Some(0x100));
        assert_eq!(fb.get(199, 199), Some(0x100));
        assert_eq!(fb.get(610, 410), Some(0x101));
        assert_eq!(fb.get(900, 50), Some(WHITE));
        assert_eq!(fb.get(200, 10), Some(WHITE));
    }

    #[test]
    fn unready_background_draws_nothing() {
        let (mut m, t0) = running(512, 512, 2);
        m.media[1] = MediaSlot::Loading;
        m.rotate_background();
        m.on_pointer_move(10.0, 10.0, t0);
        m.render_frame(t0);
        assert_eq!(m.surface().get(20, 20), Some(WHITE));
    }

    #[test]
    fn far_off_surface_pointer_squares_render_nothing() {
        let (mut m, t0) = running(64, 64, 1);
        m.on_pointer_move(3.0e9, 10.0, t0);
        m.on_pointer_move(-3.0e9, -3.0e9, t0);
        m.on_pointer_move(10.0, 3.0e9, t0);
        assert_eq!(m.squares().len(), 3);

        assert!(m.render_frame(t0));
        assert!(m.surface().pixels.iter().all(|&p| p == WHITE));
    }

    #[test]
    fn random_squares_fit_inside_the_surface() {
        let (mut m, t0) = running(1024, 768, 1);
        for i in 0..1000u64 {
            m.spawn_random_square(t0 + ms(i));
        }
        for sq in m.squares() {
            assert!(sq.x >= 0.0 && sq.x + 200.0 <= 1024.0, "x = {}", sq.x);
            assert!(sq.y >= 0.0 && sq.y + 200.0 <= 768.0, "y = {}", sq.y);
        }
    }

    #[test]
    fn undersized_surface_pins_random_squares_to_origin() {
        let (mut m, t0) = running(100, 50, 1);
        for _ in 0..20 {
            m.spawn_random_square(t0);
        }
        assert!(m.squares().all(|s| s.x == 0.0 && s.y == 0.0));
        m.render_frame(t0);
        assert_eq!(m.surface().get(99, 49), Some(0x100));
    }

    #[test]
    fn start_twice_does_not_reset_timers() {
        let mut m = manager(1024, 768, 1);
        let t0 = Instant::now();
        m.start(t0);
        m.start(t0 + ms(500));
        m.update(t0 + ms(600));
        assert_eq!(m.squares().len(), 1);
    }

    #[test]
    fn frames_reschedule_until_destroyed() {
        let (mut m, t0) = running(64, 64, 1);
        let first = m.frame_pending().unwrap();
        assert!(m.render_frame(t0));
        assert!(m.render_frame(t0 + ms(16)));
        assert_eq!(m.frame_pending().unwrap().id(), first.id() + 2);
        m.destroy();
        assert!(m.frame_pending().is_none());
        assert!(!m.render_frame(t0 + ms(32)));
    }

    #[test]
    fn destroy_before_start_is_clean_and_final() {
        let mut m = manager(64, 64, 1);
        m.destroy();
        m.destroy();
        assert!(!m.is_running());
        assert!(!m.is_listening());
        assert!(!m.has_active_timers());

        // The background is ready, but a destroyed manager never starts.
        let t0 = Instant::now();
        m.update(t0);
        m.update(t0 + ms(5000));
        assert!(!m.is_running());
        assert!(!m.render_frame(t0));
        assert_eq!(m.squares().len(), 0);
    }

    #[test]
    fn unreadable_first_background_stalls_silently() {
        let sources = [BackgroundSource::image("/no/such/background.png")];
        let mut m = AnimationManager::new(FrameBuffer::filled(64, 64, 0), &sources, AnimationConfig::default()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while m.loader.is_some() && Instant::now() < deadline {
            m.update(Instant::now());
            std::thread::sleep(ms(5));
        }
        assert!(matches!(m.media[0], MediaSlot::Failed));
        assert!(!m.is_running());
        m.destroy();
        assert!(!m.has_active_timers());
    }

    #[test]
    fn destroy_stops_everything() {
        let (mut m, t0) = running(1024, 768, 2);
        m.destroy();
        m.update(t0 + ms(10_000));
        m.on_pointer_move(10.0, 10.0, t0 + ms(10_000));
        assert_eq!(m.squares().len(), 0);
        assert_eq!(m.active_index(), 0);
        assert!(!m.has_active_timers());
        assert!(!m.is_listening());
    }

    #[test]
    fn starts_once_first_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("first.png");
        image::RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 255]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let sources = [
            BackgroundSource::image(path.display().to_string()),
            BackgroundSource::video(dir.path().join("later.gif").display().to_string()),
        ];
        let mut m = AnimationManager::new(FrameBuffer::filled(8, 8, 0), &sources, AnimationConfig::default()).unwrap();
        assert!(!m.is_running());

        let deadline = Instant::now() + Duration::from_secs(10);
        while !m.is_running() && Instant::now() < deadline {
            m.update(Instant::now());
            std::thread::sleep(ms(5));
        }
        assert!(m.is_running());
        assert_eq!(m.media_count(), 2);
    }
}
