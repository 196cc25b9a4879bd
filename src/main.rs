// Host for the reveal animation:
// • A white canvas; squares of the current background appear where the
//   pointer moves (every 50 px of travel) and at random every 600 ms.
// • Squares vanish after 3 s; the background they show rotates every 3 s.
// • ESC or closing the window quits.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{debug, info};

use reveal_canvas::window::CanvasWindow;
use reveal_canvas::{AnimationManager, AppConfig, BackgroundSource, Error, FrameBuffer};

/// Animated background revealed through short-lived squares
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML config file (window, animation tunables, backgrounds)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Add an image background (repeatable)
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<String>,

    /// Add a video background: GIF, or anything ffmpeg can read (repeatable)
    #[arg(long = "video", value_name = "PATH")]
    videos: Vec<String>,
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    /* --- Config + background list --- */
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };
    config.backgrounds.extend(args.images.iter().map(BackgroundSource::image));
    config.backgrounds.extend(args.videos.iter().map(BackgroundSource::video));
    info!("{} background source(s)", config.backgrounds.len());

    /* --- Surface, manager, window ---
       The manager starts by itself once the first background has decoded. */
    let surface = FrameBuffer::filled(config.window.width, config.window.height, 0);
    let mut manager = AnimationManager::new(surface, &config.backgrounds, config.animation.clone())?;
    let mut window = CanvasWindow::new(&config.window)?;

    let mut last_pointer: Option<(f32, f32)> = None;
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;

    /* ------------------------------ Main loop ------------------------------ */
    while window.is_open() && !window.esc_pressed() {
        let now = Instant::now();

        // 1) Timers (and the deferred start) catch up to now.
        manager.update(now);

        // 2) Pointer: only actual movement counts as an event.
        let pointer = window.pointer_pos();
        if let Some((x, y)) = pointer {
            if pointer != last_pointer {
                manager.on_pointer_move(x, y, now);
            }
        }
        last_pointer = pointer;

        // 3) Draw and present. Until the first background is ready the canvas stays blank.
        manager.render_frame(now);
        window.present(manager.surface())?;

        // 4) FPS once per second
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            debug!(
                "FPS: {:.1} | squares: {}",
                frames_this_second as f32 / secs,
                manager.squares().len()
            );
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    manager.destroy();
    Ok(())
}
