//! Castellan walkthrough
//!
//! Moves numbers from a producer thread to a consumer thread through a bounded
//! ring buffer, then draws one frame into a hidden window.
//!
//! Usage: `castellan_demo [config.toml|config.ron]`

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use castellan::config::{Config, ConfigError};
use castellan::core::{Library, LibraryConfig, LockStatus, Subsystems};
use castellan::foundation::logging;
use castellan::foundation::{Point, Rect};
use castellan::sync::{Condition, Mutex, ScopedLock, Semaphore};
use castellan::thread::{Thread, ThreadPriority};
use castellan::video::{Color, Renderer, Window};

const CAPACITY: usize = 8;
const ITEMS: u32 = 64;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Castellan(#[from] castellan::Error),

    #[error("Thread '{0}' exited with status {1}")]
    Worker(&'static str, i32),

    #[error("Consumer received {received} of {expected} items")]
    Incomplete { received: u32, expected: u32 },
}

/// Single producer, single consumer bounded buffer.
struct Channel {
    slots: [AtomicU32; CAPACITY],
    free: Semaphore,
    filled: Semaphore,
    consumed: AtomicU32,
    checksum: AtomicU32,
    mutex: Mutex,
    done: Condition,
}

impl Channel {
    fn new() -> castellan::Result<Self> {
        Ok(Self {
            slots: Default::default(),
            free: Semaphore::new(CAPACITY as u32)?,
            filled: Semaphore::new(0)?,
            consumed: AtomicU32::new(0),
            checksum: AtomicU32::new(0),
            mutex: Mutex::new()?,
            done: Condition::new()?,
        })
    }
}

fn produce(channel: Arc<Channel>) -> i32 {
    for value in 1..=ITEMS {
        if channel.free.acquire().is_failure() {
            return 1;
        }
        channel.slots[value as usize % CAPACITY].store(value, Ordering::Release);
        if channel.filled.release().is_failure() {
            return 2;
        }
    }
    0
}

fn consume(channel: Arc<Channel>) -> i32 {
    if Thread::set_priority(ThreadPriority::High).is_failure() {
        log::debug!("Consumer keeps normal priority");
    }
    for expected in 1..=ITEMS {
        if channel.filled.acquire().is_failure() {
            return 1;
        }
        let value = channel.slots[expected as usize % CAPACITY].load(Ordering::Acquire);
        if value != expected {
            log::error!("Expected {expected}, got {value}");
            return 2;
        }
        channel.checksum.fetch_add(value, Ordering::Relaxed);
        if channel.free.release().is_failure() {
            return 3;
        }

        let Ok(_lock) = ScopedLock::new(&channel.mutex) else {
            return 4;
        };
        channel.consumed.store(expected, Ordering::Release);
        if channel.done.signal().is_failure() {
            return 5;
        }
    }
    0
}

fn run_channel() -> Result<(), DemoError> {
    let channel = Arc::new(Channel::new()?);
    let mut producer = Thread::with_data("producer", Arc::clone(&channel), produce)?;
    let mut consumer = Thread::with_data("consumer", Arc::clone(&channel), consume)?;
    log::info!("Started {producer} and {consumer}");

    {
        let lock = channel.mutex.scoped()?;
        while channel.consumed.load(Ordering::Acquire) < ITEMS {
            match channel.done.wait_timeout(lock.mutex(), Duration::from_millis(100)) {
                LockStatus::Error => {
                    log::warn!("Wait failed: {}", castellan::last_error());
                    break;
                }
                LockStatus::TimedOut => log::debug!(
                    "Still waiting, {} items consumed",
                    channel.consumed.load(Ordering::Acquire)
                ),
                LockStatus::Success => {}
            }
        }
    }

    for (name, thread) in [("producer", &mut producer), ("consumer", &mut consumer)] {
        let status = thread.join();
        if status != 0 {
            return Err(DemoError::Worker(name, status));
        }
    }

    let received = channel.consumed.load(Ordering::Acquire);
    if received != ITEMS {
        return Err(DemoError::Incomplete { received, expected: ITEMS });
    }
    log::info!(
        "Moved {ITEMS} items, checksum {}, {} tokens left",
        channel.checksum.load(Ordering::Relaxed),
        channel.free.tokens()
    );
    Ok(())
}

fn draw_frame() -> Result<(), DemoError> {
    let window = Window::with_title("castellan demo")?;
    let renderer = Renderer::new(&window)?;
    log::info!("Rendering into {window}");

    let _ = renderer.clear_with(Color::from_hex("#202830").unwrap_or(Color::BLACK));
    let _ = renderer.set_color(Color::GREEN);
    let _ = renderer.fill_rect(Rect::new(100, 100, 200, 150));
    renderer.present();

    let pixel = renderer.read_pixel(Point::new(150, 150));
    log::info!("Pixel at (150, 150): {}", pixel.map_or_else(|| "none".to_owned(), |color| color.to_string()));
    Ok(())
}

fn run() -> Result<(), DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {path}");
            LibraryConfig::load_from_file(&path)?
        }
        None => LibraryConfig::default(),
    };
    let library = Library::new(&config)?;

    run_channel()?;
    if library.subsystems().contains(Subsystems::VIDEO) {
        draw_frame()?;
    } else {
        log::info!("Video disabled, skipping rendering");
    }
    Ok(())
}

fn main() {
    logging::init();
    log::info!("Starting castellan demo");

    if let Err(error) = run() {
        log::error!("Demo failed: {error}");
        std::process::exit(1);
    }
    log::info!("Demo finished");
}
