//! Teapot scene demo
//!
//! Opens a window, loads the deferred pipeline's shaders and textures, builds
//! the demonstration scene and renders it until the window closes. Any error is
//! fatal: it is logged with the failing operation and the process exits.

mod input;
mod scene;
mod shapes;
mod window;

use std::path::Path;

use deferred_engine::core::{ApplicationConfig, Config, ConfigError};
use deferred_engine::foundation::{logging, time::Timer};
use deferred_engine::frame::FrameState;
use deferred_engine::render::backends::GlDevice;
use deferred_engine::render::{DeferredPipeline, RenderError};
use thiserror::Error;

use input::{InputHandler, InputResponse};
use scene::{Scene, SceneMeshes};
use shapes::ProceduralGround;
use window::{GlWindow, WindowError};

const CONFIG_PATH: &str = "config/teapot.toml";

#[derive(Error, Debug)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

fn load_config() -> Result<ApplicationConfig, ConfigError> {
    let config = ApplicationConfig::load_or_default(CONFIG_PATH)?;
    config.validate()?;
    Ok(config)
}

fn run(config: &ApplicationConfig) -> Result<(), AppError> {
    let mut window = GlWindow::new(&config.window)?;
    let mut device = GlDevice::new(window.load_gl())?;
    let renderer = &config.renderer;

    let (width, height) = window.framebuffer_size();
    let mut pipeline = DeferredPipeline::new(&mut device, renderer, (width, height))?;

    let ground = ProceduralGround::default();
    let meshes = SceneMeshes::upload(&mut device, Path::new(&renderer.model_dir), &ground)?;
    let mut scene = Scene::build(&meshes);

    let mut frame = FrameState::new(renderer, width, height);
    let mut input = InputHandler::new();
    let mut timer = Timer::new();

    log::info!("Entering render loop");
    while !window.should_close() {
        for event in window.poll_events() {
            if input.handle(&event, &mut frame) == InputResponse::Quit {
                window.set_should_close(true);
            }
        }

        timer.update();
        let (width, height) = window.framebuffer_size();
        if width == 0 || height == 0 {
            // Minimized
            continue;
        }

        frame.advance(timer.delta_time(), width, height, &ground);
        pipeline.render_frame(&mut device, &mut scene, &frame)?;
        window.swap_buffers();

        if timer.frame_count() % 600 == 0 {
            log::debug!("{:.1} fps average", timer.average_fps());
        }
    }

    log::info!("Exiting after {} frames", timer.frame_count());
    Ok(())
}

fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init_with_level("info");
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    logging::init_with_level(&config.log_level);

    if let Err(e) = run(&config) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
