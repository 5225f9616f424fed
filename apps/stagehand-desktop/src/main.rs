mod host;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use stagehand_common::Viewport;
use stagehand_render_wgpu::WgpuRenderer;
use stagehand_runtime::{HostEvent, Stage, StageConfig};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::host::WinitHost;

/// Pixels per scrolled line, for wheels that report in lines.
const LINE_HEIGHT: f32 = 100.0;

#[derive(Parser)]
#[command(
    name = "stagehand-desktop",
    about = "Move a box with the arrow keys; the camera follows"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Stage configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Per-tick displacement for each held arrow key
    #[arg(long)]
    step: Option<f32>,

    /// Disable orbit damping
    #[arg(long)]
    no_damping: bool,

    /// Orbit damping factor in (0, 1]
    #[arg(long)]
    damping_factor: Option<f32>,
}

impl Cli {
    fn stage_config(&self) -> Result<StageConfig> {
        let mut config = match &self.config {
            Some(path) => StageConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => StageConfig::default(),
        };
        if let Some(step) = self.step {
            config.step = step;
        }
        if self.no_damping {
            config.controls.enable_damping = false;
        }
        if let Some(factor) = self.damping_factor {
            config.controls.damping_factor = factor;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Browser-style key name for the keys the stage understands.
fn key_name(event: &KeyEvent) -> Option<String> {
    match &event.logical_key {
        Key::Named(named) => {
            let name = match named {
                NamedKey::ArrowUp => "ArrowUp",
                NamedKey::ArrowDown => "ArrowDown",
                NamedKey::ArrowLeft => "ArrowLeft",
                NamedKey::ArrowRight => "ArrowRight",
                NamedKey::Escape => "Escape",
                NamedKey::Space => " ",
                NamedKey::Shift => "Shift",
                _ => return None,
            };
            Some(name.to_owned())
        }
        Key::Character(text) => Some(text.to_string()),
        _ => None,
    }
}

struct StageApp {
    config: StageConfig,
    stage: Option<Stage<WinitHost, WgpuRenderer>>,
    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
    failure: Option<anyhow::Error>,
}

impl StageApp {
    fn new(config: StageConfig) -> Self {
        Self {
            config,
            stage: None,
            dragging: false,
            cursor: None,
            failure: None,
        }
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Stagehand")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs).context("creating window")?);

        let size = window.inner_size();
        let renderer =
            WgpuRenderer::new(window.clone(), Viewport::new(size.width, size.height))?;
        tracing::info!(backend = renderer.backend(), "renderer ready");

        let stage = Stage::start(WinitHost::new(window), renderer, &self.config)?;
        self.stage = Some(stage);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(stage) = self.stage.take() {
            stop_stage(stage);
        }
        event_loop.exit();
    }

    fn forward(&mut self, event: HostEvent) {
        if let Some(stage) = &mut self.stage {
            stage.handle_event(event);
        }
    }
}

impl ApplicationHandler for StageApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.stage.is_some() {
            return;
        }
        if let Err(e) = self.open(event_loop) {
            tracing::error!("startup failed: {e:#}");
            self.failure = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(new_size) => {
                let viewport = Viewport::new(new_size.width, new_size.height);
                if let Some(stage) = &mut self.stage {
                    stage.host_mut().set_viewport(viewport);
                }
                self.forward(HostEvent::Resize(viewport));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(name) = key_name(&event) else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => self.forward(HostEvent::KeyDown(name)),
                    ElementState::Released => self.forward(HostEvent::KeyUp(name)),
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.dragging = state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (true, Some(last)) = (self.dragging, self.cursor) {
                    self.forward(HostEvent::PointerDrag {
                        dx: (position.x - last.x) as f32,
                        dy: (position.y - last.y) as f32,
                    });
                }
                self.cursor = Some(position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports positive y for scrolling away from the user.
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT,
                    MouseScrollDelta::PixelDelta(p) => -p.y as f32,
                };
                self.forward(HostEvent::Wheel { delta_y });
            }
            WindowEvent::RedrawRequested => {
                if let Some(stage) = &mut self.stage {
                    if let Some(request) = stage.pending_frame() {
                        stage.on_frame(request);
                    }
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(stage) = self.stage.take() {
            stop_stage(stage);
        }
    }
}

fn stop_stage(mut stage: Stage<WinitHost, WgpuRenderer>) {
    stage.stop();
    let leaked = stage.host().listener_count();
    if leaked > 0 {
        tracing::warn!(leaked, "listeners still registered after teardown");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = cli.stage_config()?;
    tracing::info!(
        step = config.step,
        damping = config.controls.enable_damping,
        "stagehand-desktop starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = StageApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
