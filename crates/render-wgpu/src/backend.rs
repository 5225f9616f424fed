use stagehand_common::Viewport;
use stagehand_render::{PerspectiveCamera, Renderer};
use stagehand_scene::Scene;

use crate::gpu::ScenePipelines;

/// Failures while bringing up the GPU.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// [`Renderer`] that draws into a window surface through wgpu.
pub struct WgpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipelines: ScenePipelines,
    backend: &'static str,
    disposed: bool,
}

impl WgpuRenderer {
    /// Create a surface on `target` and configure it at `size`. Blocks on
    /// adapter and device creation.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: Viewport,
    ) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(target)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(BackendError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("stagehand_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let pipelines = ScenePipelines::new(&device, surface_format, config.width, config.height);
        let backend = adapter.get_info().backend.to_str();

        tracing::info!(
            backend,
            format = ?surface_format,
            width = config.width,
            height = config.height,
            "GPU initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipelines,
            backend,
            disposed: false,
        })
    }

    /// Name of the graphics API in use, e.g. "vulkan".
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Renderer for WgpuRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        if self.disposed {
            return;
        }

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.pipelines
            .draw(&self.device, &self.queue, &view, scene, camera);
        output.present();
    }

    fn set_size(&mut self, viewport: Viewport) {
        if self.disposed {
            return;
        }
        self.config.width = viewport.width.max(1);
        self.config.height = viewport.height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.pipelines
            .resize(&self.device, self.config.width, self.config.height);
    }

    fn size(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.pipelines.destroy();
        tracing::debug!("GPU resources released");
    }
}
