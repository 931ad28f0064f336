//! Shows the annotated camera frame in a window.
//!
//! Each window holds one texture that receives the latest frame. A single full-screen triangle
//! samples it, so the frame is stretched to the window size.

use std::rc::Rc;

use anyhow::anyhow;
use wgpu::*;
use winit::{
    dpi::PhysicalSize,
    event_loop::EventLoopWindowTarget,
    window::{Fullscreen, Window, WindowBuilder},
};

use crate::image::Resolution;

/// Adapter, device and queue, shared by all windows.
pub struct Gpu {
    instance: Instance,
    adapter: Adapter,
    device: Device,
    queue: Queue,
}

impl Gpu {
    pub async fn open() -> anyhow::Result<Self> {
        // No OpenGL: its backend is unreliable on the drivers this runs on.
        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&RequestAdapterOptions::default())
            .await
            .ok_or_else(|| anyhow!("no graphics adapter found"))?;
        let info = adapter.get_info();
        log::info!("rendering on '{}' ({:?})", info.name, info.backend);

        let descriptor = DeviceDescriptor {
            label: Some("preview"),
            features: Features::empty(),
            limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
        };
        let (device, queue) = adapter.request_device(&descriptor, None).await?;
        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}

/// The pipeline state that does not depend on the frame size.
struct Blit {
    pipeline: RenderPipeline,
    layout: BindGroupLayout,
    sampler: Sampler,
}

impl Blit {
    fn new(device: &Device, target: TextureFormat) -> Self {
        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("frame"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("frame"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("frame"),
            source: ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("frame"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: "vert",
                buffers: &[],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: "frag",
                targets: &[Some(ColorTargetState::from(target))],
            }),
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
        });
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("frame"),
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            layout,
            sampler,
        }
    }
}

/// A texture of one frame size and the bind group that samples it.
struct FrameTexture {
    res: Resolution,
    texture: Texture,
    bind_group: BindGroup,
}

impl FrameTexture {
    fn new(device: &Device, blit: &Blit, res: Resolution) -> Self {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("frame"),
            size: extent(res),
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("frame"),
            layout: &blit.layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&blit.sampler),
                },
            ],
        });
        Self {
            res,
            texture,
            bind_group,
        }
    }
}

fn extent(res: Resolution) -> Extent3d {
    Extent3d {
        width: res.width(),
        height: res.height(),
        depth_or_array_layers: 1,
    }
}

/// A preview window and everything needed to draw into it.
pub struct Renderer {
    gpu: Rc<Gpu>,
    blit: Blit,
    frame: Option<FrameTexture>,
    surface: Surface,
    surface_format: TextureFormat,
    // Dropped after `surface`, which refers to it.
    window: Window,
}

impl Renderer {
    /// Opens a window titled `title`, initially sized to `res`.
    pub fn open<T>(
        target: &EventLoopWindowTarget<T>,
        gpu: Rc<Gpu>,
        title: &str,
        res: Resolution,
        fullscreen: bool,
    ) -> anyhow::Result<Self> {
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(res.width(), res.height()))
            .with_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)))
            .build(target)?;

        // Safety: `window` outlives `surface`, see the field order.
        let surface = unsafe { gpu.instance.create_surface(&window)? };
        let formats = surface.get_capabilities(&gpu.adapter).formats;
        let surface_format = formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| formats.first().copied())
            .ok_or_else(|| anyhow!("the window surface supports no texture formats"))?;

        let this = Self {
            blit: Blit::new(&gpu.device, surface_format),
            gpu,
            frame: None,
            surface,
            surface_format,
            window,
        };
        this.configure_surface();
        Ok(this)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Uploads the RGBA8 pixels of a `res` frame.
    pub fn update_texture(&mut self, res: Resolution, data: &[u8]) {
        if self.frame.as_ref().map(|frame| frame.res) != Some(res) {
            log::debug!("allocating {res} frame texture");
            self.frame = Some(FrameTexture::new(&self.gpu.device, &self.blit, res));
        }
        let Some(frame) = &self.frame else { return };

        self.gpu.queue.write_texture(
            ImageCopyTexture {
                texture: &frame.texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * res.width()),
                rows_per_image: None,
            },
            extent(res),
        );
    }

    /// Reconfigures the surface after the window was resized.
    pub fn resize(&mut self) {
        self.configure_surface();
    }

    pub fn redraw(&mut self) -> anyhow::Result<()> {
        let Some(frame) = &self.frame else {
            return Ok(());
        };
        if is_minimized(self.window.inner_size()) {
            return Ok(());
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(SurfaceError::Timeout) => {
                log::debug!("timed out waiting for the window surface");
                return Ok(());
            }
            Err(e @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::debug!("{e}, reconfiguring");
                self.configure_surface();
                self.surface.get_current_texture()?
            }
            Err(e) => return Err(e.into()),
        };
        let view = output.texture.create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor::default());
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("frame"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            pass.set_pipeline(&self.blit.pipeline);
            pass.set_bind_group(0, &frame.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.gpu.queue.submit([encoder.finish()]);
        output.present();
        Ok(())
    }

    fn configure_surface(&self) {
        let size = self.window.inner_size();
        if is_minimized(size) {
            return;
        }
        self.surface.configure(
            &self.gpu.device,
            &SurfaceConfiguration {
                usage: TextureUsages::RENDER_ATTACHMENT,
                format: self.surface_format,
                width: size.width,
                height: size.height,
                present_mode: PresentMode::Fifo,
                alpha_mode: CompositeAlphaMode::Auto,
                view_formats: Vec::new(),
            },
        );
    }
}

fn is_minimized(size: PhysicalSize<u32>) -> bool {
    size.width == 0 || size.height == 0
}
