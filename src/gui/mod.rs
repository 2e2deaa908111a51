pub mod theme;

use eframe::egui::{self, Color32, Pos2, Rect, Shape, Stroke};
use fftspectrum::config::{DisplayMode, RenderMode};
use fftspectrum::{Frame, SpectrumSource};
use std::sync::Arc;
use std::time::{Duration, Instant};
use theme::{mix_color, to_color32};

pub struct AnalyzerApp {
    //
    // Pipeline and the stream feeding it. Dropping the stream stops capture.
    //
    source: Arc<SpectrumSource>,
    _audio_stream: Option<cpal::Stream>,

    status: String,
    last_tick: Instant,
    last_stats_time: Instant,
}

impl AnalyzerApp {
    pub fn new(
        _cc: &eframe::CreationContext,
        source: Arc<SpectrumSource>,
        audio_stream: Option<cpal::Stream>,
        device_name: &str,
    ) -> Self {
        let status = format!(
            "{} | N={} @ {}Hz | {}",
            device_name,
            source.fft_size(),
            source.sample_rate(),
            source.kernels_name()
        );

        Self {
            source,
            _audio_stream: audio_stream,
            status,
            last_tick: Instant::now(),
            last_stats_time: Instant::now(),
        }
    }

    fn log_stats(&mut self) {
        if self.last_stats_time.elapsed() > Duration::from_secs(1) {
            let (used, max) = self.source.capture_usage(0);
            log::info!(
                "DSP | Buffered: {}/{} bytes | Silence: {}",
                used,
                max,
                self.source.is_silent()
            );
            self.last_stats_time = Instant::now();
        }
    }
}

impl eframe::App for AnalyzerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.source.tick(now.duration_since(self.last_tick).as_secs_f32());
        self.last_tick = now;
        self.log_stats();
        ctx.request_repaint();

        egui::CentralPanel::default().show(ctx, |ui| {
            theme::draw_menu_bar(ui, &self.status);
            ui.add_space(4.0);

            theme::draw_platinum_window(ui, "Frequency Domain", |ui| {
                ui.heading("Spectrum");

                egui::Frame::canvas(ui.style()).show(ui, |ui| {
                    let size = egui::vec2(self.source.width() as f32, self.source.height() as f32);
                    let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());
                    let painter = ui.painter_at(rect);

                    let drawn = self.source.render(|frame| paint_frame(&painter, rect.min, frame));
                    if drawn.is_none() {
                        painter.text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            "NO SIGNAL\nCheck Privacy Settings\nAllow Desktop Apps Access",
                            egui::FontId::proportional(20.0),
                            Color32::RED,
                        );
                    }
                });
            });
        });
    }
}

/// Colour at vertical offset `value`. Gradients run from the crest colour at
/// the highest point down to the base colour over the gradient height.
fn shade(frame: &Frame<'_>, value: f32) -> Color32 {
    match frame.render_mode {
        RenderMode::Gradient if frame.gradient_height > 0.0 => to_color32(mix_color(
            frame.color_crest,
            frame.color_base,
            (value - frame.top) / frame.gradient_height,
        )),
        _ => to_color32(frame.color_base),
    }
}

/// Pushes a vertical quad spanning `top..bottom` (offsets in frame space).
fn push_quad(
    mesh: &mut egui::Mesh,
    frame: &Frame<'_>,
    x: [f32; 2],
    top: f32,
    bottom: f32,
    y: impl Fn(f32) -> f32,
) {
    let base = mesh.vertices.len() as u32;
    let (crest, foot) = (shade(frame, top), shade(frame, bottom));

    mesh.colored_vertex(Pos2::new(x[0], y(top)), crest);
    mesh.colored_vertex(Pos2::new(x[1], y(top)), crest);
    mesh.colored_vertex(Pos2::new(x[0], y(bottom)), foot);
    mesh.colored_vertex(Pos2::new(x[1], y(bottom)), foot);
    mesh.add_triangle(base, base + 1, base + 2);
    mesh.add_triangle(base + 1, base + 3, base + 2);
}

fn paint_frame(painter: &egui::Painter, origin: Pos2, frame: &Frame<'_>) {
    let layout = &frame.layout;
    let baseline = layout.baseline();

    for (channel, values) in frame.channels.iter().enumerate() {
        //
        // The second stereo channel hangs below the baseline.
        //
        let mirrored = channel == 1;
        let y = |value: f32| origin.y + if mirrored { layout.bottom() - value } else { value };

        match layout.mode {
            DisplayMode::Curve if frame.render_mode == RenderMode::Line => {
                let points = values
                    .iter()
                    .enumerate()
                    .map(|(i, &value)| Pos2::new(origin.x + i as f32 + 0.5, y(value)))
                    .collect();
                painter.add(Shape::line(points, Stroke::new(1.0, shade(frame, baseline))));
            }
            DisplayMode::Curve => {
                let mut mesh = egui::Mesh::default();
                for (i, &value) in values.iter().enumerate() {
                    let x = origin.x + i as f32;
                    push_quad(&mut mesh, frame, [x, x + 1.0], value, baseline, y);
                }
                painter.add(Shape::mesh(mesh));
            }
            DisplayMode::Bars => {
                let mut mesh = egui::Mesh::default();
                for (i, &value) in values.iter().enumerate() {
                    let x = origin.x + layout.bar_x(i);
                    let span = [x, x + layout.bar_width as f32];
                    if frame.render_mode == RenderMode::Line {
                        let rect = Rect::from_two_pos(
                            Pos2::new(span[0], y(value)),
                            Pos2::new(span[1], y(baseline)),
                        );
                        painter.rect_stroke(rect, 0.0, Stroke::new(1.0, shade(frame, baseline)));
                    } else {
                        push_quad(&mut mesh, frame, span, value, baseline, y);
                    }
                }
                painter.add(Shape::mesh(mesh));
            }
            DisplayMode::SteppedBars => {
                let stride = layout.step_width as f32 + layout.step_gap as f32;
                let step = layout.step_width as f32;
                let mut mesh = egui::Mesh::default();

                for (i, &value) in values.iter().enumerate() {
                    let x = origin.x + layout.bar_x(i);
                    let span = [x, x + layout.bar_width as f32];
                    for j in 0..layout.max_steps {
                        let bottom = baseline - j as f32 * stride;
                        if baseline - value < j as f32 * stride + step {
                            break;
                        }
                        push_quad(&mut mesh, frame, span, bottom - step, bottom, y);
                    }
                }
                painter.add(Shape::mesh(mesh));
            }
        }
    }
}
