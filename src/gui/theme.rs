use eframe::egui;

pub const PLATINUM_BG: egui::Color32 = egui::Color32::from_rgb(212, 208, 200);
pub const PLATINUM_DARK: egui::Color32 = egui::Color32::from_rgb(128, 128, 128);

pub fn setup_global_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    //
    // Set global background fill colors.
    //
    style.visuals.panel_fill = PLATINUM_BG;
    style.visuals.window_fill = PLATINUM_BG;

    //
    // Remove widget rounding to match UI aesthetic.
    //
    style.visuals.widgets.noninteractive.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.active.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.inactive.rounding = egui::Rounding::ZERO;
    style.visuals.widgets.hovered.rounding = egui::Rounding::ZERO;

    ctx.set_style(style);
}

/// Draws the menu bar with the analysis parameters on the right.
pub fn draw_menu_bar(ui: &mut egui::Ui, status: &str) {
    egui::TopBottomPanel::top("menubar").show_inside(ui, |ui| {
        ui.visuals_mut().widgets.noninteractive.bg_fill = PLATINUM_BG;
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("fftspectrum").strong());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(egui::RichText::new(status).italics().size(10.0));
            });
        });
    });
}

/// Draws a window styled with the "Platinum" retro frame.
pub fn draw_platinum_window<F: FnOnce(&mut egui::Ui)>(ui: &mut egui::Ui, title: &str, content: F) {
    let frame = egui::Frame::none()
        .fill(PLATINUM_BG)
        .stroke(egui::Stroke::new(1.0, egui::Color32::BLACK))
        .inner_margin(2.0);

    frame.show(ui, |ui| {
        //
        // Title bar region.
        //
        let title_height = 18.0;
        let (rect, _response) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), title_height),
            egui::Sense::hover(),
        );

        //
        // Title bar background with pinstripe effect.
        //
        ui.painter()
            .rect_filled(rect, 0.0, egui::Color32::from_rgb(200, 200, 200));
        for i in (0..rect.width() as i32).step_by(2) {
            let x = rect.min.x + i as f32;
            ui.painter().line_segment(
                [
                    egui::Pos2::new(x, rect.min.y),
                    egui::Pos2::new(x, rect.max.y),
                ],
                egui::Stroke::new(
                    1.0,
                    egui::Color32::from_rgba_premultiplied(255, 255, 255, 50),
                ),
            );
        }

        //
        // Centered title text.
        //
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            title,
            egui::FontId::proportional(14.0),
            egui::Color32::BLACK,
        );

        //
        // Content region.
        //
        ui.add_space(4.0);
        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(1.0, PLATINUM_DARK)) // Inner bevel border.
            .inner_margin(6.0)
            .show(ui, content);
    });
}

/// Converts normalised RGBA into an egui colour.
pub fn to_color32(rgba: [f32; 4]) -> egui::Color32 {
    let [r, g, b, a] = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Blends from `crest` (t = 0) to `base` (t = 1).
pub fn mix_color(crest: [f32; 4], base: [f32; 4], t: f32) -> [f32; 4] {
    let t = t.clamp(0.0, 1.0);
    std::array::from_fn(|i| crest[i] + (base[i] - crest[i]) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_endpoints() {
        let crest = [1.0, 0.0, 0.0, 1.0];
        let base = [0.0, 0.0, 1.0, 1.0];
        assert_eq!(mix_color(crest, base, -1.0), crest);
        assert_eq!(mix_color(crest, base, 2.0), base);
        assert_eq!(to_color32([1.0, 1.0, 1.0, 1.0]), egui::Color32::WHITE);
    }
}
