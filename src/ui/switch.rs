// src/ui/switch.rs

use egui::{self, Color32, Pos2, Response, Sense, Ui, Widget};

/// Track and knob colors for the two states.
const TRACK_ON: Color32 = Color32::from_rgb(0, 170, 80);
const TRACK_OFF: Color32 = Color32::from_rgb(190, 190, 190);
const TRACK_BUSY: Color32 = Color32::from_rgb(230, 190, 80);

/// A compact toggle switch bound to an external boolean.
///
/// While `busy` is set the switch ignores clicks and paints an amber
/// track, so in-flight work cannot be double-submitted.
pub fn toggle_switch<'a>(on: &'a mut bool, busy: bool) -> impl Widget + 'a {
    move |ui: &mut Ui| {
        let desired_size = ui.spacing().interact_size.y * egui::vec2(2.0, 1.0);
        let sense = if busy { Sense::hover() } else { Sense::click() };
        let (rect, mut response) = ui.allocate_exact_size(desired_size, sense);

        if response.clicked() {
            *on = !*on;
            response.mark_changed();
        }

        response.widget_info(|| {
            egui::WidgetInfo::selected(egui::WidgetType::Checkbox, ui.is_enabled(), *on, "")
        });

        if ui.is_rect_visible(rect) {
            let radius = rect.height() / 2.0;
            let track_color = if busy {
                TRACK_BUSY
            } else if *on {
                TRACK_ON
            } else {
                TRACK_OFF
            };

            ui.painter().rect_filled(rect, radius, track_color);

            let knob_x = if *on {
                rect.right() - radius
            } else {
                rect.left() + radius
            };
            let knob_center = Pos2::new(knob_x, rect.center().y);
            ui.painter()
                .circle_filled(knob_center, radius * 0.75, Color32::WHITE);
        }

        response
    }
}
