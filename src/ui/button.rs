// src/ui/button.rs

use egui::{self, Color32, Response, Rounding, Sense, Stroke, Ui, Vec2, Widget};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    Default,
    InProgress,
}

/// A fixed-size action button that greys out while its task runs.
#[derive(Clone, Debug)]
pub struct ActionButton {
    pub state: ButtonState,
    label: &'static str,
    busy_label: &'static str,
    fill: Color32,
    stroke: Stroke,
    rounding: Rounding,
    min_size: Vec2,
}

impl ActionButton {
    pub fn new(label: &'static str, busy_label: &'static str, state: ButtonState) -> Self {
        Self {
            state,
            label,
            busy_label,
            fill: Color32::from_rgb(100, 150, 250),
            stroke: Stroke::new(1.0, Color32::BLACK),
            rounding: Rounding::same(5.0),
            min_size: Vec2::new(100.0, 30.0),
        }
    }
}

impl Widget for ActionButton {
    fn ui(self, ui: &mut Ui) -> Response {
        let label = match self.state {
            ButtonState::Default => self.label,
            ButtonState::InProgress => self.busy_label,
        };

        let is_clickable = matches!(self.state, ButtonState::Default);
        let sense = if is_clickable {
            Sense::click()
        } else {
            Sense::hover()
        };

        let (rect, mut response) = ui.allocate_exact_size(self.min_size, sense);

        if is_clickable && response.clicked() {
            response.mark_changed();
        }

        response.widget_info(|| {
            egui::WidgetInfo::selected(egui::WidgetType::Button, ui.is_enabled(), false, label)
        });

        if ui.is_rect_visible(rect) {
            let visuals = ui.style().interact(&response);
            let fill = if is_clickable {
                self.fill
            } else {
                self.fill.gamma_multiply(0.5)
            };

            ui.painter().rect_filled(rect, self.rounding, fill);
            ui.painter().rect_stroke(rect, self.rounding, self.stroke);

            let galley = ui.fonts(|f| {
                f.layout_no_wrap(
                    label.to_string(),
                    egui::FontId::default(),
                    visuals.text_color(),
                )
            });
            let text_pos = rect.center() - galley.size() / 2.0;
            ui.painter().galley(text_pos, galley, visuals.text_color());
        }

        response
    }
}
