//! Per-class colors and icons. Presentation only; the core never sees these.

use eframe::egui::Color32;
use mri_core::OutcomeClass;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassStyle {
    pub color: Color32,
    pub icon: &'static str,
}

pub fn style_for(class: OutcomeClass) -> ClassStyle {
    match class {
        OutcomeClass::NoTumor => ClassStyle {
            color: Color32::from_rgb(46, 160, 67),
            icon: "✔",
        },
        OutcomeClass::GliomaTumor => ClassStyle {
            color: Color32::from_rgb(218, 54, 51),
            icon: "⚠",
        },
        OutcomeClass::MeningiomaTumor => ClassStyle {
            color: Color32::from_rgb(219, 138, 34),
            icon: "●",
        },
        OutcomeClass::PituitaryTumor => ClassStyle {
            color: Color32::from_rgb(137, 87, 229),
            icon: "◆",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_has_a_distinct_color() {
        let colors: Vec<Color32> = OutcomeClass::ALL
            .iter()
            .map(|c| style_for(*c).color)
            .collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
