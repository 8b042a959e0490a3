//! Elevation profile rendering (SVG and PNG).
//!
//! Draws the raw elevation line with a light fill, overlays each climb span
//! in its category colour, marks the end of every climb and labels
//! categorised climbs with `Cat X` (plus the display name, when one is
//! given). The legend lists the categories present, hardest first.
//!
//! Bitmap text goes through the system fonts (plotters `ttf`). When no
//! usable font is found the PNG is rendered again without text.

use std::collections::BTreeMap;
use std::io::Cursor;

use log::warn;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::category::Category;
use crate::detector::Climb;
use crate::error::{ClimbError, OptionExt, Result};
use crate::report::DEFAULT_TITLE;

const LINE_COLOR: RGBColor = RGBColor(0x2E, 0x86, 0xAB);
const FILL_COLOR: RGBColor = RGBColor(0xA8, 0xDA, 0xDC);

fn category_color(category: Category) -> RGBColor {
    let (r, g, b) = category.color_rgb();
    RGBColor(r, g, b)
}

fn render_error(e: impl std::fmt::Display) -> ClimbError {
    ClimbError::RenderError {
        message: e.to_string(),
    }
}

/// An elevation profile ready to render.
#[derive(Debug, Clone)]
pub struct ElevationProfile<'a> {
    distance_km: &'a [f64],
    elevation_m: &'a [f64],
    climbs: &'a [Climb],
    names: Option<&'a BTreeMap<usize, String>>,
    title: String,
    width: u32,
    height: u32,
}

impl<'a> ElevationProfile<'a> {
    pub fn new(distance_km: &'a [f64], elevation_m: &'a [f64], climbs: &'a [Climb]) -> Self {
        Self {
            distance_km,
            elevation_m,
            climbs,
            names: None,
            title: DEFAULT_TITLE.to_string(),
            width: 1400,
            height: 600,
        }
    }

    /// Display names keyed by 0-based climb position.
    pub fn with_names(mut self, names: &'a BTreeMap<usize, String>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    fn check(&self) -> Result<()> {
        if self.distance_km.len() != self.elevation_m.len() {
            return Err(ClimbError::LengthMismatch {
                distance_len: self.distance_km.len(),
                elevation_len: self.elevation_m.len(),
            });
        }
        if self.distance_km.len() < 2 {
            return Err(ClimbError::InsufficientPoints {
                point_count: self.distance_km.len(),
                minimum_required: 2,
            });
        }
        Ok(())
    }

    /// Render as an SVG document.
    pub fn to_svg(&self) -> Result<String> {
        self.check()?;
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                .into_drawing_area();
            self.draw(&root, true).map_err(render_error)?;
            root.present().map_err(render_error)?;
        }
        Ok(svg)
    }

    /// Render as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        self.check()?;
        let buffer = match self.render_bitmap(true) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("[Profile] Text rendering failed, drawing PNG without labels: {}", e);
                self.render_bitmap(false)?
            }
        };

        let image = image::RgbImage::from_raw(self.width, self.height, buffer)
            .ok_or_internal("bitmap buffer does not match the image size")?;
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(render_error)?;
        Ok(bytes)
    }

    fn render_bitmap(&self, with_text: bool) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();
            self.draw(&root, with_text).map_err(render_error)?;
            root.present().map_err(render_error)?;
        }
        Ok(buffer)
    }

    fn label_for(&self, position: usize, climb: &Climb) -> String {
        let name = self.names.and_then(|names| names.get(&position));
        match name {
            Some(name) => format!("{}: {}", climb.category.marker_label(), name),
            None => climb.category.marker_label(),
        }
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        with_text: bool,
    ) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        root.fill(&WHITE)?;

        let x_max = self
            .distance_km
            .iter()
            .copied()
            .fold(0.0_f64, f64::max)
            .max(0.01);
        let (lo, hi) = self
            .elevation_m
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &e| {
                (lo.min(e), hi.max(e))
            });
        let span = (hi - lo).max(10.0);
        let y_min = lo - span * 0.05;
        let y_max = hi + span * 0.15;

        let mut builder = ChartBuilder::on(root);
        builder.margin(20);
        if with_text {
            builder
                .caption(&self.title, ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 60)
                .set_label_area_size(LabelAreaPosition::Bottom, 45);
        }
        let mut chart = builder.build_cartesian_2d(0.0..x_max, y_min..y_max)?;

        if with_text {
            chart
                .configure_mesh()
                .x_desc("Distance (km)")
                .y_desc("Elevation (m)")
                .x_label_formatter(&|v| format!("{:.0}", v))
                .y_label_formatter(&|v| format!("{:.0}", v))
                .draw()?;
        }

        let profile: Vec<(f64, f64)> = self
            .distance_km
            .iter()
            .copied()
            .zip(self.elevation_m.iter().copied())
            .collect();

        chart.draw_series(AreaSeries::new(
            profile.iter().copied(),
            y_min,
            FILL_COLOR.mix(0.3).filled(),
        ))?;
        chart.draw_series(LineSeries::new(
            profile.iter().copied(),
            LINE_COLOR.stroke_width(2),
        ))?;

        let dy = span * 0.05;
        for (position, climb) in self.climbs.iter().enumerate() {
            let Some(span_points) = profile.get(climb.start_index..=climb.end_index) else {
                continue;
            };
            let color = category_color(climb.category);
            chart.draw_series(AreaSeries::new(
                span_points.iter().copied(),
                y_min,
                color.mix(0.6).filled(),
            ))?;

            let peak = profile[climb.end_index];
            chart.draw_series(std::iter::once(Circle::new(peak, 7, color.filled())))?;
            chart.draw_series(std::iter::once(Circle::new(
                peak,
                7,
                WHITE.stroke_width(2),
            )))?;

            if with_text && climb.category.is_categorized() {
                chart.draw_series(std::iter::once(Text::new(
                    self.label_for(position, climb),
                    (peak.0, peak.1 + dy),
                    ("sans-serif", 14).into_font().color(&BLACK),
                )))?;
            }
        }

        let present: Vec<Category> = Category::LEGEND_ORDER
            .into_iter()
            .filter(|cat| self.climbs.iter().any(|c| c.category == *cat))
            .collect();
        if with_text && !present.is_empty() {
            for category in present {
                let color = category_color(category);
                chart
                    .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())?
                    .label(category.legend_label())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled())
                    });
            }
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK.mix(0.3))
                .draw()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{detect_climbs, DetectionConfig};

    fn sample_route() -> (Vec<f64>, Vec<f64>) {
        let distance: Vec<f64> = (0..=40).map(|i| i as f64 * 0.25).collect();
        let elevation: Vec<f64> = (0..=40)
            .map(|i| {
                if i <= 20 {
                    200.0 + i as f64 * 15.0
                } else {
                    500.0 - (i - 20) as f64 * 10.0
                }
            })
            .collect();
        (distance, elevation)
    }

    #[test]
    fn test_svg_contains_title_and_labels() {
        let (distance, elevation) = sample_route();
        let climbs = detect_climbs(&distance, &elevation, &DetectionConfig::default()).unwrap();
        assert!(!climbs.is_empty());

        let mut names = BTreeMap::new();
        names.insert(0, "Test Col".to_string());
        let svg = ElevationProfile::new(&distance, &elevation, &climbs)
            .with_names(&names)
            .to_svg()
            .unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains(DEFAULT_TITLE));
        assert!(svg.contains("Distance (km)"));
        assert!(svg.contains("Test Col"));
        assert!(svg.contains(&climbs[0].category.legend_label()));
    }

    #[test]
    fn test_custom_title() {
        let (distance, elevation) = sample_route();
        let svg = ElevationProfile::new(&distance, &elevation, &[])
            .with_title("Sunday Loop")
            .to_svg()
            .unwrap();
        assert!(svg.contains("Sunday Loop"));
        assert!(!svg.contains("Category"));
    }

    #[test]
    fn test_png_output() {
        let (distance, elevation) = sample_route();
        let climbs = detect_climbs(&distance, &elevation, &DetectionConfig::default()).unwrap();
        let png = ElevationProfile::new(&distance, &elevation, &climbs)
            .with_size(320, 200)
            .to_png()
            .unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_png_with_labels_and_names() {
        let (distance, elevation) = sample_route();
        let climbs = detect_climbs(&distance, &elevation, &DetectionConfig::default()).unwrap();
        let mut names = BTreeMap::new();
        names.insert(0, "Test Col".to_string());
        let png = ElevationProfile::new(&distance, &elevation, &climbs)
            .with_names(&names)
            .with_title("Sunday Loop")
            .to_png()
            .unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn test_bitmap_without_text_draws_profile() {
        let (distance, elevation) = sample_route();
        let climbs = detect_climbs(&distance, &elevation, &DetectionConfig::default()).unwrap();
        let buffer = ElevationProfile::new(&distance, &elevation, &climbs)
            .with_size(200, 120)
            .render_bitmap(false)
            .unwrap();
        assert_eq!(buffer.len(), 200 * 120 * 3);
        assert!(buffer.iter().any(|&b| b != 0xFF));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(ElevationProfile::new(&[0.0], &[1.0], &[]).to_svg().is_err());
        assert!(ElevationProfile::new(&[0.0, 1.0], &[1.0], &[]).to_png().is_err());
    }
}
