use anyhow::Result;
use holter_lib::plot::{Orientation, Page, PageRenderer, Panel, Trace};
use log::warn;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

const PANEL_HEIGHT: u32 = 120;
const PANEL_GAP: u32 = 12;

/// Draws a page onto a PNG, one row per panel.
pub struct PngPageRenderer {
    path: PathBuf,
    width: u32,
    labels: bool,
}

impl PngPageRenderer {
    pub fn new(path: &Path, width: u32, labels: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            width: width.max(2),
            labels,
        }
    }

    fn height(&self, panels: usize) -> u32 {
        let panels = panels.max(1) as u32;
        panels * PANEL_HEIGHT + (panels - 1) * PANEL_GAP
    }
}

impl PageRenderer for PngPageRenderer {
    fn render(&mut self, page: &Page) -> Result<()> {
        let height = self.height(page.panels.len());
        let root = BitMapBackend::new(&self.path, (self.width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        for panel in &page.panels {
            let top = panel.index as u32 * (PANEL_HEIGHT + PANEL_GAP);
            let area = root.clone().shrink((0, top), (self.width, PANEL_HEIGHT));
            draw_panel(&area, panel, self.labels)?;
        }
        root.present()?;
        Ok(())
    }
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    labels: bool,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (w, h) = area.dim_in_pixel();
    let px = |x: f64| (x * (w - 1) as f64).round() as i32;
    let py = |y: f64| (y * (h - 1) as f64).round() as i32;
    let right = w as i32 - 1;
    let bottom = h as i32 - 1;

    for line in &panel.grid {
        let points = match line.orientation {
            Orientation::Vertical => vec![(px(line.position), 0), (px(line.position), bottom)],
            Orientation::Horizontal => vec![(0, py(line.position)), (right, py(line.position))],
        };
        area.draw(&PathElement::new(points, BLACK.mix(0.1)))?;
    }

    match &panel.trace {
        Trace::Polyline { points } => {
            let path: Vec<(i32, i32)> = points.iter().map(|p| (px(p[0]), py(p[1]))).collect();
            area.draw(&PathElement::new(path, BLACK.mix(0.9).stroke_width(1)))?;
        }
        Trace::FlatLine { y } => {
            let y = py(*y);
            area.draw(&PathElement::new(vec![(0, y), (right, y)], BLACK.mix(0.25)))?;
        }
    }

    for &x in &panel.beat_markers {
        let x = px(x);
        area.draw(&PathElement::new(
            vec![(x, 0), (x, bottom)],
            RGBColor(220, 0, 0).mix(0.85),
        ))?;
    }

    area.draw(&Rectangle::new([(0, 0), (right, bottom)], BLACK.mix(0.18)))?;

    if labels {
        let text = format!("{}–{} s", panel.label.start_s, panel.label.end_s);
        let style = ("sans-serif", 12).into_font().color(&BLACK.mix(0.65));
        if let Err(err) = area.draw(&Text::new(text, (8, 4), style)) {
            warn!("panel {} label not drawn: {err}", panel.index);
        }
    }
    Ok(())
}
