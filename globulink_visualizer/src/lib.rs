// THEORY:
// The `globulink_visualizer` crate turns linking results into PNG map images
// a microscopist can eyeball: every particle drawn as the circle of its
// measured area at its measured centroid, with accepted links drawn as lines
// between the paired centroids. It owns a raw RGBA buffer and rasterizes
// directly into it; the only external machinery is the PNG encoder.
//
// All drawing is clipped at the canvas edge. Detectors happily report
// centroids outside the nominal image bounds, and an off-canvas particle must
// degrade to a partial (or invisible) circle, never a panic.

use anyhow::{Context, Result};
use globulink::pipeline::{Assignment, LinkedPair, Particle, ParticleRole};
use image::ImageEncoder;
use std::path::Path;

/// Canvas background, a near-black that keeps the outlines legible.
pub const BACKGROUND_COLOR: [u8; 4] = [10, 10, 14, 255];
/// Globules, linked or standalone maps.
pub const GLOBULE_COLOR: [u8; 4] = [66, 135, 245, 255];
/// Crescents, linked or standalone maps.
pub const CRESCENT_COLOR: [u8; 4] = [235, 64, 52, 255];
/// Contamination particles.
pub const CONTAMINATION_COLOR: [u8; 4] = [240, 200, 40, 255];
/// Lines between linked centroids.
pub const LINK_COLOR: [u8; 4] = [80, 220, 100, 255];
/// Globules left without a crescent on the composite map.
pub const FREE_GLOBULE_COLOR: [u8; 4] = [80, 200, 220, 255];
/// Crescents left without a globule on the composite map.
pub const FREE_CRESCENT_COLOR: [u8; 4] = [220, 80, 200, 255];

/// An RGBA drawing surface at image resolution.
pub struct MapCanvas {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl MapCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffer = vec![0u8; width as usize * height as usize * 4];
        for pixel in buffer.chunks_exact_mut(4) {
            pixel.copy_from_slice(&BACKGROUND_COLOR);
        }
        Self {
            width,
            height,
            buffer,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    fn put_pixel(&mut self, x: i64, y: i64, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let index = ((y as u32 * self.width + x as u32) * 4) as usize;
        self.buffer[index..index + 4].copy_from_slice(&color);
    }

    /// Midpoint circle outline, clipped at the canvas edge.
    pub fn draw_circle_outline(&mut self, cx: f64, cy: f64, radius: f64, color: [u8; 4]) {
        let cx = cx.round() as i64;
        let cy = cy.round() as i64;
        let r = radius.round() as i64;
        if r <= 0 {
            self.put_pixel(cx, cy, color);
            return;
        }

        let mut x = r;
        let mut y = 0i64;
        let mut err = 1 - r;
        while x >= y {
            for (px, py) in [
                (cx + x, cy + y),
                (cx - x, cy + y),
                (cx + x, cy - y),
                (cx - x, cy - y),
                (cx + y, cy + x),
                (cx - y, cy + x),
                (cx + y, cy - x),
                (cx - y, cy - x),
            ] {
                self.put_pixel(px, py, color);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    /// Bresenham line, clipped at the canvas edge.
    pub fn draw_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: [u8; 4]) {
        let mut x0 = x0.round() as i64;
        let mut y0 = y0.round() as i64;
        let x1 = x1.round() as i64;
        let y1 = y1.round() as i64;

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.put_pixel(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Encodes the canvas as a PNG file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let output = std::fs::File::create(path)
            .with_context(|| format!("creating map image {}", path.display()))?;
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder.write_image(
            &self.buffer,
            self.width,
            self.height,
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }
}

fn draw_particle(canvas: &mut MapCanvas, particle: &Particle, color: [u8; 4]) {
    canvas.draw_circle_outline(particle.x, particle.y, particle.equivalent_radius(), color);
}

/// One particle set as circles of a single color.
pub fn render_particle_map(
    particles: &[Particle],
    image_width: u32,
    image_height: u32,
    color: [u8; 4],
) -> MapCanvas {
    let mut canvas = MapCanvas::new(image_width, image_height);
    for particle in particles {
        draw_particle(&mut canvas, particle, color);
    }
    canvas
}

/// The accepted pairs only: both circles plus the connecting line.
pub fn render_link_map(pairs: &[LinkedPair], image_width: u32, image_height: u32) -> MapCanvas {
    let mut canvas = MapCanvas::new(image_width, image_height);
    for pair in pairs {
        draw_particle(&mut canvas, &pair.globule, GLOBULE_COLOR);
        draw_particle(&mut canvas, &pair.crescent, CRESCENT_COLOR);
        canvas.draw_line(
            pair.globule.x,
            pair.globule.y,
            pair.crescent.x,
            pair.crescent.y,
            LINK_COLOR,
        );
    }
    canvas
}

/// Everything on one canvas: linked pairs with their connecting lines,
/// leftover particles in their "free" colors, contamination in yellow.
pub fn render_composite_map(
    assignment: &Assignment,
    contamination: &[Particle],
    image_width: u32,
    image_height: u32,
) -> MapCanvas {
    let mut canvas = MapCanvas::new(image_width, image_height);

    for particle in contamination {
        draw_particle(&mut canvas, particle, CONTAMINATION_COLOR);
    }
    for particle in assignment.ambiguous_of(ParticleRole::Globule) {
        draw_particle(&mut canvas, particle, FREE_GLOBULE_COLOR);
    }
    for particle in assignment.ambiguous_of(ParticleRole::Crescent) {
        draw_particle(&mut canvas, particle, FREE_CRESCENT_COLOR);
    }
    for pair in &assignment.pairs {
        draw_particle(&mut canvas, &pair.globule, GLOBULE_COLOR);
        draw_particle(&mut canvas, &pair.crescent, CRESCENT_COLOR);
        canvas.draw_line(
            pair.globule.x,
            pair.globule.y,
            pair.crescent.x,
            pair.crescent.y,
            LINK_COLOR,
        );
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel_at(canvas: &MapCanvas, x: u32, y: u32) -> [u8; 4] {
        let index = ((y * canvas.width() + x) * 4) as usize;
        canvas.buffer()[index..index + 4].try_into().unwrap()
    }

    fn make_particle(area: f64, x: f64, y: f64) -> Particle {
        Particle::new(area, x, y, 20.0).unwrap()
    }

    #[test]
    fn a_fresh_canvas_is_background_colored() {
        let canvas = MapCanvas::new(16, 16);
        assert_eq!(pixel_at(&canvas, 0, 0), BACKGROUND_COLOR);
        assert_eq!(pixel_at(&canvas, 15, 15), BACKGROUND_COLOR);
    }

    #[test]
    fn circle_outline_touches_the_cardinal_points() {
        let mut canvas = MapCanvas::new(100, 100);
        canvas.draw_circle_outline(50.0, 50.0, 10.0, GLOBULE_COLOR);

        assert_eq!(pixel_at(&canvas, 60, 50), GLOBULE_COLOR);
        assert_eq!(pixel_at(&canvas, 40, 50), GLOBULE_COLOR);
        assert_eq!(pixel_at(&canvas, 50, 60), GLOBULE_COLOR);
        assert_eq!(pixel_at(&canvas, 50, 40), GLOBULE_COLOR);
        // The interior stays untouched; this is an outline, not a disc.
        assert_eq!(pixel_at(&canvas, 50, 50), BACKGROUND_COLOR);
    }

    #[test]
    fn lines_connect_their_endpoints() {
        let mut canvas = MapCanvas::new(50, 50);
        canvas.draw_line(5.0, 5.0, 45.0, 5.0, LINK_COLOR);
        assert_eq!(pixel_at(&canvas, 5, 5), LINK_COLOR);
        assert_eq!(pixel_at(&canvas, 25, 5), LINK_COLOR);
        assert_eq!(pixel_at(&canvas, 45, 5), LINK_COLOR);
    }

    #[test]
    fn off_canvas_geometry_is_clipped_without_panicking() {
        let mut canvas = MapCanvas::new(32, 32);
        canvas.draw_circle_outline(-100.0, -100.0, 40.0, CRESCENT_COLOR);
        canvas.draw_circle_outline(16.0, 16.0, 500.0, CRESCENT_COLOR);
        canvas.draw_line(-50.0, 16.0, 80.0, 16.0, LINK_COLOR);

        // The horizontal line crosses the whole visible row.
        assert_eq!(pixel_at(&canvas, 0, 16), LINK_COLOR);
        assert_eq!(pixel_at(&canvas, 31, 16), LINK_COLOR);
    }

    #[test]
    fn composite_map_draws_links_between_pair_centroids() {
        let crescent = make_particle(100.0, 20.0, 40.0);
        let globule = make_particle(400.0, 60.0, 40.0);
        let assignment = Assignment {
            pairs: vec![LinkedPair {
                crescent,
                globule,
                distance: 40.0,
            }],
            ambiguous: Vec::new(),
        };

        let canvas = render_composite_map(&assignment, &[], 100, 100);
        // Midpoint of the link line.
        assert_eq!(pixel_at(&canvas, 40, 40), LINK_COLOR);
    }

    #[test]
    fn saves_a_png_file() {
        let canvas = render_particle_map(&[make_particle(200.0, 32.0, 32.0)], 64, 64, GLOBULE_COLOR);
        let path = std::env::temp_dir().join(format!(
            "globulink_map_test_{}.png",
            std::process::id()
        ));

        canvas.save(&path).expect("Error Saving File.");
        let written = std::fs::metadata(&path).expect("saved file must exist");
        assert!(written.len() > 0);
        let _ = std::fs::remove_file(&path);
    }
}
