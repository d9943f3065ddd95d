use image::{Rgb, RgbImage};

use crate::color::gradient_stops;

/// Fill a canvas from a color-identity string: one token paints a solid field,
/// several tokens a left-to-right linear gradient.
pub fn paint_background(color_identity: &str, width: u32, height: u32) -> RgbImage {
    let stops = gradient_stops(color_identity);
    let row = gradient_row(&stops, width);
    RgbImage::from_fn(width, height, |x, _| row[x as usize])
}

/// Stop `k` of `n` sits at `round(k * (width - 1) / (n - 1))` and is reproduced exactly.
pub fn gradient_row(stops: &[Rgb<u8>], width: u32) -> Vec<Rgb<u8>> {
    let white = Rgb([255, 255, 255]);
    match stops {
        [] => vec![white; width as usize],
        [only] => vec![*only; width as usize],
        _ => {
            let positions = stop_positions(stops.len(), width);
            (0..width)
                .map(|x| {
                    let seg = positions
                        .windows(2)
                        .position(|pair| x <= pair[1])
                        .unwrap_or(positions.len() - 2);
                    let (x0, x1) = (positions[seg], positions[seg + 1]);
                    if x1 == x0 {
                        return stops[seg + 1];
                    }
                    let t = (x.saturating_sub(x0)) as f32 / (x1 - x0) as f32;
                    lerp(stops[seg], stops[seg + 1], t)
                })
                .collect()
        }
    }
}

pub fn stop_positions(count: usize, width: u32) -> Vec<u32> {
    if count < 2 {
        return vec![0; count];
    }
    let last = width.saturating_sub(1) as f64;
    (0..count)
        .map(|k| (k as f64 * last / (count - 1) as f64).round() as u32)
        .collect()
}

fn lerp(a: Rgb<u8>, b: Rgb<u8>, t: f32) -> Rgb<u8> {
    let mix = |from: u8, to: u8| (from as f32 + (to as f32 - from as f32) * t).round() as u8;
    Rgb([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])])
}
