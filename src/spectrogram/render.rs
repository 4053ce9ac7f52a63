//! Rasterizing a dB mel spectrogram into an RGB PNG

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use png::{BitDepth, ColorType, Encoder};
use crate::dsp::MelSpectrogram;
use crate::error::{PrepError, Result};
use super::colormap::inferno;

/// Scale `mel` to `width` x `height` pixels, nearest-neighbour. Time runs
/// left to right and the lowest mel band sits on the bottom row. Colours
/// are normalized over the spectrogram's own value range.
pub fn render_rgb(mel: &MelSpectrogram, width: u32, height: u32) -> Result<Vec<u8>> {
    let (n_mels, n_frames) = (mel.n_mels(), mel.n_frames());
    if n_mels == 0 || n_frames == 0 {
        return Err(PrepError::render("Spectrogram has no frames"));
    }

    let (lo, hi) = mel.min_max();
    let span = hi - lo;
    let (width, height) = (width as usize, height as usize);

    let columns: Vec<usize> = (0..width).map(|x| x * n_frames / width).collect();
    let mut pixels = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let band = &mel.data[n_mels - 1 - y * n_mels / height];
        for &frame in &columns {
            let t = if span > 0.0 { (band[frame] - lo) / span } else { 0.0 };
            pixels.extend_from_slice(&inferno(t));
        }
    }
    Ok(pixels)
}

pub fn write_png<P: AsRef<Path>>(path: P, pixels: &[u8], width: u32, height: u32) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| PrepError::render(format!("Cannot create {}: {}", path.display(), e)))?;

    let mut encoder = Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(pixels)?;
    writer.finish()?;
    Ok(())
}
