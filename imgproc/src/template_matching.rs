use image::GrayImage;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateMatchMethod {
    SqDiff,
    CcorrNormed,
    CcoeffNormed,
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

impl MatchResult {
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }
}

/// Slide `templ` over `image` and score every placement. The template must
/// fit inside the image; the caller guarantees both are non-empty.
pub fn match_template(
    image: &GrayImage,
    templ: &GrayImage,
    method: TemplateMatchMethod,
) -> MatchResult {
    assert!(
        image.width() >= templ.width() && image.height() >= templ.height(),
        "template must fit inside source image"
    );
    assert!(
        templ.width() > 0 && templ.height() > 0,
        "template cannot be empty"
    );

    let out_w = image.width() - templ.width() + 1;
    let out_h = image.height() - templ.height() + 1;

    let tw = templ.width() as usize;
    let th = templ.height() as usize;
    let iw = image.width() as usize;
    let t_raw = templ.as_raw();
    let i_raw = image.as_raw();

    let n = (tw * th) as f32;
    let t_mean = t_raw.iter().map(|&v| v as f32).sum::<f32>() / n;
    let t_sq_sum = t_raw.iter().map(|&v| (v as f32) * (v as f32)).sum::<f32>();
    let t_var_sum = t_raw
        .iter()
        .map(|&v| {
            let d = v as f32 - t_mean;
            d * d
        })
        .sum::<f32>();

    let mut out = vec![0.0f32; (out_w * out_h) as usize];
    out.par_chunks_mut(out_w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, score) in row.iter_mut().enumerate() {
                let mut sum_i = 0.0f32;
                let mut sum_i_sq = 0.0f32;
                let mut cross = 0.0f32;

                for j in 0..th {
                    let src_off = (y + j) * iw + x;
                    let t_off = j * tw;
                    for i in 0..tw {
                        let iv = i_raw[src_off + i] as f32;
                        let tv = t_raw[t_off + i] as f32;
                        sum_i += iv;
                        sum_i_sq += iv * iv;
                        cross += iv * tv;
                    }
                }

                let i_mean = sum_i / n;

                *score = match method {
                    TemplateMatchMethod::SqDiff => sum_i_sq + t_sq_sum - 2.0 * cross,
                    TemplateMatchMethod::CcorrNormed => {
                        let denom = (sum_i_sq * t_sq_sum).sqrt();
                        if denom > 1e-12 {
                            cross / denom
                        } else {
                            0.0
                        }
                    }
                    TemplateMatchMethod::CcoeffNormed => {
                        let coeff = cross - n * i_mean * t_mean;
                        let i_var = sum_i_sq - n * i_mean * i_mean;
                        let denom = (i_var * t_var_sum).sqrt();
                        if denom > 1e-12 {
                            coeff / denom
                        } else {
                            0.0
                        }
                    }
                };
            }
        });

    MatchResult {
        data: out,
        width: out_w,
        height: out_h,
    }
}

/// Locations and values of the minimum and maximum score.
pub fn min_max_loc(result: &MatchResult) -> ((u32, u32, f32), (u32, u32, f32)) {
    let mut min_val = f32::INFINITY;
    let mut max_val = f32::NEG_INFINITY;
    let mut min_xy = (0u32, 0u32);
    let mut max_xy = (0u32, 0u32);

    for y in 0..result.height {
        for x in 0..result.width {
            let v = result.get(x, y);
            if v < min_val {
                min_val = v;
                min_xy = (x, y);
            }
            if v > max_val {
                max_val = v;
                max_xy = (x, y);
            }
        }
    }

    ((min_xy.0, min_xy.1, min_val), (max_xy.0, max_xy.1, max_val))
}
