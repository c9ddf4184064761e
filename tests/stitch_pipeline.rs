//! End-to-end runs over synthetic bore sequences.

use borestitch::{
    CancelToken, Error, Frame, MotionProfile, StitchConfig, StitchPipeline, UnwrapConfig,
    UnwrapSession,
};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A tall textured "wall" the camera windows slide over. Random bright
/// blobs on a dark background give the detector plenty of corners.
fn textured_wall(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut wall = RgbImage::from_pixel(width, height, Rgb([30, 34, 28]));

    for _ in 0..(width as u64 * height as u64 / 180) {
        let bx = rng.gen_range(0..width.saturating_sub(6));
        let by = rng.gen_range(0..height.saturating_sub(6));
        let bw = rng.gen_range(3..6);
        let bh = rng.gen_range(3..6);
        let v: u8 = rng.gen_range(130..=255);
        for y in by..by + bh {
            for x in bx..bx + bw {
                wall.put_pixel(x, y, Rgb([v, v.saturating_sub(10), v]));
            }
        }
    }
    wall
}

/// Crop a frame-height window out of the wall, top edge at `row`.
fn window(wall: &RgbImage, row: u32, frame_h: u32) -> Frame {
    let crop = image::imageops::crop_imm(wall, 0, row, wall.width(), frame_h).to_image();
    Frame::from_rgb(crop)
}

#[test]
fn empty_sequence_is_rejected() {
    let pipeline = StitchPipeline::new(StitchConfig::default());
    assert!(matches!(pipeline.run(&[]), Err(Error::EmptyInput)));
}

#[test]
fn single_frame_is_passed_through() {
    let wall = textured_wall(120, 150, 7);
    let frame = window(&wall, 10, 100);

    let out = StitchPipeline::new(StitchConfig::default())
        .run(&[frame.clone()])
        .unwrap();

    assert_eq!(out.panorama.dimensions(), (frame.width(), frame.height()));
    assert_eq!(out.offsets, vec![0.0]);
    assert_eq!(out.profile, MotionProfile::InsufficientData);
}

#[test]
fn forward_scan_is_classified_penetrating_and_placed_in_order() {
    // Six windows sliding up the wall by 20 rows per frame: the content of
    // each later frame sits 20 rows lower inside the frame, which is the
    // forward-advance motion signature.
    let wall = textured_wall(160, 420, 42);
    let frame_h = 120;
    let step = 20u32;
    let base = 5 * step;
    let frames: Vec<Frame> = (0..6)
        .map(|i| window(&wall, base - i * step, frame_h))
        .collect();

    let out = StitchPipeline::new(StitchConfig::default())
        .run(&frames)
        .unwrap();

    assert_eq!(out.profile, MotionProfile::Penetrating);
    assert!(out.skipped_frames.is_empty());
    assert_eq!(out.offsets.len(), 6);
    assert_eq!(out.offsets[0], 0.0);
    for pair in out.offsets.windows(2) {
        let delta = pair[1] - pair[0];
        assert!(
            (delta - step as f64).abs() <= 3.0,
            "placement step {delta} strayed from {step}"
        );
    }

    // Five 20-row advances over 120-row frames: roughly 220 rows of wall.
    let h = out.panorama.height();
    assert!((200..=240).contains(&h), "panorama height {h}");
}

#[test]
fn featureless_zero_overlap_frames_stack_without_blending() {
    // Nothing to match, nothing to correlate: registration degrades to the
    // zero fallback and the compositor stacks the frames so both survive.
    let frames = [
        Frame::from_rgb(RgbImage::from_pixel(40, 30, Rgb([90, 90, 90]))),
        Frame::from_rgb(RgbImage::from_pixel(40, 30, Rgb([170, 170, 170]))),
    ];

    let out = StitchPipeline::new(StitchConfig::default())
        .run(&frames)
        .unwrap();

    assert_eq!(out.offsets, vec![0.0, 30.0]);
    assert_eq!(out.panorama.height(), 60);
    // Second frame's rows were copied, not blended against the first.
    let v = out.panorama.get_pixel(20, 45).0[0] as i32;
    assert!((v - 170).abs() <= 6, "stacked row holds {v}");
}

#[test]
fn cancellation_surfaces_as_error() {
    let wall = textured_wall(80, 200, 3);
    let frames: Vec<Frame> = (0..4).map(|i| window(&wall, i * 10, 80)).collect();

    let token = CancelToken::new();
    token.cancel();

    let err = StitchPipeline::new(StitchConfig::default())
        .run_with_cancel(&frames, &token)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn diagnostics_report_every_pair() {
    let wall = textured_wall(140, 300, 99);
    let frames: Vec<Frame> = (0..4).map(|i| window(&wall, 60 - i * 15, 100)).collect();

    let config = StitchConfig {
        save_intermediate: true,
        ..StitchConfig::default()
    };
    let out = StitchPipeline::new(config).run(&frames).unwrap();

    let diags = out.diagnostics.expect("diagnostics requested");
    assert_eq!(diags.len(), 3);
    for d in &diags {
        assert!(d.confidence >= 0.0 && d.confidence <= 1.0);
    }
}

#[test]
fn unwrapped_bore_frames_feed_the_stitcher() {
    // A ring-textured circular view unwraps to a rectangular wall image
    // that the pipeline accepts without errors.
    let mut circle = RgbImage::new(160, 160);
    for (x, y, p) in circle.enumerate_pixels_mut() {
        let d = ((x as f32 - 80.0).powi(2) + (y as f32 - 88.0).powi(2)).sqrt();
        let v = if d < 30.0 {
            20
        } else {
            (60.0 + 80.0 * ((d * 0.5).sin().abs())) as u8
        };
        *p = Rgb([v, v, v]);
    }

    let mut session = UnwrapSession::new(UnwrapConfig {
        output_height: 60,
        ..UnwrapConfig::default()
    });
    let unwrapped = session.unwrap(&Frame::from_rgb(circle));
    assert!(unwrapped.width() > 0 && unwrapped.height() > 0);

    let out = StitchPipeline::new(StitchConfig::default())
        .run(&[unwrapped])
        .unwrap();
    assert_eq!(out.offsets, vec![0.0]);
}
