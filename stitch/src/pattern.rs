/// Classification of the whole recovered motion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionProfile {
    /// No pair moved beyond the threshold.
    Static,
    /// Sustained forward motion: later frames sit further down the canvas.
    Penetrating,
    /// Sustained backward motion: placement is inverted.
    Retracting,
    /// Motion present but without a consistent direction.
    Mixed,
    /// Fewer than five pair offsets; classification not attempted.
    InsufficientData,
}

/// Result of motion-pattern analysis: the profile, where sustained motion
/// begins, and the non-negative canvas row for every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionAnalysis {
    pub profile: MotionProfile,
    pub onset_index: Option<usize>,
    pub canvas_offsets: Vec<f64>,
}

const MIN_OFFSETS_TO_CLASSIFY: usize = 5;

/// Classify the relative pair offsets and resolve per-frame canvas rows.
///
/// Pure and deterministic: the same offsets always produce the same
/// analysis. `relative_offsets` has one entry per consecutive pair, so
/// `N` frames contribute `N - 1` entries; frame 0 is the coordinate origin.
pub fn analyze_motion(relative_offsets: &[f64], threshold: f64) -> MotionAnalysis {
    let cumulative = cumulative_offsets(relative_offsets);

    if relative_offsets.len() < MIN_OFFSETS_TO_CLASSIFY {
        return MotionAnalysis {
            profile: MotionProfile::InsufficientData,
            onset_index: None,
            canvas_offsets: shift_non_negative(&cumulative),
        };
    }

    let onset = relative_offsets
        .iter()
        .position(|r| r.abs() > threshold);

    let Some(onset) = onset else {
        // Everything below threshold: the probe never moved.
        return MotionAnalysis {
            profile: MotionProfile::Static,
            onset_index: None,
            canvas_offsets: vec![0.0; cumulative.len()],
        };
    };

    let tail = &relative_offsets[onset..];
    let mean = tail.iter().sum::<f64>() / tail.len() as f64;

    let (profile, canvas_offsets) = if mean > threshold {
        (MotionProfile::Penetrating, shift_non_negative(&cumulative))
    } else if mean < -threshold {
        let max = cumulative.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (
            MotionProfile::Retracting,
            cumulative.iter().map(|o| max - o).collect(),
        )
    } else {
        (MotionProfile::Mixed, shift_non_negative(&cumulative))
    };

    MotionAnalysis {
        profile,
        onset_index: Some(onset),
        canvas_offsets,
    }
}

fn cumulative_offsets(relative: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(relative.len() + 1);
    let mut acc = 0.0;
    out.push(0.0);
    for r in relative {
        acc += r;
        out.push(acc);
    }
    out
}

fn shift_non_negative(cumulative: &[f64]) -> Vec<f64> {
    let min = cumulative.iter().cloned().fold(f64::INFINITY, f64::min);
    cumulative.iter().map(|o| o - min).collect()
}
