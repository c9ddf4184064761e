use crate::descriptor::Descriptor;

/// Detected interest point in frame pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct KeyPoint {
    pub x: f64,
    pub y: f64,
    pub response: f64,
    pub octave: i32,
}

impl KeyPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            response: 0.0,
            octave: 0,
        }
    }

    pub fn with_response(mut self, response: f64) -> Self {
        self.response = response;
        self
    }

    pub fn with_octave(mut self, octave: i32) -> Self {
        self.octave = octave;
        self
    }
}

/// Keypoints and their descriptors for one frame, kept together so a
/// position can never be separated from its descriptor.
///
/// Empty sets are valid values; downstream matching treats them as "no
/// correspondences", not as a failure.
#[derive(Debug, Clone, Default)]
pub struct KeypointSet {
    points: Vec<KeyPoint>,
    descriptors: Vec<Descriptor>,
}

impl KeypointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            descriptors: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: KeyPoint, descriptor: Descriptor) {
        self.points.push(point);
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, idx: usize) -> &KeyPoint {
        &self.points[idx]
    }

    pub fn descriptor(&self, idx: usize) -> &Descriptor {
        &self.descriptors[idx]
    }

    pub fn points(&self) -> &[KeyPoint] {
        &self.points
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }
}

/// One point correspondence between consecutive frames.
#[derive(Debug, Clone, Copy)]
pub struct Correspondence {
    /// Point in the earlier frame (A).
    pub src: (f64, f64),
    /// Point in the later frame (B).
    pub dst: (f64, f64),
    /// Descriptor distance of the accepted match.
    pub distance: f32,
}

/// Correspondences between a frame pair, at most one per query point.
/// Ephemeral: consumed immediately by motion estimation.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    pub correspondences: Vec<Correspondence>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            correspondences: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, c: Correspondence) {
        self.correspondences.push(c);
    }

    pub fn len(&self) -> usize {
        self.correspondences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.correspondences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Correspondence> {
        self.correspondences.iter()
    }
}
