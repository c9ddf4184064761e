use bs_core::{Correspondence, KeypointSet, MatchSet};

/// k-nearest-neighbor descriptor matcher with Lowe's ratio test.
pub struct FeatureMatcher {
    ratio_threshold: f32,
}

impl FeatureMatcher {
    pub fn new() -> Self {
        Self {
            ratio_threshold: 0.7,
        }
    }

    pub fn with_ratio_threshold(mut self, threshold: f32) -> Self {
        self.ratio_threshold = threshold;
        self
    }

    /// Match `a` (query) against `b` (train). For each query descriptor the
    /// two nearest train descriptors are found; the best is kept only when
    /// it beats the second best by the ratio margin. Either side empty means
    /// an empty MatchSet.
    pub fn match_sets(&self, a: &KeypointSet, b: &KeypointSet) -> MatchSet {
        if a.is_empty() || b.is_empty() {
            return MatchSet::new();
        }

        let mut matches = MatchSet::with_capacity(a.len());

        for qi in 0..a.len() {
            let q = a.descriptor(qi);

            let mut best: Option<(usize, u32)> = None;
            let mut second: Option<u32> = None;

            for ti in 0..b.len() {
                let d = q.hamming_distance(b.descriptor(ti));
                match best {
                    None => best = Some((ti, d)),
                    Some((_, bd)) if d < bd => {
                        second = Some(bd);
                        best = Some((ti, d));
                    }
                    Some(_) => {
                        if second.map_or(true, |s| d < s) {
                            second = Some(d);
                        }
                    }
                }
            }

            let Some((ti, best_dist)) = best else { continue };

            if let Some(second_dist) = second {
                if second_dist > 0
                    && best_dist as f32 >= self.ratio_threshold * second_dist as f32
                {
                    continue;
                }
            }

            let pa = a.point(qi);
            let pb = b.point(ti);
            matches.push(Correspondence {
                src: (pa.x, pa.y),
                dst: (pb.x, pb.y),
                distance: best_dist as f32,
            });
        }

        matches
    }
}

impl Default for FeatureMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bs_core::{Descriptor, KeyPoint};

    fn set_with(descs: &[(f64, f64, Vec<u8>)]) -> KeypointSet {
        let mut set = KeypointSet::new();
        for (x, y, d) in descs {
            set.push(KeyPoint::new(*x, *y), Descriptor::new(d.clone()));
        }
        set
    }

    #[test]
    fn empty_inputs_give_empty_matches() {
        let a = set_with(&[(1.0, 1.0, vec![0xff])]);
        let empty = KeypointSet::new();
        let matcher = FeatureMatcher::new();
        assert!(matcher.match_sets(&a, &empty).is_empty());
        assert!(matcher.match_sets(&empty, &a).is_empty());
    }

    #[test]
    fn distinct_descriptors_match_one_to_one() {
        let a = set_with(&[
            (10.0, 10.0, vec![0b0000_0000, 0x00]),
            (20.0, 20.0, vec![0b1111_1111, 0xff]),
        ]);
        let b = set_with(&[
            (11.0, 30.0, vec![0b0000_0001, 0x00]),
            (21.0, 40.0, vec![0b1111_1110, 0xff]),
        ]);

        let matches = FeatureMatcher::new().match_sets(&a, &b);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches.correspondences[0].src, (10.0, 10.0));
        assert_eq!(matches.correspondences[0].dst, (11.0, 30.0));
    }

    #[test]
    fn ratio_test_drops_ambiguous_matches() {
        // Two train descriptors nearly equidistant from the query.
        let a = set_with(&[(5.0, 5.0, vec![0b0000_1111])]);
        let b = set_with(&[
            (1.0, 1.0, vec![0b0000_1110]),
            (2.0, 2.0, vec![0b0000_1101]),
        ]);

        let matches = FeatureMatcher::new().match_sets(&a, &b);
        assert!(matches.is_empty(), "ambiguous match should be rejected");
    }

    #[test]
    fn at_most_one_match_per_query_point() {
        let a = set_with(&[(0.0, 0.0, vec![0x0f]), (1.0, 1.0, vec![0xf0])]);
        let b = set_with(&[
            (9.0, 9.0, vec![0x0f]),
            (8.0, 8.0, vec![0xf0]),
            (7.0, 7.0, vec![0xaa]),
        ]);
        let matches = FeatureMatcher::new().match_sets(&a, &b);
        assert!(matches.len() <= a.len());
    }
}
