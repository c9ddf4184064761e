/// Binary feature descriptor (packed comparison bits).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub data: Vec<u8>,
}

impl Descriptor {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn hamming_distance(&self, other: &Descriptor) -> u32 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_counts_differing_bits() {
        let a = Descriptor::new(vec![0b1010_1010, 0x00]);
        let b = Descriptor::new(vec![0b0101_0101, 0x00]);
        assert_eq!(a.hamming_distance(&b), 8);
        assert_eq!(a.hamming_distance(&a), 0);
    }
}
