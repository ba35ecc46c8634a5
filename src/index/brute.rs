use super::distance::squared_l2;
use super::{Neighbor, TopKNeighbors, VectorIndex, VectorStore};

/// 暴力搜索，适合高维向量
pub struct BruteForceIndex {
    store: VectorStore,
}

impl BruteForceIndex {
    pub fn new(store: VectorStore) -> Self {
        Self { store }
    }
}

impl VectorIndex for BruteForceIndex {
    fn store(&self) -> &VectorStore {
        &self.store
    }

    fn search(&self, pos: usize, k: usize) -> Vec<Neighbor> {
        let query = self.store.vector(pos);
        let mut topk = TopKNeighbors::new(k.min(self.store.len().saturating_sub(1)));
        for i in (0..self.store.len()).filter(|&i| i != pos) {
            let distance = squared_l2(query, self.store.vector(i));
            topk.push(Neighbor { pos: i, distance });
        }
        topk.into_sorted_vec()
    }

    fn name(&self) -> &'static str {
        "brute-force"
    }
}
