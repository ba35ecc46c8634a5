use super::distance::squared_l2;
use super::{Neighbor, TopKNeighbors, VectorIndex, VectorStore};

const LEAF_SIZE: usize = 16;

enum Node {
    Leaf { start: usize, end: usize },
    Split { axis: usize, value: f32, left: usize, right: usize },
}

/// k-d 树，适合中低维度的向量
///
/// 每次在跨度最大的维度上按中位数切分。
/// 剪枝条件是严格的大于，距离相同的候选点都会被访问，从而保证与暴力搜索结果一致
pub struct KdTreeIndex {
    store: VectorStore,
    nodes: Vec<Node>,
    order: Vec<usize>,
}

impl KdTreeIndex {
    pub fn new(store: VectorStore) -> Self {
        let order = (0..store.len()).collect::<Vec<_>>();
        let mut tree = Self { store, nodes: vec![], order };
        if !tree.order.is_empty() {
            tree.build(0, tree.order.len());
        }
        tree
    }

    /// 构建 [start, end) 范围内的子树，返回节点编号
    fn build(&mut self, start: usize, end: usize) -> usize {
        if end - start <= LEAF_SIZE {
            return self.push(Node::Leaf { start, end });
        }
        let Some(axis) = self.widest_axis(start, end) else {
            // 所有点都相同，无法再切分
            return self.push(Node::Leaf { start, end });
        };

        let store = &self.store;
        let mid = start + (end - start) / 2;
        self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            store.vector(a)[axis].total_cmp(&store.vector(b)[axis]).then(a.cmp(&b))
        });
        let value = self.store.vector(self.order[mid])[axis];

        // 先占位，子节点构建完成后再回填
        let id = self.push(Node::Leaf { start, end });
        let left = self.build(start, mid);
        let right = self.build(mid, end);
        self.nodes[id] = Node::Split { axis, value, left, right };
        id
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn widest_axis(&self, start: usize, end: usize) -> Option<usize> {
        let mut best = None;
        let mut best_spread = 0.0;
        for axis in 0..self.store.dim() {
            let (mut lo, mut hi) = (f32::INFINITY, f32::NEG_INFINITY);
            for &i in &self.order[start..end] {
                let x = self.store.vector(i)[axis];
                lo = lo.min(x);
                hi = hi.max(x);
            }
            if hi - lo > best_spread {
                best_spread = hi - lo;
                best = Some(axis);
            }
        }
        best
    }

    fn search_node(&self, node: usize, query: &[f32], skip: usize, topk: &mut TopKNeighbors) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &i in self.order[start..end].iter().filter(|&&i| i != skip) {
                    let distance = squared_l2(query, self.store.vector(i));
                    topk.push(Neighbor { pos: i, distance });
                }
            }
            Node::Split { axis, value, left, right } => {
                let diff = query[axis] - value;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                self.search_node(near, query, skip, topk);
                match topk.worst_distance() {
                    Some(worst) if diff * diff > worst => {}
                    _ => self.search_node(far, query, skip, topk),
                }
            }
        }
    }
}

impl VectorIndex for KdTreeIndex {
    fn store(&self) -> &VectorStore {
        &self.store
    }

    fn search(&self, pos: usize, k: usize) -> Vec<Neighbor> {
        let k = k.min(self.store.len().saturating_sub(1));
        let mut topk = TopKNeighbors::new(k);
        if k > 0 && !self.nodes.is_empty() {
            self.search_node(0, self.store.vector(pos), pos, &mut topk);
        }
        topk.into_sorted_vec()
    }

    fn name(&self) -> &'static str {
        "kdtree"
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;

    use super::*;
    use crate::index::{BruteForceIndex, EmbeddingRecord};

    fn random_store(n: usize, dim: usize, seed: u64) -> VectorStore {
        let mut rng = StdRng::seed_from_u64(seed);
        let records = (0..n)
            .map(|i| {
                // 量化到 0.25 的倍数，制造大量距离相同的点
                let v = (0..dim).map(|_| (rng.random_range(0..8) as f32) * 0.25).collect();
                EmbeddingRecord::new(format!("video{i:04}"), v)
            })
            .collect();
        VectorStore::build(records).unwrap()
    }

    #[test]
    fn test_kdtree_matches_brute_force() {
        for (n, dim, k) in [(1, 3, 5), (17, 2, 3), (200, 3, 7), (300, 8, 20)] {
            let store = random_store(n, dim, n as u64);
            let kd = KdTreeIndex::new(store.clone());
            let bf = BruteForceIndex::new(store);
            for pos in 0..n {
                let a = kd.search(pos, k);
                let b = bf.search(pos, k);
                assert_eq!(a, b, "n={n} dim={dim} pos={pos}");
                assert!(a.iter().all(|x| x.pos != pos));
            }
        }
    }

    #[test]
    fn test_kdtree_identical_points() {
        let records =
            (0..40).map(|i| EmbeddingRecord::new(format!("{i:02}"), vec![1.0; 4])).collect();
        let kd = KdTreeIndex::new(VectorStore::build(records).unwrap());
        let r = kd.search(10, 3);
        assert_eq!(r.iter().map(|n| n.pos).collect::<Vec<_>>(), [0, 1, 2]);
        assert!(r.iter().all(|n| n.distance == 0.0));
    }
}
