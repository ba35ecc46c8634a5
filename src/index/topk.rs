use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// 索引中的一个近邻
///
/// `distance` 为欧氏距离的平方，`pos` 为向量在索引中的位置。
/// 排序时先比较距离，距离相同时比较位置，因此结果是完全确定的
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub pos: usize,
    pub distance: f32,
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance).then(self.pos.cmp(&other.pos))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

/// 保留最小的 k 个近邻，堆顶为当前最差的结果
pub struct TopKNeighbors {
    heap: BinaryHeap<Neighbor>,
    k: usize,
}

impl TopKNeighbors {
    pub fn new(k: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(k + 1), k }
    }

    pub fn push(&mut self, neighbor: Neighbor) {
        if self.heap.len() < self.k {
            self.heap.push(neighbor);
        } else if let Some(mut worst) = self.heap.peek_mut() {
            if neighbor < *worst {
                *worst = neighbor;
            }
        }
    }

    pub fn extend(&mut self, neighbors: impl IntoIterator<Item = Neighbor>) {
        for n in neighbors {
            self.push(n);
        }
    }

    /// 已满时返回堆顶的距离，用于剪枝
    pub fn worst_distance(&self) -> Option<f32> {
        if self.heap.len() < self.k { None } else { self.heap.peek().map(|n| n.distance) }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// 按距离升序返回
    pub fn into_sorted_vec(self) -> Vec<Neighbor> {
        self.heap.into_sorted_vec()
    }
}
