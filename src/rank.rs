use std::collections::HashSet;

use crate::pairs::MatchCluster;
use crate::report::{Report, ReportEntry};

/// 大的簇排在前面，方便人工审核
///
/// 大小相同时按锚点视频 ID 升序，保证每次运行的顺序相同
pub fn rank_clusters(mut clusters: Vec<MatchCluster>) -> Vec<MatchCluster> {
    clusters.sort_by(|a, b| b.size().cmp(&a.size()).then_with(|| a.anchor.cmp(&b.anchor)));
    clusters
}

/// 按簇的顺序展开为报告，簇内保持原有顺序
///
/// 同一个匹配对只保留第一次出现的一行，因此它归属于排在最前面的簇
pub fn flatten(clusters: &[MatchCluster]) -> Report {
    let mut seen = HashSet::new();
    clusters
        .iter()
        .flat_map(|cluster| cluster.pairs.iter().map(move |pair| (cluster, pair)))
        .filter(|&(_, pair)| seen.insert(pair.key()))
        .map(|(cluster, pair)| ReportEntry::from_pair(&cluster.anchor, pair))
        .collect()
}
