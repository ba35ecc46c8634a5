/// 计算向量 va 和 vb 的欧氏距离平方
///
/// 按 4 路累加，交换参数顺序结果完全相同。
/// 所有索引实现都必须调用这个函数，否则不同索引之间的结果可能有细微差别
#[inline(always)]
pub fn squared_l2(va: &[f32], vb: &[f32]) -> f32 {
    debug_assert_eq!(va.len(), vb.len());
    let (ca, cb) = (va.chunks_exact(4), vb.chunks_exact(4));
    let (ra, rb) = (ca.remainder(), cb.remainder());
    let mut acc = [0f32; 4];
    for (a, b) in ca.zip(cb) {
        for i in 0..4 {
            let d = a[i] - b[i];
            acc[i] += d * d;
        }
    }
    let mut sum = (acc[0] + acc[1]) + (acc[2] + acc[3]);
    for (a, b) in ra.iter().zip(rb) {
        let d = a - b;
        sum += d * d;
    }
    sum
}

/// 朴素实现，仅用于测试和 benchmark 对照
#[inline(always)]
pub fn squared_l2_naive(va: &[f32], vb: &[f32]) -> f32 {
    va.iter().zip(vb).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// 将 NaN 和 Inf 替换为 0，返回被替换的分量数量
pub fn sanitize(v: &mut [f32]) -> usize {
    let mut n = 0;
    for x in v.iter_mut().filter(|x| !x.is_finite()) {
        *x = 0.0;
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_l2_identical() {
        let v = [0.5f32; 13];
        assert_eq!(squared_l2(&v, &v), 0.0);
    }

    #[test]
    fn test_squared_l2_simple() {
        let va = [0.0, 0.0, 0.0, 0.0, 0.0];
        let vb = [1.0, 2.0, 0.0, 0.0, 2.0];
        assert_eq!(squared_l2(&va, &vb), 9.0);
    }

    #[test]
    fn test_squared_l2_symmetric() {
        let va = [0.1, -0.7, 3.3, 1e-3, 0.25, 9.0, -2.5];
        let vb = [1.9, 0.2, -0.4, 7.0, 0.5, -1.0, 0.0];
        assert_eq!(squared_l2(&va, &vb).to_bits(), squared_l2(&vb, &va).to_bits());
    }

    #[test]
    fn test_squared_l2_matches_naive() {
        let va = (0..37).map(|i| i as f32 * 0.25).collect::<Vec<_>>();
        let vb = (0..37).map(|i| (37 - i) as f32 * 0.5).collect::<Vec<_>>();
        let (a, b) = (squared_l2(&va, &vb), squared_l2_naive(&va, &vb));
        assert!((a - b).abs() / b < 1e-5);
    }

    #[test]
    fn test_sanitize() {
        let mut v = [1.0, f32::NAN, f32::INFINITY, -2.0, f32::NEG_INFINITY];
        assert_eq!(sanitize(&mut v), 3);
        assert_eq!(v, [1.0, 0.0, 0.0, -2.0, 0.0]);
    }
}
