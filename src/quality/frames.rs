use ndarray::prelude::*;

use super::VideoStats;

/// 由帧级特征和采样帧计算视频统计信息
pub struct FrameStats;

impl FrameStats {
    /// 计算视频统计信息
    ///
    /// # Arguments
    ///
    /// * `video_id` - 视频 ID
    /// * `features` - 帧级特征，形状为 (帧数, 维度)
    /// * `frames` - 采样帧，形状为 (帧数, 高, 宽, 通道)，通道顺序为 BGR；缺失时灰度统计全部为 0
    /// * `frames_per_second` - 采样帧率，用于由帧数换算时长
    pub fn compute(
        video_id: &str,
        features: ArrayView2<f32>,
        frames: Option<ArrayView4<u8>>,
        frames_per_second: f32,
    ) -> VideoStats {
        let activity = features.sum_axis(Axis(1));
        let (activity_mean, activity_std) = mean_std(activity.iter().map(|&x| x as f64));
        let activity_max_delta = max_delta(activity.iter().copied());

        let grays =
            frames.map(|f| f.outer_iter().map(frame_gray).collect::<Vec<_>>()).unwrap_or_default();
        let (gray_mean, gray_std) = mean_std(grays.iter().copied());
        let gray_max = grays.iter().copied().reduce(f64::max).unwrap_or(0.0);

        VideoStats {
            video_id: video_id.to_owned(),
            video_length_seconds: features.nrows() as f32 / frames_per_second,
            activity_mean: activity_mean as f32,
            activity_std: activity_std as f32,
            activity_max_delta,
            gray_mean: gray_mean as f32,
            gray_std: gray_std as f32,
            gray_max: gray_max as f32,
        }
    }
}

/// 转换为灰度图后的平均亮度
///
/// 与 OpenCV 的 BGR2GRAY 一致，使用 14 位定点数并四舍五入到 u8
fn frame_gray(frame: ArrayView3<u8>) -> f64 {
    let (h, w, c) = frame.dim();
    if h * w == 0 {
        return 0.0;
    }
    let mut sum = 0u64;
    for pixel in frame.lanes(Axis(2)) {
        let y = if c >= 3 {
            let (b, g, r) = (pixel[0] as u32, pixel[1] as u32, pixel[2] as u32);
            (b * 1868 + g * 9617 + r * 4899 + (1 << 13)) >> 14
        } else if c > 0 {
            pixel[0] as u32
        } else {
            0
        };
        sum += y as u64;
    }
    sum as f64 / (h * w) as f64
}

/// 均值和总体标准差，空序列返回 0
fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let var = values.map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

fn max_delta(values: impl Iterator<Item = f32>) -> f32 {
    let (lo, hi) =
        values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
    if lo.is_finite() && hi.is_finite() { hi - lo } else { 0.0 }
}
