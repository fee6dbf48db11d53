//! 标签统计报表.
//!
//! 对标注中每个非空的报表标签 (2..=6) 做一次整体统计:
//! 体素数、实际体积、掩模内 HU 的 min/max/mean/stddev,
//! 并合入 [`LabelScore`] 中预先算好的 Agatston 总分.
//! 报表行即供展示与导出层消费的最终表格.

use itertools::Itertools;

use crate::agatston::{LabelScore, ScoreResult};
use crate::consts::label::*;
use crate::data::{CtData3d, NiftiHeaderAttr};

/// 单个标签的统计报表行. 一经计算即不可变.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LabelStatRow {
    /// 标签值.
    pub label: u8,

    /// 标签显示名.
    pub name: &'static str,

    /// Agatston 总分. 直接取自汇总结果, 本模块不重算.
    pub agatston: f64,

    /// 掩模内体素个数.
    pub count: usize,

    /// 实际体积, 立方毫米.
    pub volume_mm3: f64,

    /// 实际体积, 毫升 (cc).
    pub volume_cc: f64,

    /// 掩模内 HU 最小值.
    pub min_hu: f32,

    /// 掩模内 HU 最大值.
    pub max_hu: f32,

    /// 掩模内 HU 平均值.
    pub mean_hu: f64,

    /// 掩模内 HU 样本标准差 (n - 1 分母). 单体素掩模取 0.
    pub stddev_hu: f64,
}

/// 单标签 HU 累加器.
#[derive(Clone, Copy)]
struct HuAccum {
    count: usize,
    sum: f64,
    sum_sq: f64,
    min: f32,
    max: f32,
}

impl HuAccum {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    #[inline]
    fn push(&mut self, hu: f32) {
        self.count += 1;
        self.sum += hu as f64;
        self.sum_sq += (hu as f64) * (hu as f64);
        self.min = self.min.min(hu);
        self.max = self.max.max(hu);
    }

    /// 空掩模 (`count == 0`) 不产生报表行.
    fn into_row(self, label: u8, agatston: f64, voxel_mm3: f64) -> Option<LabelStatRow> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        // 浮点舍入可能让差值轻微为负, 先钳到 0.
        let stddev = if self.count > 1 {
            ((self.sum_sq - n * mean * mean) / (n - 1.0)).max(0.0).sqrt()
        } else {
            0.0
        };
        let volume_mm3 = n * voxel_mm3;
        Some(LabelStatRow {
            label,
            // 报表标签 (2..=6) 恒有显示名, 可直接 unwrap.
            name: territory_name(label).unwrap(),
            agatston,
            count: self.count,
            volume_mm3,
            volume_cc: volume_mm3 * 0.001,
            min_hu: self.min,
            max_hu: self.max,
            mean_hu: mean,
            stddev_hu: stddev,
        })
    }
}

/// 计算每个非空报表标签 (2..=6) 的统计行, 按标签升序排列.
///
/// 1. 派生标签 6 的掩模为四条动脉分支 (2..=5) 的并集.
/// 2. 体素数为零的标签不产生报表行, 即使其在 `score` 中有定义的总分.
/// 3. Agatston 总分直接取自 `score`, 缺失的标签记 0 分, 本函数从不重算.
/// 4. 标注中完全没有报表标签时返回空表 (不视为错误).
///
/// 扫描与标注几何不一致时, 在统计任何体素之前返回 `Err`.
pub fn compute_stats(data: &CtData3d, score: &LabelScore) -> ScoreResult<Vec<LabelStatRow>> {
    data.validate_geometry()?;
    let voxel_mm3 = data.scan.voxel();

    // 标签 2..=6 各一个累加器, 单趟遍历同时喂分支自身与并集.
    let mut accums = [HuAccum::new(); 5];
    for (&hu, &lab) in data.iter() {
        if is_territory(lab) {
            accums[(lab - CORONARY_LM) as usize].push(hu);
            accums[(CORONARY_ALL - CORONARY_LM) as usize].push(hu);
        }
    }

    Ok((CORONARY_LM..=CORONARY_ALL)
        .zip(accums)
        .filter_map(|(label, acc)| {
            let agatston = score.get(&label).copied().unwrap_or(0.0);
            acc.into_row(label, agatston, voxel_mm3)
        })
        .collect_vec())
}
