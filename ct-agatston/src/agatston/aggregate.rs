//! 标签总分汇总.

use std::collections::BTreeMap;

use super::{score_label, EnergyMode, ScoreResult};
use crate::consts::label::*;
use crate::data::CtData3d;

/// 标签到 Agatston 总分的映射.
///
/// 每次积分运行都会重新生成一张全新的映射, 不跨运行持久化.
pub type LabelScore = BTreeMap<u8, f64>;

/// 将逐标签、逐切片的贡献列表汇总为各标签总分.
///
/// 行为约定:
///
/// 1. 标签 0 (背景) 与 1 (未指派) 恒为 0 分.
/// 2. 动脉分支标签 (2..=5) 的总分为其全部切片贡献之和;
///    输入中缺失的分支计 0 分 (不视为错误).
/// 3. 合计标签 6 **定义** 为 2..=5 总分的精确和, 不在并集掩模上重算连通区域.
///    跨分支边界的钙化灶因此始终按分支分别计数.
/// 4. 输入中为标签 0, 1, 6 提供的贡献列表会被忽略.
///
/// 本函数对合法输入不会失败.
pub fn aggregate(contributions: &BTreeMap<u8, Vec<Vec<f64>>>) -> LabelScore {
    let mut ans = LabelScore::new();
    ans.insert(CORONARY_BACKGROUND, 0.0);
    ans.insert(CORONARY_DEFAULT, 0.0);

    let mut total = 0.0;
    for t in TERRITORIES {
        let sum = contributions
            .get(&t)
            .map(|per_slice| per_slice.iter().flatten().sum::<f64>())
            .unwrap_or(0.0);
        ans.insert(t, sum);
        total += sum;
    }
    ans.insert(CORONARY_ALL, total);
    ans
}

/// 完整积分流水线: 对四条动脉分支分别逐切片积分, 然后汇总.
///
/// 扫描与标注几何不一致时, 在处理任何切片之前返回 `Err`.
pub fn score_volume(data: &CtData3d, mode: EnergyMode) -> ScoreResult<LabelScore> {
    data.validate_geometry()?;
    let mut contributions = BTreeMap::new();
    for t in TERRITORIES {
        contributions.insert(t, score_label(data, t, mode)?);
    }
    let ans = aggregate(&contributions);
    log::debug!("Agatston 总分表: {ans:?}");
    Ok(ans)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use super::par_score_label;

        /// 借助 `rayon`, 并行版的 [`score_volume`]. 结果与串行版逐位一致.
        pub fn par_score_volume(data: &CtData3d, mode: EnergyMode) -> ScoreResult<LabelScore> {
            data.validate_geometry()?;
            let mut contributions = BTreeMap::new();
            for t in TERRITORIES {
                contributions.insert(t, par_score_label(data, t, mode)?);
            }
            Ok(aggregate(&contributions))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agatston::EnergyMode;
    use crate::data::{CtLabel, CtScan};
    use ndarray::Array3;

    #[test]
    fn test_aggregate_all_empty() {
        let mut contributions = BTreeMap::new();
        for t in TERRITORIES {
            contributions.insert(t, vec![vec![], vec![], vec![]]);
        }
        let score = aggregate(&contributions);
        assert_eq!(score.len(), 7);
        for label in 0..=CORONARY_ALL {
            assert_eq!(score[&label], 0.0);
        }
    }

    #[test]
    fn test_aggregate_missing_labels_score_zero() {
        let score = aggregate(&BTreeMap::new());
        assert_eq!(score.len(), 7);
        assert!(score.values().all(|&v| v == 0.0));
    }

    #[test]
    fn test_aggregate_sums_and_combined_equality() {
        let mut contributions = BTreeMap::new();
        contributions.insert(CORONARY_LM, vec![vec![1.5], vec![]]);
        contributions.insert(CORONARY_LAD, vec![vec![2.0, 0.5], vec![1.0]]);
        contributions.insert(CORONARY_RCA, vec![vec![], vec![4.0]]);
        let score = aggregate(&contributions);

        assert_eq!(score[&CORONARY_BACKGROUND], 0.0);
        assert_eq!(score[&CORONARY_DEFAULT], 0.0);
        assert_eq!(score[&CORONARY_LM], 1.5);
        assert_eq!(score[&CORONARY_LAD], 3.5);
        assert_eq!(score[&CORONARY_LCX], 0.0);
        assert_eq!(score[&CORONARY_RCA], 4.0);

        // 合计标签是四个分支总分的精确和.
        assert_eq!(
            score[&CORONARY_ALL],
            score[&CORONARY_LM]
                + score[&CORONARY_LAD]
                + score[&CORONARY_LCX]
                + score[&CORONARY_RCA]
        );
    }

    /// 为标签 0, 1, 6 提供的贡献列表不参与汇总.
    #[test]
    fn test_aggregate_ignores_non_territory_inputs() {
        let mut contributions = BTreeMap::new();
        contributions.insert(CORONARY_BACKGROUND, vec![vec![100.0]]);
        contributions.insert(CORONARY_DEFAULT, vec![vec![100.0]]);
        contributions.insert(CORONARY_ALL, vec![vec![100.0]]);
        contributions.insert(CORONARY_LCX, vec![vec![2.5]]);
        let score = aggregate(&contributions);

        assert_eq!(score[&CORONARY_BACKGROUND], 0.0);
        assert_eq!(score[&CORONARY_DEFAULT], 0.0);
        assert_eq!(score[&CORONARY_LCX], 2.5);
        assert_eq!(score[&CORONARY_ALL], 2.5);
    }

    fn two_territory_volume() -> CtData3d {
        let pix = [0.5, 0.5, 2.0];
        let mut hu = Array3::<f32>::zeros((2, 4, 4));
        let mut lab = Array3::<u8>::zeros((2, 4, 4));
        // 切片 0: LAD 钙化灶, 峰值 320.
        for pos in [(0, 0, 0), (0, 0, 1)] {
            hu[pos] = 320.0;
            lab[pos] = CORONARY_LAD;
        }
        // 切片 1: RCA 钙化灶, 峰值 410.
        hu[(1, 3, 3)] = 410.0;
        lab[(1, 3, 3)] = CORONARY_RCA;
        CtData3d::new(CtScan::fake(hu, pix), CtLabel::fake(lab, pix))
    }

    #[test]
    fn test_score_volume() {
        let data = two_territory_volume();
        let score = score_volume(&data, EnergyMode::Kev120).unwrap();

        // LAD: 2 像素 * 0.25 mm² * 权重 3; RCA: 1 像素 * 0.25 mm² * 权重 4.
        assert_eq!(score[&CORONARY_LAD], 0.5 * 3.0);
        assert_eq!(score[&CORONARY_RCA], 0.25 * 4.0);
        assert_eq!(score[&CORONARY_LM], 0.0);
        assert_eq!(score[&CORONARY_LCX], 0.0);
        assert_eq!(
            score[&CORONARY_ALL],
            score[&CORONARY_LAD] + score[&CORONARY_RCA]
        );

        // 无隐藏状态: 重复运行结果一致.
        let again = score_volume(&data, EnergyMode::Kev120).unwrap();
        assert_eq!(score, again);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_score_volume_matches_serial() {
        let data = two_territory_volume();
        let serial = score_volume(&data, EnergyMode::Kev120).unwrap();
        let parallel = par_score_volume(&data, EnergyMode::Kev120).unwrap();
        assert_eq!(serial, parallel);
    }
}
