//! 逐切片钙化灶提取与贡献计算.

use itertools::Itertools;

use super::{EnergyMode, ScoreResult};
use crate::data::{CtData3d, LabelSlice, NiftiHeaderAttr, ScanSlice};

/// 单个钙化灶 (切片内同标签 4-连通区域) 的测量结果.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Deposit {
    /// 区域内像素个数.
    pub count: usize,

    /// 区域在扫描切片对应坐标上的 HU 峰值.
    pub peak_hu: f32,

    /// 区域的实际面积, 平方毫米.
    pub area_mm2: f64,

    /// 由峰值 HU 与能量模式决定的密度权重 (0..=4).
    pub weight: u8,
}

impl Deposit {
    /// 该钙化灶对所属标签总分的贡献: `面积 × 权重`.
    ///
    /// 权重为 0 的钙化灶贡献 0.0, 但仍会保留在测量列表中以便诊断.
    #[inline]
    pub fn contribution(&self) -> f64 {
        self.area_mm2 * self.weight as f64
    }
}

/// 在单张 (扫描, 标注) 切片对上提取值为 `label` 的所有钙化灶并测量.
///
/// `pixel_mm2` 为该切片单个像素的实际面积 (平方毫米),
/// 即父体数据的 [`NiftiHeaderAttr::slice_pixel`].
/// 两张切片的形状必须一致, 否则程序 panic.
pub fn slice_deposits(
    scan: &ScanSlice,
    label_slice: &LabelSlice,
    label: u8,
    mode: EnergyMode,
    pixel_mm2: f64,
) -> Vec<Deposit> {
    label_slice
        .label_areas(label)
        .into_iter()
        .map(|area| {
            let count = area.len();
            // `label_areas` 产生的区域恒非空, 可直接 unwrap.
            let peak_hu = scan.peak_hu(area).unwrap();
            Deposit {
                count,
                peak_hu,
                area_mm2: count as f64 * pixel_mm2,
                weight: mode.density_weight(peak_hu),
            }
        })
        .collect_vec()
}

/// 对值为 `label` 的标签逐切片提取钙化灶.
///
/// 返回值按切片升序恰好包含 `len_z` 个列表, 无钙化灶的切片对应空列表;
/// 标注中不存在该标签时全部列表为空 (不视为错误).
/// 本函数是其输入的纯函数, 不持有任何隐藏状态.
///
/// 扫描与标注几何不一致时, 在处理任何切片之前返回 `Err`.
pub fn label_deposits(
    data: &CtData3d,
    label: u8,
    mode: EnergyMode,
) -> ScoreResult<Vec<Vec<Deposit>>> {
    data.validate_geometry()?;
    let pixel_mm2 = data.scan.slice_pixel();
    Ok(data
        .slice_iter()
        .map(|(scan, lab)| slice_deposits(&scan, &lab, label, mode, pixel_mm2))
        .collect_vec())
}

/// 对值为 `label` 的标签逐切片计算 Agatston 贡献列表.
///
/// 结果保证与 [`label_deposits`] 同构: 按切片升序恰好 `len_z` 个列表,
/// 列表内每个元素为一个钙化灶的 `面积 × 权重`.
pub fn score_label(data: &CtData3d, label: u8, mode: EnergyMode) -> ScoreResult<Vec<Vec<f64>>> {
    Ok(label_deposits(data, label, mode)?
        .iter()
        .map(|deposits| deposits.iter().map(Deposit::contribution).collect_vec())
        .collect_vec())
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Axis;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

        /// 借助 `rayon`, 并行版的 [`score_label`].
        ///
        /// 切片间不存在共享可变状态, 各切片贡献独立计算后按切片序合并,
        /// 结果与串行版逐位一致.
        pub fn par_score_label(
            data: &CtData3d,
            label: u8,
            mode: EnergyMode,
        ) -> ScoreResult<Vec<Vec<f64>>> {
            data.validate_geometry()?;
            let pixel_mm2 = data.scan.slice_pixel();
            let scan = data.scan.data();
            let lab = data.label.data();
            Ok(scan
                .axis_iter(Axis(0))
                .into_par_iter()
                .zip(lab.axis_iter(Axis(0)).into_par_iter())
                .map(|(s, l)| {
                    let (s, l) = (ScanSlice::new(s), LabelSlice::new(l));
                    slice_deposits(&s, &l, label, mode, pixel_mm2)
                        .iter()
                        .map(Deposit::contribution)
                        .collect_vec()
                })
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agatston::{EnergyMode, ScoreError};
    use crate::consts::label::*;
    use crate::data::{CtLabel, CtScan};
    use ndarray::Array3;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    /// 3 张 4x4 切片; 中间切片上有一个 2x2 的 LAD 钙化灶, 峰值 HU 250.
    fn single_deposit_volume() -> CtData3d {
        let pix = [0.5, 0.5, 1.0];
        let mut hu = Array3::<f32>::zeros((3, 4, 4));
        let mut lab = Array3::<u8>::zeros((3, 4, 4));
        for pos in [(1, 1, 1), (1, 1, 2), (1, 2, 1), (1, 2, 2)] {
            hu[pos] = 250.0;
            lab[pos] = CORONARY_LAD;
        }
        // 削低一个角, 峰值仍为 250.
        hu[(1, 2, 2)] = 135.0;
        CtData3d::new(CtScan::fake(hu, pix), CtLabel::fake(lab, pix))
    }

    #[test]
    fn test_single_deposit_120() {
        let data = single_deposit_volume();
        let per_slice = score_label(&data, CORONARY_LAD, EnergyMode::Kev120).unwrap();

        // 每张切片恰好一个贡献列表, 按切片序排列.
        assert_eq!(per_slice.len(), 3);
        assert!(per_slice[0].is_empty());
        assert!(per_slice[2].is_empty());

        // 面积 4 * 0.25 mm², 峰值 250 -> 权重 2.
        assert_eq!(per_slice[1].len(), 1);
        assert!(float_eq(per_slice[1][0], 1.0 * 2.0));

        let deposits = label_deposits(&data, CORONARY_LAD, EnergyMode::Kev120).unwrap();
        let d = &deposits[1][0];
        assert_eq!(d.count, 4);
        assert_eq!(d.peak_hu, 250.0);
        assert!(float_eq(d.area_mm2, 1.0));
        assert_eq!(d.weight, 2);
    }

    /// 同一物理测量, 80 keV 下 250 < 266, 权重降为 1.
    #[test]
    fn test_single_deposit_80() {
        let data = single_deposit_volume();
        let per_slice = score_label(&data, CORONARY_LAD, EnergyMode::Kev80).unwrap();
        assert_eq!(per_slice.len(), 3);
        assert_eq!(per_slice[1].len(), 1);
        assert!(float_eq(per_slice[1][0], 1.0 * 1.0));
    }

    #[test]
    fn test_absent_label_yields_all_empty() {
        let data = single_deposit_volume();
        let per_slice = score_label(&data, CORONARY_RCA, EnergyMode::Kev120).unwrap();
        assert_eq!(per_slice.len(), 3);
        assert!(per_slice.iter().all(Vec::is_empty));
    }

    /// 同标签、被背景隔开的两个区域按两个独立钙化灶计, 不合并.
    #[test]
    fn test_two_deposits_in_one_slice() {
        let pix = [1.0, 1.0, 1.0];
        let mut hu = Array3::<f32>::zeros((1, 3, 5));
        let mut lab = Array3::<u8>::zeros((1, 3, 5));
        for pos in [(0, 0, 0), (0, 1, 0)] {
            hu[pos] = 450.0;
            lab[pos] = CORONARY_RCA;
        }
        for pos in [(0, 0, 3), (0, 0, 4)] {
            hu[pos] = 135.0;
            lab[pos] = CORONARY_RCA;
        }
        let data = CtData3d::new(CtScan::fake(hu, pix), CtLabel::fake(lab, pix));

        let per_slice = score_label(&data, CORONARY_RCA, EnergyMode::Kev120).unwrap();
        assert_eq!(per_slice[0].len(), 2);
        // 行优先种子序: 峰值 450 的区域在前.
        assert!(float_eq(per_slice[0][0], 2.0 * 4.0));
        assert!(float_eq(per_slice[0][1], 2.0 * 1.0));
    }

    /// 峰值低于第一个断点的钙化灶保留在测量列表中, 但贡献为 0.
    #[test]
    fn test_below_threshold_deposit() {
        let pix = [1.0, 1.0, 1.0];
        let mut hu = Array3::<f32>::zeros((1, 2, 2));
        let mut lab = Array3::<u8>::zeros((1, 2, 2));
        hu[(0, 0, 0)] = 100.0;
        lab[(0, 0, 0)] = CORONARY_LM;
        let data = CtData3d::new(CtScan::fake(hu, pix), CtLabel::fake(lab, pix));

        let deposits = label_deposits(&data, CORONARY_LM, EnergyMode::Kev120).unwrap();
        assert_eq!(deposits[0].len(), 1);
        assert_eq!(deposits[0][0].weight, 0);
        assert!(float_eq(deposits[0][0].contribution(), 0.0));
    }

    #[test]
    fn test_geometry_mismatch_rejected() {
        let scan = CtScan::fake(Array3::zeros((2, 3, 3)), [1.0, 1.0, 1.0]);
        let label = CtLabel::fake(Array3::zeros((2, 3, 3)), [0.5, 0.5, 1.0]);
        let data = CtData3d::new(scan, label);
        let err = score_label(&data, CORONARY_LM, EnergyMode::Kev120).unwrap_err();
        assert!(matches!(err, ScoreError::GeometryMismatch { .. }));
    }

    /// 纯函数: 在不变的输入上重复运行, 结果逐位一致.
    #[test]
    fn test_idempotence() {
        let data = single_deposit_volume();
        let first = score_label(&data, CORONARY_LAD, EnergyMode::Kev120).unwrap();
        let second = score_label(&data, CORONARY_LAD, EnergyMode::Kev120).unwrap();
        assert_eq!(first, second);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_score_label_matches_serial() {
        let data = single_deposit_volume();
        let serial = score_label(&data, CORONARY_LAD, EnergyMode::Kev120).unwrap();
        let parallel = par_score_label(&data, CORONARY_LAD, EnergyMode::Kev120).unwrap();
        assert_eq!(serial, parallel);
    }
}
