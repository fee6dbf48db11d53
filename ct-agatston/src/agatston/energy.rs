#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// CT 扫描能量模式. 两档必须且只能选择一档; "未选择"
/// 属于上游输入错误, 应在调用本 crate 之前被拒绝.
///
/// 能量模式同时决定: (1) 上游二值化使用的最低钙化 HU 阈值;
/// (2) 积分时峰值 HU 到密度权重的分段映射.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EnergyMode {
    /// 80 keV 扫描.
    Kev80,

    /// 120 keV 扫描.
    Kev120,
}

impl EnergyMode {
    /// 最低钙化阈值 (HU). 上游阈值分割应以该值产生标注体数据,
    /// 保证阈值与权重表出自同一来源.
    #[inline]
    pub const fn hu_threshold(self) -> f32 {
        match self {
            Self::Kev80 => 167.0,
            Self::Kev120 => 130.0,
        }
    }

    /// 密度权重的分段断点 (HU), 升序. 第 `i` 个断点是权重 `i + 1` 的下界.
    #[inline]
    pub const fn breakpoints(self) -> [f32; 4] {
        match self {
            Self::Kev80 => [167.0, 266.0, 408.0, 551.0],
            Self::Kev120 => [130.0, 200.0, 300.0, 400.0],
        }
    }

    /// 由钙化灶峰值 HU 求密度权重 (0..=4).
    ///
    /// 映射为阶梯函数而非插值: 取峰值以 `>=` 能达到的最高档;
    /// 峰值低于第一个断点时权重为 0 (不产生任何贡献).
    /// 该函数对峰值单调非减.
    #[inline]
    pub fn density_weight(self, peak_hu: f32) -> u8 {
        self.breakpoints()
            .iter()
            .filter(|&&b| peak_hu >= b)
            .count() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::EnergyMode::{Kev120, Kev80};

    #[test]
    fn test_hu_threshold_matches_first_breakpoint() {
        for mode in [Kev80, Kev120] {
            assert_eq!(mode.hu_threshold(), mode.breakpoints()[0]);
        }
    }

    #[test]
    fn test_weight_table_120() {
        assert_eq!(Kev120.density_weight(-1000.0), 0);
        assert_eq!(Kev120.density_weight(129.0), 0);
        assert_eq!(Kev120.density_weight(130.0), 1);
        assert_eq!(Kev120.density_weight(199.0), 1);
        assert_eq!(Kev120.density_weight(200.0), 2);
        assert_eq!(Kev120.density_weight(299.0), 2);
        assert_eq!(Kev120.density_weight(300.0), 3);
        assert_eq!(Kev120.density_weight(399.0), 3);
        assert_eq!(Kev120.density_weight(400.0), 4);
        assert_eq!(Kev120.density_weight(4000.0), 4);
    }

    #[test]
    fn test_weight_table_80() {
        assert_eq!(Kev80.density_weight(166.0), 0);
        assert_eq!(Kev80.density_weight(167.0), 1);
        assert_eq!(Kev80.density_weight(265.0), 1);
        assert_eq!(Kev80.density_weight(266.0), 2);
        assert_eq!(Kev80.density_weight(407.0), 2);
        assert_eq!(Kev80.density_weight(408.0), 3);
        assert_eq!(Kev80.density_weight(550.0), 3);
        assert_eq!(Kev80.density_weight(551.0), 4);
    }

    #[test]
    fn test_weight_monotone() {
        for mode in [Kev80, Kev120] {
            let mut last = 0;
            for hu in (0..700).map(|v| v as f32) {
                let w = mode.density_weight(hu);
                assert!(w >= last);
                last = w;
            }
        }
    }

    /// 同一物理测量在不同能量模式下可以得到不同权重.
    #[test]
    fn test_mode_sensitivity() {
        assert_eq!(Kev120.density_weight(250.0), 2);
        assert_eq!(Kev80.density_weight(250.0), 1);
    }
}
