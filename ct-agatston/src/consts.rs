//! 通用常量.

/// 标注体数据的体素取值.
pub mod label {
    /// 背景体素值. 既不达钙化阈值, 也不属于任何动脉.
    pub const CORONARY_BACKGROUND: u8 = 0;

    /// 达到钙化阈值但尚未指派到任何动脉分支的体素值.
    pub const CORONARY_DEFAULT: u8 = 1;

    /// 左主干 (Left Main) 的体素值.
    pub const CORONARY_LM: u8 = 2;

    /// 左前降支 (Left Arterial Descending) 的体素值.
    pub const CORONARY_LAD: u8 = 3;

    /// 左回旋支 (Left Circumflex) 的体素值.
    pub const CORONARY_LCX: u8 = 4;

    /// 右冠状动脉 (Right Coronary Artery) 的体素值.
    pub const CORONARY_RCA: u8 = 5;

    /// 四条动脉分支并集的派生标签值. 仅用于合计报表, 不由编辑器直接涂画.
    pub const CORONARY_ALL: u8 = 6;

    /// 四条动脉分支标签, 按升序排列.
    pub const TERRITORIES: [u8; 4] = [CORONARY_LM, CORONARY_LAD, CORONARY_LCX, CORONARY_RCA];

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, CORONARY_BACKGROUND)
    }

    /// 体素是否仅达阈值、未指派动脉?
    #[inline]
    pub const fn is_default(p: u8) -> bool {
        matches!(p, CORONARY_DEFAULT)
    }

    /// 体素是否属于某条动脉分支 (2..=5)?
    #[inline]
    pub const fn is_territory(p: u8) -> bool {
        matches!(p, CORONARY_LM | CORONARY_LAD | CORONARY_LCX | CORONARY_RCA)
    }

    /// 标签是否会出现在统计报表中 (2..=6)?
    #[inline]
    pub const fn is_reportable(p: u8) -> bool {
        is_territory(p) || matches!(p, CORONARY_ALL)
    }

    /// 报表中标签对应的显示名. 背景与未指派标签没有显示名.
    #[inline]
    pub const fn territory_name(p: u8) -> Option<&'static str> {
        match p {
            CORONARY_LM => Some("LM"),
            CORONARY_LAD => Some("LAD"),
            CORONARY_LCX => Some("LCX"),
            CORONARY_RCA => Some("RCA"),
            CORONARY_ALL => Some("Total"),
            _ => None,
        }
    }
}
