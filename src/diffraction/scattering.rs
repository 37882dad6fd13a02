//! # 原子散射因子
//!
//! X 射线散射因子（Cromer–Mann 四高斯拟合）及其经 Mott–Bethe 关系换算得到的
//! 电子散射因子。
//!
//! ## 公式
//! - X 射线：f_x(s) = Σᵢ aᵢ exp(-bᵢ s²) + c
//! - 电子：f_e(s) = 0.023934 · (Z − f_x(s)) / s²  （单位 Å），Z 取 f_x(0)
//!
//! 其中 s = sin(θ)/λ，单位 Å⁻¹。
//!
//! ## 数据来源
//! International Tables for Crystallography, Vol. C, Table 6.1.1.4
//!
//! ## 依赖关系
//! - 被 `diffraction/calculator.rs` 调用
//! - 纯静态数据，无外部依赖

/// Mott–Bethe 常数 m₀e²/(8π²ε₀h²)，单位 Å
pub const MOTT_BETHE_CONSTANT: f64 = 0.023934;

/// 小于此 s 时使用 s → 0 极限附近的近似，避免 (Z − f_x)/s² 的数值抵消
const SMALL_S: f64 = 1e-4;

/// 单个元素的散射参数
#[derive(Debug, Clone, Copy)]
pub struct ScatteringFactorParams {
    pub symbol: &'static str,
    pub atomic_number: u32,
    pub a: [f64; 4],
    pub b: [f64; 4],
    pub c: f64,
}

impl ScatteringFactorParams {
    /// X 射线散射因子 f_x(s)
    pub fn xray(&self, s: f64) -> f64 {
        let s2 = s * s;
        self.c
            + self
                .a
                .iter()
                .zip(&self.b)
                .map(|(a, b)| a * (-b * s2).exp())
                .sum::<f64>()
    }

    /// 电子散射因子 f_e(s)（Mott–Bethe）
    pub fn electron(&self, s: f64) -> f64 {
        if s.abs() < SMALL_S {
            // f_x(0) − f_x(s) ≈ s² Σ aᵢbᵢ
            let slope: f64 = self.a.iter().zip(&self.b).map(|(a, b)| a * b).sum();
            return MOTT_BETHE_CONSTANT * slope;
        }
        // 以拟合曲线在 s = 0 的值代替 Z，使 s → 0 时保持有限
        MOTT_BETHE_CONSTANT * (self.xray(0.0) - self.xray(s)) / (s * s)
    }
}

/// (符号, Z, a, b, c)
type Row = (&'static str, u32, [f64; 4], [f64; 4], f64);

#[rustfmt::skip]
const TABLE: &[Row] = &[
    ("H", 1, [0.493002, 0.322912, 0.140191, 0.040810], [10.5109, 26.1257, 3.14236, 57.7997], 0.003038),
    ("He", 2, [0.8734, 0.6309, 0.3112, 0.1780], [9.1037, 3.3568, 22.9276, 0.9821], 0.0064),
    ("Li", 3, [1.1282, 0.7508, 0.6175, 0.4653], [3.9546, 1.0524, 85.3905, 168.261], 0.0377),
    ("Be", 4, [1.5919, 1.1278, 0.5391, 0.7029], [43.6427, 1.8623, 103.483, 0.5420], 0.0385),
    ("B", 5, [2.0545, 1.3326, 1.0979, 0.7068], [23.2185, 1.0210, 60.3498, 0.1403], -0.1932),
    ("C", 6, [2.3100, 1.0200, 1.5886, 0.8650], [20.8439, 10.2075, 0.5687, 51.6512], 0.2156),
    ("N", 7, [12.2126, 3.1322, 2.0125, 1.1663], [0.0057, 9.8933, 28.9975, 0.5826], -11.529),
    ("O", 8, [3.0485, 2.2868, 1.5463, 0.8670], [13.2771, 5.7011, 0.3239, 32.9089], 0.2508),
    ("F", 9, [3.5392, 2.6412, 1.5170, 1.0243], [10.2825, 4.2944, 0.2615, 26.1476], 0.2776),
    ("Na", 11, [4.7626, 3.1736, 1.2674, 1.1128], [3.2850, 8.8422, 0.3136, 129.424], 0.6760),
    ("Mg", 12, [5.4204, 2.1735, 1.2269, 2.3073], [2.8275, 79.2611, 0.3808, 7.1937], 0.8584),
    ("Al", 13, [6.4202, 1.9002, 1.5936, 1.9646], [3.0387, 0.7426, 31.5472, 85.0886], 1.1151),
    ("Si", 14, [6.2915, 3.0353, 1.9891, 1.5410], [2.4386, 32.3337, 0.6785, 81.6937], 1.1407),
    ("P", 15, [6.4345, 4.1791, 1.7800, 1.4908], [1.9067, 27.1570, 0.5260, 68.1645], 1.1149),
    ("S", 16, [6.9053, 5.2034, 1.4379, 1.5863], [1.4679, 22.2151, 0.2536, 56.1720], 0.8669),
    ("Cl", 17, [11.4604, 7.1964, 6.2556, 1.6455], [0.0104, 1.1662, 18.5194, 47.7784], -9.5574),
    ("K", 19, [8.2186, 7.4398, 1.0519, 0.8659], [12.7949, 0.7748, 213.187, 41.6841], 1.4228),
    ("Ca", 20, [8.6266, 7.3873, 1.5899, 1.0211], [10.4421, 0.6599, 85.7484, 178.437], 1.3751),
    ("Ti", 22, [9.7595, 7.3558, 1.6991, 1.9021], [7.8508, 0.5000, 35.6338, 116.105], 1.2807),
    ("V", 23, [10.2971, 7.3511, 2.0703, 2.0571], [6.8657, 0.4385, 26.8938, 102.478], 1.2199),
    ("Cr", 24, [10.6406, 7.3537, 3.3240, 1.4922], [6.1038, 0.3920, 20.2626, 98.7399], 1.1832),
    ("Mn", 25, [11.2819, 7.3573, 3.0193, 2.2441], [5.3409, 0.3432, 17.8674, 83.7543], 1.0896),
    ("Fe", 26, [11.7695, 7.3573, 3.5222, 2.3045], [4.7611, 0.3072, 15.3535, 76.8805], 1.0369),
    ("Co", 27, [12.2841, 7.3409, 4.0034, 2.3488], [4.2791, 0.2784, 13.5359, 71.1692], 1.0118),
    ("Ni", 28, [12.8376, 7.2920, 4.4438, 2.3800], [3.8785, 0.2565, 12.1763, 66.3421], 1.0341),
    ("Cu", 29, [13.3380, 7.1676, 5.6158, 1.6735], [3.5828, 0.2470, 11.3966, 64.8126], 1.1910),
    ("Zn", 30, [14.0743, 7.0318, 5.1652, 2.4100], [3.2655, 0.2333, 10.3163, 58.7097], 1.3041),
    ("Ga", 31, [15.2354, 6.7006, 4.3591, 2.9623], [3.0669, 0.2412, 10.7805, 61.4135], 1.7189),
    ("Ge", 32, [16.0816, 6.3747, 3.7068, 3.6830], [2.8509, 0.2516, 11.4468, 54.7625], 2.1313),
    ("As", 33, [16.6723, 6.0701, 3.4313, 4.2779], [2.6345, 0.2647, 12.9479, 47.7972], 2.531),
    ("Se", 34, [17.0006, 5.8196, 3.9731, 4.3543], [2.4098, 0.2726, 15.2372, 43.8163], 2.8409),
    ("Br", 35, [17.1789, 5.2358, 5.6377, 3.9851], [2.1723, 16.5796, 0.2609, 41.4328], 2.9557),
    ("Rb", 37, [17.5816, 7.6598, 5.8981, 2.7817], [1.7139, 14.7957, 0.1603, 31.2087], 2.0782),
    ("Sr", 38, [17.5663, 9.8184, 5.4220, 2.6694], [1.5564, 14.0988, 0.1664, 132.376], 2.5064),
    ("Y", 39, [17.7760, 10.2946, 5.7263, 3.2656], [1.4029, 12.8006, 0.1255, 104.354], 1.9341),
    ("Zr", 40, [17.8765, 10.9480, 5.4173, 3.6577], [1.2761, 11.9160, 0.1176, 87.6627], 2.0690),
    ("Nb", 41, [17.6142, 12.0144, 4.0418, 3.5334], [1.1886, 11.7660, 0.2047, 69.7957], 3.7553),
    ("Mo", 42, [3.7025, 17.2356, 12.8876, 3.7429], [0.2772, 1.0958, 11.0040, 61.6584], 4.3875),
    ("Ag", 47, [19.2808, 16.6885, 4.8045, 1.0463], [0.6446, 7.4726, 24.6605, 99.8156], 5.1790),
    ("Ba", 56, [20.3361, 19.2970, 10.8880, 2.6959], [3.2160, 0.2756, 20.2073, 167.202], 2.7731),
    ("La", 57, [20.5780, 19.5990, 11.3727, 3.2879], [2.9480, 0.2440, 18.7726, 133.124], 2.1461),
    ("Ce", 58, [21.1671, 19.7695, 11.8513, 3.3303], [2.8129, 0.2268, 17.6083, 127.113], 1.8623),
    ("Au", 79, [16.8819, 18.5913, 25.5582, 5.8600], [0.4611, 8.6216, 1.4826, 36.3956], 12.0658),
    ("Pb", 82, [31.0617, 13.0637, 18.4420, 5.9696], [0.6902, 2.3576, 8.6180, 47.2579], 13.4118),
    ("Bi", 83, [33.3689, 12.9510, 16.5877, 6.4692], [0.7040, 2.9238, 8.7937, 48.0093], 13.5782),
];

/// 查找元素参数
///
/// 依次尝试完整符号、前两个字符（处理 "Fe1" 这类标签）、首字符。
pub fn lookup(element: &str) -> Option<ScatteringFactorParams> {
    let find = |symbol: &str| {
        TABLE
            .iter()
            .find(|row| row.0 == symbol)
            .map(|&(symbol, atomic_number, a, b, c)| ScatteringFactorParams {
                symbol,
                atomic_number,
                a,
                b,
                c,
            })
    };

    find(element)
        .or_else(|| element.get(..2).and_then(find))
        .or_else(|| element.get(..1).and_then(find))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xray_factor_at_zero_is_close_to_z() {
        for symbol in ["Si", "Fe", "Au"] {
            let p = lookup(symbol).unwrap();
            let f0 = p.xray(0.0);
            assert!(
                (f0 - p.atomic_number as f64).abs() < 1.0,
                "{} f(0) should be close to {}, got {}",
                symbol,
                p.atomic_number,
                f0
            );
        }
    }

    #[test]
    fn test_electron_factor_is_continuous_near_zero() {
        let p = lookup("Al").unwrap();
        let below = p.electron(0.5 * SMALL_S);
        let above = p.electron(5.0 * SMALL_S);
        assert!((below - above).abs() / above < 0.05, "{} vs {}", below, above);
    }

    #[test]
    fn test_electron_factor_decreases_with_s() {
        let p = lookup("Cu").unwrap();
        assert!(p.electron(0.1) > p.electron(0.3));
        assert!(p.electron(0.3) > p.electron(0.6));
        assert!(p.electron(0.6) > 0.0);
    }

    #[test]
    fn test_lookup_with_site_label() {
        assert_eq!(lookup("Fe1").unwrap().symbol, "Fe");
        assert_eq!(lookup("O2").unwrap().symbol, "O");
        assert!(lookup("Xx").is_none());
    }
}
