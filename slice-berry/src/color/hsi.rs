//! RGB 与 HSI 色彩空间互转.
//!
//! 亮度 `I` 与 RGB 分量同量纲 (通常为 `[0, 255]`), 饱和度 `S` 属于 `[0, 1]`,
//! 色调 `H` 以弧度表示, 属于 `[0, 2π)`.

use std::f64::consts::{FRAC_PI_3, PI};

const TAU: f64 = 2.0 * PI;
const SECTOR: f64 = TAU / 3.0;

/// RGB -> HSI.
///
/// 灰色 (`R = G = B`) 上色调无定义, 此时取 0. 黑色的饱和度取 0.
pub fn rgb_to_hsi([r, g, b]: [f64; 3]) -> [f64; 3] {
    let i = (r + g + b) / 3.0;
    if i <= 0.0 {
        return [0.0, 0.0, 0.0];
    }
    let s = 1.0 - r.min(g).min(b) / i;
    let num = 0.5 * ((r - g) + (r - b));
    let den = ((r - g) * (r - g) + (r - b) * (g - b)).sqrt();
    let h = if den <= 0.0 {
        0.0
    } else {
        let theta = (num / den).clamp(-1.0, 1.0).acos();
        if b <= g {
            theta
        } else {
            TAU - theta
        }
    };
    [h, s, i]
}

/// HSI -> RGB. 色调按 `2π` 取模后分三个扇区计算.
pub fn hsi_to_rgb([h, s, i]: [f64; 3]) -> [f64; 3] {
    let h = h.rem_euclid(TAU);
    let low = i * (1.0 - s);
    let high = |h: f64| i * (1.0 + s * h.cos() / (FRAC_PI_3 - h).cos());
    if h < SECTOR {
        let r = high(h);
        [r, 3.0 * i - r - low, low]
    } else if h < 2.0 * SECTOR {
        let g = high(h - SECTOR);
        [low, g, 3.0 * i - g - low]
    } else {
        let b = high(h - 2.0 * SECTOR);
        [3.0 * i - b - low, low, b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rgb_close(a: [f64; 3], b: [f64; 3], eps: f64) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < eps)
    }

    #[test]
    fn test_primary_colors() {
        let [h, s, i] = rgb_to_hsi([255.0, 0.0, 0.0]);
        assert!(h.abs() < 1e-12);
        assert!((s - 1.0).abs() < 1e-12);
        assert!((i - 85.0).abs() < 1e-12);

        let [h, ..] = rgb_to_hsi([0.0, 255.0, 0.0]);
        assert!((h - SECTOR).abs() < 1e-9);
        let [h, ..] = rgb_to_hsi([0.0, 0.0, 255.0]);
        assert!((h - 2.0 * SECTOR).abs() < 1e-9);
    }

    #[test]
    fn test_gray_and_black() {
        assert_eq!(rgb_to_hsi([0.0; 3]), [0.0; 3]);
        let [h, s, i] = rgb_to_hsi([100.0; 3]);
        assert_eq!(h, 0.0);
        assert!(s.abs() < 1e-12);
        assert!((i - 100.0).abs() < 1e-12);
        assert!(rgb_close(hsi_to_rgb([h, s, i]), [100.0; 3], 1e-9));
    }

    #[test]
    fn test_known_round_trip() {
        let rgb = [10.0, 200.0, 30.0];
        assert!(rgb_close(hsi_to_rgb(rgb_to_hsi(rgb)), rgb, 1e-9));
    }

    proptest! {
        #[test]
        fn prop_round_trip(r in 0.0f64..=255.0, g in 0.0f64..=255.0, b in 0.0f64..=255.0) {
            // 灰轴附近色调无定义.
            prop_assume!((r - g).abs() > 1e-3 || (g - b).abs() > 1e-3);
            let back = hsi_to_rgb(rgb_to_hsi([r, g, b]));
            prop_assert!(rgb_close(back, [r, g, b], 1e-4), "{:?} -> {:?}", [r, g, b], back);
        }
    }
}
