//! CIE ΔE2000 perceptual color difference (Sharma, Wu, Dalal 2005).

use super::Lab;

const POW7_25: f64 = 6103515625.0; // 25^7

fn deg_to_rad(d: f64) -> f64 {
    d * std::f64::consts::PI / 180.0
}

fn rad_to_deg(r: f64) -> f64 {
    r * 180.0 / std::f64::consts::PI
}

/// Compute the CIE ΔE2000 color difference between two Lab colors.
///
/// Symmetric in its arguments and zero for identical inputs. Matches the
/// canonical reference pairs of Sharma et al. to well within 0.01.
pub fn delta_e_2000(lab1: Lab, lab2: Lab) -> f64 {
    let c1 = (lab1.a * lab1.a + lab1.b * lab1.b).sqrt();
    let c2 = (lab2.a * lab2.a + lab2.b * lab2.b).sqrt();
    let c_bar = 0.5 * (c1 + c2);
    let c_bar7 = c_bar.powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW7_25)).sqrt());

    let a1p = (1.0 + g) * lab1.a;
    let a2p = (1.0 + g) * lab2.a;
    let c1p = (a1p * a1p + lab1.b * lab1.b).sqrt();
    let c2p = (a2p * a2p + lab2.b * lab2.b).sqrt();

    let h1p = hue_angle(lab1.b, a1p);
    let h2p = hue_angle(lab2.b, a2p);

    let dl_p = lab2.l - lab1.l;
    let dc_p = c2p - c1p;

    let dh_p = if c1p * c2p == 0.0 {
        0.0
    } else {
        let mut d = h2p - h1p;
        if d > 180.0 {
            d -= 360.0;
        } else if d < -180.0 {
            d += 360.0;
        }
        d
    };
    let dhh_p = 2.0 * (c1p * c2p).sqrt() * deg_to_rad(dh_p / 2.0).sin();

    let l_bar = 0.5 * (lab1.l + lab2.l);
    let c_bar_p = 0.5 * (c1p + c2p);

    let h_bar_p = if c1p * c2p == 0.0 {
        h1p + h2p
    } else {
        let sum = h1p + h2p;
        if (h1p - h2p).abs() <= 180.0 {
            0.5 * sum
        } else if sum < 360.0 {
            0.5 * (sum + 360.0)
        } else {
            0.5 * (sum - 360.0)
        }
    };

    let t = 1.0 - 0.17 * deg_to_rad(h_bar_p - 30.0).cos()
        + 0.24 * deg_to_rad(2.0 * h_bar_p).cos()
        + 0.32 * deg_to_rad(3.0 * h_bar_p + 6.0).cos()
        - 0.20 * deg_to_rad(4.0 * h_bar_p - 63.0).cos();

    let d_theta = 30.0 * (-((h_bar_p - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + POW7_25)).sqrt();
    let r_t = -deg_to_rad(2.0 * d_theta).sin() * r_c;

    let l_minus_50_sq = (l_bar - 50.0) * (l_bar - 50.0);
    let s_l = 1.0 + 0.015 * l_minus_50_sq / (20.0 + l_minus_50_sq).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_p;
    let s_h = 1.0 + 0.015 * c_bar_p * t;

    let dl = dl_p / s_l;
    let dc = dc_p / s_c;
    let dh = dhh_p / s_h;

    (dl * dl + dc * dc + dh * dh + r_t * dc * dh).sqrt()
}

fn hue_angle(b: f64, ap: f64) -> f64 {
    if b == 0.0 && ap == 0.0 {
        return 0.0;
    }
    let h = rad_to_deg(b.atan2(ap));
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}
