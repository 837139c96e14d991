/// Linear-space RGB color.
pub type Rgb = [f32; 3];

/// Parses `#rrggbb` (leading `#` optional) into sRGB components in [0, 1].
pub fn parse_hex(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .ok()
            .map(|value| value as f32 / 255.0)
    };
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

/// Hex color decoded into the linear working space.
///
/// Only used with literals baked into the scene, so a malformed value is a
/// programming error and degrades to black instead of failing the build of
/// the scene.
pub fn linear_from_hex(hex: &str) -> Rgb {
    match parse_hex(hex) {
        Some(srgb) => srgb.map(srgb_to_linear),
        None => {
            log::warn!("invalid color literal '{}', using black", hex);
            [0.0, 0.0, 0.0]
        }
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.077_399_38
    } else {
        (c * 0.947_867_3 + 0.052_132_7).powf(2.4)
    }
}

/// Standard HSL to RGB transform; every input is wrapped/clamped first.
pub fn hsl_to_srgb(hue: f32, saturation: f32, lightness: f32) -> Rgb {
    let h = hue.rem_euclid(1.0);
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    if s == 0.0 {
        return [l, l, l];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    ]
}

/// HSL color decoded into the linear working space.
pub fn linear_from_hsl(hue: f32, saturation: f32, lightness: f32) -> Rgb {
    hsl_to_srgb(hue, saturation, lightness).map(srgb_to_linear)
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let mut t = t;
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * 6.0 * (2.0 / 3.0 - t);
    }
    p
}

#[cfg(test)]
mod tests {
    use super::{hsl_to_srgb, linear_from_hex, parse_hex, srgb_to_linear};

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn hsl_primaries() {
        assert!(close(hsl_to_srgb(0.0, 1.0, 0.5), [1.0, 0.0, 0.0]));
        assert!(close(hsl_to_srgb(1.0 / 3.0, 1.0, 0.5), [0.0, 1.0, 0.0]));
        assert!(close(hsl_to_srgb(2.0 / 3.0, 1.0, 0.5), [0.0, 0.0, 1.0]));
        assert!(close(hsl_to_srgb(0.3, 0.0, 0.25), [0.25, 0.25, 0.25]));
    }

    #[test]
    fn hsl_matches_reference_in_both_lightness_halves() {
        assert!(close(hsl_to_srgb(0.0, 0.5, 0.25), [0.375, 0.125, 0.125]));
        assert!(close(hsl_to_srgb(0.0, 0.5, 0.75), [0.875, 0.625, 0.625]));
        assert!(close(hsl_to_srgb(0.5, 0.5, 0.75), [0.625, 0.875, 0.875]));
    }

    #[test]
    fn hsl_cyan_band_is_blue_dominant() {
        let [r, g, b] = hsl_to_srgb(0.6, 0.7, 0.6);
        assert!(b > g && g > r);
    }

    #[test]
    fn parses_hex_literals() {
        assert_eq!(parse_hex("#ffffff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(parse_hex("000000"), Some([0.0, 0.0, 0.0]));
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn linear_decode_is_monotonic_and_anchored() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-5);
        assert!(srgb_to_linear(0.5) < 0.5);
        assert!(close(linear_from_hex("#invalid"), [0.0, 0.0, 0.0]));
    }
}
