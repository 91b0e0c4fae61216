//! SGR (Select Graphic Rendition) parameter interpretation.
//!
//! SGR state is delta-based: each parameter adjusts the cursor's current
//! style, which then applies to every subsequently printed cell. Both the
//! `;`-separated legacy form and the `:` sub-parameter form of extended
//! colors are accepted.

use crate::cell::{Color, Style, StyleFlags};
use crate::parser::CsiParam;

/// Apply an SGR parameter list to a style. An empty list is SGR 0.
pub fn apply_sgr(style: &mut Style, params: &[CsiParam]) {
    if params.is_empty() {
        style.reset_sgr();
        return;
    }

    let mut i = 0;
    while i < params.len() {
        let param = &params[i];
        if param.has_subparams() {
            apply_subparam_form(style, param);
            i += 1;
            continue;
        }
        match param.primary_or(0) {
            0 => style.reset_sgr(),
            1 => style.flags.insert(StyleFlags::BOLD),
            2 => style.flags.insert(StyleFlags::DIM),
            3 => style.flags.insert(StyleFlags::ITALIC),
            4 => style.flags.insert(StyleFlags::UNDERLINE),
            5 => style.flags.insert(StyleFlags::BLINK),
            7 => style.flags.insert(StyleFlags::REVERSE),
            8 => style.flags.insert(StyleFlags::HIDDEN),
            9 => style.flags.insert(StyleFlags::STRIKETHROUGH),
            21 => style.flags.remove(StyleFlags::BOLD),
            22 => style.flags.remove(StyleFlags::BOLD | StyleFlags::DIM),
            23 => style.flags.remove(StyleFlags::ITALIC),
            24 => style.flags.remove(StyleFlags::UNDERLINE),
            25 => style.flags.remove(StyleFlags::BLINK),
            27 => style.flags.remove(StyleFlags::REVERSE),
            28 => style.flags.remove(StyleFlags::HIDDEN),
            29 => style.flags.remove(StyleFlags::STRIKETHROUGH),
            p @ 30..=37 => style.fg = Color::Indexed((p - 30) as u8),
            38 => {
                if let Some((color, consumed)) = extended_color(&params[i + 1..]) {
                    style.fg = color;
                    i += consumed;
                }
            }
            39 => style.fg = Color::Default,
            p @ 40..=47 => style.bg = Color::Indexed((p - 40) as u8),
            48 => {
                if let Some((color, consumed)) = extended_color(&params[i + 1..]) {
                    style.bg = color;
                    i += consumed;
                }
            }
            49 => style.bg = Color::Default,
            p @ 90..=97 => style.fg = Color::Indexed((p - 90 + 8) as u8),
            p @ 100..=107 => style.bg = Color::Indexed((p - 100 + 8) as u8),
            _ => {}
        }
        i += 1;
    }
}

/// Extended color in the legacy form: `38;5;n` or `38;2;r;g;b`, reading
/// from the slots after the introducer. Returns the color and how many
/// slots were consumed.
fn extended_color(rest: &[CsiParam]) -> Option<(Color, usize)> {
    match rest.first()?.primary_or(0) {
        5 => {
            let idx = rest.get(1)?.primary_or(0);
            Some((Color::Indexed(idx.min(255) as u8), 2))
        }
        2 => {
            let r = rest.get(1)?.primary_or(0);
            let g = rest.get(2)?.primary_or(0);
            let b = rest.get(3)?.primary_or(0);
            Some((
                Color::Rgb(r.min(255) as u8, g.min(255) as u8, b.min(255) as u8),
                4,
            ))
        }
        _ => None,
    }
}

/// The `:` sub-parameter form: the whole extended color (or underline
/// variant) lives in one slot, e.g. `38:2:10:20:30` or `38:2:cs:10:20:30`
/// with an ignored color-space id.
fn apply_subparam_form(style: &mut Style, param: &CsiParam) {
    let parts = param.parts();
    let primary = param.primary_or(0);
    match primary {
        38 | 48 => {
            let color = match parts.get(1).copied().flatten() {
                Some(5) => parts
                    .get(2)
                    .copied()
                    .flatten()
                    .map(|n| Color::Indexed(n.min(255) as u8)),
                Some(2) => {
                    // 6 parts means a color-space id precedes the channels.
                    let base = if parts.len() >= 6 { 3 } else { 2 };
                    let channel = |i: usize| {
                        parts
                            .get(base + i)
                            .copied()
                            .flatten()
                            .map(|v| v.min(255) as u8)
                    };
                    match (channel(0), channel(1), channel(2)) {
                        (Some(r), Some(g), Some(b)) => Some(Color::Rgb(r, g, b)),
                        _ => None,
                    }
                }
                _ => None,
            };
            if let Some(color) = color {
                if primary == 38 {
                    style.fg = color;
                } else {
                    style.bg = color;
                }
            }
        }
        // 4:x underline variants: 4:0 clears, anything else underlines.
        4 => {
            if parts.get(1).copied().flatten() == Some(0) {
                style.flags.remove(StyleFlags::UNDERLINE);
            } else {
                style.flags.insert(StyleFlags::UNDERLINE);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn params(values: &[u16]) -> Vec<CsiParam> {
        values.iter().map(|&v| CsiParam::new(v)).collect()
    }

    /// Build a `:` sub-parameter slot by round-tripping through the parser,
    /// keeping the representation honest.
    fn subparam(parts: &[Option<u16>]) -> CsiParam {
        let mut text = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                text.push(':');
            }
            if let Some(v) = part {
                text.push_str(&v.to_string());
            }
        }
        let seqs = Parser::new().feed(format!("\x1b[{text}m").as_bytes());
        let crate::parser::Sequence::Csi { params, .. } = &seqs[0] else {
            panic!("expected CSI");
        };
        params[0].clone()
    }

    #[test]
    fn empty_is_reset() {
        let mut style = Style {
            flags: StyleFlags::BOLD,
            fg: Color::Indexed(3),
            ..Style::default()
        };
        apply_sgr(&mut style, &[]);
        assert_eq!(style, Style::default());
    }

    #[test]
    fn attributes_set_and_clear() {
        let mut style = Style::default();
        apply_sgr(&mut style, &params(&[1, 3, 4]));
        assert!(style.flags.contains(StyleFlags::BOLD));
        assert!(style.flags.contains(StyleFlags::ITALIC));
        assert!(style.flags.contains(StyleFlags::UNDERLINE));
        apply_sgr(&mut style, &params(&[22, 23, 24]));
        assert_eq!(style.flags, StyleFlags::empty());
    }

    #[test]
    fn reset_is_idempotent() {
        let mut style = Style {
            flags: StyleFlags::BOLD | StyleFlags::REVERSE,
            fg: Color::Rgb(1, 2, 3),
            bg: Color::Indexed(7),
            ..Style::default()
        };
        apply_sgr(&mut style, &params(&[0]));
        let once = style;
        apply_sgr(&mut style, &params(&[0]));
        assert_eq!(style, once);
    }

    #[test]
    fn basic_and_bright_colors() {
        let mut style = Style::default();
        apply_sgr(&mut style, &params(&[31, 42]));
        assert_eq!(style.fg, Color::Indexed(1));
        assert_eq!(style.bg, Color::Indexed(2));
        apply_sgr(&mut style, &params(&[94, 103]));
        assert_eq!(style.fg, Color::Indexed(12));
        assert_eq!(style.bg, Color::Indexed(11));
        apply_sgr(&mut style, &params(&[39, 49]));
        assert_eq!(style.fg, Color::Default);
        assert_eq!(style.bg, Color::Default);
    }

    #[test]
    fn truecolor_semicolon_form() {
        let mut style = Style::default();
        apply_sgr(&mut style, &params(&[38, 2, 10, 20, 30]));
        assert_eq!(style.fg, Color::Rgb(10, 20, 30));
        // Following parameters still apply after the color consumed its
        // arguments.
        apply_sgr(&mut style, &params(&[48, 5, 196, 1]));
        assert_eq!(style.bg, Color::Indexed(196));
        assert!(style.flags.contains(StyleFlags::BOLD));
    }

    #[test]
    fn truecolor_colon_form() {
        let mut style = Style::default();
        apply_sgr(&mut style, &[subparam(&[Some(38), Some(2), Some(10), Some(20), Some(30)])]);
        assert_eq!(style.fg, Color::Rgb(10, 20, 30));
    }

    #[test]
    fn colon_form_with_colorspace_prefix() {
        let mut style = Style::default();
        apply_sgr(
            &mut style,
            &[subparam(&[
                Some(38),
                Some(2),
                Some(0), // color-space id, ignored
                Some(10),
                Some(20),
                Some(30),
            ])],
        );
        assert_eq!(style.fg, Color::Rgb(10, 20, 30));
    }

    #[test]
    fn indexed_colon_form() {
        let mut style = Style::default();
        apply_sgr(&mut style, &[subparam(&[Some(48), Some(5), Some(123)])]);
        assert_eq!(style.bg, Color::Indexed(123));
    }

    #[test]
    fn truncated_extended_color_is_ignored() {
        let mut style = Style::default();
        apply_sgr(&mut style, &params(&[38, 2, 10]));
        assert_eq!(style.fg, Color::Default);
        apply_sgr(&mut style, &params(&[38]));
        assert_eq!(style.fg, Color::Default);
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let mut style = Style::default();
        apply_sgr(&mut style, &params(&[73, 1]));
        assert!(style.flags.contains(StyleFlags::BOLD));
    }
}
