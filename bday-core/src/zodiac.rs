//! Sun-sign classification for birthday decoration.

use std::fmt;

/// The twelve sun signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zodiac {
    Capricorn,
    Aquarius,
    Pisces,
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
}

/// Ordered by last day of each sign. The final entry repeats Capricorn with a
/// Dec 31 cutoff so that every calendar day matches some row.
const CUTOFFS: [(u32, u32, Zodiac); 13] = [
    (1, 19, Zodiac::Capricorn),
    (2, 18, Zodiac::Aquarius),
    (3, 20, Zodiac::Pisces),
    (4, 19, Zodiac::Aries),
    (5, 20, Zodiac::Taurus),
    (6, 20, Zodiac::Gemini),
    (7, 22, Zodiac::Cancer),
    (8, 22, Zodiac::Leo),
    (9, 22, Zodiac::Virgo),
    (10, 22, Zodiac::Libra),
    (11, 21, Zodiac::Scorpio),
    (12, 21, Zodiac::Sagittarius),
    (12, 31, Zodiac::Capricorn),
];

impl Zodiac {
    pub const ALL: [Zodiac; 12] = [
        Zodiac::Capricorn,
        Zodiac::Aquarius,
        Zodiac::Pisces,
        Zodiac::Aries,
        Zodiac::Taurus,
        Zodiac::Gemini,
        Zodiac::Cancer,
        Zodiac::Leo,
        Zodiac::Virgo,
        Zodiac::Libra,
        Zodiac::Scorpio,
        Zodiac::Sagittarius,
    ];

    pub fn for_month_day(month: u32, day: u32) -> Zodiac {
        CUTOFFS
            .iter()
            .find(|(m, d, _)| (month, day) <= (*m, *d))
            .map(|(_, _, sign)| *sign)
            .expect("Dec 31 sentinel matches every month/day")
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Zodiac::Capricorn => "\u{2651}",
            Zodiac::Aquarius => "\u{2652}",
            Zodiac::Pisces => "\u{2653}",
            Zodiac::Aries => "\u{2648}",
            Zodiac::Taurus => "\u{2649}",
            Zodiac::Gemini => "\u{264a}",
            Zodiac::Cancer => "\u{264b}",
            Zodiac::Leo => "\u{264c}",
            Zodiac::Virgo => "\u{264d}",
            Zodiac::Libra => "\u{264e}",
            Zodiac::Scorpio => "\u{264f}",
            Zodiac::Sagittarius => "\u{2650}",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Zodiac::Capricorn => "Capricorn",
            Zodiac::Aquarius => "Aquarius",
            Zodiac::Pisces => "Pisces",
            Zodiac::Aries => "Aries",
            Zodiac::Taurus => "Taurus",
            Zodiac::Gemini => "Gemini",
            Zodiac::Cancer => "Cancer",
            Zodiac::Leo => "Leo",
            Zodiac::Virgo => "Virgo",
            Zodiac::Libra => "Libra",
            Zodiac::Scorpio => "Scorpio",
            Zodiac::Sagittarius => "Sagittarius",
        }
    }

    /// Remove zodiac decoration tokens from an event summary.
    ///
    /// Works on whole whitespace-separated tokens so that names merely
    /// containing a sign name ("Leonid") survive intact.
    pub fn strip_decorations(text: &str) -> String {
        text.split_whitespace()
            .filter(|token| !Self::is_decoration(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_decoration(token: &str) -> bool {
        Zodiac::ALL.iter().any(|sign| {
            token == sign.symbol()
                || token == sign.name()
                || token == format!("({})", sign.name())
        })
    }
}

impl fmt::Display for Zodiac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbol(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sagittarius_capricorn_boundary() {
        assert_eq!(Zodiac::for_month_day(12, 21), Zodiac::Sagittarius);
        assert_eq!(Zodiac::for_month_day(12, 22), Zodiac::Capricorn);
    }

    #[test]
    fn year_wraparound_is_capricorn() {
        assert_eq!(Zodiac::for_month_day(12, 31), Zodiac::Capricorn);
        assert_eq!(Zodiac::for_month_day(1, 1), Zodiac::Capricorn);
    }

    #[test]
    fn classification_is_total() {
        let days_in_month = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        for (month, days) in days_in_month.iter().enumerate() {
            for day in 1..=*days {
                // Must not panic on any calendar day
                Zodiac::for_month_day(month as u32 + 1, day);
            }
        }
    }

    #[test]
    fn strips_symbols_and_names_but_not_substrings() {
        assert_eq!(
            Zodiac::strip_decorations("Ivan \u{2651} (Capricorn)"),
            "Ivan"
        );
        assert_eq!(Zodiac::strip_decorations("Ivan Capricorn"), "Ivan");
        assert_eq!(Zodiac::strip_decorations("Leonid"), "Leonid");
    }
}
