use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static TITLE_SEASON_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(spring|summer|fall|autumn|winter)\b\W*(\d{4})\b")
        .expect("season title pattern is valid")
});

static TITLE_YEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    /// Months 2-4 are Spring, 5-7 Summer, 8-10 Fall, everything else Winter.
    pub fn from_month(month: u32) -> Season {
        match month {
            2..=4 => Season::Spring,
            5..=7 => Season::Summer,
            8..=10 => Season::Fall,
            _ => Season::Winter,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" | "autumn" => Ok(Season::Fall),
            "winter" => Ok(Season::Winter),
            _ => Err(format!("Unknown season: {}", s)),
        }
    }
}

/// Season and year of a record. Each part is resolved on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonTag {
    pub season: Option<Season>,
    pub year: Option<i32>,
}

impl SeasonTag {
    pub fn is_empty(&self) -> bool {
        self.season.is_none() && self.year.is_none()
    }

    /// "Spring 2024", "Spring", "2024" or "".
    pub fn label(&self) -> String {
        match (self.season, self.year) {
            (Some(season), Some(year)) => format!("{} {}", season, year),
            (Some(season), None) => season.to_string(),
            (None, Some(year)) => year.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Finds "<Season> <YYYY>" in a title such as "Spring 2024 Shootout".
pub fn season_from_title(title: &str) -> Option<(Season, i32)> {
    let caps = TITLE_SEASON_REGEX.captures(title)?;
    let season = caps.get(1)?.as_str().parse().ok()?;
    let year = caps.get(2)?.as_str().parse().ok()?;
    Some((season, year))
}

/// Season by calendar month; the year is the date's own year, so January
/// belongs to the Winter of the new year.
pub fn season_from_date(date: NaiveDate) -> (Season, i32) {
    (Season::from_month(date.month()), date.year())
}

/// Resolves season and year for a record.
///
/// Precedence for each part: explicit backend field, then a
/// "<Season> <YYYY>" match in the title (a bare year in the title also
/// counts for the year), then the month heuristic on the record date.
pub fn derive_season(
    explicit_season: Option<&str>,
    explicit_year: Option<i32>,
    title: Option<&str>,
    date: Option<NaiveDate>,
) -> SeasonTag {
    let from_title = title.and_then(season_from_title);
    let title_year = title.and_then(|t| {
        TITLE_YEAR_REGEX
            .find(t)
            .and_then(|m| m.as_str().parse::<i32>().ok())
    });
    let from_date = date.map(season_from_date);

    let season = explicit_season
        .and_then(|s| s.parse::<Season>().ok())
        .or(from_title.map(|(season, _)| season))
        .or(from_date.map(|(season, _)| season));

    let year = explicit_year
        .or(from_title.map(|(_, year)| year))
        .or(title_year)
        .or(from_date.map(|(_, year)| year));

    SeasonTag { season, year }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(1, Season::Winter)]
    #[test_case(2, Season::Spring)]
    #[test_case(4, Season::Spring)]
    #[test_case(5, Season::Summer)]
    #[test_case(7, Season::Summer)]
    #[test_case(8, Season::Fall)]
    #[test_case(10, Season::Fall)]
    #[test_case(11, Season::Winter)]
    #[test_case(12, Season::Winter)]
    fn test_month_table(month: u32, expected: Season) {
        assert_eq!(Season::from_month(month), expected);
    }

    #[test_case("Spring 2024 Shootout", Some((Season::Spring, 2024)))]
    #[test_case("AAU fall-2023 league", Some((Season::Fall, 2023)))]
    #[test_case("Autumn 2022 Classic", Some((Season::Fall, 2022)))]
    #[test_case("Winter Jam", None)]
    #[test_case("Springfield 2024 Invitational", None)]
    fn test_season_from_title(title: &str, expected: Option<(Season, i32)>) {
        assert_eq!(season_from_title(title), expected);
    }

    #[test]
    fn test_explicit_fields_take_precedence() {
        let tag = derive_season(
            Some("summer"),
            Some(2025),
            Some("Spring 2024 Shootout"),
            NaiveDate::from_ymd_opt(2023, 11, 2),
        );
        assert_eq!(tag, SeasonTag { season: Some(Season::Summer), year: Some(2025) });
    }

    #[test]
    fn test_title_beats_date() {
        let tag = derive_season(
            None,
            None,
            Some("Spring 2024 Shootout"),
            NaiveDate::from_ymd_opt(2023, 11, 2),
        );
        assert_eq!(tag.label(), "Spring 2024");
    }

    #[test]
    fn test_date_fallback_and_partial_title() {
        let tag = derive_season(
            None,
            None,
            Some("Holiday Hoops 2024"),
            NaiveDate::from_ymd_opt(2024, 12, 20),
        );
        assert_eq!(tag, SeasonTag { season: Some(Season::Winter), year: Some(2024) });

        let january = derive_season(None, None, None, NaiveDate::from_ymd_opt(2025, 1, 10));
        assert_eq!(january.label(), "Winter 2025");
    }

    #[test]
    fn test_nothing_known_yields_empty_tag() {
        let tag = derive_season(Some("monsoon"), None, Some("Open gym"), None);
        assert!(tag.is_empty());
        assert_eq!(tag.label(), "");
    }
}
