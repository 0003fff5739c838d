//! Academic details encoded in a roll-number email such as `b421050@iiit-bh.ac.in`:
//! the second character is the branch, the next two the admission batch.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

const UNKNOWN: &str = "Unknown";
const YEAR_NAMES: [&str; 4] = ["1st Year", "2nd Year", "3rd Year", "4th Year"];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub branch: String,
    pub batch: String,
    pub study_year: String,
}

impl StudentInfo {
    fn unknown() -> Self {
        Self {
            branch: UNKNOWN.to_string(),
            batch: UNKNOWN.to_string(),
            study_year: UNKNOWN.to_string(),
        }
    }

    pub fn from_email(email: &str, domain: &str, today: NaiveDate) -> Self {
        let roll = match email.strip_suffix(domain).and_then(|local| local.strip_suffix('@')) {
            Some(roll) => roll.to_lowercase(),
            None => return Self::unknown(),
        };
        let mut chars = roll.chars().skip(1);
        let branch = match chars.next() {
            Some('1') => "Computer Science & Engineering",
            Some('2') => "Civil Engineering",
            Some('3') => "Electronics & Telecommunication",
            Some('4') => "Information Technology",
            Some('5') => "Electrical & Electronics Engineering",
            _ => "General",
        }
        .to_string();

        let batch_code: String = chars.take(2).collect();
        let start_year = match batch_code.parse::<i32>() {
            Ok(code) if batch_code.len() == 2 => 2000 + code,
            _ => {
                return Self {
                    branch,
                    ..Self::unknown()
                }
            }
        };

        // Academic years start in July.
        let mut year_of_study = today.year() - start_year;
        if today.month() >= 7 {
            year_of_study += 1;
        }
        let study_year = match year_of_study {
            n if n < 1 => UNKNOWN,
            n => YEAR_NAMES.get((n - 1) as usize).copied().unwrap_or("Alumni"),
        };

        Self {
            branch,
            batch: format!("{}-{}", start_year, start_year + 4),
            study_year: study_year.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "iiit-bh.ac.in";

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn decodes_branch_and_batch() {
        let info = StudentInfo::from_email("b421050@iiit-bh.ac.in", DOMAIN, day(2022, 9, 1));
        assert_eq!(info.branch, "Information Technology");
        assert_eq!(info.batch, "2021-2025");
        assert_eq!(info.study_year, "2nd Year");
    }

    #[test]
    fn study_year_rolls_over_in_july() {
        let june = StudentInfo::from_email("b121001@iiit-bh.ac.in", DOMAIN, day(2022, 6, 30));
        let july = StudentInfo::from_email("b121001@iiit-bh.ac.in", DOMAIN, day(2022, 7, 1));
        assert_eq!(june.study_year, "1st Year");
        assert_eq!(july.study_year, "2nd Year");
    }

    #[test]
    fn graduates_become_alumni() {
        let info = StudentInfo::from_email("b118001@iiit-bh.ac.in", DOMAIN, day(2026, 10, 18));
        assert_eq!(info.study_year, "Alumni");
    }

    #[test]
    fn non_roll_addresses_fall_back() {
        let info = StudentInfo::from_email("jane.smith@iiit-bh.ac.in", DOMAIN, day(2024, 1, 1));
        assert_eq!(info.branch, "General");
        assert_eq!(info.batch, "Unknown");
        let outside = StudentInfo::from_email("b421050@gmail.com", DOMAIN, day(2024, 1, 1));
        assert_eq!(outside, StudentInfo::unknown());
    }
}
