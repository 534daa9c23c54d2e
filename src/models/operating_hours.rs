use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

const DAY_ORDER: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayHours {
    pub day: String,
    #[serde(default)]
    pub open: String,
    #[serde(default)]
    pub close: String,
    #[serde(default)]
    pub closed: bool,
}

/// Weekly opening hours of a centre. An empty table means the centre has not
/// published hours and every day is bookable; otherwise unlisted days are closed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperatingHours {
    #[serde(default)]
    pub days: Vec<DayHours>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoursViolation {
    Closed { day: String },
    OutsideHours { day: String, hours: String },
}

impl std::fmt::Display for HoursViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoursViolation::Closed { day } => write!(f, "the centre is closed on {day}"),
            HoursViolation::OutsideHours { day, hours } => {
                write!(f, "the centre is open {hours} on {day}")
            }
        }
    }
}

impl OperatingHours {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let hours: OperatingHours = serde_json::from_str(s)?;
        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for day in &self.days {
            parse_weekday(&day.day)?;
            if day.closed {
                continue;
            }
            let open = parse_time(&day.open)?;
            let close = parse_time(&day.close)?;
            if open >= close {
                anyhow::bail!("opening time must precede closing time on {}", day.day);
            }
        }
        Ok(())
    }

    pub fn is_unrestricted(&self) -> bool {
        self.days.is_empty()
    }

    fn hours_for(&self, weekday: Weekday) -> Option<&DayHours> {
        let key = weekday_key(weekday);
        self.days.iter().find(|d| d.day.to_lowercase() == key)
    }

    pub fn check(&self, date: NaiveDate, time: NaiveTime) -> Result<(), HoursViolation> {
        if self.is_unrestricted() {
            return Ok(());
        }

        let weekday = date.weekday();
        let day_name = capitalize(weekday_key(weekday));
        let day = match self.hours_for(weekday) {
            Some(d) if !d.closed => d,
            _ => return Err(HoursViolation::Closed { day: day_name }),
        };

        let (Ok(open), Ok(close)) = (parse_time(&day.open), parse_time(&day.close)) else {
            return Err(HoursViolation::Closed { day: day_name });
        };

        if time < open || time >= close {
            return Err(HoursViolation::OutsideHours {
                day: day_name,
                hours: format!("{}-{}", day.open, day.close),
            });
        }
        Ok(())
    }

    pub fn to_human_readable(&self) -> String {
        let mut sorted = self.days.clone();
        sorted.sort_by_key(|d| {
            DAY_ORDER
                .iter()
                .position(|k| *k == d.day.to_lowercase())
                .unwrap_or(DAY_ORDER.len())
        });

        sorted
            .iter()
            .map(|d| {
                let day = capitalize(&d.day);
                if d.closed {
                    format!("{day}: closed")
                } else {
                    format!("{day}: {}-{}", d.open, d.close)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn weekday_key(weekday: Weekday) -> &'static str {
    DAY_ORDER[weekday.num_days_from_monday() as usize]
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}

fn parse_weekday(s: &str) -> anyhow::Result<()> {
    if DAY_ORDER.contains(&s.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("invalid weekday: {s}"))
    }
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| anyhow::anyhow!("invalid time: {s}"))
}
