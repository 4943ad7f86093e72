use chrono::NaiveDate;

/// Calendar quarter parsed from a label like "Q2 2024"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u32,
}

impl Quarter {
    pub fn parse(label: &str) -> Option<Self> {
        let mut parts = label.split_whitespace();
        let q = parts.next()?;
        let year = parts.next()?.parse::<i32>().ok()?;
        if parts.next().is_some() {
            return None;
        }

        let quarter = q
            .strip_prefix('Q')
            .or_else(|| q.strip_prefix('q'))?
            .parse::<u32>()
            .ok()?;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        Some(Self { year, quarter })
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, (self.quarter - 1) * 3 + 1, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        let next = if self.quarter == 4 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.quarter * 3 + 1, 1)
        };
        next?.pred_opt()
    }

}

/// Sortable date for the start of a quarter label
pub fn quarter_start(label: &str) -> Option<NaiveDate> {
    Quarter::parse(label)?.first_day()
}

/// Sortable date for the end of a quarter label
pub fn quarter_end(label: &str) -> Option<NaiveDate> {
    Quarter::parse(label)?.last_day()
}
