use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Listing sort modes offered by the subreddit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Hot,
    New,
    Rising,
    Top,
    Controversial,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Hot => "hot",
            Sort::New => "new",
            Sort::Rising => "rising",
            Sort::Top => "top",
            Sort::Controversial => "controversial",
        }
    }

    /// Only top and controversial listings accept a timeframe parameter.
    pub fn takes_timeframe(&self) -> bool {
        matches!(self, Sort::Top | Sort::Controversial)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(Sort::Hot),
            "new" => Ok(Sort::New),
            "rising" => Ok(Sort::Rising),
            "top" => Ok(Sort::Top),
            "controversial" => Ok(Sort::Controversial),
            other => Err(format!("unknown sort: {}", other)),
        }
    }
}

/// Timeframe window for top/controversial listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
            Timeframe::All => "all",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Timeframe::Hour),
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            "year" => Ok(Timeframe::Year),
            "all" => Ok(Timeframe::All),
            other => Err(format!("unknown timeframe: {}", other)),
        }
    }
}

/// One subreddit column on the start page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub subreddit: String,
    pub sort: Sort,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
}

impl Column {
    /// New columns get a creation-timestamp id and the default hot/day view.
    pub fn new(subreddit: String) -> Self {
        Self {
            id: format!("col_{}", Utc::now().timestamp_millis()),
            subreddit,
            sort: Sort::Hot,
            timeframe: Some(Timeframe::Day),
        }
    }

    /// Changes the sort. Sorts without a timeframe reset it to the day
    /// placeholder, which the fetch path never reads for those sorts.
    pub fn set_sort(&mut self, sort: Sort) {
        self.sort = sort;
        if !sort.takes_timeframe() {
            self.timeframe = Some(Timeframe::Day);
        }
    }

    pub fn cache_key(&self) -> String {
        super::item::cache_key(&self.subreddit, self.sort, self.timeframe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_column_defaults() {
        let column = Column::new("rust".into());
        assert!(column.id.starts_with("col_"));
        assert_eq!(column.sort, Sort::Hot);
        assert_eq!(column.timeframe, Some(Timeframe::Day));
    }

    #[test]
    fn test_set_sort_keeps_timeframe_for_top() {
        let mut column = Column::new("rust".into());
        column.timeframe = Some(Timeframe::Week);
        column.set_sort(Sort::Top);
        assert_eq!(column.timeframe, Some(Timeframe::Week));
    }

    #[test]
    fn test_set_sort_resets_timeframe_for_hot() {
        let mut column = Column::new("rust".into());
        column.timeframe = Some(Timeframe::Week);
        column.set_sort(Sort::New);
        assert_eq!(column.timeframe, Some(Timeframe::Day));
    }

    #[test]
    fn test_sort_parses_lowercase_names() {
        assert_eq!("controversial".parse::<Sort>().unwrap(), Sort::Controversial);
        assert!("hottest".parse::<Sort>().is_err());
    }

    #[test]
    fn test_column_json_shape() {
        let column = Column {
            id: "c1".into(),
            subreddit: "rust".into(),
            sort: Sort::Top,
            timeframe: Some(Timeframe::Week),
        };
        let value = serde_json::to_value(&column).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "c1",
                "subreddit": "rust",
                "sort": "top",
                "timeframe": "week"
            })
        );
    }

    #[test]
    fn test_column_without_timeframe_omits_field() {
        let column = Column {
            id: "c1".into(),
            subreddit: "rust".into(),
            sort: Sort::Hot,
            timeframe: None,
        };
        let raw = serde_json::to_string(&column).unwrap();
        assert!(!raw.contains("timeframe"));

        let back: Column = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, column);
    }
}
