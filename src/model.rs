use serde::{Deserialize, Serialize};

/// A feed category: one named ordering/window of the subreddit. Posts are
/// stored once per category they were collected under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    TopWeek,
    TopMonth,
    TopYear,
    TopAll,
    Hot,
    Rising,
}

impl Category {
    /// The fixed set of categories every scrape session collects, in order.
    pub const ALL: [Category; 6] = [
        Category::TopWeek,
        Category::TopMonth,
        Category::TopYear,
        Category::TopAll,
        Category::Hot,
        Category::Rising,
    ];

    /// Label persisted in `posts.category_name` and used by the read API.
    pub fn label(&self) -> &'static str {
        match self {
            Category::TopWeek => "top-week",
            Category::TopMonth => "top-month",
            Category::TopYear => "top-year",
            Category::TopAll => "top-all",
            Category::Hot => "hot",
            Category::Rising => "rising",
        }
    }

    /// Reddit listing endpoint segment.
    pub fn listing_path(&self) -> &'static str {
        match self {
            Category::TopWeek | Category::TopMonth | Category::TopYear | Category::TopAll => "top",
            Category::Hot => "hot",
            Category::Rising => "rising",
        }
    }

    /// `t` query parameter for time-windowed top listings.
    pub fn time_window(&self) -> Option<&'static str> {
        match self {
            Category::TopWeek => Some("week"),
            Category::TopMonth => Some("month"),
            Category::TopYear => Some("year"),
            Category::TopAll => Some("all"),
            Category::Hot | Category::Rising => None,
        }
    }
}
