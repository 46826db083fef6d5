/// Dataset and review kind definitions
///
/// Each dataset maps to one sub-table of the remote store and one snapshot file.
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three append-only datasets of a harvest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Cast,
    Movies,
    Reviews,
}

impl DatasetKind {
    /// All datasets, in flush order
    pub const ALL: [DatasetKind; 3] = [Self::Cast, Self::Movies, Self::Reviews];

    /// Name of the remote sub-table
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Self::Cast => "Cast",
            Self::Movies => "Movies",
            Self::Reviews => "Reviews",
        }
    }

    /// Rightmost column letter of the fixed-width remote range
    pub fn last_column(&self) -> char {
        match self {
            Self::Cast => 'D',
            Self::Movies => 'R',
            Self::Reviews => 'E',
        }
    }

    /// Number of columns covered by the remote range
    pub fn column_count(&self) -> usize {
        (self.last_column() as u8 - b'A' + 1) as usize
    }

    /// Local snapshot file name
    pub fn snapshot_file(&self) -> &'static str {
        match self {
            Self::Cast => "cast_and_crew.csv",
            Self::Movies => "movies.csv",
            Self::Reviews => "reviews.csv",
        }
    }

    /// Converts to a string representation for database storage
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Cast => "cast",
            Self::Movies => "movies",
            Self::Reviews => "reviews",
        }
    }

    /// Parses from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "cast" => Some(Self::Cast),
            "movies" => Some(Self::Movies),
            "reviews" => Some(Self::Reviews),
            _ => None,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

/// Review category of a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    Critic,
    Audience,
}

impl ReviewKind {
    /// Cell value written to the review_type column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critic => "critic_review",
            Self::Audience => "audience_review",
        }
    }

    /// Human readable label used in progress logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Critic => "critic",
            Self::Audience => "audience",
        }
    }
}

impl fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
